//! Result ordering.

use crate::model::entity::{AttrValue, Entity};
use crate::query::predicate::resolve;
use crate::repo::error::RepoResult;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub attribute: String,
    pub direction: Direction,
}

/// Ordered list of sort keys. Identifier ascending always breaks ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn by(attribute: impl Into<String>, direction: Direction) -> Self {
        Self::default().then(attribute, direction)
    }

    pub fn asc(attribute: impl Into<String>) -> Self {
        Self::by(attribute, Direction::Asc)
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self::by(attribute, Direction::Desc)
    }

    /// Appends a secondary key.
    pub fn then(mut self, attribute: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order {
            attribute: attribute.into(),
            direction,
        });
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub(crate) fn compile<E: Entity>(&self) -> RepoResult<CompiledSort> {
        let keys = self
            .orders
            .iter()
            .map(|order| Ok((resolve::<E>(&order.attribute)?.name, order.direction)))
            .collect::<RepoResult<_>>()?;
        Ok(CompiledSort { keys })
    }
}

pub(crate) struct CompiledSort {
    keys: Vec<(&'static str, Direction)>,
}

impl CompiledSort {
    /// Stable sort; equal keys fall back to identifier ascending.
    pub(crate) fn apply<E: Entity>(&self, rows: Vec<E>) -> Vec<E> {
        if self.keys.is_empty() {
            return rows;
        }

        let mut decorated: Vec<(Vec<AttrValue>, i64, E)> = rows
            .into_iter()
            .map(|row| {
                let key = self
                    .keys
                    .iter()
                    .map(|(name, _)| row.attribute(name).unwrap_or(AttrValue::Null))
                    .collect();
                (key, row.id().unwrap_or_default(), row)
            })
            .collect();

        decorated.sort_by(|(left_key, left_id, _), (right_key, right_id, _)| {
            self.keys
                .iter()
                .zip(left_key.iter().zip(right_key))
                .map(|((_, direction), (left, right))| match direction {
                    Direction::Asc => left.sort_cmp(right),
                    Direction::Desc => right.sort_cmp(left),
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| left_id.cmp(right_id))
        });

        decorated.into_iter().map(|(_, _, row)| row).collect()
    }
}
