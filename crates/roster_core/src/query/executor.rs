//! Query evaluation over a record store scan.
//!
//! # Responsibility
//! - Compile predicates, sorts and mutations against the entity schema.
//! - Evaluate finds, counts and pages in one pass over `RecordStore::scan`.
//! - Route bulk updates through `RecordStore::apply_where`.
//!
//! # Invariants
//! - Malformed input fails with `InvalidQuery` before the store is touched.
//! - Result order is insertion order unless a sort is given; sorts are stable
//!   with identifier ascending as the final tie-breaker.

use crate::model::entity::{Entity, EntityId};
use crate::query::mutation::Mutation;
use crate::query::page::{CountMode, Page, PageRequest};
use crate::query::predicate::Predicate;
use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::RecordStore;
use log::info;
use std::marker::PhantomData;
use std::time::Instant;

/// Filter plus optional ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicate: Predicate,
    pub sort: Option<Sort>,
}

impl Query {
    /// Matches every record, insertion order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            sort: None,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl From<Predicate> for Query {
    fn from(predicate: Predicate) -> Self {
        Self::new(predicate)
    }
}

/// Outcome of a bulk update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpdate {
    pub affected: usize,
    /// Affected identifiers, insertion order.
    pub ids: Vec<EntityId>,
}

pub struct QueryExecutor<'s, E: Entity, S: RecordStore<E> + ?Sized> {
    store: &'s S,
    _entity: PhantomData<fn() -> E>,
}

impl<'s, E: Entity, S: RecordStore<E> + ?Sized> QueryExecutor<'s, E, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn find(&self, query: &Query) -> RepoResult<Vec<E>> {
        let predicate = query.predicate.compile::<E>()?;
        let sort = query
            .sort
            .as_ref()
            .map(|sort| sort.compile::<E>())
            .transpose()?;

        let scan = self.store.scan()?;
        let matched: Vec<E> = scan
            .iter()
            .filter(|row| predicate.matches(*row))
            .cloned()
            .collect();

        Ok(match sort {
            Some(sort) => sort.apply(matched),
            None => matched,
        })
    }

    /// At most one match; more fail with `NonUniqueResult`.
    pub fn find_unique(&self, predicate: &Predicate) -> RepoResult<Option<E>> {
        let compiled = predicate.compile::<E>()?;
        let scan = self.store.scan()?;
        let mut matched = scan.iter().filter(|row| compiled.matches(*row));

        let first = matched.next().cloned();
        let extra = matched.count();
        if extra > 0 {
            return Err(RepoError::NonUniqueResult { count: extra + 1 });
        }
        Ok(first)
    }

    pub fn count(&self, predicate: &Predicate) -> RepoResult<u64> {
        let compiled = predicate.compile::<E>()?;
        if matches!(predicate, Predicate::All) {
            return self.store.count();
        }
        let scan = self.store.scan()?;
        Ok(scan.iter().filter(|row| compiled.matches(*row)).count() as u64)
    }

    /// A sort on `request` replaces the one on `query`.
    pub fn paginate(&self, query: &Query, request: &PageRequest) -> RepoResult<Page<E>> {
        let offset = request.offset()?;
        let predicate = query.predicate.compile::<E>()?;
        let sort = request
            .sort
            .as_ref()
            .or(query.sort.as_ref())
            .filter(|sort| !sort.is_unsorted())
            .map(|sort| sort.compile::<E>())
            .transpose()?;

        let scan = self.store.scan()?;
        let matching = scan.iter().filter(|row| predicate.matches(*row));

        match (sort, request.count) {
            (None, CountMode::Skip) => {
                let mut content: Vec<E> = matching
                    .skip(offset)
                    .take(request.size + 1)
                    .cloned()
                    .collect();
                let has_next = content.len() > request.size;
                content.truncate(request.size);
                Ok(Page::new(content, request, has_next, None))
            }
            (None, CountMode::Exact) => {
                let mut total = 0usize;
                let mut content = Vec::with_capacity(request.size);
                for row in matching {
                    if total >= offset && content.len() < request.size {
                        content.push(row.clone());
                    }
                    total += 1;
                }
                let has_next = offset.saturating_add(request.size) < total;
                Ok(Page::new(content, request, has_next, Some(total as u64)))
            }
            (Some(sort), count) => {
                let all = sort.apply(matching.cloned().collect());
                let total = all.len();
                let has_next = offset.saturating_add(request.size) < total;
                let content = all.into_iter().skip(offset).take(request.size).collect();
                let total_elements = match count {
                    CountMode::Exact => Some(total as u64),
                    CountMode::Skip => None,
                };
                Ok(Page::new(content, request, has_next, total_elements))
            }
        }
    }

    pub fn bulk_update(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<BulkUpdate> {
        let started_at = Instant::now();
        let filter = predicate.compile::<E>()?;
        let mutation = mutation.compile::<E>()?;

        let ids = self
            .store
            .apply_where(&|row: &E| filter.matches(row), &|row: &mut E| {
                mutation.apply(row)
            })?;

        info!(
            "event=bulk_update module=query status=ok entity={} affected={} duration_ms={}",
            E::ENTITY_NAME,
            ids.len(),
            started_at.elapsed().as_millis()
        );
        Ok(BulkUpdate {
            affected: ids.len(),
            ids,
        })
    }
}
