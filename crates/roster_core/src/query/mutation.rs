//! Attribute mutations applied by bulk updates.

use crate::model::entity::{AttrKind, AttrValue, Entity};
use crate::query::predicate::resolve;
use crate::repo::error::{RepoError, RepoResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Set(String, AttrValue),
    /// Adds `delta` to a non-nullable integer attribute.
    Increment(String, i64),
    /// Applies each mutation in order.
    Chain(Vec<Mutation>),
}

impl Mutation {
    pub fn set(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Set(attribute.into(), value.into())
    }

    pub fn increment(attribute: impl Into<String>, delta: i64) -> Self {
        Self::Increment(attribute.into(), delta)
    }

    pub fn then(self, next: Mutation) -> Self {
        match self {
            Self::Chain(mut items) => {
                items.push(next);
                Self::Chain(items)
            }
            first => Self::Chain(vec![first, next]),
        }
    }

    pub(crate) fn compile<E: Entity>(&self) -> RepoResult<CompiledMutation> {
        let mut steps = Vec::new();
        self.compile_into::<E>(&mut steps)?;
        if steps.is_empty() {
            return Err(RepoError::invalid_query("mutation has no steps"));
        }
        Ok(CompiledMutation { steps })
    }

    fn compile_into<E: Entity>(&self, steps: &mut Vec<Step>) -> RepoResult<()> {
        match self {
            Self::Set(name, value) => {
                let def = resolve::<E>(name)?;
                if !def.writable {
                    return Err(read_only::<E>(def.name));
                }
                match value.kind() {
                    None if !def.nullable => {
                        return Err(RepoError::invalid_query(format!(
                            "{}.{} is not nullable",
                            E::ENTITY_NAME,
                            def.name
                        )));
                    }
                    Some(kind) if kind != def.kind => {
                        return Err(RepoError::invalid_query(format!(
                            "{}.{} is {}, got {value}",
                            E::ENTITY_NAME,
                            def.name,
                            def.kind
                        )));
                    }
                    _ => {}
                }
                steps.push(Step::Set(def.name, value.clone()));
            }
            Self::Increment(name, delta) => {
                let def = resolve::<E>(name)?;
                if !def.writable {
                    return Err(read_only::<E>(def.name));
                }
                if def.kind != AttrKind::Int || def.nullable {
                    return Err(RepoError::invalid_query(format!(
                        "cannot increment {}.{}",
                        E::ENTITY_NAME,
                        def.name
                    )));
                }
                steps.push(Step::Increment(def.name, *delta));
            }
            Self::Chain(items) => {
                for item in items {
                    item.compile_into::<E>(steps)?;
                }
            }
        }
        Ok(())
    }
}

fn read_only<E: Entity>(attribute: &str) -> RepoError {
    RepoError::invalid_query(format!(
        "{}.{attribute} is read-only",
        E::ENTITY_NAME
    ))
}

enum Step {
    Set(&'static str, AttrValue),
    Increment(&'static str, i64),
}

pub(crate) struct CompiledMutation {
    steps: Vec<Step>,
}

impl CompiledMutation {
    pub(crate) fn apply<E: Entity>(&self, entity: &mut E) -> RepoResult<()> {
        for step in &self.steps {
            match step {
                Step::Set(name, value) => entity.set_attribute(name, value.clone())?,
                Step::Increment(name, delta) => {
                    let current = entity
                        .attribute(name)
                        .and_then(|value| value.as_int())
                        .ok_or_else(|| {
                            RepoError::InvalidData(format!(
                                "{}.{name} has no integer value",
                                E::ENTITY_NAME
                            ))
                        })?;
                    let next = current.checked_add(*delta).ok_or_else(|| {
                        RepoError::invalid_query(format!(
                            "{}.{name} overflows on increment by {delta}",
                            E::ENTITY_NAME
                        ))
                    })?;
                    entity.set_attribute(name, AttrValue::Int(next))?;
                }
            }
        }
        Ok(())
    }
}
