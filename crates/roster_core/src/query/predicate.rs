//! Structured filter expressions over entity attributes.
//!
//! # Invariants
//! - A predicate is compiled against an entity schema before evaluation;
//!   evaluation itself never fails.
//! - Evaluation is three-valued as in SQL: a comparison, `In` or pattern
//!   against a `Null` attribute is unknown, `Not` keeps it unknown, and only
//!   a true result matches. `IsNull` is never unknown.

use crate::model::entity::{AttrKind, AttrValue, AttributeDef, Entity};
use crate::repo::error::{RepoError, RepoResult};
use regex::Regex;
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Predicate {
    /// Matches every record.
    #[default]
    All,
    Eq(String, AttrValue),
    Ne(String, AttrValue),
    Gt(String, AttrValue),
    Ge(String, AttrValue),
    Lt(String, AttrValue),
    Le(String, AttrValue),
    /// Value is one of the listed values. An empty set matches nothing.
    In(String, Vec<AttrValue>),
    IsNull(String),
    /// SQL `LIKE` pattern: `%` is any run, `_` is any one character.
    Like(String, String),
    /// Regular expression searched anywhere in a text attribute.
    Matches(String, String),
    /// Conjunction. Empty is true.
    And(Vec<Predicate>),
    /// Disjunction. Empty is false.
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn eq(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Eq(attribute.into(), value.into())
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Ne(attribute.into(), value.into())
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Gt(attribute.into(), value.into())
    }

    pub fn ge(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Ge(attribute.into(), value.into())
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Lt(attribute.into(), value.into())
    }

    pub fn le(attribute: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        Self::Le(attribute.into(), value.into())
    }

    pub fn is_in<V: Into<AttrValue>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(
            attribute.into(),
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::IsNull(attribute.into())
    }

    pub fn like(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like(attribute.into(), pattern.into())
    }

    pub fn matches(attribute: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Matches(attribute.into(), pattern.into())
    }

    /// Combines with `other`, flattening nested conjunctions.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::All, other) => other,
            (this, Self::All) => this,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (this, other) => Self::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (this, other) => Self::Or(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Resolves attribute names and checks operand types for `E`.
    pub fn compile<E: Entity>(&self) -> RepoResult<CompiledPredicate> {
        let compiled = match self {
            Self::All => CompiledPredicate::All,
            Self::Eq(name, value) => compare::<E>(name, CompareOp::Eq, value)?,
            Self::Ne(name, value) => compare::<E>(name, CompareOp::Ne, value)?,
            Self::Gt(name, value) => compare::<E>(name, CompareOp::Gt, value)?,
            Self::Ge(name, value) => compare::<E>(name, CompareOp::Ge, value)?,
            Self::Lt(name, value) => compare::<E>(name, CompareOp::Lt, value)?,
            Self::Le(name, value) => compare::<E>(name, CompareOp::Le, value)?,
            Self::In(name, values) => {
                let def = resolve::<E>(name)?;
                for value in values {
                    check_operand::<E>(def, value)?;
                }
                CompiledPredicate::In {
                    attribute: def.name,
                    values: values.clone(),
                }
            }
            Self::IsNull(name) => CompiledPredicate::IsNull {
                attribute: resolve::<E>(name)?.name,
            },
            Self::Like(name, pattern) => {
                pattern_predicate::<E>(name, &like_to_regex(pattern), pattern)?
            }
            Self::Matches(name, pattern) => pattern_predicate::<E>(name, pattern, pattern)?,
            Self::And(items) => CompiledPredicate::And(
                items
                    .iter()
                    .map(Predicate::compile::<E>)
                    .collect::<RepoResult<_>>()?,
            ),
            Self::Or(items) => CompiledPredicate::Or(
                items
                    .iter()
                    .map(Predicate::compile::<E>)
                    .collect::<RepoResult<_>>()?,
            ),
            Self::Not(inner) => CompiledPredicate::Not(Box::new(inner.compile::<E>()?)),
        };
        Ok(compiled)
    }
}

/// Comparison operator of a compiled predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
        }
    }
}

/// Predicate validated against one entity schema.
#[derive(Debug, Clone)]
pub enum CompiledPredicate {
    All,
    Compare {
        attribute: &'static str,
        op: CompareOp,
        value: AttrValue,
    },
    In {
        attribute: &'static str,
        values: Vec<AttrValue>,
    },
    IsNull {
        attribute: &'static str,
    },
    Pattern {
        attribute: &'static str,
        regex: Regex,
    },
    And(Vec<CompiledPredicate>),
    Or(Vec<CompiledPredicate>),
    Not(Box<CompiledPredicate>),
}

impl CompiledPredicate {
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.evaluate(entity) == Some(true)
    }

    /// SQL three-valued evaluation; `None` is unknown.
    fn evaluate<E: Entity>(&self, entity: &E) -> Option<bool> {
        let read = |name: &str| entity.attribute(name).unwrap_or(AttrValue::Null);
        match self {
            Self::All => Some(true),
            Self::Compare {
                attribute,
                op,
                value,
            } => read(*attribute)
                .compare(value)
                .map(|ordering| op.accepts(ordering)),
            Self::In { attribute, values } => {
                let actual = read(*attribute);
                (!actual.is_null()).then(|| values.contains(&actual))
            }
            Self::IsNull { attribute } => Some(read(*attribute).is_null()),
            Self::Pattern { attribute, regex } => read(*attribute)
                .as_text()
                .map(|text| regex.is_match(text)),
            Self::And(items) => {
                let mut outcome = Some(true);
                for item in items {
                    match item.evaluate(entity) {
                        Some(false) => return Some(false),
                        None => outcome = None,
                        Some(true) => {}
                    }
                }
                outcome
            }
            Self::Or(items) => {
                let mut outcome = Some(false);
                for item in items {
                    match item.evaluate(entity) {
                        Some(true) => return Some(true),
                        None => outcome = None,
                        Some(false) => {}
                    }
                }
                outcome
            }
            Self::Not(inner) => inner.evaluate(entity).map(|value| !value),
        }
    }
}

pub(crate) fn resolve<E: Entity>(name: &str) -> RepoResult<&'static AttributeDef> {
    E::attribute_def(name).ok_or_else(|| {
        RepoError::invalid_query(format!(
            "unknown attribute `{name}` for {}",
            E::ENTITY_NAME
        ))
    })
}

fn check_operand<E: Entity>(def: &AttributeDef, value: &AttrValue) -> RepoResult<()> {
    match value.kind() {
        None => Err(RepoError::invalid_query(format!(
            "null operand for {}.{}; use is_null instead",
            E::ENTITY_NAME,
            def.name
        ))),
        Some(kind) if kind != def.kind => Err(RepoError::invalid_query(format!(
            "{}.{} is {}, got {value}",
            E::ENTITY_NAME,
            def.name,
            def.kind
        ))),
        Some(_) => Ok(()),
    }
}

fn compare<E: Entity>(name: &str, op: CompareOp, value: &AttrValue) -> RepoResult<CompiledPredicate> {
    let def = resolve::<E>(name)?;
    check_operand::<E>(def, value)?;
    Ok(CompiledPredicate::Compare {
        attribute: def.name,
        op,
        value: value.clone(),
    })
}

fn pattern_predicate<E: Entity>(
    name: &str,
    regex: &str,
    original: &str,
) -> RepoResult<CompiledPredicate> {
    let def = resolve::<E>(name)?;
    if def.kind != AttrKind::Text {
        return Err(RepoError::invalid_query(format!(
            "pattern match on non-text attribute {}.{}",
            E::ENTITY_NAME,
            def.name
        )));
    }
    let regex = Regex::new(regex).map_err(|err| {
        RepoError::invalid_query(format!("invalid pattern `{original}`: {err}"))
    })?;
    Ok(CompiledPredicate::Pattern {
        attribute: def.name,
        regex,
    })
}

fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::from("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}
