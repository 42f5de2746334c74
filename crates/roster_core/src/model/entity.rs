//! Generic entity contract and typed attribute values.
//!
//! # Responsibility
//! - Describe what the store, query executor and repository need from a
//!   record type: identity, audit stamps and named typed attributes.
//!
//! # Invariants
//! - `id`, `created_at` and `updated_at` are present in every schema and are
//!   never writable through `set_attribute`.
//! - `attribute(name)` returns `None` only for names absent from `schema()`.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Store-assigned record identifier.
///
/// Positive and never reused inside one store, even after deletion.
pub type EntityId = i64;

/// Creation/modification stamps in Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: i64,
    /// Always `>= created_at`.
    pub updated_at: i64,
}

/// Static type of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Int,
    Text,
}

impl Display for AttrKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Dynamic attribute value used by predicates, sorting and mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Int(i64),
    Text(String),
}

impl AttrValue {
    /// Returns the value kind, or `None` for `Null`.
    pub fn kind(&self) -> Option<AttrKind> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(AttrKind::Int),
            Self::Text(_) => Some(AttrKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Compares two non-null values of the same kind.
    ///
    /// Returns `None` when either side is `Null` or the kinds differ.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => Some(left.cmp(right)),
            (Self::Text(left), Self::Text(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    /// Total order used for sorting: `Null` first, then ints, then text.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        fn rank(value: &AttrValue) -> u8 {
            match value {
                AttrValue::Null => 0,
                AttrValue::Int(_) => 1,
                AttrValue::Text(_) => 2,
            }
        }
        self.compare(other)
            .unwrap_or_else(|| rank(self).cmp(&rank(other)))
    }
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "'{value}'"),
        }
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Schema entry for one named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: &'static str,
    pub kind: AttrKind,
    pub nullable: bool,
    pub writable: bool,
}

impl AttributeDef {
    pub const fn new(name: &'static str, kind: AttrKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            writable: true,
        }
    }

    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    pub const fn read_only(self) -> Self {
        Self {
            writable: false,
            ..self
        }
    }
}

/// Attribute name of the identifier.
pub const ATTR_ID: &str = "id";
/// Attribute name of the creation stamp.
pub const ATTR_CREATED_AT: &str = "created_at";
/// Attribute name of the modification stamp.
pub const ATTR_UPDATED_AT: &str = "updated_at";

/// Schema entries every entity carries.
pub const BUILTIN_ATTRIBUTES: [AttributeDef; 3] = [
    AttributeDef::new(ATTR_ID, AttrKind::Int).nullable().read_only(),
    AttributeDef::new(ATTR_CREATED_AT, AttrKind::Int)
        .nullable()
        .read_only(),
    AttributeDef::new(ATTR_UPDATED_AT, AttrKind::Int)
        .nullable()
        .read_only(),
];

/// Record type storable in a `RecordStore`.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Lowercase name used in errors and log lines.
    const ENTITY_NAME: &'static str;

    /// Full attribute schema, builtin attributes included.
    fn schema() -> &'static [AttributeDef];

    fn id(&self) -> Option<EntityId>;

    /// Called by stores exactly once, on insert.
    fn assign_id(&mut self, id: EntityId);

    fn audit(&self) -> Option<Audit>;

    fn set_audit(&mut self, audit: Audit);

    /// Reads one attribute by name. `None` means the name is unknown.
    fn attribute(&self, name: &str) -> Option<AttrValue>;

    /// Writes one writable attribute, enforcing its schema kind.
    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ValidationError>;

    /// Checks record-level constraints before persistence.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Looks up one schema entry by name.
    fn attribute_def(name: &str) -> Option<&'static AttributeDef> {
        Self::schema().iter().find(|def| def.name == name)
    }
}

/// Reads a builtin attribute shared by every entity.
pub(crate) fn builtin_attribute(
    id: Option<EntityId>,
    audit: Option<Audit>,
    name: &str,
) -> Option<AttrValue> {
    match name {
        ATTR_ID => Some(id.into()),
        ATTR_CREATED_AT => Some(audit.map(|value| value.created_at).into()),
        ATTR_UPDATED_AT => Some(audit.map(|value| value.updated_at).into()),
        _ => None,
    }
}

/// Error for a write to a read-only builtin or an unknown attribute of `E`.
pub(crate) fn read_only_or_unknown<E: Entity>(name: &str) -> ValidationError {
    match E::attribute_def(name) {
        Some(def) => ValidationError::ReadOnlyAttribute {
            entity: E::ENTITY_NAME,
            attribute: def.name,
        },
        None => ValidationError::UnknownAttribute {
            entity: E::ENTITY_NAME,
            attribute: name.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::AttrValue;
    use std::cmp::Ordering;

    #[test]
    fn compare_rejects_mixed_kinds_and_null() {
        assert_eq!(AttrValue::Int(1).compare(&AttrValue::Int(2)), Some(Ordering::Less));
        assert_eq!(AttrValue::Int(1).compare(&AttrValue::from("1")), None);
        assert_eq!(AttrValue::Null.compare(&AttrValue::Null), None);
    }

    #[test]
    fn sort_cmp_places_null_first() {
        assert_eq!(AttrValue::Null.sort_cmp(&AttrValue::Int(-5)), Ordering::Less);
        assert_eq!(
            AttrValue::from("b").sort_cmp(&AttrValue::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        assert_eq!(AttrValue::from(None::<i64>), AttrValue::Null);
        assert_eq!(AttrValue::from(Some(7_i64)), AttrValue::Int(7));
    }
}
