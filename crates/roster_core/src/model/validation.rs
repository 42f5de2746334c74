//! Record validation rules shared by entity types.

use crate::model::entity::{AttrKind, AttrValue};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static CONTROL_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Cc}").expect("valid control character regex"));

/// Constraint violation detected before a write reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField {
        entity: &'static str,
        field: &'static str,
    },
    ControlCharacters {
        entity: &'static str,
        field: &'static str,
    },
    NegativeValue {
        entity: &'static str,
        field: &'static str,
        value: i64,
    },
    UnknownAttribute {
        entity: &'static str,
        attribute: String,
    },
    ReadOnlyAttribute {
        entity: &'static str,
        attribute: &'static str,
    },
    TypeMismatch {
        entity: &'static str,
        attribute: &'static str,
        expected: AttrKind,
        actual: AttrValue,
    },
    /// Association target has not been saved yet.
    UnsavedReference {
        entity: &'static str,
        field: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { entity, field } => {
                write!(f, "{entity}.{field} must not be empty")
            }
            Self::ControlCharacters { entity, field } => {
                write!(f, "{entity}.{field} must not contain control characters")
            }
            Self::NegativeValue {
                entity,
                field,
                value,
            } => write!(f, "{entity}.{field} must be >= 0, got {value}"),
            Self::UnknownAttribute { entity, attribute } => {
                write!(f, "{entity} has no attribute `{attribute}`")
            }
            Self::ReadOnlyAttribute { entity, attribute } => {
                write!(f, "{entity}.{attribute} is read-only")
            }
            Self::TypeMismatch {
                entity,
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "{entity}.{attribute} expects {expected} value, got {actual}"
            ),
            Self::UnsavedReference { entity, field } => {
                write!(f, "{entity}.{field} references an unsaved record")
            }
        }
    }
}

impl Error for ValidationError {}

/// Validates a human-readable label such as a username or team name.
pub(crate) fn validate_label(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { entity, field });
    }
    if CONTROL_CHAR_RE.is_match(value) {
        return Err(ValidationError::ControlCharacters { entity, field });
    }
    Ok(())
}

pub(crate) fn validate_non_negative(
    entity: &'static str,
    field: &'static str,
    value: i64,
) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeValue {
            entity,
            field,
            value,
        });
    }
    Ok(())
}

pub(crate) fn expect_int(
    entity: &'static str,
    attribute: &'static str,
    value: AttrValue,
) -> Result<i64, ValidationError> {
    match value {
        AttrValue::Int(value) => Ok(value),
        other => Err(ValidationError::TypeMismatch {
            entity,
            attribute,
            expected: AttrKind::Int,
            actual: other,
        }),
    }
}

pub(crate) fn expect_optional_int(
    entity: &'static str,
    attribute: &'static str,
    value: AttrValue,
) -> Result<Option<i64>, ValidationError> {
    match value {
        AttrValue::Null => Ok(None),
        other => expect_int(entity, attribute, other).map(Some),
    }
}

pub(crate) fn expect_text(
    entity: &'static str,
    attribute: &'static str,
    value: AttrValue,
) -> Result<String, ValidationError> {
    match value {
        AttrValue::Text(value) => Ok(value),
        other => Err(ValidationError::TypeMismatch {
            entity,
            attribute,
            expected: AttrKind::Text,
            actual: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_label, ValidationError};

    #[test]
    fn label_rejects_blank_and_control_characters() {
        assert_eq!(
            validate_label("member", "username", "   "),
            Err(ValidationError::EmptyField {
                entity: "member",
                field: "username"
            })
        );
        assert!(matches!(
            validate_label("member", "username", "bad\u{7}name"),
            Err(ValidationError::ControlCharacters { .. })
        ));
        assert!(validate_label("member", "username", "member1").is_ok());
    }
}
