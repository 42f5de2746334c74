//! Error type shared by stores, the query executor and repositories.

use crate::db::DbError;
use crate::model::entity::EntityId;
use crate::model::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Operation referenced an identifier that does not exist.
    NotFound { entity: &'static str, id: EntityId },
    /// Insert with an identifier that exists or was used before.
    DuplicateIdentifier { entity: &'static str, id: EntityId },
    /// Malformed predicate, sort, page request or mutation.
    InvalidQuery(String),
    /// Single-result lookup matched more than one record.
    NonUniqueResult { count: usize },
    /// Backing store stayed busy after every retry attempt.
    StoreUnavailable { attempts: u32, message: String },
    Validation(ValidationError),
    Db(DbError),
    /// Persisted row cannot be decoded into a valid record.
    InvalidData(String),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Write succeeded but read-back disagrees.
    InconsistentState(&'static str),
}

impl RepoError {
    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::DuplicateIdentifier { entity, id } => {
                write!(f, "{entity} identifier already used: {id}")
            }
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::NonUniqueResult { count } => {
                write!(f, "expected at most one result, found {count}")
            }
            Self::StoreUnavailable { attempts, message } => write!(
                f,
                "store unavailable after {attempts} attempt(s): {message}"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::InconsistentState(details) => write!(f, "inconsistent store state: {details}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
