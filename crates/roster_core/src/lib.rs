//! Typed record storage, structured queries and paging for a member/team
//! roster.
//! Stores, the query executor and repositories are generic over `Entity`;
//! `RosterService` binds them to the roster use-cases.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, LogConfig, RosterConfig, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{AttrKind, AttrValue, AttributeDef, Audit, Entity, EntityId};
pub use model::member::Member;
pub use model::team::Team;
pub use model::validation::ValidationError;
pub use query::{
    BulkUpdate, CountMode, Direction, Mutation, Page, PageRequest, Predicate, Query,
    QueryExecutor, Sort,
};
pub use repo::{RepoError, RepoResult, Repository};
pub use service::read_model::{Fetch, MemberDto, MemberView};
pub use service::roster_service::RosterService;
pub use store::memory::MemoryRecordStore;
pub use store::sqlite::{SqlEntity, SqliteRecordStore};
pub use store::{LockMode, RecordStore, Scan};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
