//! Repository façade over record stores.
//!
//! # Responsibility
//! - Combine a `RecordStore` and the query executor behind one typed API.
//! - Keep a per-session read cache consistent with every write path.
//!
//! # Invariants
//! - Store errors surface unchanged; malformed queries surface as
//!   `InvalidQuery`.
//! - After any write returns, no cached copy of an affected id is stale.

mod cache;
pub mod error;
mod repository;

pub use error::{RepoError, RepoResult};
pub use repository::Repository;
