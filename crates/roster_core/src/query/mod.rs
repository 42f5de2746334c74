//! Structured queries: predicates, sorts, paging and bulk mutations.
//!
//! # Responsibility
//! - Replace method-name query derivation with explicit value objects.
//! - Evaluate them against any `RecordStore` through `QueryExecutor`.

mod executor;
mod mutation;
mod page;
mod predicate;
mod sort;

pub use executor::{BulkUpdate, Query, QueryExecutor};
pub use mutation::Mutation;
pub use page::{CountMode, Page, PageRequest};
pub use predicate::{CompareOp, CompiledPredicate, Predicate};
pub use sort::{Direction, Order, Sort};
