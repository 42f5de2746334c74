//! Record store contracts and implementations.
//!
//! # Responsibility
//! - Own keyed storage of entities, identifier assignment and audit stamps.
//! - Provide the single-pass scan the query executor is built on.
//!
//! # Invariants
//! - Identifiers are unique per store and never reused after deletion.
//! - Every write stamps `updated_at` strictly later than any earlier stamp
//!   issued by the same store; `created_at` is fixed at insert.
//! - Writes are mutually exclusive; reads may run concurrently.

use crate::model::entity::{Entity, EntityId};
use crate::repo::error::RepoResult;
use std::sync::Arc;

pub mod clock;
pub mod memory;
mod retry;
pub mod sqlite;

/// Lock requested for a single `get`/`update` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockMode {
    /// Shared access; concurrent readers allowed.
    #[default]
    None,
    /// Runs under the store's exclusive write lock.
    Exclusive,
}

/// Immutable snapshot of a store, in insertion order.
///
/// Iterating does not copy records and may be restarted any number of times.
#[derive(Debug, Clone)]
pub struct Scan<E> {
    rows: Arc<[E]>,
}

impl<E> Scan<E> {
    pub(crate) fn new(rows: Vec<E>) -> Self {
        Self { rows: rows.into() }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a, E> IntoIterator for &'a Scan<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Filter callback for `RecordStore::apply_where`.
pub type RecordFilter<'a, E> = dyn Fn(&E) -> bool + 'a;
/// Mutation callback for `RecordStore::apply_where`.
pub type RecordMutator<'a, E> = dyn Fn(&mut E) -> RepoResult<()> + 'a;

/// Keyed storage for one entity type.
pub trait RecordStore<E: Entity>: Send + Sync {
    /// Stores a copy of `entity` and returns its identifier.
    ///
    /// A missing id is assigned; a caller-supplied id must be unused.
    fn insert(&self, entity: &E) -> RepoResult<EntityId>;

    /// Replaces the stored copy. Fails with `NotFound` if absent.
    fn update(&self, entity: &E, lock: LockMode) -> RepoResult<()>;

    /// Returns `None` for unknown identifiers.
    fn get(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>>;

    /// Removes one record; returns whether it existed. Idempotent.
    fn delete(&self, id: EntityId) -> RepoResult<bool>;

    fn scan(&self) -> RepoResult<Scan<E>>;

    fn count(&self) -> RepoResult<u64>;

    /// Mutates every record accepted by `filter` in one exclusive pass.
    ///
    /// Returns affected ids in insertion order. On error nothing is written.
    fn apply_where(
        &self,
        filter: &RecordFilter<'_, E>,
        mutate: &RecordMutator<'_, E>,
    ) -> RepoResult<Vec<EntityId>>;
}

impl<E: Entity, S: RecordStore<E> + ?Sized> RecordStore<E> for Arc<S> {
    fn insert(&self, entity: &E) -> RepoResult<EntityId> {
        (**self).insert(entity)
    }

    fn update(&self, entity: &E, lock: LockMode) -> RepoResult<()> {
        (**self).update(entity, lock)
    }

    fn get(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>> {
        (**self).get(id, lock)
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        (**self).delete(id)
    }

    fn scan(&self) -> RepoResult<Scan<E>> {
        (**self).scan()
    }

    fn count(&self) -> RepoResult<u64> {
        (**self).count()
    }

    fn apply_where(
        &self,
        filter: &RecordFilter<'_, E>,
        mutate: &RecordMutator<'_, E>,
    ) -> RepoResult<Vec<EntityId>> {
        (**self).apply_where(filter, mutate)
    }
}
