//! Typed repository combining a record store, the query executor and a
//! read cache.

use crate::model::entity::{AttrValue, Entity, EntityId};
use crate::model::validation::ValidationError;
use crate::query::{Mutation, Page, PageRequest, Predicate, Query, QueryExecutor, Sort};
use crate::repo::cache::ReadCache;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::{LockMode, RecordStore};
use std::marker::PhantomData;
use std::ops::Bound;
use std::sync::Arc;

/// Repository over one entity type.
///
/// Several repositories may share one store through the `Arc`; each keeps its
/// own read cache.
pub struct Repository<E: Entity, S: RecordStore<E> + ?Sized> {
    store: Arc<S>,
    cache: ReadCache<E>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, S: RecordStore<E> + ?Sized> Repository<E, S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: ReadCache::new(),
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn executor(&self) -> QueryExecutor<'_, E, S> {
        QueryExecutor::new(&*self.store)
    }

    /// Inserts when `entity` has no id, updates in place otherwise.
    ///
    /// Returns the stored copy including audit stamps.
    pub fn save(&self, entity: E) -> RepoResult<E> {
        self.save_with_lock(entity, LockMode::None)
    }

    pub fn save_with_lock(&self, entity: E, lock: LockMode) -> RepoResult<E> {
        let id = match entity.id() {
            None => self.store.insert(&entity)?,
            Some(id) => {
                let written = self.store.update(&entity, lock);
                self.cache.evict(id);
                written?;
                id
            }
        };
        self.read_back(id, lock)
    }

    /// Always inserts, keeping a caller-supplied id.
    pub fn insert(&self, entity: E) -> RepoResult<E> {
        let id = self.store.insert(&entity)?;
        self.read_back(id, LockMode::None)
    }

    fn read_back(&self, id: EntityId, lock: LockMode) -> RepoResult<E> {
        let seen = self.cache.generation();
        let stored = self
            .store
            .get(id, lock)?
            .ok_or(RepoError::InconsistentState("written record missing in read-back"))?;
        self.cache.put_if_current(&stored, seen);
        Ok(stored)
    }

    /// Served from the read cache when possible.
    pub fn find_by_id(&self, id: EntityId) -> RepoResult<Option<E>> {
        if let Some(cached) = self.cache.get(id) {
            return Ok(Some(cached));
        }
        self.load(id, LockMode::None)
    }

    /// Exclusive reads bypass the cache and refresh it.
    pub fn find_by_id_with_lock(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>> {
        match lock {
            LockMode::None => self.find_by_id(id),
            LockMode::Exclusive => self.load(id, lock),
        }
    }

    /// A write that lands between the store read and the cache update wins:
    /// the row is returned but not cached.
    fn load(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>> {
        let seen = self.cache.generation();
        let found = self.store.get(id, lock)?;
        match &found {
            Some(entity) => {
                self.cache.put_if_current(entity, seen);
            }
            None => self.cache.evict(id),
        }
        Ok(found)
    }

    pub fn exists_by_id(&self, id: EntityId) -> RepoResult<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }

    pub fn find_all(&self, sort: Option<&Sort>) -> RepoResult<Vec<E>> {
        let mut query = Query::all();
        query.sort = sort.cloned();
        self.executor().find(&query)
    }

    pub fn find(&self, query: &Query) -> RepoResult<Vec<E>> {
        self.executor().find(query)
    }

    pub fn find_unique(&self, predicate: &Predicate) -> RepoResult<Option<E>> {
        self.executor().find_unique(predicate)
    }

    pub fn find_by_attribute(
        &self,
        attribute: &str,
        value: impl Into<AttrValue>,
    ) -> RepoResult<Vec<E>> {
        self.find(&Query::new(Predicate::eq(attribute, value)))
    }

    /// Records whose `attribute` lies within the given bounds. Null values lie
    /// outside every range, including a fully unbounded one.
    pub fn find_by_attribute_range(
        &self,
        attribute: &str,
        lower: Bound<AttrValue>,
        upper: Bound<AttrValue>,
    ) -> RepoResult<Vec<E>> {
        let lower = match lower {
            Bound::Included(value) => Predicate::ge(attribute, value),
            Bound::Excluded(value) => Predicate::gt(attribute, value),
            Bound::Unbounded => Predicate::All,
        };
        let upper = match upper {
            Bound::Included(value) => Predicate::le(attribute, value),
            Bound::Excluded(value) => Predicate::lt(attribute, value),
            Bound::Unbounded => Predicate::All,
        };
        let mut predicate = lower.and(upper);
        if matches!(predicate, Predicate::All) {
            predicate = Predicate::Not(Box::new(Predicate::is_null(attribute)));
        }
        self.find(&Query::new(predicate))
    }

    pub fn find_page(&self, query: &Query, request: &PageRequest) -> RepoResult<Page<E>> {
        self.executor().paginate(query, request)
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.store.count()
    }

    pub fn count_where(&self, predicate: &Predicate) -> RepoResult<u64> {
        self.executor().count(predicate)
    }

    /// Idempotent; returns whether a record was removed.
    pub fn delete_by_id(&self, id: EntityId) -> RepoResult<bool> {
        let removed = self.store.delete(id);
        self.cache.evict(id);
        removed
    }

    pub fn delete(&self, entity: &E) -> RepoResult<bool> {
        let id = entity.id().ok_or(ValidationError::UnsavedReference {
            entity: E::ENTITY_NAME,
            field: "id",
        })?;
        self.delete_by_id(id)
    }

    /// Returns the number of affected records and evicts them from the cache.
    pub fn bulk_update(&self, predicate: &Predicate, mutation: &Mutation) -> RepoResult<usize> {
        let outcome = self.executor().bulk_update(predicate, mutation)?;
        self.cache.evict_all(&outcome.ids);
        Ok(outcome.affected)
    }

    /// Drops every cached record. Stored data is untouched.
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
