//! Per-session read cache keyed by identifier.
//!
//! # Invariants
//! - Every eviction bumps the write generation.
//! - A row read from the store is only cached if no eviction happened since
//!   the generation was taken, so a read racing a write cannot resurrect the
//!   old copy.

use crate::model::entity::{Entity, EntityId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct CacheState<E> {
    entries: HashMap<EntityId, E>,
    generation: u64,
}

/// Identity map for one repository. The lock is never held across a store call.
pub(crate) struct ReadCache<E> {
    state: RwLock<CacheState<E>>,
}

impl<E: Entity> ReadCache<E> {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState<E>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState<E>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<E> {
        self.read().entries.get(&id).cloned()
    }

    /// Take before reading from the store; pass to `put_if_current`.
    pub(crate) fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Caches `entity` unless an eviction happened after `seen` was taken.
    /// Ignores entities without an identifier.
    pub(crate) fn put_if_current(&self, entity: &E, seen: u64) -> bool {
        let Some(id) = entity.id() else {
            return false;
        };
        let mut state = self.write();
        if state.generation != seen {
            return false;
        }
        state.entries.insert(id, entity.clone());
        true
    }

    pub(crate) fn evict(&self, id: EntityId) {
        let mut state = self.write();
        state.generation += 1;
        state.entries.remove(&id);
    }

    pub(crate) fn evict_all(&self, ids: &[EntityId]) {
        let mut state = self.write();
        state.generation += 1;
        for id in ids {
            state.entries.remove(id);
        }
    }

    pub(crate) fn clear(&self) {
        let mut state = self.write();
        state.generation += 1;
        state.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.read().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::ReadCache;
    use crate::model::team::Team;

    fn saved(id: i64, name: &str) -> Team {
        let mut team = Team::new(name);
        team.id = Some(id);
        team
    }

    #[test]
    fn unsaved_entities_are_not_cached() {
        let cache = ReadCache::new();
        let seen = cache.generation();
        assert!(!cache.put_if_current(&Team::new("unsaved"), seen));
        assert_eq!(cache.len(), 0);

        assert!(cache.put_if_current(&saved(4, "saved"), seen));
        assert_eq!(cache.get(4).map(|t| t.name), Some("saved".to_string()));

        cache.evict_all(&[4, 5]);
        assert!(cache.get(4).is_none());
    }

    #[test]
    fn eviction_after_generation_was_taken_rejects_the_put() {
        let cache = ReadCache::new();
        let seen = cache.generation();
        cache.evict(7);
        assert!(!cache.put_if_current(&saved(7, "old"), seen));
        assert!(cache.get(7).is_none());

        let fresh = cache.generation();
        assert!(cache.put_if_current(&saved(7, "new"), fresh));
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_ne!(cache.generation(), fresh);
    }
}
