//! In-memory record store.
//!
//! # Invariants
//! - Rows are kept in insertion order; deletes do not reorder survivors.
//! - `next_id` only grows and saturates at `EntityId::MAX`; deleted ids move
//!   to `retired` and are refused on later caller-supplied inserts.
//! - One `RwLock` guards the whole store: writers are exclusive, readers
//!   share.

use crate::model::entity::{Audit, Entity, EntityId};
use crate::model::validation::ValidationError;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::clock::AuditClock;
use crate::store::{LockMode, RecordFilter, RecordMutator, RecordStore, Scan};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct MemoryState<E> {
    rows: IndexMap<EntityId, E>,
    next_id: EntityId,
    retired: HashSet<EntityId>,
}

/// `RecordStore` keeping every record in process memory.
pub struct MemoryRecordStore<E> {
    state: RwLock<MemoryState<E>>,
    clock: AuditClock,
}

impl<E: Entity> Default for MemoryRecordStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryRecordStore<E> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                rows: IndexMap::new(),
                next_id: 1,
                retired: HashSet::new(),
            }),
            clock: AuditClock::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState<E>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState<E>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Entity> RecordStore<E> for MemoryRecordStore<E> {
    fn insert(&self, entity: &E) -> RepoResult<EntityId> {
        entity.validate()?;

        let mut state = self.write();
        let id = match entity.id() {
            Some(id) if id <= 0 => {
                return Err(RepoError::InvalidData(format!(
                    "{} identifier must be positive, got {id}",
                    E::ENTITY_NAME
                )));
            }
            Some(id) => {
                if state.rows.contains_key(&id) || state.retired.contains(&id) {
                    return Err(RepoError::DuplicateIdentifier {
                        entity: E::ENTITY_NAME,
                        id,
                    });
                }
                state.next_id = state.next_id.max(id.saturating_add(1));
                id
            }
            None => {
                let id = state.next_id;
                if state.rows.contains_key(&id) || state.retired.contains(&id) {
                    return Err(RepoError::InvalidData(format!(
                        "{} identifier space exhausted",
                        E::ENTITY_NAME
                    )));
                }
                state.next_id = id.saturating_add(1);
                id
            }
        };

        let now = self.clock.stamp();
        let mut stored = entity.clone();
        stored.assign_id(id);
        stored.set_audit(Audit {
            created_at: now,
            updated_at: now,
        });
        state.rows.insert(id, stored);

        debug!(
            "event=record_insert module=store status=ok backend=memory entity={} id={id}",
            E::ENTITY_NAME
        );
        Ok(id)
    }

    fn update(&self, entity: &E, _lock: LockMode) -> RepoResult<()> {
        entity.validate()?;
        let id = entity.id().ok_or(ValidationError::UnsavedReference {
            entity: E::ENTITY_NAME,
            field: "id",
        })?;

        // Updates always take the write guard, so both lock modes coincide.
        let mut state = self.write();
        let stored = state.rows.get_mut(&id).ok_or(RepoError::NotFound {
            entity: E::ENTITY_NAME,
            id,
        })?;
        let now = self.clock.stamp();
        let created_at = stored.audit().map_or(now, |audit| audit.created_at);

        let mut next = entity.clone();
        next.set_audit(Audit {
            created_at,
            updated_at: now,
        });
        *stored = next;

        debug!(
            "event=record_update module=store status=ok backend=memory entity={} id={id}",
            E::ENTITY_NAME
        );
        Ok(())
    }

    fn get(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>> {
        let found = match lock {
            LockMode::None => self.read().rows.get(&id).cloned(),
            LockMode::Exclusive => self.write().rows.get(&id).cloned(),
        };
        Ok(found)
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        let mut state = self.write();
        let removed = state.rows.shift_remove(&id).is_some();
        if removed {
            state.retired.insert(id);
        }
        debug!(
            "event=record_delete module=store status=ok backend=memory entity={} id={id} removed={removed}",
            E::ENTITY_NAME
        );
        Ok(removed)
    }

    fn scan(&self) -> RepoResult<Scan<E>> {
        let rows = self.read().rows.values().cloned().collect();
        Ok(Scan::new(rows))
    }

    fn count(&self) -> RepoResult<u64> {
        Ok(self.read().rows.len() as u64)
    }

    fn apply_where(
        &self,
        filter: &RecordFilter<'_, E>,
        mutate: &RecordMutator<'_, E>,
    ) -> RepoResult<Vec<EntityId>> {
        let mut state = self.write();

        let mut staged = Vec::new();
        for (id, current) in state.rows.iter().filter(|(_, row)| filter(row)) {
            let mut next = current.clone();
            mutate(&mut next)?;
            next.validate()?;
            staged.push((*id, next));
        }

        let mut affected = Vec::with_capacity(staged.len());
        for (id, mut next) in staged {
            let now = self.clock.stamp();
            let created_at = next.audit().map_or(now, |audit| audit.created_at);
            next.set_audit(Audit {
                created_at,
                updated_at: now,
            });
            state.rows.insert(id, next);
            affected.push(id);
        }

        Ok(affected)
    }
}
