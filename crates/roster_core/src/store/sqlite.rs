//! SQLite-backed record store.
//!
//! # Responsibility
//! - Persist `Member` and `Team` rows with the same contract as the
//!   in-memory store.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every call applies the configured busy timeout and retries transient
//!   lock failures a bounded number of times.
//! - Writes run inside one `BEGIN IMMEDIATE` transaction each.
//! - Insertion order is `inserted_seq`, not `id`, so caller-supplied ids do
//!   not reorder scans.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::config::StoreConfig;
use crate::db::migrations::{latest_version, schema_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::entity::{Audit, Entity, EntityId};
use crate::model::member::{Member, ATTR_AGE, ATTR_TEAM_ID, ATTR_USERNAME};
use crate::model::team::{Team, ATTR_NAME};
use crate::model::validation::ValidationError;
use crate::repo::error::{RepoError, RepoResult};
use crate::store::clock::AuditClock;
use crate::store::retry::RetryPolicy;
use crate::store::{LockMode, RecordFilter, RecordMutator, RecordStore, Scan};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const REQUIRED_TABLES: [&str; 3] = ["teams", "members", "retired_ids"];

/// Row mapping for entities persisted by `SqliteRecordStore`.
///
/// Every table carries `id`, `inserted_seq`, `created_at` and `updated_at`
/// next to the entity's own `COLUMNS`.
pub trait SqlEntity: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Values for `COLUMNS`, in the same order.
    fn column_values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> RepoResult<Self>;
}

impl SqlEntity for Member {
    const TABLE: &'static str = "members";
    const COLUMNS: &'static [&'static str] = &[ATTR_USERNAME, ATTR_AGE, ATTR_TEAM_ID];

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.username.clone()),
            Value::Integer(self.age),
            self.team_id.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id: EntityId = row.get("id")?;
        let member = Self {
            id: Some(id),
            username: row.get(ATTR_USERNAME)?,
            age: row.get(ATTR_AGE)?,
            team_id: row.get(ATTR_TEAM_ID)?,
            audit: Some(read_audit(row)?),
        };
        check_row(member, id)
    }
}

impl SqlEntity for Team {
    const TABLE: &'static str = "teams";
    const COLUMNS: &'static [&'static str] = &[ATTR_NAME];

    fn column_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let id: EntityId = row.get("id")?;
        let team = Self {
            id: Some(id),
            name: row.get(ATTR_NAME)?,
            audit: Some(read_audit(row)?),
        };
        check_row(team, id)
    }
}

/// `RecordStore` over one SQLite connection, shared by all entity tables.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    clock: AuditClock,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl SqliteRecordStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version differs from the
    ///   latest migration.
    /// - `MissingRequiredTable` when a roster table is absent.
    pub fn try_new(conn: Connection, config: &StoreConfig) -> RepoResult<Self> {
        let actual_version = schema_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        for table in REQUIRED_TABLES {
            if !table_exists(&conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }

        let floor = latest_stamp(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock: AuditClock::starting_after(floor),
            retry: RetryPolicy::from_config(config),
            call_timeout: config.call_timeout(),
        })
    }

    /// Opens (or creates) a database file and wraps it.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> RepoResult<Self> {
        Self::try_new(open_db(path)?, config)
    }

    /// Opens a private in-memory database and wraps it.
    pub fn open_in_memory(config: &StoreConfig) -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?, config)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn call<T>(
        &self,
        operation: &'static str,
        mut op: impl FnMut(&mut Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut conn = self.lock();
        conn.busy_timeout(self.call_timeout)?;
        self.retry.run(operation, || op(&mut *conn))
    }
}

impl<E: SqlEntity> RecordStore<E> for SqliteRecordStore {
    fn insert(&self, entity: &E) -> RepoResult<EntityId> {
        entity.validate()?;
        if let Some(id) = entity.id() {
            if id <= 0 {
                return Err(RepoError::InvalidData(format!(
                    "{} identifier must be positive, got {id}",
                    E::ENTITY_NAME
                )));
            }
        }

        let id = self.call("insert", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if let Some(id) = entity.id() {
                if row_exists(&tx, E::TABLE, id)? || is_retired(&tx, E::TABLE, id)? {
                    return Err(RepoError::DuplicateIdentifier {
                        entity: E::ENTITY_NAME,
                        id,
                    });
                }
            }

            let seq: i64 = tx.query_row(
                &format!(
                    "SELECT COALESCE(MAX(inserted_seq), 0) + 1 FROM {};",
                    E::TABLE
                ),
                [],
                |row| row.get(0),
            )?;
            let now = self.clock.stamp();

            let mut values = vec![entity.id().map_or(Value::Null, Value::Integer)];
            values.extend(entity.column_values());
            values.extend([Value::Integer(seq), Value::Integer(now), Value::Integer(now)]);

            tx.execute(&insert_sql::<E>(), params_from_iter(values))?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        })?;

        debug!(
            "event=record_insert module=store status=ok backend=sqlite entity={} id={id}",
            E::ENTITY_NAME
        );
        Ok(id)
    }

    fn update(&self, entity: &E, lock: LockMode) -> RepoResult<()> {
        entity.validate()?;
        let id = entity.id().ok_or(ValidationError::UnsavedReference {
            entity: E::ENTITY_NAME,
            field: "id",
        })?;

        self.call("update", |conn| {
            let tx = conn.transaction_with_behavior(transaction_behavior(lock))?;
            let mut values = entity.column_values();
            values.extend([Value::Integer(self.clock.stamp()), Value::Integer(id)]);
            let changed = tx.execute(&update_sql::<E>(), params_from_iter(values))?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: E::ENTITY_NAME,
                    id,
                });
            }
            tx.commit()?;
            Ok(())
        })?;

        debug!(
            "event=record_update module=store status=ok backend=sqlite entity={} id={id}",
            E::ENTITY_NAME
        );
        Ok(())
    }

    fn get(&self, id: EntityId, lock: LockMode) -> RepoResult<Option<E>> {
        let sql = format!("{} WHERE id = ?1;", select_sql::<E>());
        self.call("get", |conn| match lock {
            LockMode::None => load_one::<E>(conn, &sql, id),
            LockMode::Exclusive => {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let found = load_one::<E>(&tx, &sql, id)?;
                tx.commit()?;
                Ok(found)
            }
        })
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        let removed = self.call("delete", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = tx.execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?;
            if changed > 0 {
                tx.execute(
                    "INSERT OR IGNORE INTO retired_ids (table_name, id) VALUES (?1, ?2);",
                    params![E::TABLE, id],
                )?;
            }
            tx.commit()?;
            Ok(changed > 0)
        })?;

        debug!(
            "event=record_delete module=store status=ok backend=sqlite entity={} id={id} removed={removed}",
            E::ENTITY_NAME
        );
        Ok(removed)
    }

    fn scan(&self) -> RepoResult<Scan<E>> {
        let sql = format!("{} ORDER BY inserted_seq ASC;", select_sql::<E>());
        let rows = self.call("scan", |conn| load_all::<E>(conn, &sql))?;
        Ok(Scan::new(rows))
    }

    fn count(&self) -> RepoResult<u64> {
        self.call("count", |conn| {
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {};", E::TABLE),
                [],
                |row| row.get(0),
            )?;
            u64::try_from(count)
                .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
        })
    }

    fn apply_where(
        &self,
        filter: &RecordFilter<'_, E>,
        mutate: &RecordMutator<'_, E>,
    ) -> RepoResult<Vec<EntityId>> {
        let select = format!("{} ORDER BY inserted_seq ASC;", select_sql::<E>());
        let update = update_sql::<E>();

        self.call("apply_where", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let rows = load_all::<E>(&tx, &select)?;

            let mut affected = Vec::new();
            for row in rows.iter().filter(|row| filter(row)) {
                let id = row.id().ok_or(RepoError::InconsistentState(
                    "persisted row without identifier",
                ))?;
                let mut next = row.clone();
                mutate(&mut next)?;
                next.validate()?;

                let mut values = next.column_values();
                values.extend([Value::Integer(self.clock.stamp()), Value::Integer(id)]);
                tx.execute(&update, params_from_iter(values))?;
                affected.push(id);
            }

            tx.commit()?;
            Ok(affected)
        })
    }
}

fn transaction_behavior(lock: LockMode) -> TransactionBehavior {
    match lock {
        LockMode::None => TransactionBehavior::Deferred,
        LockMode::Exclusive => TransactionBehavior::Immediate,
    }
}

fn select_sql<E: SqlEntity>() -> String {
    format!(
        "SELECT id, {}, created_at, updated_at FROM {}",
        E::COLUMNS.join(", "),
        E::TABLE
    )
}

fn insert_sql<E: SqlEntity>() -> String {
    let placeholders = vec!["?"; E::COLUMNS.len() + 4].join(", ");
    format!(
        "INSERT INTO {} (id, {}, inserted_seq, created_at, updated_at) VALUES ({placeholders});",
        E::TABLE,
        E::COLUMNS.join(", ")
    )
}

fn update_sql<E: SqlEntity>() -> String {
    let assignments = E::COLUMNS
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {assignments}, updated_at = ? WHERE id = ?;",
        E::TABLE
    )
}

fn load_one<E: SqlEntity>(conn: &Connection, sql: &str, id: EntityId) -> RepoResult<Option<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(E::from_row(row)?));
    }
    Ok(None)
}

fn load_all<E: SqlEntity>(conn: &Connection, sql: &str) -> RepoResult<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(E::from_row(row)?);
    }
    Ok(items)
}

fn read_audit(row: &Row<'_>) -> RepoResult<Audit> {
    Ok(Audit {
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn check_row<E: Entity>(entity: E, id: EntityId) -> RepoResult<E> {
    entity.validate().map_err(|err| {
        RepoError::InvalidData(format!("{} row {id}: {err}", E::ENTITY_NAME))
    })?;
    Ok(entity)
}

fn row_exists(conn: &Connection, table: &str, id: EntityId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn is_retired(conn: &Connection, table: &str, id: EntityId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM retired_ids WHERE table_name = ?1 AND id = ?2);",
        params![table, id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Largest audit stamp already persisted, so new stamps stay monotonic
/// across process restarts.
fn latest_stamp(conn: &Connection) -> RepoResult<i64> {
    let stamp: i64 = conn.query_row(
        "SELECT MAX(
            COALESCE((SELECT MAX(updated_at) FROM members), 0),
            COALESCE((SELECT MAX(updated_at) FROM teams), 0)
        );",
        [],
        |row| row.get(0),
    )?;
    Ok(stamp)
}
