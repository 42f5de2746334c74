//! Connection bootstrap for SQLite-backed record stores.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.
//! - Every open attempt emits one `db_open` start event and one terminal
//!   `ok`/`error` event with its duration.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BOOTSTRAP_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a SQLite database file and applies pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory SQLite database and applies migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = connect()
        .map_err(|err| ("db_open_failed", DbError::from(err)))
        .and_then(|mut conn| {
            bootstrap_connection(&mut conn)
                .map(|()| conn)
                .map_err(|err| ("db_bootstrap_failed", err))
        });

    match result {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err((error_code, err)) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code={error_code} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(BOOTSTRAP_BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
