//! Bounded retry of transient backing-store failures.

use crate::config::StoreConfig;
use crate::db::DbError;
use crate::repo::error::{RepoError, RepoResult};
use log::{error, warn};
use rusqlite::ErrorCode;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub(crate) fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub(crate) fn run<T>(
        &self,
        operation: &'static str,
        mut op: impl FnMut() -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Err(err) if is_transient(&err) => {
                    if attempt >= self.max_attempts {
                        error!(
                            "event=store_call module=store status=error operation={operation} attempts={attempt} error_code=store_unavailable error={err}"
                        );
                        return Err(RepoError::StoreUnavailable {
                            attempts: attempt,
                            message: err.to_string(),
                        });
                    }
                    warn!(
                        "event=store_retry module=store status=retry operation={operation} attempt={attempt} error={err}"
                    );
                    std::thread::sleep(self.backoff * attempt);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn is_transient(err: &RepoError) -> bool {
    match err {
        RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}
