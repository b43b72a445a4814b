use std::time::Duration;

use thiserror::Error;

/// SQLite primary result codes that mean another connection holds the lock.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;

/// Postgres-style SQLSTATEs for serialization failure and deadlock, kept so a
/// conflict is classified the same way whatever engine reports it.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Error, Debug)]
pub enum StoreError {
    /// Input rejected before any transaction was opened.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Lock contention or serialization failure reported by the engine.
    /// Not retried here; the caller may run the whole operation again.
    #[error("Storage conflict: {0}")]
    Conflict(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// The unit of work failed and so did the rollback that followed.
    #[error("tx err: {tx}, rollback err: {rollback}")]
    Rollback {
        tx: Box<StoreError>,
        #[source]
        rollback: sqlx::Error,
    },

    #[error("Transaction cancelled after {0:?}")]
    Cancelled(Duration),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }

    /// True when the failure came from contention rather than bad input,
    /// i.e. running the same operation again may succeed.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict(_) => true,
            StoreError::Rollback { tx, .. } => tx.is_conflict(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_conflict_error(&err) {
            StoreError::Conflict(err)
        } else {
            StoreError::Database(err)
        }
    }
}

fn is_conflict_error(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db_err) = err else {
        return false;
    };
    let Some(code) = db_err.code() else {
        return false;
    };

    if code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED {
        return true;
    }

    // SQLite reports extended codes (e.g. 517 = SQLITE_BUSY_SNAPSHOT); the
    // primary code lives in the low byte.
    match code.parse::<i64>() {
        Ok(extended) => matches!(extended & 0xff, SQLITE_BUSY | SQLITE_LOCKED),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_error_keeps_both_causes() {
        let err = StoreError::Rollback {
            tx: Box::new(StoreError::not_found("account", 42)),
            rollback: sqlx::Error::PoolClosed,
        };

        let message = err.to_string();
        assert!(message.starts_with("tx err: account 42 not found"));
        assert!(message.contains("rollback err: "));
        assert!(message.contains(&sqlx::Error::PoolClosed.to_string()));

        let source = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(source, Some(sqlx::Error::PoolClosed.to_string()));
        assert!(matches!(
            err,
            StoreError::Rollback { ref tx, .. } if matches!(**tx, StoreError::NotFound { id: 42, .. })
        ));
    }

    #[test]
    fn test_row_not_found_is_not_a_conflict() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_conflict_detected_through_rollback() {
        let err = StoreError::Rollback {
            tx: Box::new(StoreError::Conflict(sqlx::Error::PoolTimedOut)),
            rollback: sqlx::Error::PoolClosed,
        };
        assert!(err.is_conflict());
        assert!(!StoreError::Cancelled(Duration::from_secs(1)).is_conflict());
    }
}
