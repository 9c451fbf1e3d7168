//! Storage errors.
//!
//! `sqlx::Error` is classified once here; till-engine turns each class into
//! a stable error code:
//!
//! ```text
//! busy / locked / stale snapshot ─► Conflict          (retry the unit of work)
//! UNIQUE / FOREIGN KEY            ─► *Violation        (caller input)
//! trigger RAISE(ABORT), other SQL ─► QueryFailed       (fatal)
//! undecodable column              ─► Decode            (fatal)
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the row, e.g. a second open register in a
    /// warehouse or a repeated SKU.
    #[error("Unique constraint failed: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// SQLite was busy or locked, or a read snapshot went stale before the
    /// first write. Nothing was applied.
    #[error("Storage conflict: {0}")]
    Conflict(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value does not fit its domain type.
    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Whether running the whole unit of work again may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_) | DbError::PoolExhausted)
    }
}

/// Primary SQLite result code; extended codes carry it in the low byte
/// (`SQLITE_BUSY_SNAPSHOT` 517 → 5).
fn primary_code(err: &dyn sqlx::error::DatabaseError) -> Option<i32> {
    err.code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xff)
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Row".to_string(),
                id: "?".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                if matches!(primary_code(db_err.as_ref()), Some(SQLITE_BUSY | SQLITE_LOCKED)) {
                    return DbError::Conflict(message);
                }
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        constraint: message
                            .strip_prefix("UNIQUE constraint failed: ")
                            .unwrap_or(&message)
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Decode(format!("column {index}: {source}"))
            }
            sqlx::Error::Decode(source) => DbError::Decode(source.to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
