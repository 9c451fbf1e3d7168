//! # Engine Error Type
//!
//! The one error type callers of the engine see: a stable [`ErrorCode`]
//! plus a message.
//!
//! ```text
//! DbError::Conflict            -> STORAGE_CONFLICT   (retry the operation)
//! CoreError::AlreadyCancelled  -> ALREADY_CANCELLED
//! CoreError::TenantMismatch    -> TENANT_MISMATCH    (never retry)
//!
//! { "code": "ALREADY_CANCELLED", "message": "Sale S1 is already cancelled" }
//! ```
//!
//! An operation either commits all of its effects or returns one of these.

use serde::Serialize;
use till_core::{CoreError, ValidationError};
use till_db::DbError;
use ts_rs::TS;

use crate::config::ConfigError;

/// Error returned from every engine operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Sale not found: 8a1f..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EngineError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Stable error codes.
///
/// ## Usage in the web layer
/// ```typescript
/// try {
///   await cancelSale(saleId);
/// } catch (e) {
///   switch (e.code) {
///     case 'ALREADY_CANCELLED':
///       refresh();            // nothing left to do
///       break;
///     case 'STORAGE_CONFLICT':
///       retry();              // safe: the whole operation rolled back
///       break;
///     default:
///       showError(e.message);
///   }
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Record belongs to another tenant, or tenant id is absent/malformed
    TenantMismatch,

    /// Sale, product, or register absent for this tenant
    NotFound,

    /// Idempotency guard: the sale was cancelled before
    AlreadyCancelled,

    /// Composite product references a component that cannot be resolved
    UnresolvedComponent,

    /// Concurrent modification; retry the whole operation
    StorageConflict,

    /// Input validation failed
    ValidationError,

    /// Operation needs an open register
    RegisterClosed,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl EngineError {
    /// Creates a new engine error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        EngineError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        EngineError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        EngineError::new(ErrorCode::Internal, message)
    }

    /// Only storage conflicts are worth retrying: the operation rolled back
    /// entirely and starts again from its first step.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::StorageConflict
    }
}

/// Converts database errors to engine errors.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::UniqueViolation { constraint } => EngineError::new(
                ErrorCode::ValidationError,
                format!("Already exists ({constraint})"),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                EngineError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::Conflict(e) => {
                tracing::warn!("Storage conflict: {}", e);
                EngineError::new(
                    ErrorCode::StorageConflict,
                    "Concurrent modification, retry the operation",
                )
            }
            DbError::PoolExhausted => {
                EngineError::new(ErrorCode::StorageConflict, "Database pool exhausted")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Decode(e) => {
                tracing::error!("Corrupt row: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Stored data could not be read")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                EngineError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        let code = match err {
            CoreError::TenantMismatch { .. } => {
                tracing::warn!("{}", message);
                ErrorCode::TenantMismatch
            }
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::AlreadyCancelled { .. } => ErrorCode::AlreadyCancelled,
            CoreError::UnresolvedComponent { .. } => {
                tracing::error!("{}", message);
                ErrorCode::UnresolvedComponent
            }
            CoreError::RegisterClosed { .. } => ErrorCode::RegisterClosed,
            CoreError::InvalidSaleStatus { .. }
            | CoreError::PaymentMismatch { .. }
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        EngineError::new(code, message)
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::validation(err.to_string())
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::internal(err.to_string())
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for EngineError {}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
