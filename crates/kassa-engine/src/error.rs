//! # Engine Error Type
//!
//! The single error every engine operation returns.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Kassa                                  │
//! │                                                                         │
//! │  Till screen                 Engine                                     │
//! │  ───────────                 ──────                                     │
//! │                                                                         │
//! │  cart.add_line("Espresso", 3)                                          │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  EngineResult<T>                                                 │  │
//! │  │         │                                                        │  │
//! │  │  Database error? ─── DbError::QueryFailed("...") ──┐            │  │
//! │  │         │             (logged, generic message)    │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Business rule? ─── CoreError::InsufficientStock ─ EngineError ►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  match err.kind {                                                       │
//! │      ErrorKind::InsufficientStock => "Not enough in stock",            │
//! │      ErrorKind::Unauthorized => ask for admin login,                    │
//! │      ...                                                                │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! ```json
//! {
//!   "kind": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for Espresso: available 2, requested 3"
//! }
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use kassa_core::{CoreError, ErrorKind};
use kassa_db::DbError;

/// Error returned by every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineError {
    /// What went wrong, for branching.
    pub kind: ErrorKind,

    /// Human-readable message for display.
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        EngineError {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        EngineError::new(ErrorKind::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::Validation, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        EngineError::new(ErrorKind::Storage, message)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Converts core errors, keeping the domain message as is.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        EngineError::new(err.kind(), err.to_string())
    }
}

/// Converts database errors.
///
/// ## Mapping
/// ```text
/// NotFound                       → NotFound
/// Domain(core)                   → core.kind()
/// UniqueViolation / CheckViolation / ForeignKeyViolation → Validation
/// Connection, migration, query, pool, internal → Storage (logged)
/// ```
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::not_found(&entity, &id),
            DbError::Domain(core) => core.into(),
            DbError::UniqueViolation { field, value } => {
                EngineError::validation(format!("{} '{}' already exists", field, value))
            }
            DbError::CheckViolation { message } => {
                tracing::warn!("Constraint rejected write: {}", message);
                EngineError::validation(format!("Rejected by store: {}", message))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                EngineError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                EngineError::storage("Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                EngineError::storage("Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                EngineError::storage("Database operation failed")
            }
            DbError::PoolExhausted => EngineError::storage("Database pool exhausted"),
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                EngineError::storage("Database operation failed")
            }
        }
    }
}

/// Configuration errors surface as validation failures.
impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::validation(err.to_string())
    }
}

/// Errors loading or saving [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_keeps_kind_and_message() {
        let err: EngineError = CoreError::InsufficientStock {
            product: "Espresso".to_string(),
            available: 2,
            requested: 3,
        }
        .into();

        assert_eq!(err.kind, ErrorKind::InsufficientStock);
        assert!(err.message.contains("Espresso"));
    }

    #[test]
    fn test_db_domain_error_unwraps_to_core_kind() {
        let err: EngineError = DbError::Domain(CoreError::InsufficientBonuses {
            available: 5,
            requested: 6,
        })
        .into();

        assert_eq!(err.kind, ErrorKind::InsufficientBonuses);
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: EngineError = DbError::not_found("Product", "Latte").into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Product not found: Latte");
    }

    #[test]
    fn test_storage_errors_hide_details() {
        let err: EngineError = DbError::QueryFailed("disk I/O error at page 7".to_string()).into();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert!(!err.message.contains("page 7"));
    }

    #[test]
    fn test_serializes_screaming_kind() {
        let err = EngineError::new(ErrorKind::EmptyCart, "Cart is empty");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"kind":"EMPTY_CART","message":"Cart is empty"}"#);
    }
}
