//! # Error Types
//!
//! Domain-specific error types for kassa-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kassa-core errors (this file)                                         │
//! │  ├── ErrorKind        - The kind a caller branches on                  │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kassa-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  kassa-engine errors                                                   │
//! │  └── EngineError      - kind + message surfaced to the caller          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;
use crate::types::{CheckId, ClientId, ProductId, SaleLineId};

// =============================================================================
// Error Kind
// =============================================================================

/// Machine-readable category of a failed engine operation.
///
/// ## Usage at the Boundary
/// ```text
/// match err.kind {
///     ErrorKind::InsufficientStock => "Not enough in stock",
///     ErrorKind::Unauthorized      => "Enter administrator login and password",
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Product, client, check, sale line or cart line absent.
    NotFound,
    /// Quantity is not a positive integer.
    InvalidQuantity,
    /// Requested quantity exceeds current stock.
    InsufficientStock,
    /// Checkout attempted with no lines.
    EmptyCart,
    /// Redemption larger than the client's balance.
    InsufficientBonuses,
    /// Wrong role or credentials for a return.
    Unauthorized,
    /// Any other rejected input.
    Validation,
    /// The store failed underneath the operation.
    Storage,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No product with this name or id.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// No client with this id or bonus code.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Check not found: {0}")]
    CheckNotFound(CheckId),

    #[error("Sale line not found: {0}")]
    SaleLineNotFound(SaleLineId),

    /// The cart holds no line for this product.
    #[error("Product {0} is not in the cart")]
    CartLineNotFound(ProductId),

    /// Quantity is zero, negative or not an integer.
    #[error("Quantity must be a positive integer, got '{input}'")]
    InvalidQuantity { input: String },

    /// Insufficient stock to add the line.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Espresso", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    /// Client balance is lower than the redemption.
    #[error("Insufficient bonuses: available {available}, requested {requested}")]
    InsufficientBonuses { available: i64, requested: i64 },

    /// The redemption discount is larger than the cart total.
    #[error("Bonus discount {discount} exceeds check total {total}")]
    RedemptionExceedsTotal { total: Money, discount: Money },

    /// A batch return was requested with nothing selected.
    #[error("Select at least one check or sale line to return")]
    EmptySelection,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the kind the caller should branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::ClientNotFound(_)
            | CoreError::CheckNotFound(_)
            | CoreError::SaleLineNotFound(_)
            | CoreError::CartLineNotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::EmptyCart => ErrorKind::EmptyCart,
            CoreError::InsufficientBonuses { .. } => ErrorKind::InsufficientBonuses,
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::RedemptionExceedsTotal { .. }
            | CoreError::EmptySelection
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Shorthand for a client lookup by id that came back empty.
    pub fn client_not_found(id: ClientId) -> Self {
        CoreError::ClientNotFound(id.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed bonus code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Espresso".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Espresso: available 3, requested 5"
        );

        let err = CoreError::InsufficientBonuses {
            available: 5,
            requested: 6,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient bonuses: available 5, requested 6"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::EmptyCart.kind(), ErrorKind::EmptyCart);
        assert_eq!(CoreError::CheckNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::client_not_found(3).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InvalidQuantity {
                input: "0".to_string()
            }
            .kind(),
            ErrorKind::InvalidQuantity
        );
        assert_eq!(
            CoreError::Unauthorized("cashier".to_string()).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(CoreError::EmptySelection.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "login".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientBonuses).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_BONUSES\"");
    }
}
