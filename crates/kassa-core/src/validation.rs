//! # Validation Module
//!
//! Input validation utilities for Kassa.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Till screen                                                   │
//! │  └── Raw text from entry fields                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── parse_quantity: "3" → 3, "2.5" → InvalidQuantity                  │
//! │  └── names, prices, codes, credentials, redemptions                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK(amount >= 0), CHECK(bonuses >= 0), CHECK(sum >= 0)          │
//! │  └── UNIQUE(name), foreign keys                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kassa_core::validation::{parse_quantity, validate_bonus_code};
//!
//! assert_eq!(parse_quantity("3").unwrap(), 3);
//! assert!(parse_quantity("0").is_err());
//! assert!(validate_bonus_code("004217").is_ok());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::BONUS_CODE_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Quantity
// =============================================================================

/// Parses the quantity entry field.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must be a base-10 integer (`"2.5"`, `"abc"`, `""` rejected)
/// - Must be positive
///
/// ## Example
/// ```rust
/// use kassa_core::validation::parse_quantity;
///
/// assert_eq!(parse_quantity(" 2 ").unwrap(), 2);
/// assert!(parse_quantity("2.5").is_err());
/// assert!(parse_quantity("-1").is_err());
/// ```
pub fn parse_quantity(input: &str) -> CoreResult<i64> {
    let trimmed = input.trim();
    let quantity: i64 = trimmed.parse().map_err(|_| CoreError::InvalidQuantity {
        input: trimmed.to_string(),
    })?;
    validate_quantity(quantity)?;
    Ok(quantity)
}

/// Validates a numeric quantity for a cart line.
pub fn validate_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity {
            input: quantity.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Catalog Fields
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a price or stock figure that the schema requires to be non-negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Loyalty
// =============================================================================

/// Validates a bonus code: exactly six ASCII digits, leading zeros allowed.
pub fn validate_bonus_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "bonus_code".to_string(),
        });
    }

    if code.len() != BONUS_CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "bonus_code".to_string(),
            reason: format!("must be {} digits", BONUS_CODE_LEN),
        });
    }

    Ok(())
}

/// Checks a bonus redemption against the balance and the cart total.
///
/// ## Rules
/// ```text
/// requested < 0                       → Validation
/// requested > balance                 → InsufficientBonuses
/// requested × rate > total            → RedemptionExceedsTotal
/// ```
///
/// Returns the discount the redemption is worth.
pub fn validate_redemption(
    requested: i64,
    balance: i64,
    total: Money,
    rate: Money,
) -> CoreResult<Money> {
    validate_non_negative("bonuses", requested)?;

    if requested > balance {
        return Err(CoreError::InsufficientBonuses {
            available: balance,
            requested,
        });
    }

    let discount = rate.bonus_value(requested);
    if discount > total {
        return Err(CoreError::RedemptionExceedsTotal { total, discount });
    }

    Ok(discount)
}

// =============================================================================
// Credentials
// =============================================================================

/// Validates a login/password pair before registration.
pub fn validate_credentials(login: &str, password: &str) -> ValidationResult<()> {
    let login = login.trim();

    if login.is_empty() {
        return Err(ValidationError::Required {
            field: "login".to_string(),
        });
    }

    if login.chars().count() > 64 {
        return Err(ValidationError::TooLong {
            field: "login".to_string(),
            max: 64,
        });
    }

    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
