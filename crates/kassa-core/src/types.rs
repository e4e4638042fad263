//! # Domain Types
//!
//! Core domain types used throughout Kassa.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Check      │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (monotonic) │   │  id             │       │
//! │  │  name (unique)  │   │  sum            │   │  check_id (FK)  │       │
//! │  │  stock          │   │  bonuses_redeem │   │  product_id(FK) │       │
//! │  │  sell_price     │   │  client_id?     │   │  quantity       │       │
//! │  │  bonus_points   │   └─────────────────┘   │  unit_price     │       │
//! │  │  returnable     │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Client      │   │      Role       │   │ ReturnPricing   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bonus_balance  │   │  Admin          │   │  CurrentPrice   │       │
//! │  │  bonus_code     │   │  Cashier        │   │  SaleTime       │       │
//! │  │  code_expiry    │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record is addressed by its integer row id. Only the cart accepts a
//! product *name*, and it resolves the name to an id before doing anything else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Identifiers
// =============================================================================

pub type ProductId = i64;
pub type ClientId = i64;
pub type CheckId = i64;
pub type SaleLineId = i64;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// Column names follow the shop's `goods` table; the struct uses the
/// domain names (`amount` is the stock count, `bonuses` the points a sale earns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,

    /// Display name, unique across the catalog.
    pub name: String,

    pub manufacturer: String,

    /// Units currently on the shelf.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "amount"))]
    pub stock: i64,

    /// Price in whole currency units.
    pub sell_price: i64,

    pub use_by: NaiveDate,

    pub purchase_price: i64,

    /// Bonus points a client earns when this product is in a check.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "bonuses"))]
    pub bonus_points: i64,

    /// Whether returning a sale of this product puts it back on the shelf.
    pub returnable: bool,
}

impl Product {
    /// Returns the sell price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_units(self.sell_price)
    }

    /// Checks if `quantity` more units can be taken from the shelf.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

/// Input for creating a product (seeding, tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub manufacturer: String,
    pub stock: i64,
    pub sell_price: i64,
    pub use_by: NaiveDate,
    pub purchase_price: i64,
    pub bonus_points: i64,
    pub returnable: bool,
}

// =============================================================================
// Client
// =============================================================================

/// A loyalty client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Client {
    pub id: ClientId,
    pub phone: String,
    pub name: String,

    /// Redeemable points. Never negative.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "bonuses"))]
    pub bonus_balance: i64,

    /// Six-digit code the client reads out at the till.
    pub bonus_code: String,

    /// Last day the code is accepted (inclusive).
    pub code_expiry: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub phone: String,
    pub name: String,
    pub bonus_balance: i64,
    pub bonus_code: String,
    pub code_expiry: NaiveDate,
}

// =============================================================================
// Check
// =============================================================================

/// A committed receipt.
///
/// `sum` is what the customer paid: the line costs minus the bonus discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Check {
    pub id: CheckId,
    pub sum: i64,
    pub bonuses_redeemed: i64,
    pub client_id: Option<ClientId>,
}

impl Check {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_units(self.sum)
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One product-quantity record of a check.
/// Uses snapshot pattern to freeze the unit price at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: SaleLineId,
    pub check_id: CheckId,
    pub product_id: ProductId,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "amount"))]
    pub quantity: i64,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "sell_date"))]
    pub sold_date: NaiveDate,

    /// Sell price at the time the line entered the cart (frozen).
    pub unit_price: i64,
}

impl SaleLine {
    /// Returns the frozen unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_units(self.unit_price)
    }

    /// Line cost at sale time (unit_price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// A sale line about to be written by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: i64,
    pub sold_date: NaiveDate,
}

// =============================================================================
// Role
// =============================================================================

/// Operator role attached to a login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May return sales without a credential challenge.
    Admin,
    #[default]
    Cashier,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Cashier => "cashier",
        }
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "cashier" => Ok(Role::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "cashier".to_string()],
            }),
        }
    }
}

// =============================================================================
// Return Pricing
// =============================================================================

/// Which price a partial return takes off the check sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnPricing {
    /// The product's sell price at the moment of the return.
    #[default]
    #[serde(alias = "current")]
    CurrentPrice,
    /// The unit price recorded on the sale line.
    SaleTime,
}

impl FromStr for ReturnPricing {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" | "current_price" => Ok(ReturnPricing::CurrentPrice),
            "sale_time" | "sale-time" => Ok(ReturnPricing::SaleTime),
            _ => Err(ValidationError::NotAllowed {
                field: "return_pricing".to_string(),
                allowed: vec!["current".to_string(), "sale_time".to_string()],
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn espresso() -> Product {
        Product {
            id: 1,
            name: "Espresso".to_string(),
            manufacturer: "House".to_string(),
            stock: 10,
            sell_price: 150,
            use_by: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            purchase_price: 60,
            bonus_points: 2,
            returnable: true,
        }
    }

    #[test]
    fn test_product_can_sell() {
        let p = espresso();
        assert!(p.can_sell(10));
        assert!(!p.can_sell(11));
        assert_eq!(p.price().units(), 150);
    }

    #[test]
    fn test_sale_line_total() {
        let line = SaleLine {
            id: 1,
            check_id: 1,
            product_id: 1,
            quantity: 3,
            sold_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            unit_price: 150,
        };
        assert_eq!(line.line_total().units(), 450);
    }

    #[test]
    fn test_role_parse_and_display() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Cashier ".parse::<Role>().unwrap(), Role::Cashier);
        assert!("manager".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::default(), Role::Cashier);
    }

    #[test]
    fn test_return_pricing_parse() {
        assert_eq!(
            "current".parse::<ReturnPricing>().unwrap(),
            ReturnPricing::CurrentPrice
        );
        assert_eq!(
            "sale_time".parse::<ReturnPricing>().unwrap(),
            ReturnPricing::SaleTime
        );
        assert!("later".parse::<ReturnPricing>().is_err());
        assert_eq!(ReturnPricing::default(), ReturnPricing::CurrentPrice);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
    }
}
