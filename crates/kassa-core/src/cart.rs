//! # Cart Lines
//!
//! The pure, in-memory part of the cart. Stock reservation lives one layer
//! up in `kassa-engine`; this module only does line bookkeeping and math.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Line Operations                                 │
//! │                                                                         │
//! │  Engine Action            Cart Method             Line Change           │
//! │  ─────────────            ───────────             ───────────           │
//! │                                                                         │
//! │  add_line("Espresso", 3) ─► add_item() ─────────► push or merge         │
//! │                                                                         │
//! │  remove_line(id) ────────► remove_item() ───────► line removed,         │
//! │                                                   qty handed back       │
//! │                                                                         │
//! │  commit ok ──────────────► clear() ─────────────► lines dropped         │
//! │                                                                         │
//! │  total() ────────────────► total() ─────────────► Σ line_cost           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, ProductId};
use crate::validation::validate_quantity;

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Design Notes
/// - `unit_price` is frozen when the product first enters the cart. Adding
///   more of the same product later keeps that price even if the catalog
///   price moved in between.
/// - `line_cost` is always `quantity × unit_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,

    /// Product name at time of adding (frozen)
    pub name: String,

    pub quantity: i64,

    /// Sell price at time of adding (frozen)
    pub unit_price: i64,
}

impl CartLine {
    /// Creates a line from a product and quantity, capturing the current price.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity,
            unit_price: product.sell_price,
        }
    }

    /// quantity × unit price.
    pub fn line_cost(&self) -> Money {
        Money::from_units(self.unit_price).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The lines for the next check.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Every quantity is positive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds a product to the cart or increases its quantity if already present.
    ///
    /// Stock is NOT checked here; the caller compares against the catalog
    /// before calling and reserves the units afterwards.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<&CartLine> {
        validate_quantity(quantity)?;

        if let Some(idx) = self.position(product.id) {
            let line = &mut self.lines[idx];
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| CoreError::InvalidQuantity {
                    input: quantity.to_string(),
                })?;
            return Ok(&self.lines[idx]);
        }

        self.lines.push(CartLine::from_product(product, quantity));
        let last = self.lines.len() - 1;
        Ok(&self.lines[last])
    }

    /// Removes the line for `product_id` and returns it, so the caller can
    /// hand its quantity back to the shelf.
    pub fn remove_item(&mut self, product_id: ProductId) -> CoreResult<CartLine> {
        match self.position(product_id) {
            Some(idx) => Ok(self.lines.remove(idx)),
            None => Err(CoreError::CartLineNotFound(product_id)),
        }
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Sum of line costs.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_cost).sum()
    }

    /// Drops every line. Stock is left as it is.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;

    fn product(id: i64, name: &str, price: i64) -> Product {
        Product {
            id,
            name: name.to_string(),
            manufacturer: "House".to_string(),
            stock: 100,
            sell_price: price,
            use_by: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            purchase_price: 0,
            bonus_points: 0,
            returnable: true,
        }
    }

    #[test]
    fn test_add_and_total() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Espresso", 150), 3).unwrap();
        cart.add_item(&product(2, "Croissant", 120), 1).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total().units(), 570);
    }

    #[test]
    fn test_same_product_merges_with_frozen_price() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Espresso", 150), 2).unwrap();

        // Price changed in the catalog between the two adds
        let line = cart.add_item(&product(1, "Espresso", 200), 1).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(line.unit_price, 150);

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total().units(), 450);
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Espresso", 150), 3).unwrap();

        let removed = cart.remove_item(1).unwrap();
        assert_eq!(removed.quantity, 3);
        assert!(cart.is_empty());

        let err = cart.remove_item(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rejects_bad_quantity() {
        let mut cart = Cart::new();
        let err = cart.add_item(&product(1, "Espresso", 150), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQuantity);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_large_quantities_merge() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Sugar Sticks", 2), 600).unwrap();
        let line = cart.add_item(&product(1, "Sugar Sticks", 2), 600).unwrap();
        assert_eq!(line.quantity, 1200);
        assert_eq!(cart.total().units(), 2400);
    }

    #[test]
    fn test_no_line_count_cap() {
        let mut cart = Cart::new();
        for id in 1..=150 {
            cart.add_item(&product(id, &format!("Item {}", id), 1), 1)
                .unwrap();
        }
        assert_eq!(cart.item_count(), 150);
    }
}
