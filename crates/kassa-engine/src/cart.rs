//! # Cart Session
//!
//! The open cart of a till, with stock reserved as lines are added.
//!
//! ## Reservation Model
//! ```text
//! add_line("Espresso", 3)          remove_line(id) / void()
//!      │                                 │
//!      ▼                                 ▼
//! goods.amount -= 3  (committed)   goods.amount += qty  (committed)
//!      │                                 │
//!      ▼                                 ▼
//! Cart line  Espresso × 3 @ 150    line dropped
//!
//! checkout commit: lines become sale lines, stock is NOT touched again
//! ```
//!
//! Reservations are committed one by one, outside the checkout
//! transaction. A cart abandoned without `void()` leaves its units off
//! the shelf.

use tracing::{debug, info, warn};

use kassa_core::validation::{parse_quantity, validate_quantity};
use kassa_core::{Cart, CartLine, CoreError, Money, ProductId};
use kassa_db::{Database, ProductRepository};

use crate::error::EngineResult;

/// A cart bound to the database it reserves stock in.
#[derive(Debug)]
pub struct CartSession {
    db: Database,
    cart: Cart,
}

impl CartSession {
    pub fn new(db: Database) -> Self {
        CartSession {
            db,
            cart: Cart::new(),
        }
    }

    /// Adds `quantity` of the product called `product_name`.
    ///
    /// ## Returns
    /// The cart line after the add (merged if the product was already in
    /// the cart).
    ///
    /// ## Errors
    /// * `NotFound` - No product with that name
    /// * `InvalidQuantity` - Quantity not positive
    /// * `InsufficientStock` - More than the shelf holds; stock unchanged
    pub async fn add_line(&mut self, product_name: &str, quantity: i64) -> EngineResult<CartLine> {
        let product = self.db.products().find_by_name(product_name).await?;
        validate_quantity(quantity)?;

        if !product.can_sell(quantity) {
            warn!(
                product = %product.name,
                available = product.stock,
                requested = quantity,
                "Rejected add: insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            }
            .into());
        }

        // The cart line changes before any stock moves.
        let before = self.cart.clone();
        let line = self.cart.add_item(&product, quantity)?.clone();

        if let Err(e) = self.db.products().adjust_stock(product.id, -quantity).await {
            self.cart = before;
            return Err(e.into());
        }

        debug!(
            product_id = product.id,
            quantity = quantity,
            line_quantity = line.quantity,
            "Reserved stock for cart line"
        );

        Ok(line)
    }

    /// Same as [`add_line`](Self::add_line) with the quantity as typed.
    pub async fn add_line_text(
        &mut self,
        product_name: &str,
        quantity: &str,
    ) -> EngineResult<CartLine> {
        let quantity = parse_quantity(quantity)?;
        self.add_line(product_name, quantity).await
    }

    /// Drops the line for `product_id` and puts its units back on the shelf.
    pub async fn remove_line(&mut self, product_id: ProductId) -> EngineResult<CartLine> {
        let quantity = self
            .cart
            .line(product_id)
            .map(|l| l.quantity)
            .ok_or(CoreError::CartLineNotFound(product_id))?;

        self.db.products().adjust_stock(product_id, quantity).await?;
        let line = self.cart.remove_item(product_id)?;

        debug!(product_id = product_id, quantity = quantity, "Released cart line");
        Ok(line)
    }

    /// Puts every reserved unit back and empties the cart, in one transaction.
    pub async fn void(&mut self) -> EngineResult<()> {
        if self.cart.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.begin().await?;
        for line in self.cart.lines() {
            ProductRepository::adjust_stock_with(&mut tx, line.product_id, line.quantity).await?;
        }
        Database::commit(tx).await?;

        info!(lines = self.cart.item_count(), "Cart voided");
        self.cart.clear();
        Ok(())
    }

    /// Sum of line costs.
    pub fn total(&self) -> Money {
        self.cart.total()
    }

    /// Discards lines without touching stock. Only correct once the lines
    /// have been written as a check.
    pub fn clear(&mut self) {
        self.cart.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kassa_core::{ErrorKind, NewProduct};
    use kassa_db::DbConfig;

    async fn setup() -> (Database, ProductId) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let espresso = db
            .products()
            .insert(&NewProduct {
                name: "Espresso".to_string(),
                manufacturer: "House".to_string(),
                stock: 10,
                sell_price: 150,
                use_by: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                purchase_price: 40,
                bonus_points: 1,
                returnable: true,
            })
            .await
            .unwrap();
        (db, espresso.id)
    }

    async fn stock(db: &Database, id: ProductId) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_add_line_reserves_stock() {
        let (db, id) = setup().await;
        let mut cart = CartSession::new(db.clone());

        let line = cart.add_line("Espresso", 3).await.unwrap();

        assert_eq!(line.quantity, 3);
        assert_eq!(cart.total(), Money::from_units(450));
        assert_eq!(stock(&db, id).await, 7);
    }

    #[tokio::test]
    async fn test_add_line_merges_same_product() {
        let (db, id) = setup().await;
        let mut cart = CartSession::new(db.clone());

        cart.add_line("Espresso", 2).await.unwrap();
        let line = cart.add_line("Espresso", 3).await.unwrap();

        assert_eq!(line.quantity, 5);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(stock(&db, id).await, 5);
    }

    #[tokio::test]
    async fn test_add_line_rejections_leave_stock() {
        let (db, id) = setup().await;
        let mut cart = CartSession::new(db.clone());

        let err = cart.add_line("Espresso", 11).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientStock);

        let err = cart.add_line("Espresso", 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidQuantity);

        let err = cart.add_line("Ristretto", 1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err = cart.add_line_text("Espresso", "2.5").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidQuantity);

        assert!(cart.is_empty());
        assert_eq!(stock(&db, id).await, 10);
    }

    #[tokio::test]
    async fn test_remove_line_restores_stock() {
        let (db, id) = setup().await;
        let mut cart = CartSession::new(db.clone());

        cart.add_line_text("Espresso", " 4 ").await.unwrap();
        let removed = cart.remove_line(id).await.unwrap();

        assert_eq!(removed.quantity, 4);
        assert!(cart.is_empty());
        assert_eq!(stock(&db, id).await, 10);

        let err = cart.remove_line(id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_void_restores_everything() {
        let (db, id) = setup().await;
        let mut cart = CartSession::new(db.clone());

        cart.add_line("Espresso", 2).await.unwrap();
        cart.add_line("Espresso", 1).await.unwrap();
        cart.void().await.unwrap();

        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
        assert_eq!(stock(&db, id).await, 10);
    }
}
