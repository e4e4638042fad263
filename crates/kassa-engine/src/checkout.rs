//! # Checkout
//!
//! Turns the cart into a committed check.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        CheckoutEngine::commit                           │
//! │                                                                         │
//! │  cart empty? ───────────────────────────────────────► EmptyCart         │
//! │      │                                                                  │
//! │  BEGIN                                                                  │
//! │      │                                                                  │
//! │  client given and missing? ─────────────────────────► NotFound         │
//! │  bonuses > balance? ────────────────────────────────► InsufficientBonuses│
//! │  bonuses × rate > total? ───────────────────────────► Validation       │
//! │      │                                                                  │
//! │  INSERT checks (id, total − discount, bonuses, client)                 │
//! │  INSERT sales  (one per cart line, today, frozen price)                │
//! │  accrued = Σ goods.bonuses (> 0) over distinct products                │
//! │  UPDATE clients SET bonuses += accrued − redeemed                      │
//! │      │                                                                  │
//! │  COMMIT ──► cart cleared, stock stays reserved                         │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written     │
//! │  and the cart is left as it was.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use kassa_core::validation::validate_redemption;
use kassa_core::{
    Check, CheckId, ClientId, CoreError, Money, NewSaleLine, SaleLine, BONUS_RATE,
};
use kassa_db::{CheckRepository, ClientRepository, Database, ProductRepository};

use crate::cart::CartSession;
use crate::error::EngineResult;

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReceipt {
    pub check: Check,
    pub lines: Vec<SaleLine>,

    /// Points credited to the client. Zero for anonymous checks.
    pub accrued: i64,

    pub redeemed: i64,

    /// Client balance after the commit, if a client was attached.
    pub balance: Option<i64>,
}

impl CheckReceipt {
    /// Amount taken off the check by the redemption.
    pub fn discount(&self, rate: Money) -> Money {
        rate.bonus_value(self.redeemed)
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    db: Database,
    bonus_rate: Money,
}

impl CheckoutEngine {
    pub fn new(db: Database) -> Self {
        CheckoutEngine {
            db,
            bonus_rate: BONUS_RATE,
        }
    }

    /// Overrides the value of one redeemed point.
    pub fn with_bonus_rate(mut self, rate: Money) -> Self {
        self.bonus_rate = rate;
        self
    }

    pub fn bonus_rate(&self) -> Money {
        self.bonus_rate
    }

    /// `MAX(id) + 1`, or 1 when no check exists.
    pub async fn next_check_id(&self) -> EngineResult<CheckId> {
        Ok(self.db.checks().next_id().await?)
    }

    /// Commits the cart as check `check_id`, dated today.
    pub async fn commit(
        &self,
        cart: &mut CartSession,
        check_id: CheckId,
        client_id: Option<ClientId>,
        bonuses_to_redeem: i64,
    ) -> EngineResult<CheckReceipt> {
        let today = Local::now().date_naive();
        self.commit_on(cart, check_id, client_id, bonuses_to_redeem, today)
            .await
    }

    /// Commits the cart with an explicit sale date.
    pub async fn commit_on(
        &self,
        cart: &mut CartSession,
        check_id: CheckId,
        client_id: Option<ClientId>,
        bonuses_to_redeem: i64,
        sold_date: NaiveDate,
    ) -> EngineResult<CheckReceipt> {
        if cart.is_empty() {
            warn!(check_id = check_id, "Rejected commit: cart is empty");
            return Err(CoreError::EmptyCart.into());
        }

        let total = cart.total();
        let mut tx = self.db.begin().await?;

        let client = match client_id {
            Some(id) => Some(
                ClientRepository::get_by_id_with(&mut tx, id)
                    .await?
                    .ok_or_else(|| CoreError::client_not_found(id))?,
            ),
            None => None,
        };

        let balance = client.as_ref().map(|c| c.bonus_balance).unwrap_or(0);
        let discount = validate_redemption(bonuses_to_redeem, balance, total, self.bonus_rate)?;
        let sum = total - discount;

        let check = CheckRepository::insert_check_with(
            &mut tx,
            check_id,
            sum.units(),
            bonuses_to_redeem,
            client_id,
        )
        .await?;

        let mut lines = Vec::with_capacity(cart.lines().len());
        let mut accrued = 0;
        for line in cart.lines() {
            let sale = NewSaleLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                sold_date,
            };
            lines.push(CheckRepository::insert_sale_line_with(&mut tx, check_id, &sale).await?);

            let product = ProductRepository::get_by_id_with(&mut tx, line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.to_string()))?;
            if product.bonus_points > 0 {
                accrued += product.bonus_points;
            }
        }

        let (accrued, balance) = match client_id {
            Some(id) => {
                let updated =
                    ClientRepository::adjust_bonuses_with(&mut tx, id, accrued - bonuses_to_redeem)
                        .await?;
                (accrued, Some(updated))
            }
            None => (0, None),
        };

        Database::commit(tx).await?;
        cart.clear();

        info!(
            check_id = check.id,
            sum = check.sum,
            lines = lines.len(),
            client_id = ?client_id,
            redeemed = bonuses_to_redeem,
            accrued = accrued,
            "Check committed"
        );

        Ok(CheckReceipt {
            check,
            lines,
            accrued,
            redeemed: bonuses_to_redeem,
            balance,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::{ErrorKind, NewClient, NewProduct};
    use kassa_db::DbConfig;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (name, price, bonuses) in [("Latte", 240, 2), ("Croissant", 120, 0)] {
            db.products()
                .insert(&NewProduct {
                    name: name.to_string(),
                    manufacturer: "House".to_string(),
                    stock: 20,
                    sell_price: price,
                    use_by: date(),
                    purchase_price: 50,
                    bonus_points: bonuses,
                    returnable: false,
                })
                .await
                .unwrap();
        }
        db
    }

    async fn client(db: &Database, bonuses: i64) -> ClientId {
        db.clients()
            .insert(&NewClient {
                phone: "+7 900 000 00 00".to_string(),
                name: "Vera".to_string(),
                bonus_balance: bonuses,
                bonus_code: "123456".to_string(),
                code_expiry: date(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_anonymous_commit() {
        let db = setup().await;
        let engine = CheckoutEngine::new(db.clone());
        let mut cart = CartSession::new(db.clone());

        cart.add_line("Latte", 2).await.unwrap();
        cart.add_line("Croissant", 1).await.unwrap();

        let id = engine.next_check_id().await.unwrap();
        assert_eq!(id, 1);

        let receipt = engine.commit_on(&mut cart, id, None, 0, date()).await.unwrap();

        assert_eq!(receipt.check.sum, 600);
        assert_eq!(receipt.lines.len(), 2);
        assert_eq!(receipt.accrued, 0);
        assert_eq!(receipt.balance, None);
        assert!(cart.is_empty());
        assert_eq!(engine.next_check_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_commit_with_client_accrues_once_per_product() {
        let db = setup().await;
        let vera = client(&db, 5).await;
        let engine = CheckoutEngine::new(db.clone());
        let mut cart = CartSession::new(db.clone());

        cart.add_line("Latte", 3).await.unwrap();
        cart.add_line("Croissant", 2).await.unwrap();

        let receipt = engine
            .commit_on(&mut cart, 1, Some(vera), 4, date())
            .await
            .unwrap();

        // 3 × 240 + 2 × 120 − 4 × 10
        assert_eq!(receipt.check.sum, 920);
        assert_eq!(receipt.accrued, 2);
        assert_eq!(receipt.balance, Some(3));
        assert_eq!(receipt.discount(engine.bonus_rate()), Money::from_units(40));
    }

    #[tokio::test]
    async fn test_commit_rejections_keep_cart() {
        let db = setup().await;
        let vera = client(&db, 100).await;
        let engine = CheckoutEngine::new(db.clone());
        let mut cart = CartSession::new(db.clone());

        let err = engine.commit_on(&mut cart, 1, None, 0, date()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::EmptyCart);

        cart.add_line("Croissant", 1).await.unwrap();

        let err = engine.commit_on(&mut cart, 1, None, 1, date()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientBonuses);

        let err = engine
            .commit_on(&mut cart, 1, Some(vera), 13, date())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = engine
            .commit_on(&mut cart, 1, Some(vera + 1), 0, date())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(db.checks().count_checks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_custom_bonus_rate() {
        let db = setup().await;
        let vera = client(&db, 10).await;
        let engine = CheckoutEngine::new(db.clone()).with_bonus_rate(Money::from_units(1));
        let mut cart = CartSession::new(db.clone());

        cart.add_line("Croissant", 1).await.unwrap();
        let receipt = engine
            .commit_on(&mut cart, 1, Some(vera), 10, date())
            .await
            .unwrap();

        assert_eq!(receipt.check.sum, 110);
    }
}
