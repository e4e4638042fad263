//! # Returns
//!
//! Reverses committed sales: whole checks, single sale lines, or a batch
//! selected in the returns view.
//!
//! ## What a Return Touches
//! ```text
//!                         stock            check sum          bonuses
//!                         ─────            ─────────          ───────
//! return_check            +qty if          check deleted      untouched
//!                         returnable       (lines cascade)
//!
//! return_sale_line        +qty if          −qty × price,      untouched
//!                         returnable       floored at 0
//!                                          (check remains)
//! ```
//!
//! `price` is the product's current sell price, or the price recorded on
//! the line under [`ReturnPricing::SaleTime`].
//!
//! Every operation is one transaction; a failure anywhere leaves the
//! store as it was.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use kassa_core::{CheckId, CoreError, Money, Product, ReturnPricing, SaleLine, SaleLineId};
use kassa_db::{CheckRepository, Database, ProductRepository};

use crate::error::EngineResult;

/// What a return reversed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReturnSummary {
    /// Checks deleted by the operation.
    pub checks_removed: Vec<CheckId>,

    /// Sale lines deleted, including those that went with a deleted check.
    pub lines_returned: Vec<SaleLineId>,

    /// Units put back on the shelf. Non-returnable products add nothing.
    pub units_restocked: i64,

    /// Total taken off surviving check sums by line returns.
    pub sum_deducted: Money,
}

impl ReturnSummary {
    fn absorb(&mut self, other: ReturnSummary) {
        self.checks_removed.extend(other.checks_removed);
        self.lines_returned.extend(other.lines_returned);
        self.units_restocked += other.units_restocked;
        self.sum_deducted += other.sum_deducted;
    }
}

#[derive(Debug, Clone)]
pub struct ReturnEngine {
    db: Database,
    pricing: ReturnPricing,
}

impl ReturnEngine {
    pub fn new(db: Database) -> Self {
        ReturnEngine {
            db,
            pricing: ReturnPricing::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: ReturnPricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn pricing(&self) -> ReturnPricing {
        self.pricing
    }

    /// Returns a whole check: restocks its returnable lines and deletes it.
    ///
    /// Bonuses accrued or redeemed on the check stay with the client.
    pub async fn return_check(&self, check_id: CheckId) -> EngineResult<ReturnSummary> {
        let mut tx = self.db.begin().await?;
        let summary = return_check_with(&mut tx, check_id).await?;
        Database::commit(tx).await?;

        info!(
            check_id = check_id,
            lines = summary.lines_returned.len(),
            restocked = summary.units_restocked,
            "Check returned"
        );
        Ok(summary)
    }

    /// Returns one sale line. The check stays, even if it ends up empty.
    pub async fn return_sale_line(&self, sale_line_id: SaleLineId) -> EngineResult<ReturnSummary> {
        let mut tx = self.db.begin().await?;

        let line = CheckRepository::get_sale_line_with(&mut tx, sale_line_id)
            .await?
            .ok_or(CoreError::SaleLineNotFound(sale_line_id))?;
        let summary = reverse_line_with(&mut tx, &line, self.pricing).await?;

        Database::commit(tx).await?;

        info!(
            sale_line_id = sale_line_id,
            check_id = line.check_id,
            deducted = %summary.sum_deducted,
            restocked = summary.units_restocked,
            "Sale line returned"
        );
        Ok(summary)
    }

    /// Returns a selection from the returns view.
    ///
    /// Every selected line and every line of every selected check is
    /// reversed once, then the selected checks are deleted.
    pub async fn return_selection(
        &self,
        check_ids: &[CheckId],
        sale_line_ids: &[SaleLineId],
    ) -> EngineResult<ReturnSummary> {
        if check_ids.is_empty() && sale_line_ids.is_empty() {
            return Err(CoreError::EmptySelection.into());
        }

        let checks: BTreeSet<CheckId> = check_ids.iter().copied().collect();
        let mut line_ids: BTreeSet<SaleLineId> = sale_line_ids.iter().copied().collect();

        let mut tx = self.db.begin().await?;

        for &check_id in &checks {
            CheckRepository::get_check_with(&mut tx, check_id)
                .await?
                .ok_or(CoreError::CheckNotFound(check_id))?;
            for line in CheckRepository::sale_lines_for_check_with(&mut tx, check_id).await? {
                line_ids.insert(line.id);
            }
        }

        let mut summary = ReturnSummary::default();
        for &line_id in &line_ids {
            let line = CheckRepository::get_sale_line_with(&mut tx, line_id)
                .await?
                .ok_or(CoreError::SaleLineNotFound(line_id))?;
            summary.absorb(reverse_line_with(&mut tx, &line, self.pricing).await?);
        }

        for &check_id in &checks {
            summary.absorb(return_check_with(&mut tx, check_id).await?);
        }

        Database::commit(tx).await?;

        info!(
            checks = summary.checks_removed.len(),
            lines = summary.lines_returned.len(),
            restocked = summary.units_restocked,
            "Selection returned"
        );
        Ok(summary)
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Restocks (if returnable) and deletes every line of a check, then the check.
async fn return_check_with(
    conn: &mut SqliteConnection,
    check_id: CheckId,
) -> EngineResult<ReturnSummary> {
    CheckRepository::get_check_with(conn, check_id)
        .await?
        .ok_or(CoreError::CheckNotFound(check_id))?;

    let mut summary = ReturnSummary::default();
    for line in CheckRepository::sale_lines_for_check_with(conn, check_id).await? {
        let product = product_for(conn, &line).await?;
        summary.units_restocked += restock_with(conn, &product, line.quantity).await?;
        summary.lines_returned.push(line.id);
    }

    CheckRepository::delete_check_with(conn, check_id).await?;
    summary.checks_removed.push(check_id);

    Ok(summary)
}

/// Restocks (if returnable), decrements the check sum and deletes the line.
async fn reverse_line_with(
    conn: &mut SqliteConnection,
    line: &SaleLine,
    pricing: ReturnPricing,
) -> EngineResult<ReturnSummary> {
    let product = product_for(conn, line).await?;

    let unit_price = match pricing {
        ReturnPricing::CurrentPrice => product.price(),
        ReturnPricing::SaleTime => line.unit_price(),
    };
    let amount = unit_price.multiply_quantity(line.quantity);

    let restocked = restock_with(conn, &product, line.quantity).await?;

    let before = CheckRepository::get_check_with(conn, line.check_id)
        .await?
        .map(|c| c.total())
        .unwrap_or_default();
    let after = CheckRepository::decrement_sum_with(conn, line.check_id, amount.units()).await?;
    CheckRepository::delete_sale_line_with(conn, line.id).await?;

    debug!(
        sale_line_id = line.id,
        amount = %amount,
        new_sum = after,
        "Reversed sale line"
    );

    Ok(ReturnSummary {
        checks_removed: Vec::new(),
        lines_returned: vec![line.id],
        units_restocked: restocked,
        sum_deducted: before.saturating_sub_floor(Money::from_units(after)),
    })
}

async fn product_for(conn: &mut SqliteConnection, line: &SaleLine) -> EngineResult<Product> {
    let product = ProductRepository::get_by_id_with(conn, line.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(line.product_id.to_string()))?;
    Ok(product)
}

/// Puts the line's units back if the product is returnable.
async fn restock_with(
    conn: &mut SqliteConnection,
    product: &Product,
    quantity: i64,
) -> EngineResult<i64> {
    if !product.returnable {
        return Ok(0);
    }

    ProductRepository::adjust_stock_with(conn, product.id, quantity).await?;
    Ok(quantity)
}
