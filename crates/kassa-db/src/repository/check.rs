//! # Check Repository
//!
//! Database operations for checks (receipts) and their sale lines.
//!
//! ## Check Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Check Lifecycle                                    │
//! │                                                                         │
//! │  next_id() ──► 42                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert_check_with(tx, 42, sum, redeemed, client)                      │
//! │  insert_sale_line_with(tx, 42, line) × N                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────┐   return one line    ┌──────────────────────────┐    │
//! │  │ check 42     │ ───────────────────► │ decrement_sum_with       │    │
//! │  │  sales: N    │                      │ delete_sale_line_with    │    │
//! │  └──────┬───────┘                      └──────────────────────────┘    │
//! │         │ return whole check                                            │
//! │         ▼                                                               │
//! │  delete_check_with ──► sales removed by ON DELETE CASCADE              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write has a `*_with(conn, ..)` form so engines can run several of
//! them inside one transaction.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::{Check, CheckId, ClientId, NewSaleLine, SaleLine, SaleLineId};

const SELECT_CHECK: &str = "SELECT id, sum, bonuses_redeemed, client_id FROM checks";

const SELECT_SALE_LINE: &str =
    "SELECT id, check_id, product_id, amount, sell_date, unit_price FROM sales";

/// Repository for check and sale-line operations.
#[derive(Debug, Clone)]
pub struct CheckRepository {
    pool: SqlitePool,
}

impl CheckRepository {
    /// Creates a new CheckRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CheckRepository { pool }
    }

    // =========================================================================
    // Checks
    // =========================================================================

    /// Returns the id the next check should use: `MAX(id) + 1`, or 1 when
    /// there are no checks.
    pub async fn next_id(&self) -> DbResult<CheckId> {
        let mut conn = self.pool.acquire().await?;
        Self::next_id_with(&mut conn).await
    }

    pub async fn next_id_with(conn: &mut SqliteConnection) -> DbResult<CheckId> {
        let next: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(id), 0) + 1 FROM checks")
            .fetch_one(&mut *conn)
            .await?;

        Ok(next)
    }

    /// Inserts a check row.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - A check with this id already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown client id
    pub async fn insert_check_with(
        conn: &mut SqliteConnection,
        id: CheckId,
        sum: i64,
        bonuses_redeemed: i64,
        client_id: Option<ClientId>,
    ) -> DbResult<Check> {
        debug!(check_id = id, sum = sum, "Inserting check");

        sqlx::query(
            "INSERT INTO checks (id, sum, bonuses_redeemed, client_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(sum)
        .bind(bonuses_redeemed)
        .bind(client_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("check id", id.to_string()),
            other => other,
        })?;

        Ok(Check {
            id,
            sum,
            bonuses_redeemed,
            client_id,
        })
    }

    /// Gets a check by id.
    pub async fn get_check(&self, id: CheckId) -> DbResult<Option<Check>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_check_with(&mut conn, id).await
    }

    pub async fn get_check_with(
        conn: &mut SqliteConnection,
        id: CheckId,
    ) -> DbResult<Option<Check>> {
        let sql = format!("{} WHERE id = ?1", SELECT_CHECK);
        let check = sqlx::query_as::<_, Check>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(check)
    }

    /// Lists checks, newest first.
    pub async fn list_checks(&self, limit: u32) -> DbResult<Vec<Check>> {
        let sql = format!("{} ORDER BY id DESC LIMIT ?1", SELECT_CHECK);
        let checks = sqlx::query_as::<_, Check>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(checks)
    }

    /// Subtracts `amount` from a check's sum, stopping at zero.
    ///
    /// ## Returns
    /// The new sum.
    pub async fn decrement_sum_with(
        conn: &mut SqliteConnection,
        id: CheckId,
        amount: i64,
    ) -> DbResult<i64> {
        debug!(check_id = id, amount = amount, "Decrementing check sum");

        let result = sqlx::query("UPDATE checks SET sum = MAX(sum - ?1, 0) WHERE id = ?2")
            .bind(amount)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Check", id));
        }

        let sum: i64 = sqlx::query_scalar("SELECT sum FROM checks WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(sum)
    }

    /// Deletes a check. Its sale lines go with it.
    pub async fn delete_check_with(conn: &mut SqliteConnection, id: CheckId) -> DbResult<()> {
        debug!(check_id = id, "Deleting check");

        let result = sqlx::query("DELETE FROM checks WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Check", id));
        }

        Ok(())
    }

    // =========================================================================
    // Sale Lines
    // =========================================================================

    /// Inserts one sale line for a check.
    pub async fn insert_sale_line_with(
        conn: &mut SqliteConnection,
        check_id: CheckId,
        line: &NewSaleLine,
    ) -> DbResult<SaleLine> {
        debug!(
            check_id = check_id,
            product_id = line.product_id,
            quantity = line.quantity,
            "Inserting sale line"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO sales (check_id, product_id, amount, sell_date, unit_price)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(check_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.sold_date)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;

        Ok(SaleLine {
            id: result.last_insert_rowid(),
            check_id,
            product_id: line.product_id,
            quantity: line.quantity,
            sold_date: line.sold_date,
            unit_price: line.unit_price,
        })
    }

    /// Gets a sale line by id.
    pub async fn get_sale_line(&self, id: SaleLineId) -> DbResult<Option<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_sale_line_with(&mut conn, id).await
    }

    pub async fn get_sale_line_with(
        conn: &mut SqliteConnection,
        id: SaleLineId,
    ) -> DbResult<Option<SaleLine>> {
        let sql = format!("{} WHERE id = ?1", SELECT_SALE_LINE);
        let line = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(line)
    }

    /// Lists the sale lines of one check in insertion order.
    pub async fn sale_lines_for_check(&self, check_id: CheckId) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::sale_lines_for_check_with(&mut conn, check_id).await
    }

    pub async fn sale_lines_for_check_with(
        conn: &mut SqliteConnection,
        check_id: CheckId,
    ) -> DbResult<Vec<SaleLine>> {
        let sql = format!("{} WHERE check_id = ?1 ORDER BY id", SELECT_SALE_LINE);
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(check_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Lists sale lines across all checks, newest first (the returns view).
    pub async fn list_sale_lines(&self, limit: u32) -> DbResult<Vec<SaleLine>> {
        let sql = format!("{} ORDER BY id DESC LIMIT ?1", SELECT_SALE_LINE);
        let lines = sqlx::query_as::<_, SaleLine>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    pub async fn delete_sale_line_with(
        conn: &mut SqliteConnection,
        id: SaleLineId,
    ) -> DbResult<()> {
        debug!(sale_line_id = id, "Deleting sale line");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale line", id));
        }

        Ok(())
    }

    /// Counts checks (for diagnostics).
    pub async fn count_checks(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use kassa_core::NewProduct;

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Espresso".to_string(),
                manufacturer: "House".to_string(),
                stock: 10,
                sell_price: 150,
                use_by: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                purchase_price: 60,
                bonus_points: 0,
                returnable: true,
            })
            .await
            .unwrap();
        (db, product.id)
    }

    fn line(product_id: i64, quantity: i64) -> NewSaleLine {
        NewSaleLine {
            product_id,
            quantity,
            unit_price: 150,
            sold_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_next_id_starts_at_one() {
        let (db, _) = setup().await;
        assert_eq!(db.checks().next_id().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (db, product_id) = setup().await;
        let mut tx = db.begin().await.unwrap();

        let check = CheckRepository::insert_check_with(&mut tx, 1, 450, 0, None)
            .await
            .unwrap();
        let sale = CheckRepository::insert_sale_line_with(&mut tx, 1, &line(product_id, 3))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let repo = db.checks();
        assert_eq!(repo.get_check(1).await.unwrap(), Some(check));
        assert_eq!(repo.sale_lines_for_check(1).await.unwrap(), vec![sale.clone()]);
        assert_eq!(repo.get_sale_line(sale.id).await.unwrap(), Some(sale));
        assert_eq!(repo.next_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_check_id() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        CheckRepository::insert_check_with(&mut conn, 1, 0, 0, None)
            .await
            .unwrap();
        let err = CheckRepository::insert_check_with(&mut conn, 1, 0, 0, None)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_decrement_sum_floors_at_zero() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        CheckRepository::insert_check_with(&mut conn, 1, 100, 0, None)
            .await
            .unwrap();

        assert_eq!(
            CheckRepository::decrement_sum_with(&mut conn, 1, 30).await.unwrap(),
            70
        );
        assert_eq!(
            CheckRepository::decrement_sum_with(&mut conn, 1, 500).await.unwrap(),
            0
        );
        assert!(CheckRepository::decrement_sum_with(&mut conn, 9, 1)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_delete_check_cascades() {
        let (db, product_id) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        CheckRepository::insert_check_with(&mut conn, 1, 450, 0, None)
            .await
            .unwrap();
        let sale = CheckRepository::insert_sale_line_with(&mut conn, 1, &line(product_id, 3))
            .await
            .unwrap();

        CheckRepository::delete_check_with(&mut conn, 1).await.unwrap();
        assert!(CheckRepository::get_sale_line_with(&mut conn, sale.id)
            .await
            .unwrap()
            .is_none());
        assert!(CheckRepository::delete_check_with(&mut conn, 1)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_client_is_rejected() {
        let (db, _) = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let err = CheckRepository::insert_check_with(&mut conn, 1, 0, 0, Some(77))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
