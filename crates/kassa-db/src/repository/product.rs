//! # Product Repository
//!
//! Database operations for the catalog (`goods` table).
//!
//! ## Key Operations
//! - Lookup by name (the till's entry field) and by id
//! - Stock adjustment by delta
//! - Listing and substring search for the product table
//!
//! ## Stock Deltas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  add_line(Espresso, 3)   →  UPDATE goods SET amount = amount + (-3)    │
//! │  remove_line(Espresso)   →  UPDATE goods SET amount = amount + 3       │
//! │  return (returnable)     →  UPDATE goods SET amount = amount + q       │
//! │                                                                         │
//! │  CHECK (amount >= 0) rejects any delta that would go below zero.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kassa_core::validation::{validate_non_negative, validate_product_name};
use kassa_core::{NewProduct, Product, ProductId};

const SELECT_PRODUCT: &str = r#"
    SELECT id, name, manufacturer, amount, sell_price, use_by,
           purchase_price, bonuses, returnable
    FROM goods
"#;

/// Repository for catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let espresso = repo.find_by_name("Espresso").await?;
/// repo.adjust_stock(espresso.id, -3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Finds a product by its exact name.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product found
    /// * `Err(DbError::NotFound)` - No product with that name
    pub async fn find_by_name(&self, name: &str) -> DbResult<Product> {
        let name = name.trim();
        debug!(name = %name, "Finding product by name");

        let sql = format!("{} WHERE name = ?1", SELECT_PRODUCT);
        sqlx::query_as::<_, Product>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", name))
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_with(&mut conn, id).await
    }

    /// Gets a product by its ID on the given connection (or transaction).
    pub async fn get_by_id_with(
        conn: &mut SqliteConnection,
        id: ProductId,
    ) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE id = ?1", SELECT_PRODUCT);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Adds `delta` to a product's stock (negative to take, positive to put back).
    ///
    /// ## Returns
    /// * `Ok(())` - Stock updated
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::CheckViolation)` - Result would be negative
    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_stock_with(&mut conn, id, delta).await
    }

    pub async fn adjust_stock_with(
        conn: &mut SqliteConnection,
        id: ProductId,
        delta: i64,
    ) -> DbResult<()> {
        debug!(id = id, delta = delta, "Adjusting stock");

        let result = sqlx::query("UPDATE goods SET amount = amount + ?1 WHERE id = ?2")
            .bind(delta)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists products ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!("{} ORDER BY name LIMIT ?1", SELECT_PRODUCT);
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Case-insensitive substring search over name and manufacturer.
    ///
    /// Matching uses Unicode lowercasing, so Cyrillic and other non-ASCII
    /// names fold the same way Latin ones do. `%` and `_` match literally.
    /// An empty query lists products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list(limit).await;
        }

        // SQLite's lower() and LIKE only fold ASCII, so matching happens here.
        let needle = query.to_lowercase();
        let sql = format!("{} ORDER BY name", SELECT_PRODUCT);
        let products: Vec<Product> = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.manufacturer.to_lowercase().contains(&needle)
            })
            .take(limit as usize)
            .collect();

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with its generated id
    /// * `Err(DbError::UniqueViolation)` - Name already exists
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        debug!(name = %product.name, "Inserting product");

        validate_product_name(&product.name).map_err(kassa_core::CoreError::from)?;
        for (field, value) in [
            ("stock", product.stock),
            ("sell_price", product.sell_price),
            ("purchase_price", product.purchase_price),
            ("bonus_points", product.bonus_points),
        ] {
            validate_non_negative(field, value).map_err(kassa_core::CoreError::from)?;
        }

        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO goods (
                name, manufacturer, amount, sell_price, use_by,
                purchase_price, bonuses, returnable
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(product.name.trim())
        .bind(&product.manufacturer)
        .bind(product.stock)
        .bind(product.sell_price)
        .bind(product.use_by)
        .bind(product.purchase_price)
        .bind(product.bonus_points)
        .bind(product.returnable)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, product.name.trim())
            }
            other => other,
        })?;

        let id = result.last_insert_rowid();
        Self::get_by_id_with(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Counts products in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM goods")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
