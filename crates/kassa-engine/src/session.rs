//! # POS Session
//!
//! One signed-in operator at one till: the database handle, the open cart
//! and the engines, wired from an [`EngineConfig`].
//!
//! ## Lifecycle
//! ```text
//! PosSession::open(config, "anna", "till")
//!      │   Database::new → migrations → authenticate
//!      ▼
//! add_line / sell / challenge / return_* ...
//!      │
//!      ▼
//! close()  ──► void the open cart ──► PRAGMA optimize ──► pool closed
//! ```

use chrono::Local;
use tracing::{info, warn};

use kassa_core::validation::validate_bonus_code;
use kassa_core::{
    CartLine, Check, CheckId, Client, ClientId, CoreError, Product, ProductId, Role, SaleLine,
    SaleLineId,
};
use kassa_db::Database;

use crate::authorizer::ReturnAuthorizer;
use crate::cart::CartSession;
use crate::checkout::{CheckReceipt, CheckoutEngine};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::returns::{ReturnEngine, ReturnSummary};

#[derive(Debug)]
pub struct PosSession {
    db: Database,
    config: EngineConfig,
    role: Role,
    cart: CartSession,
    checkout: CheckoutEngine,
    returns: ReturnEngine,
    authorizer: ReturnAuthorizer,
}

impl PosSession {
    /// Opens the configured database and signs the operator in.
    ///
    /// ## Returns
    /// * `Err(Unauthorized)` - Unknown login or wrong password
    /// * `Err(Storage)` - The database could not be opened
    pub async fn open(config: EngineConfig, login: &str, password: &str) -> EngineResult<Self> {
        let db = Database::new(config.db_config()?).await?;

        let Some(role) = db.logins().authenticate(login, password).await? else {
            warn!(login = %login.trim(), "Sign-in rejected");
            db.close().await;
            return Err(CoreError::Unauthorized("invalid login or password".to_string()).into());
        };

        info!(login = %login.trim(), role = %role, "Session opened");
        Ok(Self::with_database(db, config, role))
    }

    /// Wires a session over an already open database.
    pub fn with_database(db: Database, config: EngineConfig, role: Role) -> Self {
        let checkout = CheckoutEngine::new(db.clone()).with_bonus_rate(config.bonus_rate());
        let returns = ReturnEngine::new(db.clone()).with_pricing(config.return_pricing());

        PosSession {
            cart: CartSession::new(db.clone()),
            authorizer: ReturnAuthorizer::new(&db, role),
            checkout,
            returns,
            role,
            config,
            db,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn cart(&self) -> &CartSession {
        &self.cart
    }

    pub fn checkout(&self) -> &CheckoutEngine {
        &self.checkout
    }

    pub fn returns(&self) -> &ReturnEngine {
        &self.returns
    }

    pub fn authorizer(&self) -> &ReturnAuthorizer {
        &self.authorizer
    }

    // =========================================================================
    // Catalog & Cart
    // =========================================================================

    /// Product table search; an empty query lists the catalog.
    pub async fn search_products(&self, query: &str, limit: u32) -> EngineResult<Vec<Product>> {
        Ok(self.db.products().search(query, limit).await?)
    }

    pub async fn add_line(&mut self, product_name: &str, quantity: i64) -> EngineResult<CartLine> {
        self.cart.add_line(product_name, quantity).await
    }

    pub async fn add_line_text(
        &mut self,
        product_name: &str,
        quantity: &str,
    ) -> EngineResult<CartLine> {
        self.cart.add_line_text(product_name, quantity).await
    }

    /// Removes a cart line. Gated like a return for cashier sessions.
    pub async fn void_line(&mut self, product_id: ProductId) -> EngineResult<CartLine> {
        self.authorizer
            .void_cart_line(&mut self.cart, product_id)
            .await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Finds the client owning a bonus code that is valid today.
    pub async fn lookup_client(&self, bonus_code: &str) -> EngineResult<Client> {
        let code = bonus_code.trim();
        validate_bonus_code(code).map_err(CoreError::from)?;

        let today = Local::now().date_naive();
        Ok(self.db.clients().find_by_bonus_code(code, today).await?)
    }

    /// Commits the cart under the next check id.
    pub async fn sell(
        &mut self,
        client_id: Option<ClientId>,
        bonuses_to_redeem: i64,
    ) -> EngineResult<CheckReceipt> {
        let check_id = self.checkout.next_check_id().await?;
        self.checkout
            .commit(&mut self.cart, check_id, client_id, bonuses_to_redeem)
            .await
    }

    /// Commits the cart for the client holding `bonus_code`.
    pub async fn sell_with_code(
        &mut self,
        bonus_code: &str,
        bonuses_to_redeem: i64,
    ) -> EngineResult<CheckReceipt> {
        let client = self.lookup_client(bonus_code).await?;
        self.sell(Some(client.id), bonuses_to_redeem).await
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// Checks for the returns view, newest first.
    pub async fn recent_checks(&self, limit: u32) -> EngineResult<Vec<Check>> {
        Ok(self.db.checks().list_checks(limit).await?)
    }

    /// Sale lines for the returns view, newest first.
    pub async fn recent_sale_lines(&self, limit: u32) -> EngineResult<Vec<SaleLine>> {
        Ok(self.db.checks().list_sale_lines(limit).await?)
    }

    pub async fn challenge(&mut self, login: &str, password: &str) -> EngineResult<Role> {
        self.authorizer.challenge(login, password).await
    }

    pub async fn return_check(&mut self, check_id: CheckId) -> EngineResult<ReturnSummary> {
        self.authorizer.return_check(&self.returns, check_id).await
    }

    pub async fn return_sale_line(
        &mut self,
        sale_line_id: SaleLineId,
    ) -> EngineResult<ReturnSummary> {
        self.authorizer
            .return_sale_line(&self.returns, sale_line_id)
            .await
    }

    pub async fn return_selection(
        &mut self,
        check_ids: &[CheckId],
        sale_line_ids: &[SaleLineId],
    ) -> EngineResult<ReturnSummary> {
        self.authorizer
            .return_selection(&self.returns, check_ids, sale_line_ids)
            .await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Issues new codes for every client whose code has expired.
    /// Administrator sessions only.
    pub async fn rotate_bonus_codes(&self) -> EngineResult<Vec<(ClientId, String)>> {
        if !self.role.is_admin() {
            return Err(CoreError::Unauthorized(
                "only administrators can rotate bonus codes".to_string(),
            )
            .into());
        }

        let today = Local::now().date_naive();
        let rotated = self
            .db
            .clients()
            .rotate_expired_codes(today, self.config.code_validity_days())
            .await?;

        info!(rotated = rotated.len(), "Bonus codes rotated");
        Ok(rotated)
    }

    /// Ends the session: puts the open cart back on the shelf and closes
    /// the database.
    pub async fn close(mut self) -> EngineResult<()> {
        let voided = self.cart.void().await;
        self.db.close().await;
        info!(role = %self.role, "Session closed");
        voided
    }
}
