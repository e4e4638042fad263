//! # Return Authorizer
//!
//! Puts returns (and voiding cart lines) behind an administrator
//! challenge for cashier sessions.
//!
//! ```text
//! cashier session
//! ───────────────
//!   return_check(7) ──► Locked ──► Unauthorized
//!   challenge("boss", "****") ──► admin ──► Unlocked
//!   return_check(7) ──► runs ──► Ok ──► Locked again
//!                            └─► Err ──► stays Unlocked
//!
//! admin session
//! ─────────────
//!   return_check(7) ──► runs, no challenge needed
//! ```

use std::future::Future;

use tracing::{info, warn};

use kassa_core::{CartLine, CheckId, GateState, ProductId, ReturnGate, Role, SaleLineId};
use kassa_db::{Database, LoginRepository};

use crate::cart::CartSession;
use crate::error::EngineResult;
use crate::returns::{ReturnEngine, ReturnSummary};

#[derive(Debug, Clone)]
pub struct ReturnAuthorizer {
    logins: LoginRepository,
    gate: ReturnGate,
}

impl ReturnAuthorizer {
    /// Creates the authorizer for a session signed in as `session_role`.
    pub fn new(db: &Database, session_role: Role) -> Self {
        ReturnAuthorizer {
            logins: db.logins(),
            gate: ReturnGate::new(session_role),
        }
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    pub fn session_role(&self) -> Role {
        self.gate.session_role()
    }

    /// Verifies `login`/`password` and unlocks the gate if they belong to
    /// an administrator.
    ///
    /// ## Returns
    /// * `Ok(Role::Admin)` - Gate unlocked for the next gated operation
    /// * `Err(Unauthorized)` - Unknown login, wrong password or a non-admin
    ///   role; the gate is locked
    pub async fn challenge(&mut self, login: &str, password: &str) -> EngineResult<Role> {
        let verified = self.logins.authenticate(login, password).await?;

        match self.gate.apply_challenge(verified) {
            Ok(role) => {
                info!(login = %login.trim(), "Return gate unlocked");
                Ok(role)
            }
            Err(e) => {
                warn!(login = %login.trim(), "Return challenge rejected");
                Err(e.into())
            }
        }
    }

    /// Runs `op` if the gate is open, consuming the unlock when it succeeds.
    ///
    /// `op` is not polled at all while the gate is locked.
    pub async fn authorize<T, F>(&mut self, op: F) -> EngineResult<T>
    where
        F: Future<Output = EngineResult<T>>,
    {
        self.gate.ensure_open()?;
        let out = op.await?;
        self.gate.consume();
        Ok(out)
    }

    // =========================================================================
    // Gated Operations
    // =========================================================================

    pub async fn return_check(
        &mut self,
        returns: &ReturnEngine,
        check_id: CheckId,
    ) -> EngineResult<ReturnSummary> {
        self.authorize(returns.return_check(check_id)).await
    }

    pub async fn return_sale_line(
        &mut self,
        returns: &ReturnEngine,
        sale_line_id: SaleLineId,
    ) -> EngineResult<ReturnSummary> {
        self.authorize(returns.return_sale_line(sale_line_id)).await
    }

    pub async fn return_selection(
        &mut self,
        returns: &ReturnEngine,
        check_ids: &[CheckId],
        sale_line_ids: &[SaleLineId],
    ) -> EngineResult<ReturnSummary> {
        self.authorize(returns.return_selection(check_ids, sale_line_ids))
            .await
    }

    /// Voids a line of the open cart (a return before checkout).
    pub async fn void_cart_line(
        &mut self,
        cart: &mut CartSession,
        product_id: ProductId,
    ) -> EngineResult<CartLine> {
        self.authorize(cart.remove_line(product_id)).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use kassa_core::ErrorKind;
    use kassa_db::DbConfig;

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.logins().register("boss", "s3cret", Role::Admin).await.unwrap();
        db.logins().register("anna", "till", Role::Cashier).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_cashier_session_starts_locked() {
        let db = setup().await;
        let mut auth = ReturnAuthorizer::new(&db, Role::Cashier);

        assert_eq!(auth.state(), GateState::Locked);
        let err = auth.authorize(async { Ok::<_, EngineError>(()) }).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_admin_challenge_unlocks_once() {
        let db = setup().await;
        let mut auth = ReturnAuthorizer::new(&db, Role::Cashier);

        assert_eq!(auth.challenge("boss", "s3cret").await.unwrap(), Role::Admin);
        assert!(auth.is_open());

        auth.authorize(async { Ok::<_, EngineError>(()) }).await.unwrap();
        assert_eq!(auth.state(), GateState::Locked);
    }

    #[tokio::test]
    async fn test_failed_operation_keeps_unlock() {
        let db = setup().await;
        let mut auth = ReturnAuthorizer::new(&db, Role::Cashier);
        auth.challenge("boss", "s3cret").await.unwrap();

        let result: EngineResult<()> = auth
            .authorize(async { Err(EngineError::validation("nope")) })
            .await;
        assert!(result.is_err());
        assert!(auth.is_open());
    }

    #[tokio::test]
    async fn test_cashier_or_bad_credentials_relock() {
        let db = setup().await;
        let mut auth = ReturnAuthorizer::new(&db, Role::Cashier);
        auth.challenge("boss", "s3cret").await.unwrap();

        let err = auth.challenge("anna", "till").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(auth.state(), GateState::Locked);

        let err = auth.challenge("boss", "guess").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert!(!auth.is_open());
    }

    #[tokio::test]
    async fn test_admin_session_never_needs_challenge() {
        let db = setup().await;
        let mut auth = ReturnAuthorizer::new(&db, Role::Admin);

        for _ in 0..3 {
            auth.authorize(async { Ok::<_, EngineError>(()) }).await.unwrap();
        }
        assert!(auth.is_open());
    }
}
