//! # Login Repository
//!
//! Operator credentials. Passwords are stored as Argon2 PHC strings; the
//! plain password never touches the database.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use kassa_core::validation::validate_credentials;
use kassa_core::{CoreError, Role};

/// Repository for operator logins.
#[derive(Debug, Clone)]
pub struct LoginRepository {
    pool: SqlitePool,
}

impl LoginRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoginRepository { pool }
    }

    /// Registers an operator.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(Validation))` - Empty login or password
    /// * `Err(DbError::UniqueViolation)` - Login already taken
    pub async fn register(&self, login: &str, password: &str, role: Role) -> DbResult<()> {
        validate_credentials(login, password).map_err(CoreError::from)?;
        let login = login.trim();

        debug!(login = %login, role = %role, "Registering operator");

        let hash = hash_password(password)?;

        sqlx::query("INSERT INTO logins (login, password_hash, role) VALUES (?1, ?2, ?3)")
            .bind(login)
            .bind(hash)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::duplicate("login", login),
                other => other,
            })?;

        info!(login = %login, role = %role, "Operator registered");
        Ok(())
    }

    /// Checks a login/password pair.
    ///
    /// ## Returns
    /// * `Ok(Some(role))` - Credentials match
    /// * `Ok(None)` - Unknown login or wrong password
    pub async fn authenticate(&self, login: &str, password: &str) -> DbResult<Option<Role>> {
        let login = login.trim();

        let row: Option<(String, Role)> =
            sqlx::query_as("SELECT password_hash, role FROM logins WHERE login = ?1")
                .bind(login)
                .fetch_optional(&self.pool)
                .await?;

        let Some((hash, role)) = row else {
            debug!(login = %login, "Unknown login");
            return Ok(None);
        };

        if verify_password(password, &hash) {
            debug!(login = %login, role = %role, "Credentials accepted");
            Ok(Some(role))
        } else {
            warn!(login = %login, "Wrong password");
            Ok(None)
        }
    }

    /// Number of registered operators.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM logins")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Hash a password for storage.
pub fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against its stored hash.
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> LoginRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().logins()
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let repo = repo().await;
        repo.register("boss", "s3cret", Role::Admin).await.unwrap();
        repo.register("anna", "till", Role::Cashier).await.unwrap();

        assert_eq!(
            repo.authenticate("boss", "s3cret").await.unwrap(),
            Some(Role::Admin)
        );
        assert_eq!(
            repo.authenticate("anna", "till").await.unwrap(),
            Some(Role::Cashier)
        );
        assert_eq!(repo.authenticate("boss", "wrong").await.unwrap(), None);
        assert_eq!(repo.authenticate("ghost", "x").await.unwrap(), None);
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_blanks() {
        let repo = repo().await;
        repo.register("boss", "s3cret", Role::Admin).await.unwrap();

        let err = repo.register("boss", "other", Role::Cashier).await.unwrap_err();
        assert!(err.is_unique_violation());

        assert!(matches!(
            repo.register("", "pw", Role::Cashier).await.unwrap_err(),
            DbError::Domain(_)
        ));
        assert!(matches!(
            repo.register("x", "", Role::Cashier).await.unwrap_err(),
            DbError::Domain(_)
        ));
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("s3cret!", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }
}
