//! # Client Repository
//!
//! The loyalty ledger: client identity, bonus balance and the daily bonus code.
//!
//! ## Bonus Code Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  rotate_expired_codes(today, 1)                                        │
//! │       │                                                                 │
//! │       ├── code_expiry <  today ──► new random 6-digit code,            │
//! │       │                           not held by any valid client,        │
//! │       │                           code_expiry = today + days - 1       │
//! │       └── code_expiry >= today ──► untouched                           │
//! │                                                                         │
//! │  find_by_bonus_code("004217", today)                                   │
//! │       └── matches only while code_expiry >= today                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, NaiveDate};
use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kassa_core::validation::{validate_bonus_code, validate_non_negative};
use kassa_core::{Client, ClientId, CoreError, NewClient, ValidationError};

/// Draws allowed per client before rotation gives up on finding a free code.
const CODE_DRAW_ATTEMPTS: usize = 64;

const SELECT_CLIENT: &str = r#"
    SELECT id, phone, name, bonuses, bonus_code, code_expiry
    FROM clients
"#;

/// Repository for client and bonus operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Finds the client owning a bonus code that is still valid on `today`.
    ///
    /// ## Returns
    /// * `Ok(Client)` - Code matched and has not expired
    /// * `Err(DbError::NotFound)` - Unknown or expired code
    pub async fn find_by_bonus_code(&self, code: &str, today: NaiveDate) -> DbResult<Client> {
        let code = code.trim();
        debug!(today = %today, "Looking up client by bonus code");

        let sql = format!(
            "{} WHERE bonus_code = ?1 AND code_expiry >= ?2 ORDER BY id LIMIT 1",
            SELECT_CLIENT
        );
        sqlx::query_as::<_, Client>(&sql)
            .bind(code)
            .bind(today)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Client with bonus code", code))
    }

    /// Gets a client by id.
    pub async fn get_by_id(&self, id: ClientId) -> DbResult<Option<Client>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_id_with(&mut conn, id).await
    }

    pub async fn get_by_id_with(
        conn: &mut SqliteConnection,
        id: ClientId,
    ) -> DbResult<Option<Client>> {
        let sql = format!("{} WHERE id = ?1", SELECT_CLIENT);
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(client)
    }

    /// Adds `delta` to a client's bonus balance.
    ///
    /// ## Returns
    /// * `Ok(new_balance)`
    /// * `Err(DbError::NotFound)` - Client doesn't exist
    /// * `Err(DbError::Domain(InsufficientBonuses))` - Balance would go
    ///   negative; nothing is written
    pub async fn adjust_bonuses(&self, id: ClientId, delta: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::adjust_bonuses_with(&mut conn, id, delta).await
    }

    pub async fn adjust_bonuses_with(
        conn: &mut SqliteConnection,
        id: ClientId,
        delta: i64,
    ) -> DbResult<i64> {
        debug!(client_id = id, delta = delta, "Adjusting bonuses");

        let balance: Option<i64> = sqlx::query_scalar("SELECT bonuses FROM clients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let balance = balance.ok_or_else(|| DbError::not_found("Client", id))?;
        let updated = balance + delta;
        if updated < 0 {
            return Err(CoreError::InsufficientBonuses {
                available: balance,
                requested: -delta,
            }
            .into());
        }

        sqlx::query("UPDATE clients SET bonuses = ?1 WHERE id = ?2")
            .bind(updated)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(updated)
    }

    /// Inserts a new client.
    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        debug!(name = %client.name, "Inserting client");

        validate_non_negative("bonus_balance", client.bonus_balance).map_err(CoreError::from)?;
        validate_bonus_code(&client.bonus_code).map_err(CoreError::from)?;

        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO clients (phone, name, bonuses, bonus_code, code_expiry)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&client.phone)
        .bind(&client.name)
        .bind(client.bonus_balance)
        .bind(client.bonus_code.trim())
        .bind(client.code_expiry)
        .execute(&mut *conn)
        .await?;

        let id = result.last_insert_rowid();
        Self::get_by_id_with(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    /// Lists clients ordered by id.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Client>> {
        let sql = format!("{} ORDER BY id LIMIT ?1", SELECT_CLIENT);
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    /// Issues fresh codes to every client whose code expired before `today`.
    ///
    /// New codes are valid from `today` for `validity_days` days (inclusive),
    /// so with one day of validity the code expires tonight. A new code is
    /// never one another client can still redeem on `today`.
    /// All updates run in one transaction.
    ///
    /// ## Returns
    /// The `(client_id, new_code)` pairs that were rotated.
    pub async fn rotate_expired_codes(
        &self,
        today: NaiveDate,
        validity_days: u32,
    ) -> DbResult<Vec<(ClientId, String)>> {
        self.rotate_with(today, validity_days, generate_bonus_code)
            .await
    }

    async fn rotate_with<G>(
        &self,
        today: NaiveDate,
        validity_days: u32,
        mut generate: G,
    ) -> DbResult<Vec<(ClientId, String)>>
    where
        G: FnMut() -> String,
    {
        let expiry = code_expiry(today, validity_days)?;

        let mut tx = self.pool.begin().await?;

        let expired: Vec<ClientId> =
            sqlx::query_scalar("SELECT id FROM clients WHERE code_expiry < ?1 ORDER BY id")
                .bind(today)
                .fetch_all(&mut *tx)
                .await?;

        let mut rotated = Vec::with_capacity(expired.len());
        for id in expired {
            let code = Self::free_code_with(&mut tx, today, &mut generate).await?;
            sqlx::query("UPDATE clients SET bonus_code = ?1, code_expiry = ?2 WHERE id = ?3")
                .bind(&code)
                .bind(expiry)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            rotated.push((id, code));
        }

        tx.commit().await?;

        info!(
            rotated = rotated.len(),
            expiry = %expiry,
            "Rotated expired bonus codes"
        );
        Ok(rotated)
    }

    /// Draws codes until one is not held by a client whose code is valid on `today`.
    /// Codes issued earlier in the same rotation count as held.
    async fn free_code_with<G>(
        conn: &mut SqliteConnection,
        today: NaiveDate,
        generate: &mut G,
    ) -> DbResult<String>
    where
        G: FnMut() -> String,
    {
        for _ in 0..CODE_DRAW_ATTEMPTS {
            let code = generate();
            let held: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM clients WHERE bonus_code = ?1 AND code_expiry >= ?2",
            )
            .bind(&code)
            .bind(today)
            .fetch_one(&mut *conn)
            .await?;

            if held == 0 {
                return Ok(code);
            }
            debug!("Drawn bonus code already in use, drawing again");
        }

        Err(DbError::Internal(format!(
            "no free bonus code after {} draws",
            CODE_DRAW_ATTEMPTS
        )))
    }
}

/// Last valid day of a code issued on `today`.
fn code_expiry(today: NaiveDate, validity_days: u32) -> DbResult<NaiveDate> {
    if validity_days == 0 {
        return Err(CoreError::Validation(ValidationError::OutOfRange {
            field: "code_validity_days".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        })
        .into());
    }

    today
        .checked_add_days(Days::new(u64::from(validity_days - 1)))
        .ok_or_else(|| DbError::Internal(format!("code expiry overflows from {}", today)))
}

/// Random six-digit code, leading zeros allowed.
pub fn generate_bonus_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kassa_core::ErrorKind;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_client(name: &str, bonuses: i64, code: &str, expiry: NaiveDate) -> NewClient {
        NewClient {
            phone: "+7 900 000 00 00".to_string(),
            name: name.to_string(),
            bonus_balance: bonuses,
            bonus_code: code.to_string(),
            code_expiry: expiry,
        }
    }

    async fn repo() -> ClientRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().clients()
    }

    #[tokio::test]
    async fn test_find_by_bonus_code_respects_expiry() {
        let repo = repo().await;
        let today = day(2024, 5, 10);
        let client = repo
            .insert(&new_client("Ann", 5, "123456", today))
            .await
            .unwrap();

        let found = repo.find_by_bonus_code("123456", today).await.unwrap();
        assert_eq!(found.id, client.id);
        assert_eq!(found.bonus_balance, 5);

        let tomorrow = today.succ_opt().unwrap();
        assert!(repo
            .find_by_bonus_code("123456", tomorrow)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(repo
            .find_by_bonus_code("654321", today)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_adjust_bonuses_floor() {
        let repo = repo().await;
        let c = repo
            .insert(&new_client("Ann", 5, "123456", day(2024, 5, 10)))
            .await
            .unwrap();

        assert_eq!(repo.adjust_bonuses(c.id, 3).await.unwrap(), 8);
        assert_eq!(repo.adjust_bonuses(c.id, -8).await.unwrap(), 0);

        match repo.adjust_bonuses(c.id, -1).await.unwrap_err() {
            DbError::Domain(e) => assert_eq!(e.kind(), ErrorKind::InsufficientBonuses),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(repo.get_by_id(c.id).await.unwrap().unwrap().bonus_balance, 0);

        assert!(repo.adjust_bonuses(999, 1).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rotate_expired_codes() {
        let repo = repo().await;
        let today = day(2024, 5, 10);
        let stale = repo
            .insert(&new_client("Ann", 0, "111111", day(2024, 5, 9)))
            .await
            .unwrap();
        let fresh = repo
            .insert(&new_client("Bob", 0, "222222", today))
            .await
            .unwrap();

        let rotated = repo.rotate_expired_codes(today, 1).await.unwrap();
        assert_eq!(rotated.len(), 1);
        assert_eq!(rotated[0].0, stale.id);

        let code = &rotated[0].1;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let stale = repo.get_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(&stale.bonus_code, code);
        assert_eq!(stale.code_expiry, today);

        let fresh_after = repo.get_by_id(fresh.id).await.unwrap().unwrap();
        assert_eq!(fresh_after, fresh);
    }

    #[tokio::test]
    async fn test_rotate_with_longer_validity() {
        let repo = repo().await;
        let today = day(2024, 5, 10);
        let c = repo
            .insert(&new_client("Ann", 0, "111111", day(2024, 1, 1)))
            .await
            .unwrap();

        repo.rotate_expired_codes(today, 7).await.unwrap();
        let c = repo.get_by_id(c.id).await.unwrap().unwrap();
        assert_eq!(c.code_expiry, day(2024, 5, 16));

        assert!(repo.rotate_expired_codes(today, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_rotation_skips_codes_still_in_use() {
        let repo = repo().await;
        let today = day(2024, 5, 10);
        let holder = repo
            .insert(&new_client("Bob", 0, "222222", today))
            .await
            .unwrap();
        let first = repo
            .insert(&new_client("Ann", 0, "111111", day(2024, 5, 9)))
            .await
            .unwrap();
        let second = repo
            .insert(&new_client("Eve", 0, "333333", day(2024, 5, 9)))
            .await
            .unwrap();

        // Bob's live code first, then a code handed out earlier in this run.
        let mut draws = ["222222", "444444", "444444", "555555"].into_iter();
        let rotated = repo
            .rotate_with(today, 1, || draws.next().unwrap_or("999999").to_string())
            .await
            .unwrap();

        assert_eq!(
            rotated,
            vec![(first.id, "444444".to_string()), (second.id, "555555".to_string())]
        );
        let found = repo.find_by_bonus_code("222222", today).await.unwrap();
        assert_eq!(found.id, holder.id);
        let found = repo.find_by_bonus_code("444444", today).await.unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn test_rotation_gives_up_when_every_draw_is_taken() {
        let repo = repo().await;
        let today = day(2024, 5, 10);
        repo.insert(&new_client("Bob", 0, "222222", today))
            .await
            .unwrap();
        let stale = repo
            .insert(&new_client("Ann", 0, "111111", day(2024, 5, 9)))
            .await
            .unwrap();

        let err = repo
            .rotate_with(today, 1, || "222222".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));

        let stale_after = repo.get_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(stale_after, stale);
    }

    #[test]
    fn test_generate_bonus_code_shape() {
        for _ in 0..100 {
            let code = generate_bonus_code();
            assert_eq!(code.len(), 6);
            assert!(validate_bonus_code(&code).is_ok());
        }
    }
}
