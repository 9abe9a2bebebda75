use chrono::{DateTime, Duration, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use cotar_core::domain::quote::{QuoteId, QuoteItem, QuoteSummary};
use cotar_core::domain::supplier::{Supplier, SupplierId};

use super::quote::SqlQuoteRepository;
use super::supplier::SqlSupplierRepository;
use super::{decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

/// Request to mint a response token for one recipient of a letter.
pub struct TokenGrant {
    pub quote_id: QuoteId,
    pub supplier_id: Option<SupplierId>,
    pub letter_id: Option<String>,
    pub ttl_days: i64,
}

/// Everything the public response page needs, resolved in one shot.
#[derive(Clone, Debug)]
pub struct ResolvedToken {
    pub token_id: String,
    pub token: String,
    pub quote: QuoteSummary,
    pub items: Vec<QuoteItem>,
    pub supplier: Option<Supplier>,
    pub letter_id: Option<String>,
}

/// Invalid states are distinguished so the interface layer can explain
/// expiry and revocation differently from a token that never existed.
#[derive(Debug)]
pub enum TokenResolution {
    Valid(Box<ResolvedToken>),
    Expired,
    Revoked,
    AlreadyUsed,
    NotFound,
}

pub struct SqlTokenRepository {
    pool: DbPool,
}

impl SqlTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Mint an opaque single-use token. The token value is the only
    /// credential; no supplier login is involved.
    pub async fn issue(&self, grant: TokenGrant) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::days(grant.ttl_days.max(1));

        sqlx::query(
            "INSERT INTO quote_token (
                id, token, quote_id, supplier_id, letter_id,
                expires_at, revoked, used_at, created_at
             ) VALUES (?, ?, ?, ?, ?, ?, 0, NULL, ?)",
        )
        .bind(&id)
        .bind(&token)
        .bind(&grant.quote_id.0)
        .bind(grant.supplier_id.as_ref().map(|supplier_id| supplier_id.0.clone()))
        .bind(&grant.letter_id)
        .bind(encode_timestamp(expires_at))
        .bind(encode_timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn resolve(&self, token: &str) -> Result<TokenResolution, RepositoryError> {
        self.resolve_at(token, Utc::now()).await
    }

    /// Resolution order: existence, revocation, expiry, prior use. A token
    /// that is both revoked and expired reports revoked.
    pub async fn resolve_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenResolution, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, token, quote_id, supplier_id, letter_id, expires_at, revoked, used_at
             FROM quote_token
             WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(TokenResolution::NotFound);
        };

        if row.get::<i64, _>("revoked") != 0 {
            return Ok(TokenResolution::Revoked);
        }

        let expires_at = decode_timestamp("expires_at", &row.get::<String, _>("expires_at"))?;
        if expires_at < now {
            return Ok(TokenResolution::Expired);
        }

        if row.get::<Option<String>, _>("used_at").is_some() {
            return Ok(TokenResolution::AlreadyUsed);
        }

        let quote_id = QuoteId(row.get("quote_id"));
        let quotes = SqlQuoteRepository::new(self.pool.clone());
        let Some(quote) = quotes.find_summary(&quote_id).await? else {
            // Token without its quote is a broken reference, not a user error.
            return Ok(TokenResolution::NotFound);
        };
        let items = quotes.list_items(&quote_id).await?;

        let supplier = match row.get::<Option<String>, _>("supplier_id") {
            Some(supplier_id) => {
                SqlSupplierRepository::new(self.pool.clone())
                    .find_by_id(&SupplierId(supplier_id))
                    .await?
            }
            None => None,
        };

        Ok(TokenResolution::Valid(Box::new(ResolvedToken {
            token_id: row.get("id"),
            token: row.get("token"),
            quote,
            items,
            supplier,
            letter_id: row.get("letter_id"),
        })))
    }

    /// Single-use guard: succeeds exactly once per token. Used inside the
    /// submission transaction and available standalone for admin tooling.
    pub async fn mark_used(&self, token_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE quote_token SET used_at = ? WHERE id = ? AND used_at IS NULL AND revoked = 0",
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(token_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn revoke(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE quote_token SET revoked = 1 WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_for_letter(&self, letter_id: &str) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT token FROM quote_token WHERE letter_id = ? ORDER BY created_at ASC")
            .bind(letter_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row: SqliteRow| row.get("token")).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use cotar_core::domain::quote::QuoteId;

    use super::{SqlTokenRepository, TokenGrant, TokenResolution};
    use crate::migrations::run_pending;
    use crate::{connect_with_settings, DbPool};

    async fn pool_with_quote() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");

        sqlx::query(
            "INSERT INTO quote (id, client_name, title, description, requires_visit, status, created_at, updated_at)
             VALUES ('q-1', 'Condomínio Jardim', 'Material elétrico', '', 0, 'open', ?1, ?1)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .expect("seed quote");

        sqlx::query(
            "INSERT INTO quote_item (id, quote_id, product_name, quantity, unit_price, position)
             VALUES ('qi-1', 'q-1', 'Disjuntor 20A', 4, '35.90', 0)",
        )
        .execute(&pool)
        .await
        .expect("seed item");

        pool
    }

    fn grant() -> TokenGrant {
        TokenGrant {
            quote_id: QuoteId("q-1".to_string()),
            supplier_id: None,
            letter_id: None,
            ttl_days: 7,
        }
    }

    #[tokio::test]
    async fn issued_token_resolves_with_quote_and_items() {
        let pool = pool_with_quote().await;
        let repo = SqlTokenRepository::new(pool);

        let token = repo.issue(grant()).await.expect("issue");
        let resolution = repo.resolve(&token).await.expect("resolve");

        match resolution {
            TokenResolution::Valid(resolved) => {
                assert_eq!(resolved.quote.id.0, "q-1");
                assert_eq!(resolved.items.len(), 1);
                assert_eq!(resolved.items[0].product_name, "Disjuntor 20A");
                assert!(resolved.supplier.is_none());
            }
            other => panic!("expected valid resolution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let pool = pool_with_quote().await;
        let repo = SqlTokenRepository::new(pool);

        let resolution = repo.resolve("missing").await.expect("resolve");
        assert!(matches!(resolution, TokenResolution::NotFound));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired() {
        let pool = pool_with_quote().await;
        let repo = SqlTokenRepository::new(pool);

        let token = repo.issue(grant()).await.expect("issue");
        let future = Utc::now() + Duration::days(30);
        let resolution = repo.resolve_at(&token, future).await.expect("resolve");

        assert!(matches!(resolution, TokenResolution::Expired));
    }

    #[tokio::test]
    async fn revoked_wins_over_expiry() {
        let pool = pool_with_quote().await;
        let repo = SqlTokenRepository::new(pool);

        let token = repo.issue(grant()).await.expect("issue");
        assert!(repo.revoke(&token).await.expect("revoke"));

        let future = Utc::now() + Duration::days(30);
        let resolution = repo.resolve_at(&token, future).await.expect("resolve");
        assert!(matches!(resolution, TokenResolution::Revoked));
    }

    #[tokio::test]
    async fn mark_used_succeeds_exactly_once() {
        let pool = pool_with_quote().await;
        let repo = SqlTokenRepository::new(pool);

        let token = repo.issue(grant()).await.expect("issue");
        let resolved = match repo.resolve(&token).await.expect("resolve") {
            TokenResolution::Valid(resolved) => resolved,
            other => panic!("expected valid resolution, got {other:?}"),
        };

        assert!(repo.mark_used(&resolved.token_id).await.expect("first use"));
        assert!(!repo.mark_used(&resolved.token_id).await.expect("second use"));

        let resolution = repo.resolve(&token).await.expect("resolve after use");
        assert!(matches!(resolution, TokenResolution::AlreadyUsed));
    }
}
