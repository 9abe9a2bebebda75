use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_QUOTE_ID: &str = "quote-demo-001";
const SEED_LETTER_ID: &str = "letter-demo-001";
const SEED_SUPPLIER_IDS: &[&str] = &["supplier-demo-001", "supplier-demo-002"];
const SEED_TOKENS: &[&str] = &["demo-valid-token", "demo-expired-token"];
const SEED_QUOTE_ITEM_COUNT: i64 = 3;
const SEED_RECIPIENT_COUNT: i64 = 2;

/// Deterministic demo dataset: one dispatched invitation letter over an
/// open quote, with a valid and an expired response token.
pub struct DemoSeedDataset;

/// What the seed created, for CLI reporting.
#[derive(Debug)]
pub struct SeedResult {
    pub quote_id: &'static str,
    pub letter_id: &'static str,
    pub tokens: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|(_, passed)| *passed)
    }
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            quote_id: SEED_QUOTE_ID,
            letter_id: SEED_LETTER_ID,
            tokens: SEED_TOKENS.to_vec(),
        })
    }

    /// Verify the seed contract without mutating anything.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quote_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM quote WHERE id = ?1 AND status = 'open')",
        )
        .bind(SEED_QUOTE_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("quote-open", quote_exists == 1));

        let item_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM quote_item WHERE quote_id = ?1")
                .bind(SEED_QUOTE_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("quote-items", item_count == SEED_QUOTE_ITEM_COUNT));

        let letter_sent: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM invitation_letter WHERE id = ?1 AND status = 'sent' AND sent_at IS NOT NULL)",
        )
        .bind(SEED_LETTER_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("letter-dispatched", letter_sent == 1));

        let recipient_count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM letter_recipient WHERE letter_id = ?1")
                .bind(SEED_LETTER_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("letter-recipients", recipient_count == SEED_RECIPIENT_COUNT));

        for supplier_id in SEED_SUPPLIER_IDS {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM supplier WHERE id = ?1)")
                    .bind(supplier_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((*supplier_id, exists == 1));
        }

        for token in SEED_TOKENS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM quote_token WHERE token = ?1 AND used_at IS NULL)",
            )
            .bind(token)
            .fetch_one(pool)
            .await?;
            checks.push((*token, exists == 1));
        }

        Ok(VerificationResult { checks })
    }
}
