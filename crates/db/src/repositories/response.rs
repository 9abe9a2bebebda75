use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use cotar_core::domain::response::SupplierResponseSubmission;

use super::{encode_date, encode_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlResponseRepository {
    pool: DbPool,
}

impl SqlResponseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a submission and consume its token in one transaction.
    /// The token is spent with a guarded UPDATE, so a concurrent second
    /// submission loses the race and gets a conflict instead of a
    /// duplicate response row.
    pub async fn submit(
        &self,
        quote_id: &str,
        token_id: &str,
        submission: &SupplierResponseSubmission,
    ) -> Result<String, RepositoryError> {
        let response_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let spent = sqlx::query(
            "UPDATE quote_token SET used_at = ? WHERE id = ? AND used_at IS NULL AND revoked = 0",
        )
        .bind(encode_timestamp(now))
        .bind(token_id)
        .execute(&mut *tx)
        .await?;

        if spent.rows_affected() != 1 {
            return Err(RepositoryError::Conflict(format!(
                "token `{token_id}` was already consumed"
            )));
        }

        sqlx::query(
            "INSERT INTO supplier_response (
                id, quote_id, token_id, supplier_name, supplier_email,
                total_amount, delivery_days, shipping_cost, warranty_months,
                payment_terms, notes, attachment_url, visit_date, visit_notes,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&response_id)
        .bind(quote_id)
        .bind(token_id)
        .bind(&submission.supplier_name)
        .bind(&submission.supplier_email)
        .bind(submission.total_amount.to_string())
        .bind(submission.delivery_days.map(i64::from))
        .bind(submission.shipping_cost.to_string())
        .bind(submission.warranty_months.map(i64::from))
        .bind(&submission.payment_terms)
        .bind(&submission.notes)
        .bind(&submission.attachment_url)
        .bind(submission.visit_date.map(encode_date))
        .bind(&submission.visit_notes)
        .bind(encode_timestamp(now))
        .execute(&mut *tx)
        .await?;

        for (position, item) in submission.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO response_item (id, response_id, product_name, quantity, unit_price, total, position)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&response_id)
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.to_string())
            .bind(item.total.to_string())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(url) = &submission.attachment_url {
            sqlx::query(
                "UPDATE upload_artifact SET response_id = ?, orphaned = 0 WHERE url = ?",
            )
            .bind(&response_id)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(response_id)
    }

    pub async fn count_for_quote(&self, quote_id: &str) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM supplier_response WHERE quote_id = ?")
                .bind(quote_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn item_count(&self, response_id: &str) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM response_item WHERE response_id = ?")
                .bind(response_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn total_amount(&self, response_id: &str) -> Result<String, RepositoryError> {
        let row = sqlx::query("SELECT total_amount FROM supplier_response WHERE id = ?")
            .bind(response_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("total_amount"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use cotar_core::domain::quote::QuoteId;
    use cotar_core::domain::response::{SubmissionItem, SupplierResponseSubmission};

    use super::SqlResponseRepository;
    use crate::migrations::run_pending;
    use crate::repositories::token::{SqlTokenRepository, TokenGrant, TokenResolution};
    use crate::repositories::RepositoryError;
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

        pool
    }

    async fn valid_token_id(pool: &DbPool) -> String {
        let tokens = SqlTokenRepository::new(pool.clone());
        let token = tokens
            .issue(TokenGrant {
                quote_id: QuoteId("q-1".to_string()),
                supplier_id: None,
                letter_id: None,
                ttl_days: 7,
            })
            .await
            .expect("issue");

        match tokens.resolve(&token).await.expect("resolve") {
            TokenResolution::Valid(resolved) => resolved.token_id,
            other => panic!("expected valid token, got {other:?}"),
        }
    }

    fn submission() -> SupplierResponseSubmission {
        SupplierResponseSubmission {
            token: "unused-here".to_string(),
            supplier_name: "Hidro Silva".to_string(),
            supplier_email: "contato@hidrosilva.com.br".to_string(),
            total_amount: Decimal::new(2100, 2),
            delivery_days: Some(5),
            shipping_cost: Decimal::ZERO,
            warranty_months: None,
            payment_terms: "30 dias".to_string(),
            notes: String::new(),
            attachment_url: None,
            visit_date: None,
            visit_notes: String::new(),
            items: vec![SubmissionItem {
                product_name: "Tubo PVC".to_string(),
                quantity: 2,
                unit_price: Decimal::new(1050, 2),
                total: Decimal::new(2100, 2),
            }],
        }
    }

    #[tokio::test]
    async fn submit_persists_response_and_items() {
        let pool = pool_with_quote().await;
        let token_id = valid_token_id(&pool).await;
        let repo = SqlResponseRepository::new(pool);

        let response_id = repo.submit("q-1", &token_id, &submission()).await.expect("submit");

        assert_eq!(repo.count_for_quote("q-1").await.expect("count"), 1);
        assert_eq!(repo.item_count(&response_id).await.expect("items"), 1);
        assert_eq!(repo.total_amount(&response_id).await.expect("total"), "21.00");
    }

    #[tokio::test]
    async fn second_submit_on_same_token_conflicts_without_a_duplicate_row() {
        let pool = pool_with_quote().await;
        let token_id = valid_token_id(&pool).await;
        let repo = SqlResponseRepository::new(pool);

        repo.submit("q-1", &token_id, &submission()).await.expect("first submit");
        let second = repo.submit("q-1", &token_id, &submission()).await;

        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
        assert_eq!(repo.count_for_quote("q-1").await.expect("count"), 1);
    }
}
