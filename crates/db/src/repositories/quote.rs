use sqlx::{sqlite::SqliteRow, Row};

use cotar_core::domain::quote::{QuoteId, QuoteItem, QuoteItemId, QuoteSummary};

use super::{decode_date, decode_decimal, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_summary(
        &self,
        id: &QuoteId,
    ) -> Result<Option<QuoteSummary>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                title,
                description,
                client_name,
                client_address,
                requires_visit,
                visit_deadline,
                supplier_id,
                supplier_name
             FROM quote
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(summary_from_row).transpose()
    }

    pub async fn list_items(&self, id: &QuoteId) -> Result<Vec<QuoteItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, product_name, quantity, unit_price
             FROM quote_item
             WHERE quote_id = ?
             ORDER BY position ASC, id ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(item_from_row).collect()
    }
}

fn summary_from_row(row: SqliteRow) -> Result<QuoteSummary, RepositoryError> {
    let visit_deadline = row
        .get::<Option<String>, _>("visit_deadline")
        .map(|raw| decode_date("visit_deadline", &raw))
        .transpose()?;

    Ok(QuoteSummary {
        id: QuoteId(row.get("id")),
        title: row.get("title"),
        description: row.get::<Option<String>, _>("description").unwrap_or_default(),
        client_name: row.get("client_name"),
        client_address: row.get("client_address"),
        requires_visit: row.get::<i64, _>("requires_visit") != 0,
        visit_deadline,
        supplier_id: row.get("supplier_id"),
        supplier_name: row.get("supplier_name"),
    })
}

fn item_from_row(row: SqliteRow) -> Result<QuoteItem, RepositoryError> {
    let raw_price = row.get::<String, _>("unit_price");

    Ok(QuoteItem {
        id: QuoteItemId(row.get("id")),
        product_name: row.get("product_name"),
        quantity: row.get::<i64, _>("quantity").max(0) as u32,
        unit_price: decode_decimal("unit_price", &raw_price)?,
    })
}
