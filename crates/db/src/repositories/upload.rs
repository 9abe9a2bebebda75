use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use cotar_core::ports::StoredAttachment;

use super::{encode_timestamp, RepositoryError};
use crate::DbPool;

/// Tracks uploaded files from the moment they land on disk. A file starts
/// orphaned and is claimed by the submission that references it; sweeps
/// can then reclaim storage for uploads whose response never arrived.
pub struct SqlUploadRepository {
    pool: DbPool,
}

impl SqlUploadRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, stored: &StoredAttachment) -> Result<String, RepositoryError> {
        // The storage-side id doubles as the tracking id.
        let id =
            if stored.id.is_empty() { Uuid::new_v4().to_string() } else { stored.id.clone() };

        sqlx::query(
            "INSERT INTO upload_artifact (id, url, file_name, content_type, size_bytes, response_id, orphaned, created_at)
             VALUES (?, ?, ?, ?, ?, NULL, 1, ?)",
        )
        .bind(&id)
        .bind(&stored.url)
        .bind(&stored.file_name)
        .bind(&stored.content_type)
        .bind(stored.size_bytes as i64)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn list_orphaned_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT url FROM upload_artifact WHERE orphaned = 1 AND created_at < ? ORDER BY created_at ASC",
        )
        .bind(encode_timestamp(cutoff))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row: SqliteRow| row.get("url")).collect())
    }

    pub async fn forget(&self, url: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM upload_artifact WHERE url = ? AND orphaned = 1")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
