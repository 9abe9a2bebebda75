use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use cotar_core::domain::eligibility::RequiredDocument;
use cotar_core::domain::letter::{InvitationLetterDraft, LetterAttachment, LetterMode};

use super::{decode_date, decode_timestamp, encode_date, encode_timestamp, RepositoryError};
use crate::DbPool;

/// Persisted letter with its child rows loaded.
#[derive(Clone, Debug)]
pub struct LetterRecord {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub deadline: chrono::NaiveDate,
    pub mode: LetterMode,
    pub category: Option<String>,
    pub quote_id: Option<String>,
    pub status: String,
    pub required_documents: Vec<RequiredDocument>,
    pub supplier_ids: Vec<String>,
    pub direct_emails: Vec<String>,
    pub attachments: Vec<LetterAttachment>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

pub struct SqlLetterRepository {
    pool: DbPool,
}

impl SqlLetterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a validated draft with its documents, recipients, and
    /// attachments in one transaction. Returns the letter id.
    pub async fn create(&self, draft: &InvitationLetterDraft) -> Result<String, RepositoryError> {
        let letter_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let deadline = draft
            .deadline
            .ok_or_else(|| RepositoryError::Decode("draft has no deadline".to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO invitation_letter (
                id, client_id, title, description, deadline,
                mode, category, quote_id, status, created_at, sent_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'draft', ?, NULL)",
        )
        .bind(&letter_id)
        .bind(&draft.client_id.0)
        .bind(draft.title.trim())
        .bind(draft.description.trim())
        .bind(encode_date(deadline))
        .bind(mode_str(draft.mode))
        .bind(draft.category.map(|category| category.as_str().to_string()))
        .bind(draft.quote_id.as_ref().map(|quote_id| quote_id.0.clone()))
        .bind(encode_timestamp(now))
        .execute(&mut *tx)
        .await?;

        for (position, document) in draft.required_documents.iter().enumerate() {
            sqlx::query(
                "INSERT INTO letter_required_document (letter_id, doc_type, label, mandatory, position)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&letter_id)
            .bind(&document.doc_type)
            .bind(&document.label)
            .bind(document.mandatory as i64)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        for supplier_id in &draft.supplier_ids {
            sqlx::query(
                "INSERT INTO letter_recipient (id, letter_id, supplier_id, email, created_at)
                 VALUES (?, ?, ?, NULL, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&letter_id)
            .bind(&supplier_id.0)
            .bind(encode_timestamp(now))
            .execute(&mut *tx)
            .await?;
        }

        for email in &draft.direct_emails {
            sqlx::query(
                "INSERT INTO letter_recipient (id, letter_id, supplier_id, email, created_at)
                 VALUES (?, ?, NULL, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&letter_id)
            .bind(email)
            .bind(encode_timestamp(now))
            .execute(&mut *tx)
            .await?;
        }

        for attachment in &draft.attachments {
            sqlx::query(
                "INSERT INTO letter_attachment (id, letter_id, file_name, content_type, size_bytes, url)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&letter_id)
            .bind(&attachment.file_name)
            .bind(&attachment.content_type)
            .bind(attachment.size_bytes as i64)
            .bind(attachment.url.clone().unwrap_or_default())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(letter_id)
    }

    pub async fn find(&self, letter_id: &str) -> Result<Option<LetterRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, client_id, title, description, deadline, mode, category,
                    quote_id, status, created_at, sent_at
             FROM invitation_letter
             WHERE id = ?",
        )
        .bind(letter_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = record_from_row(row)?;

        let documents = sqlx::query(
            "SELECT doc_type, label, mandatory
             FROM letter_required_document
             WHERE letter_id = ?
             ORDER BY position ASC",
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;
        record.required_documents = documents
            .into_iter()
            .map(|row| RequiredDocument {
                doc_type: row.get("doc_type"),
                label: row.get("label"),
                mandatory: row.get::<i64, _>("mandatory") != 0,
            })
            .collect();

        let recipients = sqlx::query(
            "SELECT supplier_id, email FROM letter_recipient WHERE letter_id = ? ORDER BY created_at ASC",
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;
        for recipient in recipients {
            if let Some(supplier_id) = recipient.get::<Option<String>, _>("supplier_id") {
                record.supplier_ids.push(supplier_id);
            } else if let Some(email) = recipient.get::<Option<String>, _>("email") {
                record.direct_emails.push(email);
            }
        }

        let attachments = sqlx::query(
            "SELECT file_name, content_type, size_bytes, url
             FROM letter_attachment
             WHERE letter_id = ?
             ORDER BY id ASC",
        )
        .bind(letter_id)
        .fetch_all(&self.pool)
        .await?;
        record.attachments = attachments
            .into_iter()
            .map(|row| LetterAttachment {
                file_name: row.get("file_name"),
                content_type: row.get("content_type"),
                size_bytes: row.get::<i64, _>("size_bytes").max(0) as u64,
                url: Some(row.get("url")),
            })
            .collect();

        Ok(Some(record))
    }

    /// Flip a draft to sent. Idempotent in effect: a second call finds no
    /// draft row and reports false.
    pub async fn mark_dispatched(&self, letter_id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE invitation_letter SET status = 'sent', sent_at = ? WHERE id = ? AND status = 'draft'",
        )
        .bind(encode_timestamp(Utc::now()))
        .bind(letter_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn mode_str(mode: LetterMode) -> &'static str {
    match mode {
        LetterMode::Standalone => "standalone",
        LetterMode::Linked => "linked",
    }
}

fn record_from_row(row: SqliteRow) -> Result<LetterRecord, RepositoryError> {
    let mode = match row.get::<String, _>("mode").as_str() {
        "linked" => LetterMode::Linked,
        _ => LetterMode::Standalone,
    };

    let sent_at = row
        .get::<Option<String>, _>("sent_at")
        .map(|raw| decode_timestamp("sent_at", &raw))
        .transpose()?;

    Ok(LetterRecord {
        id: row.get("id"),
        client_id: row.get("client_id"),
        title: row.get("title"),
        description: row.get("description"),
        deadline: decode_date("deadline", &row.get::<String, _>("deadline"))?,
        mode,
        category: row.get("category"),
        quote_id: row.get("quote_id"),
        status: row.get("status"),
        required_documents: Vec::new(),
        supplier_ids: Vec::new(),
        direct_emails: Vec::new(),
        attachments: Vec::new(),
        created_at: decode_timestamp("created_at", &row.get::<String, _>("created_at"))?,
        sent_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use cotar_core::domain::letter::{InvitationLetterDraft, LetterCategory, LetterMode};
    use cotar_core::domain::supplier::ClientId;

    use super::SqlLetterRepository;
    use crate::migrations::run_pending;
    use crate::{connect_with_settings, DbPool};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        pool
    }

    fn standalone_draft() -> InvitationLetterDraft {
        let mut draft = InvitationLetterDraft::new(ClientId("client-1".to_string()));
        draft.set_mode(LetterMode::Standalone);
        draft.select_category(LetterCategory::Limpeza);
        draft.title = "Limpeza pós-obra".to_string();
        draft.description = "Serviço completo para torre B.".to_string();
        draft.deadline = NaiveDate::from_ymd_opt(2026, 10, 1);
        draft.set_direct_emails("a@ex.com, b@ex.com");
        draft
    }

    #[tokio::test]
    async fn create_then_find_round_trips_children() {
        let pool = migrated_pool().await;
        let repo = SqlLetterRepository::new(pool);

        let draft = standalone_draft();
        let expected_docs = draft.required_documents.len();
        assert!(expected_docs > 0, "category selection should suggest documents");

        let letter_id = repo.create(&draft).await.expect("create");
        let record = repo.find(&letter_id).await.expect("find").expect("letter exists");

        assert_eq!(record.title, "Limpeza pós-obra");
        assert_eq!(record.status, "draft");
        assert_eq!(record.category.as_deref(), Some("limpeza"));
        assert_eq!(record.required_documents.len(), expected_docs);
        assert_eq!(record.direct_emails, vec!["a@ex.com", "b@ex.com"]);
        assert!(record.supplier_ids.is_empty());
        assert!(record.sent_at.is_none());
    }

    #[tokio::test]
    async fn dispatch_flips_status_once() {
        let pool = migrated_pool().await;
        let repo = SqlLetterRepository::new(pool);

        let letter_id = repo.create(&standalone_draft()).await.expect("create");

        assert!(repo.mark_dispatched(&letter_id).await.expect("first dispatch"));
        assert!(!repo.mark_dispatched(&letter_id).await.expect("second dispatch"));

        let record = repo.find(&letter_id).await.expect("find").expect("letter exists");
        assert_eq!(record.status, "sent");
        assert!(record.sent_at.is_some());
    }
}
