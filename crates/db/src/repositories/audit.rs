use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use super::{decode_timestamp, encode_timestamp, RepositoryError};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub actor_type: String,
    pub quote_id: Option<String>,
    pub event_type: String,
    pub event_category: String,
    pub payload: Value,
}

impl AuditEvent {
    pub fn now(
        actor: impl Into<String>,
        actor_type: impl Into<String>,
        event_type: impl Into<String>,
        event_category: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            actor: actor.into(),
            actor_type: actor_type.into(),
            quote_id: None,
            event_type: event_type.into(),
            event_category: event_category.into(),
            payload,
        }
    }

    pub fn for_quote(mut self, quote_id: impl Into<String>) -> Self {
        self.quote_id = Some(quote_id.into());
        self
    }
}

/// Append-only audit trail. Nothing updates or deletes these rows.
pub struct SqlAuditLog {
    pool: DbPool,
}

impl SqlAuditLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO audit_event (
                id, timestamp, actor, actor_type, quote_id,
                event_type, event_category, payload_json
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(encode_timestamp(event.timestamp))
        .bind(&event.actor)
        .bind(&event.actor_type)
        .bind(&event.quote_id)
        .bind(&event.event_type)
        .bind(&event.event_category)
        .bind(event.payload.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_for_quote(&self, quote_id: &str) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, actor, actor_type, quote_id, event_type, event_category, payload_json
             FROM audit_event
             WHERE quote_id = ?
             ORDER BY timestamp ASC",
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let raw_payload = row.get::<String, _>("payload_json");
    let payload = serde_json::from_str(&raw_payload)
        .map_err(|error| RepositoryError::Decode(format!("payload_json: {error}")))?;

    Ok(AuditEvent {
        id: row.get("id"),
        timestamp: decode_timestamp("timestamp", &row.get::<String, _>("timestamp"))?,
        actor: row.get("actor"),
        actor_type: row.get("actor_type"),
        quote_id: row.get("quote_id"),
        event_type: row.get("event_type"),
        event_category: row.get("event_category"),
        payload,
    })
}
