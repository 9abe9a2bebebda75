//! Handler-test fixtures: in-memory pools, seeded rows, and scripted port
//! implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use cotar_core::domain::eligibility::{EligibilityResult, EligibilityStatus, RequiredDocument};
use cotar_core::domain::supplier::{ClientId, SupplierId};
use cotar_core::ports::{
    AttachmentStore, CepAddress, CepLookup, EligibilityGateway, EscrowGateway,
    EscrowReleaseStatus, GatewayError, PlatformBalance, SessionPort, SessionTokens,
    StoredAttachment,
};
use cotar_core::QuoteId;
use cotar_db::migrations::run_pending;
use cotar_db::repositories::{SqlTokenRepository, TokenGrant};
use cotar_db::{connect_with_settings, DbPool};

use crate::bootstrap::AppState;

/// Eligibility scripted by supplier-id prefix: `ok-` is eligible, `pend-`
/// pending, `no-` ineligible, anything else not checked.
pub struct KeyedEligibility;

#[async_trait]
impl EligibilityGateway for KeyedEligibility {
    async fn evaluate(
        &self,
        supplier_id: &SupplierId,
        _client_id: &ClientId,
        _required_documents: &[RequiredDocument],
    ) -> EligibilityResult {
        let status = if supplier_id.0.starts_with("ok-") {
            EligibilityStatus::Eligible
        } else if supplier_id.0.starts_with("pend-") {
            EligibilityStatus::Pending
        } else if supplier_id.0.starts_with("no-") {
            EligibilityStatus::Ineligible
        } else {
            EligibilityStatus::NotChecked
        };
        EligibilityResult { status, ..EligibilityResult::not_checked("scripted") }
    }
}

pub struct StaticCep(pub Option<CepAddress>);

#[async_trait]
impl CepLookup for StaticCep {
    async fn lookup(&self, _cep: &str) -> Result<Option<CepAddress>, GatewayError> {
        Ok(self.0.clone())
    }
}

pub struct FailingCep;

#[async_trait]
impl CepLookup for FailingCep {
    async fn lookup(&self, _cep: &str) -> Result<Option<CepAddress>, GatewayError> {
        Err(GatewayError::Transport("connection refused".to_string()))
    }
}

/// Storage that never touches disk; URLs mirror the filesystem layout.
pub struct MemoryAttachments;

#[async_trait]
impl AttachmentStore for MemoryAttachments {
    async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredAttachment, GatewayError> {
        let id = Uuid::new_v4().simple().to_string();
        Ok(StoredAttachment {
            url: format!("/uploads/{id}-{file_name}"),
            id,
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }

    async fn discard(&self, _id: &str) -> Result<(), GatewayError> {
        Ok(())
    }
}

pub struct ScriptedSessions {
    pub direct_ok: bool,
    pub password_ok: bool,
}

#[async_trait]
impl SessionPort for ScriptedSessions {
    async fn set_session(&self, _tokens: &SessionTokens) -> Result<(), GatewayError> {
        if self.direct_ok {
            Ok(())
        } else {
            Err(GatewayError::Remote("session rejected".to_string()))
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> Result<SessionTokens, GatewayError> {
        if self.password_ok {
            Ok(SessionTokens {
                access_token: format!("access-{email}"),
                refresh_token: "refresh-fallback".to_string(),
            })
        } else {
            Err(GatewayError::Remote("invalid credentials".to_string()))
        }
    }
}

pub struct StaticEscrow;

#[async_trait]
impl EscrowGateway for StaticEscrow {
    async fn platform_balance(&self) -> Result<PlatformBalance, GatewayError> {
        Ok(PlatformBalance {
            available: Decimal::new(150_000, 2),
            held_in_escrow: Decimal::new(42_000, 2),
            pending_transfers: Decimal::ZERO,
            updated_at: Utc::now(),
        })
    }

    async fn release_payment(
        &self,
        _payment_id: &str,
    ) -> Result<EscrowReleaseStatus, GatewayError> {
        Ok(EscrowReleaseStatus::Released)
    }
}

pub fn state(pool: DbPool) -> AppState {
    AppState {
        db_pool: pool,
        eligibility: Arc::new(KeyedEligibility),
        cep: Arc::new(StaticCep(Some(CepAddress {
            street: "Avenida Paulista".to_string(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
        }))),
        attachments: Arc::new(MemoryAttachments),
        sessions: Arc::new(ScriptedSessions { direct_ok: true, password_ok: true }),
        escrow: None,
        public_base_url: "http://localhost:8080".to_string(),
    }
}

pub async fn migrated_state() -> AppState {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    state(pool)
}

pub async fn seed_quote(pool: &DbPool, id: &str, requires_visit: bool, supplier_name: Option<&str>) {
    sqlx::query(
        "INSERT INTO quote (id, client_name, title, description, supplier_name, requires_visit, status, created_at, updated_at)
         VALUES (?1, 'Condomínio Jardim', 'Material hidráulico', '', ?2, ?3, 'open', ?4, ?4)",
    )
    .bind(id)
    .bind(supplier_name)
    .bind(requires_visit as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await
    .expect("seed quote");
}

pub async fn seed_quote_item(pool: &DbPool, quote_id: &str, name: &str, quantity: i64, price: &str) {
    sqlx::query(
        "INSERT INTO quote_item (id, quote_id, product_name, quantity, unit_price, position)
         VALUES (?, ?, ?, ?, ?, 0)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(quote_id)
    .bind(name)
    .bind(quantity)
    .bind(price)
    .execute(pool)
    .await
    .expect("seed quote item");
}

pub async fn seed_supplier(pool: &DbPool, id: &str, name: &str, email: &str) {
    sqlx::query("INSERT INTO supplier (id, name, email, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .expect("seed supplier");
}

pub async fn issue_token(pool: &DbPool, quote_id: &str) -> String {
    SqlTokenRepository::new(pool.clone())
        .issue(TokenGrant {
            quote_id: QuoteId(quote_id.to_string()),
            supplier_id: None,
            letter_id: None,
            ttl_days: 7,
        })
        .await
        .expect("issue token")
}
