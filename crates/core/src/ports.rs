//! Ports for external collaborators. Implementations live in `cotar-gateway`;
//! handlers receive these as injected trait objects, never as ambient globals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::eligibility::{EligibilityResult, RequiredDocument};
use crate::domain::supplier::{ClientId, SupplierId};

#[derive(Clone, Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("remote service rejected the request: {0}")]
    Remote(String),
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

/// Document eligibility service. The actual document-state lookup is remote;
/// callers only build the request and interpret the contract.
#[async_trait]
pub trait EligibilityGateway: Send + Sync {
    /// Evaluate one supplier against a required-document set. Implementations
    /// degrade to a `NotChecked` result on transport or server errors instead
    /// of failing, and never retry.
    async fn evaluate(
        &self,
        supplier_id: &SupplierId,
        client_id: &ClientId,
        required_documents: &[RequiredDocument],
    ) -> EligibilityResult;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepAddress {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// Public postal-code lookup keyed by an 8-digit CEP.
#[async_trait]
pub trait CepLookup: Send + Sync {
    /// `cep` must already be normalized to 8 digits. `Ok(None)` means the
    /// code is unknown to the remote directory.
    async fn lookup(&self, cep: &str) -> Result<Option<CepAddress>, GatewayError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub id: String,
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Blob storage for proposal and letter attachments.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredAttachment, GatewayError>;

    /// Discard a previously stored artifact (partial-failure cleanup).
    async fn discard(&self, id: &str) -> Result<(), GatewayError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Auth provider session surface used after supplier self-registration.
#[async_trait]
pub trait SessionPort: Send + Sync {
    /// Establish a session directly from provider-issued tokens.
    async fn set_session(&self, tokens: &SessionTokens) -> Result<(), GatewayError>;

    /// Password sign-in fallback using a provider-issued temporary password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionTokens, GatewayError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformBalance {
    pub available: Decimal,
    pub held_in_escrow: Decimal,
    pub pending_transfers: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowReleaseStatus {
    Released,
    AlreadyReleased,
    Pending,
    Failed,
}

/// Escrow processor holding client funds until delivery confirmation.
#[async_trait]
pub trait EscrowGateway: Send + Sync {
    async fn platform_balance(&self) -> Result<PlatformBalance, GatewayError>;
    async fn release_payment(&self, payment_id: &str) -> Result<EscrowReleaseStatus, GatewayError>;
}
