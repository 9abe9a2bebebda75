use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;

use cotar_core::config::EscrowConfig;
use cotar_core::ports::{EscrowGateway, EscrowReleaseStatus, GatewayError, PlatformBalance};

/// Escrow processor client. Amounts arrive as decimal strings and are
/// parsed strictly; a malformed amount is a decode error, never zero.
pub struct HttpEscrowGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct BalanceResponse {
    available: String,
    held_in_escrow: String,
    pending_transfers: String,
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ReleaseResponse {
    status: String,
}

impl HttpEscrowGateway {
    /// Returns `None` when escrow is disabled or unconfigured.
    pub fn from_config(config: &EscrowConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let base_url = config.base_url.as_ref()?;
        let api_key = config.api_key.as_ref()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_default();

        Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.expose_secret().to_string(),
        })
    }

    fn parse_amount(field: &str, raw: &str) -> Result<Decimal, GatewayError> {
        raw.parse::<Decimal>()
            .map_err(|_| GatewayError::Decode(format!("field `{field}` holds non-decimal `{raw}`")))
    }
}

#[async_trait]
impl EscrowGateway for HttpEscrowGateway {
    async fn platform_balance(&self) -> Result<PlatformBalance, GatewayError> {
        let url = format!("{}/v1/platform/balance", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Remote(format!(
                "balance request rejected with {}",
                response.status()
            )));
        }

        let payload: BalanceResponse =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        Ok(PlatformBalance {
            available: Self::parse_amount("available", &payload.available)?,
            held_in_escrow: Self::parse_amount("held_in_escrow", &payload.held_in_escrow)?,
            pending_transfers: Self::parse_amount(
                "pending_transfers",
                &payload.pending_transfers,
            )?,
            updated_at: payload.updated_at,
        })
    }

    async fn release_payment(&self, payment_id: &str) -> Result<EscrowReleaseStatus, GatewayError> {
        let url = format!("{}/v1/payments/{payment_id}/release", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        // 409 means the processor already released this payment.
        if response.status().as_u16() == 409 {
            return Ok(EscrowReleaseStatus::AlreadyReleased);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Remote(format!(
                "release rejected with {}",
                response.status()
            )));
        }

        let payload: ReleaseResponse =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        Ok(match payload.status.as_str() {
            "released" => EscrowReleaseStatus::Released,
            "already_released" => EscrowReleaseStatus::AlreadyReleased,
            "pending" => EscrowReleaseStatus::Pending,
            _ => EscrowReleaseStatus::Failed,
        })
    }
}
