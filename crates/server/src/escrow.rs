//! Admin liquidity surface: thin orchestration over the escrow processor.
//! When escrow is disabled by configuration both routes answer 503.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use cotar_core::ports::{EscrowGateway, EscrowReleaseStatus, GatewayError, PlatformBalance};
use cotar_db::repositories::{AuditEvent, SqlAuditLog};

use crate::bootstrap::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/admin/balance", get(platform_balance))
        .route("/api/v1/admin/escrow/{payment_id}/release", post(release_payment))
}

#[derive(Clone, Debug, Serialize)]
pub struct EscrowError {
    pub error: String,
}

type EscrowFailure = (StatusCode, Json<EscrowError>);

fn escrow_error(status: StatusCode, error: &str) -> EscrowFailure {
    (status, Json(EscrowError { error: error.to_string() }))
}

fn require_gateway(state: &AppState) -> Result<&dyn EscrowGateway, EscrowFailure> {
    state
        .escrow
        .as_deref()
        .ok_or_else(|| escrow_error(StatusCode::SERVICE_UNAVAILABLE, "escrow_disabled"))
}

fn upstream_error(error: &GatewayError) -> EscrowFailure {
    warn!(event_name = "escrow.gateway_error", error = %error, "escrow processor call failed");
    escrow_error(StatusCode::BAD_GATEWAY, "escrow_unavailable")
}

pub async fn platform_balance(
    State(state): State<AppState>,
) -> Result<Json<PlatformBalance>, EscrowFailure> {
    let gateway = require_gateway(&state)?;
    let balance = gateway.platform_balance().await.map_err(|error| upstream_error(&error))?;
    Ok(Json(balance))
}

#[derive(Clone, Debug, Serialize)]
pub struct ReleaseReceipt {
    pub payment_id: String,
    pub status: EscrowReleaseStatus,
}

pub async fn release_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<ReleaseReceipt>, EscrowFailure> {
    let gateway = require_gateway(&state)?;
    let status =
        gateway.release_payment(&payment_id).await.map_err(|error| upstream_error(&error))?;

    info!(
        event_name = "escrow.release_requested",
        payment_id = %payment_id,
        status = ?status,
        "escrow release forwarded to processor"
    );

    let event = AuditEvent::now(
        "admin",
        "admin",
        "escrow_release",
        "escrow",
        json!({ "payment_id": &payment_id, "status": &status }),
    );
    if let Err(error) = SqlAuditLog::new(state.db_pool.clone()).record(event).await {
        warn!(event_name = "escrow.audit_write_failed", error = %error, "audit event dropped");
    }

    Ok(Json(ReleaseReceipt { payment_id, status }))
}
