//! Public quote-response surface. Every route is keyed by an opaque
//! single-use token; no supplier login is involved.

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{error, warn};

use cotar_core::domain::letter::{validate_attachment, MAX_ATTACHMENT_BYTES};
use cotar_core::domain::supplier::SupplierId;
use cotar_core::{QuickResponseDraft, QuoteSummary, ResponseItem};
use cotar_db::repositories::{
    AuditEvent, ResolvedToken, SqlAuditLog, SqlResponseRepository, SqlSupplierRepository,
    SqlTokenRepository, SqlUploadRepository, TokenResolution,
};
use cotar_db::RepositoryError;

use crate::bootstrap::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/r/{token}", get(resolve_link))
        .route("/r/{token}/response", post(submit_response))
        .route(
            "/r/{token}/attachment",
            post(upload_attachment)
                .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES as usize + 4096)),
        )
}

#[derive(Clone, Debug, Serialize)]
pub struct RespondError {
    pub valid: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

pub(crate) type RespondFailure = (StatusCode, Json<RespondError>);

pub(crate) fn link_error(status: StatusCode, error: &str) -> RespondFailure {
    (
        status,
        Json(RespondError { valid: false, error: error.to_string(), user_message: None }),
    )
}

fn internal_error(error: &RepositoryError) -> RespondFailure {
    error!(event_name = "respond.repository_error", error = %error, "repository failure");
    link_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
}

/// Resolve a token or map each invalid state to its own status code.
/// A link that never existed is indistinguishable from a broken
/// reference; expiry, revocation, and prior use are each named.
pub(crate) async fn resolve_valid(
    state: &AppState,
    token: &str,
) -> Result<Box<ResolvedToken>, RespondFailure> {
    let tokens = SqlTokenRepository::new(state.db_pool.clone());
    match tokens.resolve(token).await {
        Ok(TokenResolution::Valid(resolved)) => Ok(resolved),
        Ok(TokenResolution::NotFound) => {
            warn!(event_name = "respond.link_not_found", "unknown response token");
            Err(link_error(StatusCode::NOT_FOUND, "link_not_found"))
        }
        Ok(TokenResolution::Expired) => Err(link_error(StatusCode::GONE, "link_expired")),
        Ok(TokenResolution::Revoked) => Err(link_error(StatusCode::GONE, "link_revoked")),
        Ok(TokenResolution::AlreadyUsed) => {
            Err(link_error(StatusCode::CONFLICT, "link_already_used"))
        }
        Err(error) => Err(internal_error(&error)),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SupplierPrefill {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RespondPage {
    pub valid: bool,
    pub token: String,
    pub quote: QuoteSummary,
    pub items: Vec<ResponseItem>,
    pub supplier: Option<SupplierPrefill>,
}

pub async fn resolve_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<RespondPage>, RespondFailure> {
    let resolved = resolve_valid(&state, &token).await?;
    let supplier = prefill(&state, &resolved).await;

    Ok(Json(RespondPage {
        valid: true,
        token: resolved.token.clone(),
        items: resolved.items.iter().map(ResponseItem::from_quote_item).collect(),
        supplier,
        quote: resolved.quote,
    }))
}

/// Pre-fill cascade: the token's own supplier record, then the quote's
/// supplier reference, then the free-text supplier name. First hit wins.
async fn prefill(state: &AppState, resolved: &ResolvedToken) -> Option<SupplierPrefill> {
    if let Some(supplier) = &resolved.supplier {
        return Some(SupplierPrefill { name: supplier.name.clone(), email: supplier.email.clone() });
    }

    if let Some(supplier_id) = &resolved.quote.supplier_id {
        let found = SqlSupplierRepository::new(state.db_pool.clone())
            .find_by_id(&SupplierId(supplier_id.clone()))
            .await;
        match found {
            Ok(Some(supplier)) => {
                return Some(SupplierPrefill { name: supplier.name, email: supplier.email });
            }
            Ok(None) => {}
            Err(error) => {
                warn!(event_name = "respond.prefill_lookup_failed", error = %error, "supplier lookup failed, falling back to quote name");
            }
        }
    }

    resolved
        .quote
        .supplier_name
        .as_ref()
        .map(|name| SupplierPrefill { name: name.clone(), email: String::new() })
}

#[derive(Clone, Debug, Serialize)]
pub struct SubmissionReceipt {
    pub response_id: String,
    pub total_amount: String,
}

pub async fn submit_response(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(draft): Json<QuickResponseDraft>,
) -> Result<(StatusCode, Json<SubmissionReceipt>), RespondFailure> {
    let resolved = resolve_valid(&state, &token).await?;

    if let Err(validation) = draft.validate(&resolved.quote) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RespondError {
                valid: false,
                error: validation.to_string(),
                user_message: Some(validation.user_message()),
            }),
        ));
    }

    let submission = draft.into_submission(&resolved.token);
    let quote_id = resolved.quote.id.0.clone();
    let responses = SqlResponseRepository::new(state.db_pool.clone());

    match responses.submit(&quote_id, &resolved.token_id, &submission).await {
        Ok(response_id) => {
            record_audit(
                &state,
                AuditEvent::now(
                    submission.supplier_email.clone(),
                    "supplier",
                    "response_submitted",
                    "response",
                    json!({
                        "response_id": &response_id,
                        "total_amount": submission.total_amount.to_string(),
                        "item_count": submission.items.len(),
                    }),
                )
                .for_quote(quote_id),
            )
            .await;

            Ok((
                StatusCode::CREATED,
                Json(SubmissionReceipt {
                    response_id,
                    total_amount: submission.total_amount.to_string(),
                }),
            ))
        }
        Err(RepositoryError::Conflict(detail)) => {
            record_audit(
                &state,
                AuditEvent::now(
                    submission.supplier_email.clone(),
                    "supplier",
                    "response_conflict",
                    "response",
                    json!({ "detail": detail }),
                )
                .for_quote(quote_id),
            )
            .await;

            Err(link_error(StatusCode::CONFLICT, "link_already_used"))
        }
        Err(error) => Err(internal_error(&error)),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AttachmentReceipt {
    pub url: String,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Raw-body upload: the file name travels in `x-file-name`, the MIME type
/// in `content-type`. Stored artifacts start orphaned until a submission
/// claims them.
pub async fn upload_attachment(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<AttachmentReceipt>), RespondFailure> {
    resolve_valid(&state, &token).await?;

    let Some(file_name) = header_text(&headers, "x-file-name") else {
        return Err(link_error(StatusCode::BAD_REQUEST, "missing_file_name"));
    };
    let Some(content_type) = header_text(&headers, header::CONTENT_TYPE.as_str()) else {
        return Err(link_error(StatusCode::BAD_REQUEST, "missing_content_type"));
    };

    if let Err(validation) = validate_attachment(&file_name, &content_type, body.len() as u64) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RespondError {
                valid: false,
                error: validation.to_string(),
                user_message: Some(validation.user_message()),
            }),
        ));
    }

    let stored = match state.attachments.store(&file_name, &content_type, &body).await {
        Ok(stored) => stored,
        Err(error) => {
            error!(event_name = "respond.attachment_store_failed", error = %error, "attachment storage failure");
            return Err(link_error(StatusCode::BAD_GATEWAY, "storage_unavailable"));
        }
    };

    if let Err(error) = SqlUploadRepository::new(state.db_pool.clone()).record(&stored).await {
        // An untracked blob would never be swept; drop it again.
        let _ = state.attachments.discard(&stored.id).await;
        return Err(internal_error(&error));
    }

    Ok((
        StatusCode::CREATED,
        Json(AttachmentReceipt {
            url: stored.url,
            file_name: stored.file_name,
            size_bytes: stored.size_bytes,
        }),
    ))
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn record_audit(state: &AppState, event: AuditEvent) {
    if let Err(error) = SqlAuditLog::new(state.db_pool.clone()).record(event).await {
        warn!(event_name = "respond.audit_write_failed", error = %error, "audit event dropped");
    }
}
