//! Supplier self-registration routes. The wizard steps validate one at a
//! time; completion is atomic and finishes with the dual-path session
//! machine.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use cotar_core::br::normalize_cep;
use cotar_core::domain::session::{establish_session, SessionBundle, SessionOutcome};
use cotar_core::domain::supplier::SupplierId;
use cotar_core::ports::{CepAddress, SessionTokens};
use cotar_core::{RegistrationForm, RegistrationStep, StepValidationError};
use cotar_db::repositories::{AuditEvent, NewSupplier, SqlAuditLog, SqlSupplierRepository};
use uuid::Uuid;

use crate::bootstrap::AppState;
use crate::respond::{link_error, resolve_valid, RespondFailure};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/cep/{cep}", get(lookup_cep))
        .route("/register/{token}/steps/{step}", post(validate_step))
        .route("/register/{token}", post(complete_registration))
}

#[derive(Clone, Debug, Serialize)]
pub struct StepRejection {
    pub field: String,
    pub message: String,
}

fn step_rejection(error: StepValidationError) -> (StatusCode, Json<StepRejection>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(StepRejection { field: error.field, message: error.message }),
    )
}

#[derive(Clone, Debug, Serialize)]
pub struct StepAccepted {
    pub step: RegistrationStep,
    pub next: Option<RegistrationStep>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum StepFailure {
    Link(super::respond::RespondError),
    Step(StepRejection),
}

type StepResult = Result<Json<StepAccepted>, (StatusCode, Json<StepFailure>)>;

fn link_failure(failure: RespondFailure) -> (StatusCode, Json<StepFailure>) {
    let (status, Json(body)) = failure;
    (status, Json(StepFailure::Link(body)))
}

/// Validate a single wizard step against the submitted form. Forward
/// navigation is gated here; going back never re-validates, so there is
/// no backward route.
pub async fn validate_step(
    State(state): State<AppState>,
    Path((token, step)): Path<(String, String)>,
    Json(form): Json<RegistrationForm>,
) -> StepResult {
    resolve_valid(&state, &token).await.map_err(link_failure)?;

    let step: RegistrationStep = step.parse().map_err(|error: StepValidationError| {
        (StatusCode::BAD_REQUEST, Json(StepFailure::Step(StepRejection {
            field: error.field,
            message: error.message,
        })))
    })?;

    form.validate_step(step).map_err(|error| {
        let (status, Json(rejection)) = step_rejection(error);
        (status, Json(StepFailure::Step(rejection)))
    })?;

    Ok(Json(StepAccepted { step, next: step.next() }))
}

#[derive(Clone, Debug, Serialize)]
pub struct CepError {
    pub error: String,
}

/// Address lookup backing step 2. A CEP that does not normalize to 8
/// digits never reaches the remote directory.
pub async fn lookup_cep(
    State(state): State<AppState>,
    Path(cep): Path<String>,
) -> Result<Json<CepAddress>, (StatusCode, Json<CepError>)> {
    let Some(cep) = normalize_cep(&cep) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(CepError { error: "invalid_cep".to_string() }),
        ));
    };

    match state.cep.lookup(&cep).await {
        Ok(Some(address)) => Ok(Json(address)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(CepError { error: "cep_not_found".to_string() }),
        )),
        Err(gateway_error) => {
            warn!(event_name = "register.cep_lookup_failed", error = %gateway_error, "cep directory unavailable");
            Err((
                StatusCode::BAD_GATEWAY,
                Json(CepError { error: "cep_directory_unavailable".to_string() }),
            ))
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub form: RegistrationForm,
    /// Material the auth provider issued alongside the account, if any.
    #[serde(default)]
    pub session_tokens: Option<SessionTokens>,
    #[serde(default)]
    pub temporary_password: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegistrationComplete {
    pub supplier_id: String,
    pub quote_id: String,
    pub session: SessionOutcome,
    /// Where the now-registered supplier should land: the response page
    /// for the quote that invited them.
    pub redirect: String,
}

/// Atomic completion: every step re-validates, the supplier row is
/// written once, and only then is a session attempted. A session failure
/// never unwinds the registration.
pub async fn complete_registration(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<RegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationComplete>), (StatusCode, Json<StepFailure>)> {
    let resolved = resolve_valid(&state, &token).await.map_err(link_failure)?;

    if request.name.trim().is_empty() {
        return Err(contact_rejection("name", "informe o nome da empresa"));
    }
    if request.email.trim().is_empty() {
        return Err(contact_rejection("email", "informe o e-mail de acesso"));
    }
    request.form.validate_all().map_err(|error| {
        let (status, Json(rejection)) = step_rejection(error);
        (status, Json(StepFailure::Step(rejection)))
    })?;

    let supplier_id = SupplierId(Uuid::new_v4().to_string());
    let suppliers = SqlSupplierRepository::new(state.db_pool.clone());
    suppliers
        .insert(NewSupplier {
            id: supplier_id.clone(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            form: request.form,
        })
        .await
        .map_err(|repo_error| {
            error!(event_name = "register.insert_failed", error = %repo_error, "supplier insert failed");
            link_failure(link_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error"))
        })?;

    let quote_id = resolved.quote.id.0.clone();
    let audit = SqlAuditLog::new(state.db_pool.clone());
    let event = AuditEvent::now(
        request.email.trim().to_string(),
        "supplier",
        "supplier_registered",
        "registration",
        json!({ "supplier_id": supplier_id.0 }),
    )
    .for_quote(quote_id.clone());
    if let Err(audit_error) = audit.record(event).await {
        warn!(event_name = "register.audit_write_failed", error = %audit_error, "audit event dropped");
    }

    let bundle = SessionBundle {
        email: request.email.trim().to_string(),
        tokens: request.session_tokens,
        temporary_password: request.temporary_password,
    };
    let session = establish_session(state.sessions.as_ref(), &bundle).await;

    info!(
        event_name = "register.completed",
        supplier_id = %supplier_id.0,
        session_established = !matches!(session, SessionOutcome::ManualLoginRequired),
        "supplier registration completed"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegistrationComplete {
            supplier_id: supplier_id.0,
            redirect: format!("{}/r/{token}", state.public_base_url),
            quote_id,
            session,
        }),
    ))
}

fn contact_rejection(field: &str, message: &str) -> (StatusCode, Json<StepFailure>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(StepFailure::Step(StepRejection {
            field: field.to_string(),
            message: message.to_string(),
        })),
    )
}
