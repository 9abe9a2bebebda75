//! Invitation letter API: draft creation, dispatch with one response token
//! per recipient, category document suggestions, and the eligibility
//! roll-up used before sending.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use cotar_core::domain::eligibility::EligibilityStatus;
use cotar_core::domain::letter::LetterMode;
use cotar_core::domain::supplier::{ClientId, SupplierId};
use cotar_core::{
    EligibilityResult, EligibilitySummary, InvitationLetterDraft, LetterAttachment,
    LetterCategory, QuoteId, RequiredDocument,
};
use cotar_db::repositories::{
    AuditEvent, LetterRecord, SqlAuditLog, SqlLetterRepository, SqlQuoteRepository,
    SqlTokenRepository, TokenGrant,
};
use cotar_db::RepositoryError;

use crate::bootstrap::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/letters", post(create_letter))
        .route("/api/v1/letters/{id}", get(get_letter))
        .route("/api/v1/letters/{id}/dispatch", post(dispatch_letter))
        .route("/api/v1/letters/categories/{category}/documents", get(category_documents))
        .route("/api/v1/letters/eligibility", post(evaluate_eligibility))
}

#[derive(Clone, Debug, Serialize)]
pub struct LetterError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
}

type LetterFailure = (StatusCode, Json<LetterError>);

fn letter_error(status: StatusCode, error: &str) -> LetterFailure {
    (status, Json(LetterError { error: error.to_string(), user_message: None }))
}

fn internal_error(error: &RepositoryError) -> LetterFailure {
    error!(event_name = "letters.repository_error", error = %error, "repository failure");
    letter_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
}

/// One minted token per recipient, with the public link the letter
/// delivery channel should embed.
#[derive(Clone, Debug, Serialize)]
pub struct DispatchedToken {
    pub recipient: String,
    pub token: String,
    pub url: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LetterCreated {
    pub letter_id: String,
    pub status: &'static str,
    pub tokens: Vec<DispatchedToken>,
}

pub async fn create_letter(
    State(state): State<AppState>,
    Json(mut draft): Json<InvitationLetterDraft>,
) -> Result<(StatusCode, Json<LetterCreated>), LetterFailure> {
    // A category with no explicit document list falls back to the
    // suggestion table.
    if draft.required_documents.is_empty() {
        if let Some(category) = draft.category {
            draft.required_documents = category.suggested_documents();
        }
    }

    if let Err(validation) = draft.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(LetterError {
                error: validation.to_string(),
                user_message: Some(validation.user_message()),
            }),
        ));
    }

    // A linked draft must point at a real quote; dispatch mints tokens
    // against it later and a dangling reference would only surface there.
    if let Some(quote_id) = &draft.quote_id {
        let found = SqlQuoteRepository::new(state.db_pool.clone())
            .find_summary(quote_id)
            .await
            .map_err(|error| internal_error(&error))?;
        if found.is_none() {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(LetterError {
                    error: "quote_not_found".to_string(),
                    user_message: Some("A cotação vinculada não foi encontrada.".to_string()),
                }),
            ));
        }
    }

    let letters = SqlLetterRepository::new(state.db_pool.clone());
    let letter_id = letters.create(&draft).await.map_err(|error| internal_error(&error))?;

    info!(
        event_name = "letters.created",
        letter_id = %letter_id,
        recipients = draft.supplier_ids.len() + draft.direct_emails.len(),
        "invitation letter draft persisted"
    );

    let mut created = LetterCreated { letter_id: letter_id.clone(), status: "draft", tokens: Vec::new() };
    if draft.send_immediately {
        created.tokens = dispatch(&state, &letter_id).await?;
        created.status = "sent";
    }

    Ok((StatusCode::CREATED, Json(created)))
}

/// Persisted letter plus the tokens already minted for it.
#[derive(Clone, Debug, Serialize)]
pub struct LetterView {
    pub id: String,
    pub client_id: String,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDate,
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
    pub tokens: Vec<String>,
}

pub async fn get_letter(
    State(state): State<AppState>,
    Path(letter_id): Path<String>,
) -> Result<Json<LetterView>, LetterFailure> {
    let letters = SqlLetterRepository::new(state.db_pool.clone());
    let record = letters
        .find(&letter_id)
        .await
        .map_err(|error| internal_error(&error))?
        .ok_or_else(|| letter_error(StatusCode::NOT_FOUND, "letter_not_found"))?;

    let tokens = SqlTokenRepository::new(state.db_pool.clone())
        .list_for_letter(&letter_id)
        .await
        .map_err(|error| internal_error(&error))?;

    Ok(Json(view_from_record(record, tokens)))
}

fn view_from_record(record: LetterRecord, tokens: Vec<String>) -> LetterView {
    LetterView {
        id: record.id,
        client_id: record.client_id,
        title: record.title,
        description: record.description,
        deadline: record.deadline,
        mode: record.mode,
        category: record.category,
        quote_id: record.quote_id,
        status: record.status,
        required_documents: record.required_documents,
        supplier_ids: record.supplier_ids,
        direct_emails: record.direct_emails,
        attachments: record.attachments,
        created_at: record.created_at,
        sent_at: record.sent_at,
        tokens,
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DispatchReceipt {
    pub letter_id: String,
    pub status: &'static str,
    pub tokens: Vec<DispatchedToken>,
}

pub async fn dispatch_letter(
    State(state): State<AppState>,
    Path(letter_id): Path<String>,
) -> Result<Json<DispatchReceipt>, LetterFailure> {
    let tokens = dispatch(&state, &letter_id).await?;
    Ok(Json(DispatchReceipt { letter_id, status: "sent", tokens }))
}

/// Flip the letter to sent and mint one token per recipient. Tokens only
/// exist for quote-linked letters; a standalone letter invites suppliers
/// to register instead of responding to a quote.
async fn dispatch(state: &AppState, letter_id: &str) -> Result<Vec<DispatchedToken>, LetterFailure> {
    let letters = SqlLetterRepository::new(state.db_pool.clone());
    let record = letters
        .find(letter_id)
        .await
        .map_err(|error| internal_error(&error))?
        .ok_or_else(|| letter_error(StatusCode::NOT_FOUND, "letter_not_found"))?;

    if !letters.mark_dispatched(letter_id).await.map_err(|error| internal_error(&error))? {
        return Err(letter_error(StatusCode::CONFLICT, "letter_already_sent"));
    }

    let mut dispatched = Vec::new();
    if let Some(quote_id) = &record.quote_id {
        let tokens = SqlTokenRepository::new(state.db_pool.clone());
        let ttl_days = (record.deadline - Utc::now().date_naive()).num_days().max(1);

        for supplier_id in &record.supplier_ids {
            let token = tokens
                .issue(TokenGrant {
                    quote_id: QuoteId(quote_id.clone()),
                    supplier_id: Some(SupplierId(supplier_id.clone())),
                    letter_id: Some(record.id.clone()),
                    ttl_days,
                })
                .await
                .map_err(|error| internal_error(&error))?;
            dispatched.push(recipient_token(state, supplier_id, token));
        }

        for email in &record.direct_emails {
            let token = tokens
                .issue(TokenGrant {
                    quote_id: QuoteId(quote_id.clone()),
                    supplier_id: None,
                    letter_id: Some(record.id.clone()),
                    ttl_days,
                })
                .await
                .map_err(|error| internal_error(&error))?;
            dispatched.push(recipient_token(state, email, token));
        }
    }

    let audit = AuditEvent::now(
        "system",
        "system",
        "letter_dispatched",
        "letter",
        json!({ "letter_id": record.id, "tokens_issued": dispatched.len() }),
    );
    let audit = match &record.quote_id {
        Some(quote_id) => audit.for_quote(quote_id.clone()),
        None => audit,
    };
    if let Err(error) = SqlAuditLog::new(state.db_pool.clone()).record(audit).await {
        warn!(event_name = "letters.audit_write_failed", error = %error, "audit event dropped");
    }

    info!(
        event_name = "letters.dispatched",
        letter_id = %record.id,
        tokens_issued = dispatched.len(),
        "invitation letter dispatched"
    );

    Ok(dispatched)
}

fn recipient_token(state: &AppState, recipient: &str, token: String) -> DispatchedToken {
    DispatchedToken {
        recipient: recipient.to_string(),
        url: format!("{}/r/{token}", state.public_base_url),
        token,
    }
}

pub async fn category_documents(
    Path(category): Path<String>,
) -> Result<Json<Vec<RequiredDocument>>, LetterFailure> {
    let category: LetterCategory = category
        .parse()
        .map_err(|_| letter_error(StatusCode::NOT_FOUND, "unknown_category"))?;

    Ok(Json(category.suggested_documents()))
}

#[derive(Clone, Debug, Deserialize)]
pub struct EligibilityRequest {
    pub client_id: String,
    pub supplier_ids: Vec<String>,
    pub required_documents: Vec<RequiredDocument>,
    #[serde(default)]
    pub eligible_only: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SupplierEligibility {
    pub supplier_id: String,
    #[serde(flatten)]
    pub result: EligibilityResult,
}

#[derive(Clone, Debug, Serialize)]
pub struct EligibilityReport {
    pub summary: EligibilitySummary,
    pub results: Vec<SupplierEligibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_supplier_ids: Option<Vec<String>>,
}

/// Evaluate each candidate in turn; every evaluator call is awaited before
/// the summary or the filtered list is derived. Evaluator failures arrive
/// as `not_checked` results and never abort the roll-up.
pub async fn evaluate_eligibility(
    State(state): State<AppState>,
    Json(request): Json<EligibilityRequest>,
) -> Json<EligibilityReport> {
    let client_id = ClientId(request.client_id);

    let mut results = Vec::with_capacity(request.supplier_ids.len());
    for supplier_id in request.supplier_ids {
        let result = state
            .eligibility
            .evaluate(&SupplierId(supplier_id.clone()), &client_id, &request.required_documents)
            .await;
        results.push(SupplierEligibility { supplier_id, result });
    }

    let summary = EligibilitySummary::summarize(results.iter().map(|entry| &entry.result));

    let eligible_supplier_ids = request.eligible_only.then(|| {
        results
            .iter()
            .filter(|entry| entry.result.status == EligibilityStatus::Eligible)
            .map(|entry| entry.supplier_id.clone())
            .collect()
    });

    Json(EligibilityReport { summary, results, eligible_supplier_ids })
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;
    use chrono::{Duration, Utc};

    use cotar_core::domain::letter::LetterMode;
    use cotar_core::domain::supplier::{ClientId, SupplierId};
    use cotar_core::{InvitationLetterDraft, LetterCategory, QuoteId};

    use crate::test_support::{migrated_state, seed_quote, seed_supplier};

    use super::{
        category_documents, create_letter, dispatch_letter, evaluate_eligibility, get_letter,
        EligibilityRequest,
    };

    fn standalone_draft() -> InvitationLetterDraft {
        let mut draft = InvitationLetterDraft::new(ClientId("cond-centro".to_string()));
        draft.select_category(LetterCategory::Limpeza);
        draft.title = "Limpeza mensal".to_string();
        draft.description = "Halls e garagem".to_string();
        draft.deadline = Some(Utc::now().date_naive() + Duration::days(14));
        draft.set_direct_emails("a@ex.com");
        draft
    }

    fn linked_draft(quote_id: &str) -> InvitationLetterDraft {
        let mut draft = InvitationLetterDraft::new(ClientId("cond-centro".to_string()));
        draft.set_mode(LetterMode::Linked);
        draft.link_quote(QuoteId(quote_id.to_string()));
        draft.title = "Cotação de material".to_string();
        draft.description = "Itens conforme lista".to_string();
        draft.deadline = Some(Utc::now().date_naive() + Duration::days(7));
        draft.toggle_supplier(SupplierId("sup-1".to_string()));
        draft.set_direct_emails("b@ex.com");
        draft
    }

    #[tokio::test]
    async fn create_persists_draft_with_suggested_documents() {
        let state = migrated_state().await;

        let (status, Json(created)) =
            create_letter(State(state.clone()), Json(standalone_draft()))
                .await
                .expect("create succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.status, "draft");
        assert!(created.tokens.is_empty());

        let Json(view) = get_letter(State(state), Path(created.letter_id))
            .await
            .expect("letter exists");
        assert_eq!(view.category.as_deref(), Some("limpeza"));
        assert_eq!(view.required_documents.len(), 3);
        assert!(view.tokens.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft_with_first_failure_only() {
        let state = migrated_state().await;
        let mut draft = standalone_draft();
        draft.title = String::new();

        let (status, Json(body)) = create_letter(State(state), Json(draft))
            .await
            .expect_err("missing title");

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.user_message.as_deref(), Some("Informe o título da carta."));
    }

    #[tokio::test]
    async fn create_rejects_linked_draft_for_unknown_quote() {
        let state = migrated_state().await;

        let (status, Json(body)) = create_letter(State(state), Json(linked_draft("q-missing")))
            .await
            .expect_err("dangling quote reference");

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error, "quote_not_found");
        assert_eq!(
            body.user_message.as_deref(),
            Some("A cotação vinculada não foi encontrada.")
        );
    }

    #[tokio::test]
    async fn dispatch_mints_one_token_per_recipient_once() {
        let state = migrated_state().await;
        seed_quote(&state.db_pool, "q-1", false, None).await;
        seed_supplier(&state.db_pool, "sup-1", "Hidro Silva", "contato@hidrosilva.com.br").await;

        let (_, Json(created)) = create_letter(State(state.clone()), Json(linked_draft("q-1")))
            .await
            .expect("create succeeds");

        let Json(receipt) = dispatch_letter(State(state.clone()), Path(created.letter_id.clone()))
            .await
            .expect("dispatch succeeds");

        assert_eq!(receipt.tokens.len(), 2);
        assert_eq!(receipt.tokens[0].recipient, "sup-1");
        assert_eq!(receipt.tokens[1].recipient, "b@ex.com");
        assert!(receipt.tokens[0].url.contains("/r/"));

        let (status, Json(body)) = dispatch_letter(State(state.clone()), Path(created.letter_id.clone()))
            .await
            .expect_err("second dispatch conflicts");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "letter_already_sent");

        let Json(view) = get_letter(State(state), Path(created.letter_id))
            .await
            .expect("letter exists");
        assert_eq!(view.status, "sent");
        assert_eq!(view.tokens.len(), 2);
    }

    #[tokio::test]
    async fn send_immediately_dispatches_during_creation() {
        let state = migrated_state().await;
        seed_quote(&state.db_pool, "q-1", false, None).await;
        seed_supplier(&state.db_pool, "sup-1", "Hidro Silva", "contato@hidrosilva.com.br").await;

        let mut draft = linked_draft("q-1");
        draft.send_immediately = true;

        let (_, Json(created)) = create_letter(State(state), Json(draft))
            .await
            .expect("create succeeds");

        assert_eq!(created.status, "sent");
        assert_eq!(created.tokens.len(), 2);
    }

    #[tokio::test]
    async fn category_suggestions_come_from_the_dictionary() {
        let Json(documents) = category_documents(Path("obras".to_string()))
            .await
            .expect("known category");
        assert_eq!(documents.len(), 4);
        assert!(documents.iter().any(|doc| doc.doc_type == "art_crea"));

        let (status, Json(body)) = category_documents(Path("piscina".to_string()))
            .await
            .expect_err("unknown category");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "unknown_category");
    }

    #[tokio::test]
    async fn eligibility_report_counts_statuses_and_filters() {
        let state = migrated_state().await;

        let Json(report) = evaluate_eligibility(
            State(state),
            Json(EligibilityRequest {
                client_id: "cond-centro".to_string(),
                supplier_ids: vec![
                    "ok-1".to_string(),
                    "ok-2".to_string(),
                    "pend-3".to_string(),
                    "no-4".to_string(),
                ],
                required_documents: Vec::new(),
                eligible_only: true,
            }),
        )
        .await;

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.eligible, 2);
        assert_eq!(report.summary.pending, 1);
        assert_eq!(report.summary.ineligible, 1);
        assert_eq!(
            report.eligible_supplier_ids,
            Some(vec!["ok-1".to_string(), "ok-2".to_string()])
        );
    }
}
