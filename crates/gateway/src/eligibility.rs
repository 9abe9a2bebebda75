use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use cotar_core::config::EligibilityConfig;
use cotar_core::domain::eligibility::{EligibilityResult, EligibilityStatus, RequiredDocument};
use cotar_core::domain::supplier::{ClientId, SupplierId};
use cotar_core::ports::EligibilityGateway;

/// Remote document-eligibility evaluator.
///
/// This call sits on an interactive path (letter composition), so any
/// failure degrades to a `NotChecked` result instead of surfacing an
/// error, and no retry is attempted.
pub struct HttpEligibilityGateway {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    supplier_id: &'a str,
    client_id: &'a str,
    required_documents: Vec<RequestedDocument<'a>>,
}

#[derive(Serialize)]
struct RequestedDocument<'a> {
    doc_type: &'a str,
    mandatory: bool,
}

#[derive(Deserialize)]
struct EvaluateResponse {
    status: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    documents: Vec<String>,
    #[serde(default)]
    missing_docs: Vec<String>,
    #[serde(default)]
    pending_docs: Vec<String>,
    #[serde(default)]
    expired_docs: Vec<String>,
    #[serde(default)]
    rejected_docs: Vec<String>,
}

impl HttpEligibilityGateway {
    pub fn new(config: &EligibilityConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_default();

        Self { client, base_url: config.base_url.trim_end_matches('/').to_string() }
    }

    fn degraded(reason: &str) -> EligibilityResult {
        EligibilityResult::not_checked(reason)
    }
}

#[async_trait]
impl EligibilityGateway for HttpEligibilityGateway {
    async fn evaluate(
        &self,
        supplier_id: &SupplierId,
        client_id: &ClientId,
        required_documents: &[RequiredDocument],
    ) -> EligibilityResult {
        let request = EvaluateRequest {
            supplier_id: &supplier_id.0,
            client_id: &client_id.0,
            required_documents: required_documents
                .iter()
                .map(|document| RequestedDocument {
                    doc_type: &document.doc_type,
                    mandatory: document.mandatory,
                })
                .collect(),
        };

        let url = format!("{}/api/v1/eligibility/evaluate", self.base_url);
        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "eligibility_transport_failure",
                    supplier_id = %supplier_id.0,
                    error = %error,
                    "eligibility service unreachable, degrading to not_checked"
                );
                return Self::degraded("eligibility service unreachable");
            }
        };

        if !response.status().is_success() {
            warn!(
                event_name = "eligibility_remote_failure",
                supplier_id = %supplier_id.0,
                status = %response.status(),
                "eligibility service returned an error, degrading to not_checked"
            );
            return Self::degraded("eligibility service error");
        }

        let payload: EvaluateResponse = match response.json().await {
            Ok(payload) => payload,
            Err(error) => {
                warn!(
                    event_name = "eligibility_decode_failure",
                    supplier_id = %supplier_id.0,
                    error = %error,
                    "eligibility payload did not decode, degrading to not_checked"
                );
                return Self::degraded("eligibility payload malformed");
            }
        };

        let status = match payload.status.as_str() {
            "eligible" => EligibilityStatus::Eligible,
            "pending" => EligibilityStatus::Pending,
            "ineligible" => EligibilityStatus::Ineligible,
            _ => EligibilityStatus::NotChecked,
        };

        EligibilityResult {
            status,
            reason: payload.reason,
            score: payload.score,
            documents: payload.documents,
            missing_docs: payload.missing_docs,
            pending_docs: payload.pending_docs,
            expired_docs: payload.expired_docs,
            rejected_docs: payload.rejected_docs,
        }
    }
}
