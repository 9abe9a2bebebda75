//! Supplier document eligibility: per-supplier evaluation contract and the
//! roll-up summary used to gate "send to all" vs "send to eligible only".

use serde::{Deserialize, Serialize};

use crate::domain::supplier::{ClientId, SupplierId};
use crate::ports::EligibilityGateway;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocument {
    pub doc_type: String,
    pub label: String,
    pub mandatory: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityStatus {
    Eligible,
    Pending,
    Ineligible,
    NotChecked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub status: EligibilityStatus,
    pub reason: String,
    pub score: f64,
    pub documents: Vec<String>,
    pub missing_docs: Vec<String>,
    pub pending_docs: Vec<String>,
    pub expired_docs: Vec<String>,
    pub rejected_docs: Vec<String>,
}

impl EligibilityResult {
    /// Degraded result used when the remote evaluator cannot be reached.
    /// Evaluation failures must never block the invitation flow.
    pub fn not_checked(reason: impl Into<String>) -> Self {
        Self {
            status: EligibilityStatus::NotChecked,
            reason: reason.into(),
            score: 0.0,
            documents: Vec::new(),
            missing_docs: Vec::new(),
            pending_docs: Vec::new(),
            expired_docs: Vec::new(),
            rejected_docs: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilitySummary {
    pub total: usize,
    pub eligible: usize,
    pub pending: usize,
    pub ineligible: usize,
    pub not_checked: usize,
}

impl EligibilitySummary {
    /// Count results per status. Empty input resets every counter to zero;
    /// `total` always equals the sum of the four buckets.
    pub fn summarize<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a EligibilityResult>,
    {
        let mut summary = Self::default();
        for result in results {
            summary.total += 1;
            match result.status {
                EligibilityStatus::Eligible => summary.eligible += 1,
                EligibilityStatus::Pending => summary.pending += 1,
                EligibilityStatus::Ineligible => summary.ineligible += 1,
                EligibilityStatus::NotChecked => summary.not_checked += 1,
            }
        }
        summary
    }
}

/// Evaluate every candidate and keep only the eligible ones. Each evaluator
/// call is awaited before the filtered list is derived, so the result can
/// never be based on unresolved checks.
pub async fn filter_eligible(
    gateway: &dyn EligibilityGateway,
    client_id: &ClientId,
    supplier_ids: &[SupplierId],
    required_documents: &[RequiredDocument],
) -> Vec<SupplierId> {
    let mut eligible = Vec::new();
    for supplier_id in supplier_ids {
        let result = gateway.evaluate(supplier_id, client_id, required_documents).await;
        if result.status == EligibilityStatus::Eligible {
            eligible.push(supplier_id.clone());
        }
    }
    eligible
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::domain::supplier::{ClientId, SupplierId};
    use crate::ports::EligibilityGateway;

    use super::{
        filter_eligible, EligibilityResult, EligibilityStatus, EligibilitySummary,
        RequiredDocument,
    };

    fn result(status: EligibilityStatus) -> EligibilityResult {
        EligibilityResult { status, ..EligibilityResult::not_checked("") }
    }

    #[test]
    fn summary_total_equals_sum_of_buckets() {
        let results = vec![
            result(EligibilityStatus::Eligible),
            result(EligibilityStatus::Eligible),
            result(EligibilityStatus::Pending),
            result(EligibilityStatus::Ineligible),
            result(EligibilityStatus::NotChecked),
        ];

        let summary = EligibilitySummary::summarize(&results);
        assert_eq!(summary.total, 5);
        assert_eq!(
            summary.total,
            summary.eligible + summary.pending + summary.ineligible + summary.not_checked
        );
        assert_eq!(summary.eligible, 2);
    }

    #[test]
    fn empty_input_resets_all_counters() {
        let summary = EligibilitySummary::summarize(&[]);
        assert_eq!(summary, EligibilitySummary::default());
    }

    struct StaticGateway;

    #[async_trait]
    impl EligibilityGateway for StaticGateway {
        async fn evaluate(
            &self,
            supplier_id: &SupplierId,
            _client_id: &ClientId,
            _required_documents: &[RequiredDocument],
        ) -> EligibilityResult {
            if supplier_id.0.starts_with("ok-") {
                result(EligibilityStatus::Eligible)
            } else {
                result(EligibilityStatus::Ineligible)
            }
        }
    }

    #[tokio::test]
    async fn filter_eligible_awaits_every_evaluation() {
        let suppliers = vec![
            SupplierId("ok-1".into()),
            SupplierId("bad-2".into()),
            SupplierId("ok-3".into()),
        ];

        let eligible = filter_eligible(
            &StaticGateway,
            &ClientId("cond-1".into()),
            &suppliers,
            &[],
        )
        .await;

        assert_eq!(eligible, vec![SupplierId("ok-1".into()), SupplierId("ok-3".into())]);
    }
}
