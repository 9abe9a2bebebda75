//! Quick-response drafting: response-ready line items, business-rule
//! validation, and the structured proposal submitted back to the platform.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::{QuoteItem, QuoteSummary};
use crate::money::parse_localized_currency;

/// Editable response row derived from an original quote item.
///
/// `proposed_unit_price` stays free text until submission; `proposed_total`
/// is recomputed on every edit and never stored stale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseItem {
    pub product_name: String,
    pub original_unit_price: Decimal,
    pub proposed_quantity: u32,
    pub proposed_unit_price: String,
    pub proposed_total: Decimal,
}

impl ResponseItem {
    /// Initialize from the original item: quantity carries over, the price
    /// field starts empty so the reference price cannot anchor the supplier.
    pub fn from_quote_item(item: &QuoteItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            original_unit_price: item.unit_price,
            proposed_quantity: item.quantity,
            proposed_unit_price: String::new(),
            proposed_total: Decimal::ZERO,
        }
    }

    pub fn set_quantity(&mut self, quantity: u32) {
        self.proposed_quantity = quantity;
        self.recompute_total();
    }

    pub fn set_unit_price(&mut self, raw: impl Into<String>) {
        self.proposed_unit_price = raw.into();
        self.recompute_total();
    }

    pub fn parsed_unit_price(&self) -> Decimal {
        parse_localized_currency(&self.proposed_unit_price)
    }

    fn recompute_total(&mut self) {
        self.proposed_total = self.parsed_unit_price() * Decimal::from(self.proposed_quantity);
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResponseValidationError {
    #[error("supplier name is required")]
    MissingSupplierName,
    #[error("supplier email is required")]
    MissingSupplierEmail,
    #[error("technical visit date is required")]
    MissingVisitDate,
    #[error("technical visit must be scheduled on or before {deadline}")]
    VisitAfterDeadline { deadline: String },
    #[error("at least one item needs a positive unit price")]
    NoPricedItem,
}

impl ResponseValidationError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingSupplierName => "Informe o nome do fornecedor.".to_string(),
            Self::MissingSupplierEmail => "Informe o e-mail do fornecedor.".to_string(),
            Self::MissingVisitDate => {
                "O agendamento da visita técnica é obrigatório para esta cotação.".to_string()
            }
            Self::VisitAfterDeadline { deadline } => {
                format!("A visita técnica deve ser agendada até {deadline}.")
            }
            Self::NoPricedItem => {
                "Preencha o preço de ao menos um item antes de enviar.".to_string()
            }
        }
    }
}

/// Supplier-entered quick response, validated before any network call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickResponseDraft {
    pub supplier_name: String,
    pub supplier_email: String,
    pub items: Vec<ResponseItem>,
    pub delivery_days: Option<u32>,
    pub shipping_cost: String,
    pub warranty_months: Option<u32>,
    pub payment_terms: String,
    pub notes: String,
    pub attachment_url: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub visit_notes: String,
}

impl QuickResponseDraft {
    pub fn for_items(items: &[QuoteItem]) -> Self {
        Self {
            items: items.iter().map(ResponseItem::from_quote_item).collect(),
            ..Self::default()
        }
    }

    /// Sum of line totals at submission time.
    pub fn total_amount(&self) -> Decimal {
        self.items.iter().map(|item| item.proposed_total).sum()
    }

    /// Ordered validation: contact fields, then visit rules, then pricing.
    /// The first failing rule is returned; no network call may be made on
    /// failure.
    pub fn validate(&self, quote: &QuoteSummary) -> Result<(), ResponseValidationError> {
        if self.supplier_name.trim().is_empty() {
            return Err(ResponseValidationError::MissingSupplierName);
        }
        if self.supplier_email.trim().is_empty() {
            return Err(ResponseValidationError::MissingSupplierEmail);
        }

        if quote.requires_visit {
            let visit_date = self.visit_date.ok_or(ResponseValidationError::MissingVisitDate)?;
            if let Some(deadline) = quote.visit_deadline {
                if visit_date > deadline {
                    return Err(ResponseValidationError::VisitAfterDeadline {
                        deadline: deadline.format("%d/%m/%Y").to_string(),
                    });
                }
            }
        }

        let any_priced = self.items.iter().any(|item| item.parsed_unit_price() > Decimal::ZERO);
        if !any_priced {
            return Err(ResponseValidationError::NoPricedItem);
        }

        Ok(())
    }

    /// Build the structured proposal payload after validation succeeded.
    ///
    /// Line totals are recomputed here from the parsed price and quantity.
    /// Drafts arrive over the wire as plain JSON, so a carried
    /// `proposed_total` may be stale or forged and is never persisted.
    pub fn into_submission(self, token: &str) -> SupplierResponseSubmission {
        let items: Vec<SubmissionItem> = self
            .items
            .into_iter()
            .map(|item| {
                let unit_price = parse_localized_currency(&item.proposed_unit_price);
                SubmissionItem {
                    product_name: item.product_name,
                    quantity: item.proposed_quantity,
                    unit_price,
                    total: unit_price * Decimal::from(item.proposed_quantity),
                }
            })
            .collect();
        let total_amount = items.iter().map(|item| item.total).sum();

        SupplierResponseSubmission {
            token: token.to_string(),
            supplier_name: self.supplier_name,
            supplier_email: self.supplier_email,
            total_amount,
            delivery_days: self.delivery_days,
            shipping_cost: parse_localized_currency(&self.shipping_cost),
            warranty_months: self.warranty_months,
            payment_terms: self.payment_terms,
            notes: self.notes,
            attachment_url: self.attachment_url,
            visit_date: self.visit_date,
            visit_notes: self.visit_notes,
            items,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierResponseSubmission {
    pub token: String,
    pub supplier_name: String,
    pub supplier_email: String,
    pub total_amount: Decimal,
    pub delivery_days: Option<u32>,
    pub shipping_cost: Decimal,
    pub warranty_months: Option<u32>,
    pub payment_terms: String,
    pub notes: String,
    pub attachment_url: Option<String>,
    pub visit_date: Option<NaiveDate>,
    pub visit_notes: String,
    pub items: Vec<SubmissionItem>,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use crate::domain::quote::{QuoteId, QuoteItem, QuoteItemId, QuoteSummary};

    use super::{QuickResponseDraft, ResponseItem, ResponseValidationError};

    fn item(name: &str, quantity: u32, unit_price: Decimal) -> QuoteItem {
        QuoteItem {
            id: QuoteItemId(format!("item-{name}")),
            product_name: name.to_string(),
            quantity,
            unit_price,
        }
    }

    fn quote(requires_visit: bool, visit_deadline: Option<NaiveDate>) -> QuoteSummary {
        QuoteSummary {
            id: QuoteId("Q-1".to_string()),
            title: "Material hidráulico".to_string(),
            description: String::new(),
            client_name: "Condomínio Jardim".to_string(),
            client_address: None,
            requires_visit,
            visit_deadline,
            supplier_id: None,
            supplier_name: None,
        }
    }

    fn priced_draft() -> QuickResponseDraft {
        let mut draft = QuickResponseDraft::for_items(&[
            item("Tubo PVC", 2, Decimal::new(900, 2)),
            item("Registro", 1, Decimal::new(4500, 2)),
            item("Veda rosca", 5, Decimal::new(300, 2)),
        ]);
        draft.supplier_name = "Hidro Silva".to_string();
        draft.supplier_email = "contato@hidrosilva.com.br".to_string();
        draft
    }

    #[test]
    fn response_items_start_unanchored() {
        let source = item("Tubo PVC", 4, Decimal::new(1250, 2));
        let row = ResponseItem::from_quote_item(&source);

        assert_eq!(row.proposed_quantity, 4);
        assert!(row.proposed_unit_price.is_empty());
        assert_eq!(row.proposed_total, Decimal::ZERO);
        assert_eq!(row.original_unit_price, Decimal::new(1250, 2));
    }

    #[test]
    fn total_recomputes_on_every_edit() {
        let mut row = ResponseItem::from_quote_item(&item("Tubo PVC", 2, Decimal::ZERO));

        row.set_unit_price("R$ 10,50");
        assert_eq!(row.proposed_total, Decimal::new(2100, 2));

        row.set_quantity(3);
        assert_eq!(row.proposed_total, Decimal::new(3150, 2));

        row.set_unit_price("");
        assert_eq!(row.proposed_total, Decimal::ZERO);
    }

    #[test]
    fn contact_fields_are_validated_first() {
        let mut draft = priced_draft();
        draft.supplier_name = "  ".to_string();
        assert_eq!(
            draft.validate(&quote(false, None)),
            Err(ResponseValidationError::MissingSupplierName)
        );

        draft.supplier_name = "Hidro Silva".to_string();
        draft.supplier_email = String::new();
        assert_eq!(
            draft.validate(&quote(false, None)),
            Err(ResponseValidationError::MissingSupplierEmail)
        );
    }

    #[test]
    fn visit_is_mandatory_when_quote_requires_it() {
        let mut draft = priced_draft();
        draft.items[0].set_unit_price("10,00");

        let deadline = NaiveDate::from_ymd_opt(2026, 9, 15);
        assert_eq!(
            draft.validate(&quote(true, deadline)),
            Err(ResponseValidationError::MissingVisitDate)
        );

        draft.visit_date = NaiveDate::from_ymd_opt(2026, 9, 20);
        assert_eq!(
            draft.validate(&quote(true, deadline)),
            Err(ResponseValidationError::VisitAfterDeadline {
                deadline: "15/09/2026".to_string()
            })
        );

        draft.visit_date = NaiveDate::from_ymd_opt(2026, 9, 10);
        assert_eq!(draft.validate(&quote(true, deadline)), Ok(()));
    }

    #[test]
    fn at_least_one_positive_price_is_required() {
        let draft = priced_draft();
        assert_eq!(
            draft.validate(&quote(false, None)),
            Err(ResponseValidationError::NoPricedItem)
        );
    }

    #[test]
    fn partially_priced_response_is_accepted_and_totalled() {
        let mut draft = priced_draft();
        draft.items[0].set_unit_price("R$ 10,50");
        assert_eq!(draft.validate(&quote(false, None)), Ok(()));

        // Two items at zero, one at 10.50 × 2.
        assert_eq!(draft.total_amount(), Decimal::new(2100, 2));

        let submission = draft.into_submission("tok-1");
        assert_eq!(submission.total_amount, Decimal::new(2100, 2));
        assert_eq!(submission.items.len(), 3);
        assert_eq!(submission.items[0].unit_price, Decimal::new(1050, 2));
        assert_eq!(submission.items[1].total, Decimal::ZERO);
    }

    #[test]
    fn submission_recomputes_totals_ignoring_carried_wire_values() {
        // Deserialized drafts bypass the setters, so the carried totals
        // can disagree with price × quantity.
        let draft: QuickResponseDraft = serde_json::from_value(serde_json::json!({
            "supplier_name": "Hidro Silva",
            "supplier_email": "contato@hidrosilva.com.br",
            "items": [{
                "product_name": "Tubo PVC",
                "original_unit_price": "12.50",
                "proposed_quantity": 2,
                "proposed_unit_price": "10,50",
                "proposed_total": "999.00"
            }],
            "shipping_cost": "",
            "payment_terms": "",
            "notes": "",
            "visit_notes": ""
        }))
        .expect("wire draft");

        assert_eq!(draft.validate(&quote(false, None)), Ok(()));

        let submission = draft.into_submission("tok-1");
        assert_eq!(submission.items[0].total, Decimal::new(2100, 2));
        assert_eq!(submission.total_amount, Decimal::new(2100, 2));
    }
}
