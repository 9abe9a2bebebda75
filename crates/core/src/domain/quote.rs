use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteItemId(pub String);

/// Original line item of a quote request. `unit_price` is the reference
/// price captured at creation time, informational only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: QuoteItemId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Quote header as seen by a responding supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub id: QuoteId,
    pub title: String,
    pub description: String,
    pub client_name: String,
    pub client_address: Option<String>,
    pub requires_visit: bool,
    pub visit_deadline: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
}
