use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

pub mod audit;
pub mod letter;
pub mod quote;
pub mod response;
pub mod supplier;
pub mod token;
pub mod upload;

pub use audit::{AuditEvent, SqlAuditLog};
pub use letter::{LetterRecord, SqlLetterRepository};
pub use quote::SqlQuoteRepository;
pub use response::SqlResponseRepository;
pub use supplier::{NewSupplier, SqlSupplierRepository};
pub use token::{ResolvedToken, SqlTokenRepository, TokenGrant, TokenResolution};
pub use upload::SqlUploadRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Money lives in TEXT columns; parse failures surface as decode errors
/// rather than silently becoming zero.
pub(crate) fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|_| RepositoryError::Decode(format!("column `{column}` holds non-decimal `{raw}`")))
}

pub(crate) fn decode_date(column: &str, raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| RepositoryError::Decode(format!("column `{column}` holds non-date `{raw}`")))
}

pub(crate) fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| {
            RepositoryError::Decode(format!("column `{column}` holds non-timestamp `{raw}`"))
        })
}

pub(crate) fn encode_date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{decode_date, decode_decimal, RepositoryError};

    #[test]
    fn decimal_decoding_reports_the_offending_column() {
        let value = decode_decimal("total_amount", "123.45").expect("decode");
        assert_eq!(value, Decimal::new(12345, 2));

        let error = decode_decimal("total_amount", "12,50").unwrap_err();
        assert!(matches!(error, RepositoryError::Decode(message) if message.contains("total_amount")));
    }

    #[test]
    fn date_decoding_accepts_iso_dates_only() {
        assert!(decode_date("visit_deadline", "2026-09-15").is_ok());
        assert!(decode_date("visit_deadline", "15/09/2026").is_err());
    }
}
