use thiserror::Error;

/// Field-level validation failure raised by domain value parsers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed for `{field}`: {message}")]
    ValidationFailed { field: String, message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed { field: field.into(), message: message.into() }
    }
}
