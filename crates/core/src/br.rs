//! Brazilian identifier helpers: CPF/CNPJ documents, PIX keys, CEP codes.

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Cpf,
    Cnpj,
}

impl DocumentType {
    pub fn expected_digits(self) -> usize {
        match self {
            Self::Cpf => 11,
            Self::Cnpj => 14,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cpf" => Ok(Self::Cpf),
            "cnpj" => Ok(Self::Cnpj),
            other => Err(DomainError::validation(
                "document_type",
                format!("unsupported document type `{other}` (expected cpf|cnpj)"),
            )),
        }
    }
}

/// Strip everything but ASCII digits.
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize and length-check a CPF/CNPJ number. Returns the digits-only form.
pub fn validate_document(document_type: DocumentType, raw: &str) -> Result<String, DomainError> {
    let digits = normalize_digits(raw);
    let expected = document_type.expected_digits();
    if digits.len() != expected {
        return Err(DomainError::validation(
            "document_number",
            format!("{} must have exactly {expected} digits", document_type.as_str()),
        ));
    }
    Ok(digits)
}

/// Normalize a CEP postal code. A non-8-digit input yields `None` and must
/// never trigger a lookup.
pub fn normalize_cep(raw: &str) -> Option<String> {
    let digits = normalize_digits(raw);
    (digits.len() == 8).then_some(digits)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

impl PixKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Random => "random",
        }
    }
}

/// Detect the PIX key type of a raw key, or `None` when the key matches no
/// known format and must be rejected.
pub fn detect_pix_key(raw: &str) -> Option<PixKeyType> {
    let key = raw.trim();
    if key.is_empty() {
        return None;
    }

    if is_random_key(key) {
        return Some(PixKeyType::Random);
    }

    if key.contains('@') {
        return is_plausible_email(key).then_some(PixKeyType::Email);
    }

    let digits = normalize_digits(key);
    let non_digit_noise = key.chars().any(|c| c.is_ascii_alphabetic());
    if non_digit_noise {
        return None;
    }

    match digits.len() {
        11 if key.starts_with("+55") || looks_like_phone(&digits) => Some(PixKeyType::Phone),
        11 => Some(PixKeyType::Cpf),
        14 => Some(PixKeyType::Cnpj),
        // +55 followed by DDD and 9-digit number
        13 if digits.starts_with("55") => Some(PixKeyType::Phone),
        10 => Some(PixKeyType::Phone),
        _ => None,
    }
}

// 32 hex digits in 8-4-4-4-12 UUID grouping.
fn is_random_key(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    groups.len() == 5
        && [8usize, 4, 4, 4, 12]
            .iter()
            .zip(&groups)
            .all(|(len, group)| group.len() == *len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_plausible_email(key: &str) -> bool {
    let Some((local, domain)) = key.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

// Mobile numbers are 11 digits with a leading 9 after the two-digit DDD.
fn looks_like_phone(digits: &str) -> bool {
    digits.len() == 11 && digits.as_bytes().get(2) == Some(&b'9')
}

#[cfg(test)]
mod tests {
    use super::{
        detect_pix_key, normalize_cep, normalize_digits, validate_document, DocumentType,
        PixKeyType,
    };

    #[test]
    fn normalizes_formatted_documents() {
        assert_eq!(normalize_digits("123.456.789-09"), "12345678909");
        assert_eq!(normalize_digits("12.345.678/0001-95"), "12345678000195");
    }

    #[test]
    fn cpf_requires_eleven_digits() {
        assert!(validate_document(DocumentType::Cpf, "123.456.789-09").is_ok());
        assert!(validate_document(DocumentType::Cpf, "123.456.789").is_err());
    }

    #[test]
    fn cnpj_requires_fourteen_digits() {
        assert!(validate_document(DocumentType::Cnpj, "12.345.678/0001-95").is_ok());
        assert!(validate_document(DocumentType::Cnpj, "12345678909").is_err());
    }

    #[test]
    fn cep_must_have_exactly_eight_digits() {
        assert_eq!(normalize_cep("01310-100"), Some("01310100".to_string()));
        assert_eq!(normalize_cep("1310-100"), None);
        assert_eq!(normalize_cep(""), None);
    }

    #[test]
    fn detects_email_pix_key() {
        assert_eq!(detect_pix_key("financeiro@fornecedor.com.br"), Some(PixKeyType::Email));
        assert_eq!(detect_pix_key("not-an-email@nodot"), None);
    }

    #[test]
    fn detects_document_pix_keys() {
        assert_eq!(detect_pix_key("123.456.789-09"), Some(PixKeyType::Cpf));
        assert_eq!(detect_pix_key("12.345.678/0001-95"), Some(PixKeyType::Cnpj));
    }

    #[test]
    fn detects_phone_pix_keys() {
        assert_eq!(detect_pix_key("+5511987654321"), Some(PixKeyType::Phone));
        assert_eq!(detect_pix_key("11987654321"), Some(PixKeyType::Phone));
        assert_eq!(detect_pix_key("1133334444"), Some(PixKeyType::Phone));
    }

    #[test]
    fn detects_random_uuid_keys() {
        assert_eq!(
            detect_pix_key("123e4567-e89b-12d3-a456-426614174000"),
            Some(PixKeyType::Random)
        );
    }

    #[test]
    fn rejects_unknown_formats() {
        assert_eq!(detect_pix_key("not-a-valid-format"), None);
        assert_eq!(detect_pix_key(""), None);
        assert_eq!(detect_pix_key("12345"), None);
    }
}
