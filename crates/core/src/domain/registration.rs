//! Supplier self-registration wizard: four linear steps with per-step
//! validation gating forward navigation. Backward navigation never
//! re-validates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::br::{detect_pix_key, validate_document, DocumentType, PixKeyType};
use crate::ports::CepAddress;

pub const MAX_SPECIALTIES: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    Identity,
    Address,
    Business,
    Payout,
}

impl RegistrationStep {
    pub const ALL: [Self; 4] = [Self::Identity, Self::Address, Self::Business, Self::Payout];

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Identity => Some(Self::Address),
            Self::Address => Some(Self::Business),
            Self::Business => Some(Self::Payout),
            Self::Payout => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Identity => None,
            Self::Address => Some(Self::Identity),
            Self::Business => Some(Self::Address),
            Self::Payout => Some(Self::Business),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Address => "address",
            Self::Business => "business",
            Self::Payout => "payout",
        }
    }
}

impl std::str::FromStr for RegistrationStep {
    type Err = StepValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(Self::Identity),
            "address" => Ok(Self::Address),
            "business" => Ok(Self::Business),
            "payout" => Ok(Self::Payout),
            other => Err(StepValidationError::new(
                "step",
                format!("unknown registration step `{other}`"),
            )),
        }
    }
}

/// Validation failure attached to a single form field.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("invalid `{field}`: {message}")]
pub struct StepValidationError {
    pub field: String,
    pub message: String,
}

impl StepValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    Pix,
    BankAccount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Corrente,
    Poupanca,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    // Step 1: identity
    pub document_type: Option<DocumentType>,
    pub document_number: String,
    pub whatsapp: String,

    // Step 2: address
    pub cep: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,

    // Step 3: business
    pub specialties: Vec<String>,
    pub website: String,
    pub description: String,

    // Step 4: payout
    pub payment_method: Option<PayoutMethod>,
    pub pix_key: String,
    pub bank_code: String,
    pub agency: String,
    pub agency_digit: String,
    pub account_number: String,
    pub account_digit: String,
    pub account_type: Option<AccountType>,
    pub account_holder_name: String,
    pub account_holder_document: String,
}

/// Wizard over a [`RegistrationForm`]: forward navigation is gated by the
/// current step's validation; backward navigation is always permitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationWizard {
    pub form: RegistrationForm,
    current: Option<RegistrationStep>,
}

impl RegistrationWizard {
    pub fn new() -> Self {
        Self { form: RegistrationForm::default(), current: Some(RegistrationStep::Identity) }
    }

    pub fn current_step(&self) -> RegistrationStep {
        self.current.unwrap_or(RegistrationStep::Identity)
    }

    /// Validate the current step and move forward. Returns the new step,
    /// or `None` when the wizard was already on the final step.
    pub fn advance(&mut self) -> Result<Option<RegistrationStep>, StepValidationError> {
        let current = self.current_step();
        self.form.validate_step(current)?;
        if let Some(next) = current.next() {
            self.current = Some(next);
            return Ok(Some(next));
        }
        Ok(None)
    }

    /// Move backward without re-validating. No-op on the first step.
    pub fn back(&mut self) -> Option<RegistrationStep> {
        let previous = self.current_step().previous()?;
        self.current = Some(previous);
        Some(previous)
    }
}

impl RegistrationForm {
    pub fn validate_step(&self, step: RegistrationStep) -> Result<(), StepValidationError> {
        match step {
            RegistrationStep::Identity => self.validate_identity(),
            RegistrationStep::Address => self.validate_address(),
            RegistrationStep::Business => self.validate_business(),
            RegistrationStep::Payout => self.validate_payout(),
        }
    }

    /// Validate every step in order; used by the final atomic submission.
    pub fn validate_all(&self) -> Result<(), StepValidationError> {
        for step in RegistrationStep::ALL {
            self.validate_step(step)?;
        }
        Ok(())
    }

    fn validate_identity(&self) -> Result<(), StepValidationError> {
        let document_type = self.document_type.ok_or_else(|| {
            StepValidationError::new("document_type", "selecione CPF ou CNPJ")
        })?;
        validate_document(document_type, &self.document_number).map_err(|_| {
            StepValidationError::new(
                "document_number",
                match document_type {
                    DocumentType::Cpf => "o CPF deve ter 11 dígitos",
                    DocumentType::Cnpj => "o CNPJ deve ter 14 dígitos",
                },
            )
        })?;
        if self.whatsapp.trim().is_empty() {
            return Err(StepValidationError::new("whatsapp", "informe o WhatsApp de contato"));
        }
        Ok(())
    }

    fn validate_address(&self) -> Result<(), StepValidationError> {
        let required: [(&str, &str, &str); 5] = [
            ("cep", self.cep.trim(), "informe o CEP"),
            ("street", self.street.trim(), "informe a rua"),
            ("number", self.number.trim(), "informe o número"),
            ("neighborhood", self.neighborhood.trim(), "informe o bairro"),
            ("city", self.city.trim(), "informe a cidade"),
        ];
        for (field, value, message) in required {
            if value.is_empty() {
                return Err(StepValidationError::new(field, message));
            }
        }
        if self.state.trim().len() != 2 {
            return Err(StepValidationError::new("state", "a UF deve ter 2 letras"));
        }
        Ok(())
    }

    fn validate_business(&self) -> Result<(), StepValidationError> {
        if self.specialties.is_empty() {
            return Err(StepValidationError::new(
                "specialties",
                "selecione ao menos uma especialidade",
            ));
        }
        if self.specialties.len() > MAX_SPECIALTIES {
            return Err(StepValidationError::new(
                "specialties",
                format!("no máximo {MAX_SPECIALTIES} especialidades"),
            ));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(StepValidationError::new(
                "description",
                format!("a descrição deve ter até {MAX_DESCRIPTION_CHARS} caracteres"),
            ));
        }
        Ok(())
    }

    fn validate_payout(&self) -> Result<(), StepValidationError> {
        let method = self.payment_method.ok_or_else(|| {
            StepValidationError::new("payment_method", "selecione a forma de recebimento")
        })?;

        match method {
            PayoutMethod::Pix => {
                if self.pix_key.trim().is_empty() {
                    return Err(StepValidationError::new("pix_key", "informe a chave PIX"));
                }
                if detect_pix_key(&self.pix_key).is_none() {
                    return Err(StepValidationError::new(
                        "pix_key",
                        "chave PIX inválida (CPF, CNPJ, e-mail, telefone ou chave aleatória)",
                    ));
                }
            }
            PayoutMethod::BankAccount => {
                let required: [(&str, &str, &str); 5] = [
                    ("bank_code", self.bank_code.trim(), "informe o banco"),
                    ("agency", self.agency.trim(), "informe a agência"),
                    ("account_number", self.account_number.trim(), "informe a conta"),
                    (
                        "account_holder_name",
                        self.account_holder_name.trim(),
                        "informe o titular da conta",
                    ),
                    (
                        "account_holder_document",
                        self.account_holder_document.trim(),
                        "informe o documento do titular",
                    ),
                ];
                for (field, value, message) in required {
                    if value.is_empty() {
                        return Err(StepValidationError::new(field, message));
                    }
                }
            }
        }
        Ok(())
    }

    /// Detected PIX key type, once step 4 has validated.
    pub fn pix_key_type(&self) -> Option<PixKeyType> {
        detect_pix_key(&self.pix_key)
    }

    /// Apply a successful CEP lookup. Merge policy: the lookup fills only
    /// fields the user has not already typed; manual edits win.
    pub fn apply_cep_lookup(&mut self, address: &CepAddress) {
        if self.street.trim().is_empty() {
            self.street = address.street.clone();
        }
        if self.neighborhood.trim().is_empty() {
            self.neighborhood = address.neighborhood.clone();
        }
        if self.city.trim().is_empty() {
            self.city = address.city.clone();
        }
        if self.state.trim().is_empty() {
            self.state = address.state.clone();
        }
    }
}
