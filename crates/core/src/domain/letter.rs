//! Invitation letter composer: mode handling, category-driven document
//! suggestions, recipients, attachments, and ordered draft validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::eligibility::RequiredDocument;
use crate::domain::quote::QuoteId;
use crate::domain::supplier::{ClientId, SupplierId};

pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// MIME allow-list shared by letter attachments and proposal uploads.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/png",
    "image/jpg",
    "image/jpeg",
];

/// Compliance document dictionary: stable type key and display label.
pub const DOCUMENT_DICTIONARY: &[(&str, &str)] = &[
    ("contrato_social", "Contrato Social"),
    ("cartao_cnpj", "Cartão CNPJ"),
    ("certidao_negativa_federal", "Certidão Negativa de Débitos Federais"),
    ("certidao_fgts", "Certificado de Regularidade do FGTS"),
    ("alvara_funcionamento", "Alvará de Funcionamento"),
    ("seguro_responsabilidade_civil", "Seguro de Responsabilidade Civil"),
    ("laudo_tecnico", "Laudo Técnico"),
    ("art_crea", "ART/CREA"),
    ("certificado_limpeza", "Certificado de Controle Sanitário"),
    ("certificado_brigada", "Certificado de Brigada de Incêndio"),
];

pub fn document_label(doc_type: &str) -> Option<&'static str> {
    DOCUMENT_DICTIONARY.iter().find(|(key, _)| *key == doc_type).map(|(_, label)| *label)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterCategory {
    Limpeza,
    Manutencao,
    Seguranca,
    Jardinagem,
    Obras,
    Portaria,
}

impl LetterCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Limpeza => "limpeza",
            Self::Manutencao => "manutencao",
            Self::Seguranca => "seguranca",
            Self::Jardinagem => "jardinagem",
            Self::Obras => "obras",
            Self::Portaria => "portaria",
        }
    }

    /// Category → suggested required documents. Selecting a category replaces
    /// the current required-document list with exactly this mapping.
    pub fn suggested_documents(self) -> Vec<RequiredDocument> {
        let types: &[&str] = match self {
            Self::Limpeza => {
                &["cartao_cnpj", "certidao_negativa_federal", "certificado_limpeza"]
            }
            Self::Manutencao => &["cartao_cnpj", "certidao_negativa_federal", "art_crea"],
            Self::Seguranca => {
                &["cartao_cnpj", "alvara_funcionamento", "certificado_brigada"]
            }
            Self::Jardinagem => &["cartao_cnpj", "certidao_negativa_federal"],
            Self::Obras => {
                &["cartao_cnpj", "art_crea", "seguro_responsabilidade_civil", "laudo_tecnico"]
            }
            Self::Portaria => &["cartao_cnpj", "certidao_fgts", "alvara_funcionamento"],
        };

        types
            .iter()
            .map(|doc_type| RequiredDocument {
                doc_type: (*doc_type).to_string(),
                label: document_label(doc_type).unwrap_or(*doc_type).to_string(),
                mandatory: true,
            })
            .collect()
    }
}

impl std::str::FromStr for LetterCategory {
    type Err = LetterValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "limpeza" => Ok(Self::Limpeza),
            "manutencao" => Ok(Self::Manutencao),
            "seguranca" => Ok(Self::Seguranca),
            "jardinagem" => Ok(Self::Jardinagem),
            "obras" => Ok(Self::Obras),
            "portaria" => Ok(Self::Portaria),
            other => Err(LetterValidationError::UnknownCategory { category: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LetterMode {
    Standalone,
    Linked,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterAttachment {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LetterValidationError {
    #[error("standalone letters require a category")]
    MissingCategory,
    #[error("linked letters require a quote reference")]
    MissingQuote,
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("at least one recipient is required")]
    NoRecipients,
    #[error("unknown category `{category}`")]
    UnknownCategory { category: String },
    #[error("attachment `{file_name}` exceeds the 10MB limit")]
    AttachmentTooLarge { file_name: String },
    #[error("attachment `{file_name}` has unsupported type `{content_type}`")]
    AttachmentTypeNotAllowed { file_name: String, content_type: String },
}

impl LetterValidationError {
    /// Short, actionable user-facing message, one per first failing rule.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCategory => "Selecione uma categoria para a carta avulsa.".to_string(),
            Self::MissingQuote => "Selecione a cotação vinculada à carta.".to_string(),
            Self::MissingField { field } => match *field {
                "title" => "Informe o título da carta.".to_string(),
                "description" => "Informe a descrição da carta.".to_string(),
                "deadline" => "Informe o prazo de resposta.".to_string(),
                other => format!("Preencha o campo obrigatório: {other}."),
            },
            Self::NoRecipients => {
                "Adicione ao menos um fornecedor ou e-mail de destino.".to_string()
            }
            Self::UnknownCategory { .. } => "Categoria inválida.".to_string(),
            Self::AttachmentTooLarge { file_name } => {
                format!("O anexo {file_name} excede o limite de 10MB.")
            }
            Self::AttachmentTypeNotAllowed { file_name, .. } => {
                format!("O tipo do anexo {file_name} não é aceito.")
            }
        }
    }
}

/// Mutable letter draft backing the composer. `mode` decides which of
/// `category` / `quote_id` is meaningful; the other is always `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvitationLetterDraft {
    pub client_id: ClientId,
    pub mode: LetterMode,
    pub category: Option<LetterCategory>,
    pub quote_id: Option<QuoteId>,
    pub title: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub required_documents: Vec<RequiredDocument>,
    pub supplier_ids: Vec<SupplierId>,
    pub direct_emails: Vec<String>,
    pub attachments: Vec<LetterAttachment>,
    pub send_immediately: bool,
}

impl InvitationLetterDraft {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            mode: LetterMode::Standalone,
            category: None,
            quote_id: None,
            title: String::new(),
            description: String::new(),
            deadline: None,
            required_documents: Vec::new(),
            supplier_ids: Vec::new(),
            direct_emails: Vec::new(),
            attachments: Vec::new(),
            send_immediately: false,
        }
    }

    /// Switch composer mode, clearing the fields that no longer apply.
    pub fn set_mode(&mut self, mode: LetterMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        match mode {
            LetterMode::Standalone => self.quote_id = None,
            LetterMode::Linked => self.category = None,
        }
    }

    /// Select a category and replace the required-document list with the
    /// category mapping. Returns `true` when a previously chosen list was
    /// overwritten, so callers can warn the user about the side effect.
    pub fn select_category(&mut self, category: LetterCategory) -> bool {
        let had_documents = !self.required_documents.is_empty();
        self.category = Some(category);
        self.required_documents = category.suggested_documents();
        had_documents
    }

    pub fn link_quote(&mut self, quote_id: QuoteId) {
        self.quote_id = Some(quote_id);
    }

    /// Add or remove a required document, resolving its label from the
    /// dictionary. Unknown types are ignored.
    pub fn toggle_required_document(&mut self, doc_type: &str) {
        if let Some(position) =
            self.required_documents.iter().position(|doc| doc.doc_type == doc_type)
        {
            self.required_documents.remove(position);
            return;
        }
        if let Some(label) = document_label(doc_type) {
            self.required_documents.push(RequiredDocument {
                doc_type: doc_type.to_string(),
                label: label.to_string(),
                mandatory: true,
            });
        }
    }

    pub fn toggle_supplier(&mut self, supplier_id: SupplierId) {
        if let Some(position) = self.supplier_ids.iter().position(|id| *id == supplier_id) {
            self.supplier_ids.remove(position);
        } else {
            self.supplier_ids.push(supplier_id);
        }
    }

    /// Replace direct e-mails from comma-separated free text, trimming
    /// entries and dropping empties.
    pub fn set_direct_emails(&mut self, raw: &str) {
        self.direct_emails = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
    }

    pub fn add_attachment(
        &mut self,
        attachment: LetterAttachment,
    ) -> Result<(), LetterValidationError> {
        validate_attachment(&attachment.file_name, &attachment.content_type, attachment.size_bytes)?;
        self.attachments.push(attachment);
        Ok(())
    }

    pub fn remove_attachment(&mut self, file_name: &str) {
        self.attachments.retain(|attachment| attachment.file_name != file_name);
    }

    /// Ordered validation: mode-specific reference first, then the core
    /// fields, then recipients. Only the first failing rule is reported.
    pub fn validate(&self) -> Result<(), LetterValidationError> {
        match self.mode {
            LetterMode::Standalone if self.category.is_none() => {
                return Err(LetterValidationError::MissingCategory);
            }
            LetterMode::Linked if self.quote_id.is_none() => {
                return Err(LetterValidationError::MissingQuote);
            }
            _ => {}
        }

        if self.title.trim().is_empty() {
            return Err(LetterValidationError::MissingField { field: "title" });
        }
        if self.description.trim().is_empty() {
            return Err(LetterValidationError::MissingField { field: "description" });
        }
        if self.deadline.is_none() {
            return Err(LetterValidationError::MissingField { field: "deadline" });
        }

        if self.supplier_ids.is_empty() && self.direct_emails.is_empty() {
            return Err(LetterValidationError::NoRecipients);
        }

        Ok(())
    }
}

pub fn validate_attachment(
    file_name: &str,
    content_type: &str,
    size_bytes: u64,
) -> Result<(), LetterValidationError> {
    if size_bytes > MAX_ATTACHMENT_BYTES {
        return Err(LetterValidationError::AttachmentTooLarge {
            file_name: file_name.to_string(),
        });
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(LetterValidationError::AttachmentTypeNotAllowed {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
        });
    }
    Ok(())
}
