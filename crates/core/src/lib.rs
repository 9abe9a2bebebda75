pub mod br;
pub mod config;
pub mod domain;
pub mod errors;
pub mod money;
pub mod ports;

pub use domain::eligibility::{
    EligibilityResult, EligibilityStatus, EligibilitySummary, RequiredDocument,
};
pub use domain::letter::{
    InvitationLetterDraft, LetterAttachment, LetterCategory, LetterMode, LetterValidationError,
};
pub use domain::quote::{QuoteId, QuoteItem, QuoteItemId, QuoteSummary};
pub use domain::registration::{
    PayoutMethod, RegistrationForm, RegistrationStep, RegistrationWizard, StepValidationError,
};
pub use domain::response::{QuickResponseDraft, ResponseItem, ResponseValidationError};
pub use domain::session::{establish_session, SessionBundle, SessionOutcome, SessionPath};
pub use domain::supplier::{ClientId, Supplier, SupplierId};
pub use errors::DomainError;
pub use money::parse_localized_currency;
pub use ports::{
    AttachmentStore, CepAddress, CepLookup, EligibilityGateway, EscrowGateway, GatewayError,
    PlatformBalance, SessionPort, SessionTokens,
};
