//! HTTP and filesystem implementations of the `cotar-core` ports.
//!
//! Each gateway owns a `reqwest::Client` tuned from its config section.
//! Failure posture differs per collaborator: eligibility degrades, the
//! others report errors for the caller to translate.

pub mod auth;
pub mod cep;
pub mod eligibility;
pub mod escrow;
pub mod storage;

pub use auth::HttpSessionGateway;
pub use cep::HttpCepLookup;
pub use eligibility::HttpEligibilityGateway;
pub use escrow::HttpEscrowGateway;
pub use storage::FsAttachmentStore;
