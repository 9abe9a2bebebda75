pub mod eligibility;
pub mod quote;
pub mod letter;
pub mod registration;
pub mod response;
pub mod session;
pub mod supplier;
