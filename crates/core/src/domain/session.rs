//! Post-registration session establishment.
//!
//! Two-tier recovery modeled as an explicit state machine instead of nested
//! error handling: try the provider-issued tokens first, fall back to a
//! temporary-password sign-in, and report a manual-login outcome when both
//! paths fail. Registration itself has already succeeded by this point, so
//! the failure outcome must be surfaced, never swallowed.

use serde::{Deserialize, Serialize};

use crate::ports::{SessionPort, SessionTokens};

/// Material returned by the registration call that the machine can spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBundle {
    pub email: String,
    pub tokens: Option<SessionTokens>,
    pub temporary_password: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPath {
    Direct,
    PasswordFallback,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Established { path: SessionPath, tokens: SessionTokens },
    /// Both paths failed: the supplier is registered but unauthenticated
    /// and must be told to log in manually.
    ManualLoginRequired,
}

enum AttemptState {
    DirectSession,
    PasswordFallback,
    Failed,
}

pub async fn establish_session(port: &dyn SessionPort, bundle: &SessionBundle) -> SessionOutcome {
    let mut state = AttemptState::DirectSession;

    loop {
        match state {
            AttemptState::DirectSession => {
                if let Some(tokens) = &bundle.tokens {
                    if port.set_session(tokens).await.is_ok() {
                        return SessionOutcome::Established {
                            path: SessionPath::Direct,
                            tokens: tokens.clone(),
                        };
                    }
                }
                state = AttemptState::PasswordFallback;
            }
            AttemptState::PasswordFallback => {
                if let Some(password) = &bundle.temporary_password {
                    if let Ok(tokens) =
                        port.sign_in_with_password(&bundle.email, password).await
                    {
                        return SessionOutcome::Established {
                            path: SessionPath::PasswordFallback,
                            tokens,
                        };
                    }
                }
                state = AttemptState::Failed;
            }
            AttemptState::Failed => return SessionOutcome::ManualLoginRequired,
        }
    }
}
