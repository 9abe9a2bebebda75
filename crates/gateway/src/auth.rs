use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use cotar_core::config::AuthConfig;
use cotar_core::ports::{GatewayError, SessionPort, SessionTokens};

/// Auth-provider session surface. Both operations are plain JSON calls;
/// the service key travels in a header and never appears in logs.
pub struct HttpSessionGateway {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Serialize)]
struct SetSessionRequest<'a> {
    access_token: &'a str,
    refresh_token: &'a str,
}

#[derive(Serialize)]
struct PasswordSignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

impl HttpSessionGateway {
    pub fn new(config: &AuthConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.expose_secret().to_string(),
        }
    }
}

#[async_trait]
impl SessionPort for HttpSessionGateway {
    async fn set_session(&self, tokens: &SessionTokens) -> Result<(), GatewayError> {
        let url = format!("{}/auth/v1/session", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .json(&SetSessionRequest {
                access_token: &tokens.access_token,
                refresh_token: &tokens.refresh_token,
            })
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(GatewayError::Remote(format!("session rejected with {}", response.status())))
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SessionTokens, GatewayError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.service_key)
            .json(&PasswordSignInRequest { email, password })
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Remote(format!(
                "password sign-in rejected with {}",
                response.status()
            )));
        }

        let pair: TokenPairResponse =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        Ok(SessionTokens { access_token: pair.access_token, refresh_token: pair.refresh_token })
    }
}
