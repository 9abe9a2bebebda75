use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use cotar_core::config::CepConfig;
use cotar_core::ports::{CepAddress, CepLookup, GatewayError};

/// ViaCEP-compatible postal directory client.
pub struct HttpCepLookup {
    client: Client,
    base_url: String,
}

/// ViaCEP signals an unknown code with `{"erro": true}` and HTTP 200.
#[derive(Deserialize)]
struct CepResponse {
    #[serde(default)]
    erro: bool,
    #[serde(default)]
    logradouro: String,
    #[serde(default)]
    bairro: String,
    #[serde(default)]
    localidade: String,
    #[serde(default)]
    uf: String,
}

impl HttpCepLookup {
    pub fn new(config: &CepConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_default();

        Self { client, base_url: config.base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl CepLookup for HttpCepLookup {
    async fn lookup(&self, cep: &str) -> Result<Option<CepAddress>, GatewayError> {
        let url = format!("{}/ws/{cep}/json/", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        // Malformed CEPs come back as 400.
        if response.status().as_u16() == 400 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Remote(format!(
                "cep directory returned {}",
                response.status()
            )));
        }

        let payload: CepResponse =
            response.json().await.map_err(|error| GatewayError::Decode(error.to_string()))?;

        if payload.erro {
            return Ok(None);
        }

        Ok(Some(CepAddress {
            street: payload.logradouro,
            neighborhood: payload.bairro,
            city: payload.localidade,
            state: payload.uf,
        }))
    }
}
