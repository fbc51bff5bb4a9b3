//! Gemini `generateContent` client producing license contracts

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::LicenseConfig,
    license::{LicenseError, LicenseGenerator, LicenseRequest},
};

const USER_AGENT: &str = concat!("muvuka/", env!("CARGO_PKG_VERSION"));

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

pub struct GeminiLicenseClient {
    http_client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiLicenseClient {
    pub fn new(config: &LicenseConfig, api_key: String) -> Result<Self, LicenseError> {
        let http_client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LicenseError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

/// Contract prompt, in Angolan Portuguese
pub fn license_prompt(request: &LicenseRequest) -> String {
    format!(
        "Gere um contrato de licença de uso musical profissional (em português de Angola) \
         para a obra intitulada \"{}\" produzida por \"{}\". O comprador é \"{}\". \
         O contrato deve incluir: concessão de direitos, limitações de uso comercial, \
         duração vitalícia e validade jurídica. Seja formal e use termos jurídicos \
         apropriados para o mercado musical.",
        request.track_title, request.artist_name, request.buyer_name
    )
}

impl LicenseGenerator for GeminiLicenseClient {
    fn generate(&self, request: &LicenseRequest) -> Result<String, LicenseError> {
        let url = self.url();
        debug!("requesting license from {url}");

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(license_prompt(request)),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| LicenseError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(LicenseError::Api(status.as_u16(), error_text));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| LicenseError::Parse(e.to_string()))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LicenseError::Empty);
        }
        Ok(text)
    }
}
