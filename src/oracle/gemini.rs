//! Google Gemini `generateContent` client

use super::{Oracle, OracleError};
use crate::config::OracleConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Oracle backed by the Gemini REST API
pub struct GeminiOracle {
    client: Client,
    config: OracleConfig,
    api_key: SecretString,
}

impl GeminiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            OracleError::Initialization("Gemini API key is not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Initialization(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint().trim_end_matches('/'),
            self.config.model()
        )
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        debug!("Sending {} byte prompt to {}", prompt.len(), self.config.model());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(OracleError::Api(format!("HTTP {}", status)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Api(format!("Failed to parse response: {}", e)))?;

        let text = body
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
            return Err(OracleError::EmptyResponse);
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
