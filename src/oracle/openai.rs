//! OpenAI-compatible chat-completions client

use super::{Oracle, OracleError};
use crate::config::OracleConfig;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const SYSTEM_PROMPT: &str =
    "You are a precise assistant for fact verification. Follow the output format exactly.";

/// Oracle backed by an OpenAI-compatible API (OpenAI, OpenRouter, vLLM, Ollama)
pub struct OpenAiOracle {
    client: Client,
    config: OracleConfig,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| OracleError::Initialization(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = ChatCompletionRequest {
            model: self.config.model().to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
        };

        debug!("Sending {} byte prompt to {}", prompt.len(), self.config.model());

        let mut req = self.client.post(self.config.endpoint()).json(&request);

        // Local servers usually run without a key
        if let Some(ref api_key) = self.config.api_key {
            req = req.bearer_auth(api_key.expose_secret());
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Chat completion API error {}: {}", status, body);
            return Err(OracleError::Api(format!("HTTP {}", status)));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Api(format!("Failed to parse response: {}", e)))?;

        match body.choices.into_iter().next() {
            Some(choice) if !choice.message.content.trim().is_empty() => Ok(choice.message.content),
            _ => Err(OracleError::EmptyResponse),
        }
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OracleProvider;
    use secrecy::SecretString;

    fn config_for(url: String) -> OracleConfig {
        OracleConfig {
            provider: OracleProvider::OpenAi,
            endpoint: Some(url),
            ..OracleConfig::default()
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"{\"status\":\"verified\"}"}}]}"#,
            )
            .create_async()
            .await;

        let mut config = config_for(format!("{}/v1/chat/completions", server.url()));
        config.api_key = Some(SecretString::new("sk-test".to_string()));

        let oracle = OpenAiOracle::new(config).unwrap();
        let text = oracle.complete("prompt").await.unwrap();

        assert_eq!(text, r#"{"status":"verified"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let oracle =
            OpenAiOracle::new(config_for(format!("{}/v1/chat/completions", server.url()))).unwrap();

        assert!(matches!(
            oracle.complete("prompt").await,
            Err(OracleError::EmptyResponse)
        ));
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        let mut config = config_for("http://127.0.0.1:9/v1/chat/completions".to_string());
        config.timeout_ms = 500;
        let oracle = OpenAiOracle::new(config).unwrap();

        let result = tokio_test::block_on(oracle.complete("prompt"));
        assert!(matches!(
            result,
            Err(OracleError::Network(_)) | Err(OracleError::Timeout(_))
        ));
    }
}
