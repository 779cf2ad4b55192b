//! Configuration for the claim verifier
//!
//! Values come from (lowest to highest precedence): built-in defaults, an
//! optional TOML file, `VERIFIER__SECTION__KEY` environment variables, and a
//! handful of well-known variables such as `GEMINI_API_KEY`.

use crate::error::{Result, VerifierError};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifierConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// External glossary table; the built-in table is used when unset
    #[serde(default)]
    pub glossary_path: Option<PathBuf>,
}

/// HTTP API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Longest claim accepted by the API, in characters
    #[serde(default = "default_max_claim_chars")]
    pub max_claim_chars: usize,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8081 }
fn default_max_claim_chars() -> usize { 500 }
fn default_body_limit() -> usize { 16 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_claim_chars: default_max_claim_chars(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which completion API the oracle talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    Gemini,
    #[serde(alias = "openai-compatible")]
    OpenAi,
}

impl OracleProvider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            OracleProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            OracleProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            OracleProvider::Gemini => "gemini-2.0-flash",
            OracleProvider::OpenAi => "gpt-4o-mini",
        }
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(OracleProvider::Gemini),
            "openai" | "openai-compatible" => Ok(OracleProvider::OpenAi),
            other => Err(VerifierError::Config(format!("unknown oracle provider: {}", other))),
        }
    }
}

/// Text-completion oracle settings
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_provider")]
    pub provider: OracleProvider,

    /// Model name; the provider default is used when unset
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL (Gemini) or full chat-completions URL (OpenAI-compatible)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_oracle_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider() -> OracleProvider { OracleProvider::Gemini }
fn default_oracle_timeout_ms() -> u64 { 30_000 }
fn default_temperature() -> f32 { 0.1 }

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            endpoint: None,
            api_key: None,
            timeout_ms: default_oracle_timeout_ms(),
            temperature: default_temperature(),
        }
    }
}

impl OracleConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// SPARQL knowledge endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_sparql_endpoint")]
    pub endpoint: String,

    /// Name reported as `source` on every result
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Wikidata rejects requests without a descriptive user agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_knowledge_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_sparql_endpoint() -> String { "https://query.wikidata.org/sparql".to_string() }
fn default_source_name() -> String { "Wikidata".to_string() }
fn default_user_agent() -> String {
    format!("claim-verifier/{} (reqwest)", env!("CARGO_PKG_VERSION"))
}
fn default_knowledge_timeout_ms() -> u64 { 20_000 }

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sparql_endpoint(),
            source_name: default_source_name(),
            user_agent: default_user_agent(),
            timeout_ms: default_knowledge_timeout_ms(),
        }
    }
}

impl KnowledgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Log a fingerprint of each claim instead of its text
    #[serde(default)]
    pub redact_claims: bool,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> LogFormat { LogFormat::Pretty }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            redact_claims: false,
        }
    }
}

impl VerifierConfig {
    /// Load from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Load from an optional file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("VERIFIER").separator("__"),
            )
            .build()?;

        let config: VerifierConfig = settings.try_deserialize()?;
        let config = config.from_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply well-known environment variables on top of the loaded values
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("ORACLE_PROVIDER") {
            if let Ok(provider) = val.parse() {
                self.oracle.provider = provider;
            }
        }

        if let Ok(val) = std::env::var("ORACLE_MODEL") {
            self.oracle.model = Some(val);
        }

        if self.oracle.api_key.is_none() {
            let key_var = match self.oracle.provider {
                OracleProvider::Gemini => "GEMINI_API_KEY",
                OracleProvider::OpenAi => "OPENAI_API_KEY",
            };
            if let Ok(val) = std::env::var(key_var) {
                self.oracle.api_key = Some(SecretString::new(val));
            }
        }

        if let Ok(val) = std::env::var("ORACLE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.oracle.timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("WIKIDATA_SPARQL_URL") {
            self.knowledge.endpoint = val;
        }

        if let Ok(val) = std::env::var("KNOWLEDGE_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.knowledge.timeout_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("VERIFIER_GLOSSARY_PATH") {
            self.glossary_path = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        self
    }

    /// Reject values the clients cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.oracle.timeout_ms == 0 || self.knowledge.timeout_ms == 0 {
            return Err(VerifierError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        if self.server.max_claim_chars == 0 {
            return Err(VerifierError::Config(
                "server.max_claim_chars must be greater than zero".to_string(),
            ));
        }

        reqwest::Url::parse(&self.knowledge.endpoint).map_err(|e| {
            VerifierError::Config(format!(
                "invalid knowledge endpoint '{}': {}",
                self.knowledge.endpoint, e
            ))
        })?;

        if self.knowledge.source_name.trim().is_empty() {
            return Err(VerifierError::Config(
                "knowledge.source_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
