//! Entity/property glossary used to ground the extraction and query prompts
//!
//! The table is versioned and loaded from TOML. A default copy ships inside
//! the binary (`config/glossary.toml`); deployments can point
//! `glossary_path` at their own file.

use crate::pipeline::parsing::{ENTITY_ID, PROPERTY_CODE};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_GLOSSARY: &str = include_str!("../config/glossary.toml");

/// Glossary loading errors
#[derive(Debug, thiserror::Error)]
pub enum GlossaryError {
    #[error("Failed to load glossary: {0}")]
    Load(String),

    #[error("Invalid glossary entry: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for GlossaryError {
    fn from(e: config::ConfigError) -> Self {
        GlossaryError::Load(e.to_string())
    }
}

/// Known knowledge-base entity
#[derive(Debug, Clone, Deserialize)]
pub struct EntityEntry {
    pub label: String,
    pub id: String,
}

/// Known knowledge-base property
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyEntry {
    pub code: String,
    pub label: String,
}

/// Directional rule, e.g. which side of a "capital of" claim to query
#[derive(Debug, Clone, Deserialize)]
pub struct GuidanceRule {
    pub rule: String,
}

/// Few-shot claim/query pair keyed by property code
#[derive(Debug, Clone, Deserialize)]
pub struct QueryExample {
    pub property: String,
    pub claim: String,
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Glossary {
    pub version: String,

    #[serde(default)]
    pub entities: Vec<EntityEntry>,

    #[serde(default)]
    pub properties: Vec<PropertyEntry>,

    #[serde(default)]
    pub guidance: Vec<GuidanceRule>,

    #[serde(default)]
    pub examples: Vec<QueryExample>,
}

impl Glossary {
    /// The table compiled into the binary
    pub fn builtin() -> Result<Self, GlossaryError> {
        Self::from_toml_str(BUILTIN_GLOSSARY)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, GlossaryError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        let glossary: Glossary = settings.try_deserialize()?;
        glossary.validate()?;
        Ok(glossary)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GlossaryError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let glossary: Glossary = settings.try_deserialize()?;
        glossary.validate()?;
        info!(
            "Loaded glossary {} from {} ({} entities, {} properties)",
            glossary.version,
            path.display(),
            glossary.entities.len(),
            glossary.properties.len()
        );
        Ok(glossary)
    }

    /// External table when a path is given, built-in otherwise
    pub fn load(path: Option<&Path>) -> Result<Self, GlossaryError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("Using built-in glossary");
                Self::builtin()
            }
        }
    }

    fn validate(&self) -> Result<(), GlossaryError> {
        if self.version.trim().is_empty() {
            return Err(GlossaryError::Invalid("version cannot be empty".to_string()));
        }

        for entity in &self.entities {
            if !ENTITY_ID.is_match(&entity.id) {
                return Err(GlossaryError::Invalid(format!(
                    "entity '{}' has malformed id '{}'",
                    entity.label, entity.id
                )));
            }
        }

        for property in &self.properties {
            if !PROPERTY_CODE.is_match(&property.code) {
                return Err(GlossaryError::Invalid(format!(
                    "property '{}' has malformed code '{}'",
                    property.label, property.code
                )));
            }
        }

        for example in &self.examples {
            if !PROPERTY_CODE.is_match(&example.property) {
                return Err(GlossaryError::Invalid(format!(
                    "example '{}' is keyed by malformed code '{}'",
                    example.claim, example.property
                )));
            }
        }

        Ok(())
    }

    pub fn property_label(&self, code: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
            .map(|p| p.label.as_str())
    }

    /// Few-shot examples for a property code.
    ///
    /// Examples keyed by `property_code` come first; the remaining slots are
    /// filled with the other examples in table order.
    pub fn examples_for(&self, property_code: Option<&str>, limit: usize) -> Vec<&QueryExample> {
        let is_match = |e: &QueryExample| {
            property_code
                .map(|code| e.property.eq_ignore_ascii_case(code))
                .unwrap_or(false)
        };

        let matching = self.examples.iter().filter(|e| is_match(e));
        let rest = self.examples.iter().filter(|e| !is_match(e));

        matching.chain(rest).take(limit).collect()
    }

    /// Entities and properties as prompt lines
    pub fn render_reference(&self) -> String {
        let mut out = String::from("Common entities:\n");
        for entity in &self.entities {
            out.push_str(&format!("- {} = wd:{}\n", entity.label, entity.id));
        }

        out.push_str("\nCommon properties:\n");
        for property in &self.properties {
            out.push_str(&format!("- {} = wdt:{}\n", property.label, property.code));
        }

        out
    }

    pub fn render_guidance(&self) -> String {
        self.guidance
            .iter()
            .map(|g| format!("- {}", g.rule))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
