//! Fence stripping and schema validation of oracle output
//!
//! Oracle text is untrusted. Every structured response goes through
//! `strip_fences`, a serde parse, and a validation step, producing either the
//! typed value or a `ParseFailure` the caller branches on.

use super::models::{Decomposition, Verdict, VerdictStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

/// A code fence. A word after the backticks is only a language tag when the
/// line ends there (```json, ```SPARQL); otherwise only the backticks go.
static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```[a-z0-9_+\-]*[ \t]*(?:\r?\n|$)|```").unwrap());

pub(crate) static ENTITY_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Q[1-9][0-9]*$").unwrap());
pub(crate) static PROPERTY_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^P[1-9][0-9]*$").unwrap());

/// Oracle output did not match the expected shape
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
}

impl ParseFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Remove every code fence marker and surrounding whitespace.
///
/// Works whether the response has one fence pair, an unbalanced fence, or
/// none at all; applying it twice gives the same result as once.
pub fn strip_fences(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

/// Strip fences and deserialize as JSON
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    let cleaned = strip_fences(raw);
    if cleaned.is_empty() {
        return Err(ParseFailure::new("response was empty after removing code fences"));
    }

    serde_json::from_str(&cleaned).map_err(|e| ParseFailure::new(format!("invalid JSON: {}", e)))
}

/// Parse and validate a claim decomposition
pub fn parse_decomposition(raw: &str) -> Result<Decomposition, ParseFailure> {
    let mut decomposition: Decomposition = parse_structured(raw)?;

    for (field, value) in [
        ("subject", &decomposition.subject),
        ("property", &decomposition.property),
        ("object", &decomposition.object),
    ] {
        if value.trim().is_empty() {
            return Err(ParseFailure::new(format!("field '{}' is empty", field)));
        }
    }

    decomposition.property_code =
        normalize_identifier(decomposition.property_code.take(), &PROPERTY_CODE, "propertyCode");
    decomposition.subject_entity_id = normalize_identifier(
        decomposition.subject_entity_id.take(),
        &ENTITY_ID,
        "subjectEntityId",
    );
    decomposition.object_entity_id = normalize_identifier(
        decomposition.object_entity_id.take(),
        &ENTITY_ID,
        "objectEntityId",
    );

    Ok(decomposition)
}

/// Accept `P36`, `wdt:P36`, `wd:Q17` or a full entity URI; drop anything else.
///
/// A bad identifier only weakens the query prompt, so it is discarded rather
/// than failing the whole decomposition.
fn normalize_identifier(value: Option<String>, pattern: &Regex, field: &str) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed)
        .to_uppercase();

    if pattern.is_match(&candidate) {
        Some(candidate)
    } else {
        warn!("Discarding malformed {} ({} chars)", field, trimmed.chars().count());
        None
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    status: String,
    confidence: f64,
    #[serde(default)]
    explanation: String,
}

/// Parse and validate a synthesized verdict.
///
/// Status is matched case-insensitively; confidence is rounded and clamped
/// into 0..=100.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ParseFailure> {
    let raw_verdict: RawVerdict = parse_structured(raw)?;

    let status = match raw_verdict.status.trim().to_lowercase().as_str() {
        "verified" => VerdictStatus::Verified,
        "unverified" => VerdictStatus::Unverified,
        other => {
            return Err(ParseFailure::new(format!("unknown status '{}'", other)));
        }
    };

    if !raw_verdict.confidence.is_finite() {
        return Err(ParseFailure::new("confidence is not a finite number"));
    }

    let rounded = raw_verdict.confidence.round();
    if !(0.0..=100.0).contains(&rounded) {
        warn!("Clamping out-of-range confidence {}", raw_verdict.confidence);
    }
    let confidence = rounded.clamp(0.0, 100.0) as u8;

    let explanation = raw_verdict.explanation.trim().to_string();
    if explanation.is_empty() {
        return Err(ParseFailure::new("explanation is empty"));
    }

    Ok(Verdict {
        status,
        confidence,
        explanation,
    })
}
