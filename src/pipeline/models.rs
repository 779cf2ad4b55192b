//! Data models for the verification pipeline

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Which side of the claim the knowledge query starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryDirection {
    #[serde(alias = "Subject", alias = "SUBJECT")]
    Subject,
    #[serde(alias = "Object", alias = "OBJECT")]
    Object,
}

impl QueryDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryDirection::Subject => "subject",
            QueryDirection::Object => "object",
        }
    }
}

/// Structured breakdown of a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decomposition {
    pub subject: String,
    pub property: String,
    pub object: String,
    pub query_direction: QueryDirection,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_entity_id: Option<String>,
}

impl Decomposition {
    /// Label and entity id of the side the query starts from
    pub fn anchor(&self) -> (&str, Option<&str>) {
        match self.query_direction {
            QueryDirection::Subject => (self.subject.as_str(), self.subject_entity_id.as_deref()),
            QueryDirection::Object => (self.object.as_str(), self.object_entity_id.as_deref()),
        }
    }

    /// Label and entity id of the side the evidence should contain
    pub fn target(&self) -> (&str, Option<&str>) {
        match self.query_direction {
            QueryDirection::Subject => (self.object.as_str(), self.object_entity_id.as_deref()),
            QueryDirection::Object => (self.subject.as_str(), self.subject_entity_id.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Verified,
    Unverified,
}

/// Synthesized verdict, already validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub confidence: u8,
    pub explanation: String,
}

/// Public output of a verification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    pub confidence: u8,
    pub explanation: String,
    pub source: String,
}

impl VerificationResult {
    pub fn from_verdict(verdict: Verdict, source: &str) -> Self {
        Self {
            verified: verdict.status == VerdictStatus::Verified,
            confidence: verdict.confidence.min(100),
            explanation: verdict.explanation,
            source: source.to_string(),
        }
    }

    /// Negative result for a run that stopped early
    pub fn unverified(confidence: u8, explanation: impl Into<String>, source: &str) -> Self {
        Self {
            verified: false,
            confidence: confidence.min(100),
            explanation: explanation.into(),
            source: source.to_string(),
        }
    }
}

/// Confidence rubric given to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub const ALL: [ConfidenceBand; 3] = [
        ConfidenceBand::High,
        ConfidenceBand::Medium,
        ConfidenceBand::Low,
    ];

    pub fn range(&self) -> RangeInclusive<u8> {
        match self {
            ConfidenceBand::High => 80..=95,
            ConfidenceBand::Medium => 50..=75,
            ConfidenceBand::Low => 10..=40,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "the evidence clearly and directly matches the claim",
            ConfidenceBand::Medium => "the evidence reasonably supports the claim but only partially matches it",
            ConfidenceBand::Low => "the evidence is weak, indirect, or contradicts the claim",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }

    /// Band containing `confidence`; scores between bands have none
    pub fn classify(confidence: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|band| band.range().contains(&confidence))
    }
}
