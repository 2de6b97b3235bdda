//! KGX Core - Domain models and shared types
//!
//! This crate defines the core abstractions used throughout the KGX system:
//! - Mention models (entity mentions, relation mentions, evidence)
//! - Common error types
//! - Configuration management
//! - Run metadata (provenance for one extraction invocation)

pub mod config;
pub mod metadata;

pub use config::{AppConfig, BackendConfig, BackendParams, ConfigError, ExtractionConfig};
pub use metadata::{Clock, IdSource, RunMetadata, SystemClock, UuidIds};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for KGX operations
#[derive(Error, Debug)]
pub enum KgxError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, KgxError>;

// ============================================================================
// Mention Models
// ============================================================================

/// A single entity occurrence within a segment, produced by the NER stage.
///
/// `start`/`end` are 0-based character offsets into the segment text,
/// `start <= end` when both are present. Offsets are optional; a mention
/// without them still participates in relation extraction, it just cannot
/// anchor derived evidence spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Stable identifier, unique within a segment
    pub id: String,

    /// Entity label (e.g. "organization")
    pub label: String,

    /// Surface text of the mention
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl EntityMention {
    /// Create a mention without offsets or confidence
    pub fn new(id: impl Into<String>, label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            text: text.into(),
            start: None,
            end: None,
            confidence: None,
        }
    }

    /// Set character offsets
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Set confidence score
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Both offsets, when present
    pub fn span(&self) -> Option<(usize, usize)> {
        self.start.zip(self.end)
    }
}

/// One endpoint of a relation mention, resolved to an entity mention id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationEndpoint {
    pub mention_id: String,
}

impl RelationEndpoint {
    pub fn new(mention_id: impl Into<String>) -> Self {
        Self {
            mention_id: mention_id.into(),
        }
    }
}

/// A validated relation between two entity mentions.
///
/// Created exclusively by the relation normalizer and never mutated.
/// Both endpoints reference ids from the entity sequence of the same
/// extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationMention {
    /// Unique identifier
    pub id: String,

    /// Relation type, always non-empty
    #[serde(rename = "type")]
    pub relation_type: String,

    /// Confidence score, absent when the backend supplied none or an
    /// uncoercible value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    pub subject: RelationEndpoint,

    pub object: RelationEndpoint,

    /// Supporting evidence, possibly empty
    #[serde(default)]
    pub evidence: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// Extraction Output
// ============================================================================

/// Provenance records for the backends that produced one segment extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub ner: RunMetadata,

    /// Present only when the relation stage actually ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub re: Option<RunMetadata>,
}

/// The full result of one extraction call over one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentExtraction {
    pub run: RunInfo,
    pub entity_mentions: Vec<EntityMention>,
    pub relation_mentions: Vec<RelationMention>,
}

// ============================================================================
// Tests
// ============================================================================
