//! KGX Extractor - Mention extraction pipeline
//!
//! Implements pluggable Named Entity Recognition (NER) and Relation
//! Extraction (RE) backends, plus the normalization layer that turns raw
//! backend output into validated relation mentions.

use async_trait::async_trait;
use serde_json::Value;

use kgx_core::{EntityMention, Result, RunMetadata};

/// Trait for entity-mention backends (the NER stage)
#[async_trait]
pub trait EntityBackend: Send + Sync {
    /// Stable backend name, as used in configuration
    fn name(&self) -> &str;

    /// Provenance record for this backend instance
    fn run_meta(&self) -> &RunMetadata;

    /// Extract entity mentions from one segment
    async fn extract(
        &self,
        text: &str,
        labels: &[String],
        threshold: f64,
        spans: bool,
    ) -> Result<Vec<EntityMention>>;
}

/// Trait for relation-mention backends (the RE stage).
///
/// The payload comes back verbatim as JSON; backends disagree wildly on
/// shape, and the normalizer owns turning it into `RelationMention` records.
#[async_trait]
pub trait RelationBackend: Send + Sync {
    /// Stable backend name, as used in configuration
    fn name(&self) -> &str;

    /// Provenance record for this backend instance
    fn run_meta(&self) -> &RunMetadata;

    /// Extract raw relations between the given mentions
    async fn extract(
        &self,
        text: &str,
        entities: &[EntityMention],
        relation_types: &[String],
        threshold: f64,
    ) -> Result<Value>;
}

pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod remote;

pub use normalize::RelationNormalizer;
pub use pipeline::ExtractionPipeline;
pub use registry::ExtractorRegistry;
