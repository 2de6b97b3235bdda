//! Segment extraction pipeline
//!
//! Runs NER, optionally RE, and relation normalization over one text
//! segment, and assembles the run document with provenance for each stage.

use tracing::debug;

use kgx_core::config::{AppConfig, ExtractionConfig};
use kgx_core::{EntityMention, Result, RunInfo, SegmentExtraction};

use crate::normalize::RelationNormalizer;
use crate::registry::ExtractorRegistry;
use crate::{EntityBackend, RelationBackend};

/// One configured extraction pipeline.
///
/// Pipelines hold no cross-call state; extracting different segments from
/// separate pipelines (or the same one behind a shared reference) is safe.
pub struct ExtractionPipeline {
    ner: Box<dyn EntityBackend>,
    re: Option<Box<dyn RelationBackend>>,
    normalizer: RelationNormalizer,
    config: ExtractionConfig,
}

impl ExtractionPipeline {
    /// Wire a pipeline from configuration.
    ///
    /// The RE stage is constructed only when relation types are configured
    /// and the RE backend is not disabled; a misconfigured backend fails
    /// here, eagerly.
    pub fn from_config(registry: &ExtractorRegistry, config: &AppConfig) -> Result<Self> {
        let ner = registry.create_ner(config)?;
        let extraction = config.extraction.clone();

        let re = if extraction.relation_types.is_empty() || extraction.re.is_disabled() {
            None
        } else {
            Some(registry.create_re(config)?)
        };

        Ok(Self::new(ner, re, extraction))
    }

    /// Assemble a pipeline from already-constructed backends
    pub fn new(
        ner: Box<dyn EntityBackend>,
        re: Option<Box<dyn RelationBackend>>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            ner,
            re,
            normalizer: RelationNormalizer::default(),
            config,
        }
    }

    /// Replace the relation normalizer (tests pin the id source here)
    pub fn with_normalizer(mut self, normalizer: RelationNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Extract entity and relation mentions from one segment
    pub async fn extract(&self, text: &str) -> Result<SegmentExtraction> {
        let entities = self
            .ner
            .extract(
                text,
                &self.config.entity_labels,
                self.config.ner_threshold,
                self.config.with_spans,
            )
            .await?;
        debug!(
            backend = self.ner.name(),
            count = entities.len(),
            "entity mentions extracted"
        );

        let mut relations = Vec::new();
        let mut re_meta = None;

        if let Some(re) = self.relation_stage(&entities) {
            let raw = re
                .extract(
                    text,
                    &entities,
                    &self.config.relation_types,
                    self.config.re_threshold,
                )
                .await?;
            relations = self.normalizer.normalize(&raw, &entities, text);
            re_meta = Some(re.run_meta().clone());
            debug!(
                backend = re.name(),
                count = relations.len(),
                "relation mentions normalized"
            );
        }

        Ok(SegmentExtraction {
            run: RunInfo {
                ner: self.ner.run_meta().clone(),
                re: re_meta,
            },
            entity_mentions: entities,
            relation_mentions: relations,
        })
    }

    /// The RE backend runs only with a non-empty relation-type vocabulary
    /// and at least one entity mention to anchor endpoints on.
    fn relation_stage(&self, entities: &[EntityMention]) -> Option<&dyn RelationBackend> {
        if self.config.relation_types.is_empty() || entities.is_empty() {
            return None;
        }
        self.re.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================
