//! End-to-end pipeline scenarios over the public API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use kgx_core::config::ExtractionConfig;
use kgx_core::{EntityMention, Result, RunMetadata, SystemClock, UuidIds};
use kgx_extractor::{EntityBackend, ExtractionPipeline, RelationBackend};

const TEXT: &str = "Apple Inc. CEO Tim Cook announced the new iPhone 15 in Cupertino.";

struct FixtureNer {
    run_meta: RunMetadata,
}

impl FixtureNer {
    fn new() -> Self {
        Self {
            run_meta: RunMetadata::new("ner", "fixture", &SystemClock, &UuidIds),
        }
    }
}

#[async_trait]
impl EntityBackend for FixtureNer {
    fn name(&self) -> &str {
        "fixture"
    }

    fn run_meta(&self) -> &RunMetadata {
        &self.run_meta
    }

    async fn extract(
        &self,
        _text: &str,
        _labels: &[String],
        _threshold: f64,
        _spans: bool,
    ) -> Result<Vec<EntityMention>> {
        Ok(vec![
            EntityMention::new("e1", "organization", "Apple Inc.").with_span(0, 10),
            EntityMention::new("e2", "person", "Tim Cook").with_span(15, 23),
        ])
    }
}

struct FixtureRe {
    raw: Value,
    calls: Arc<AtomicUsize>,
    run_meta: RunMetadata,
}

impl FixtureRe {
    fn new(raw: Value) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Self {
            raw,
            calls: Arc::clone(&calls),
            run_meta: RunMetadata::new("re", "fixture_re", &SystemClock, &UuidIds),
        };
        (backend, calls)
    }
}

#[async_trait]
impl RelationBackend for FixtureRe {
    fn name(&self) -> &str {
        "fixture_re"
    }

    fn run_meta(&self) -> &RunMetadata {
        &self.run_meta
    }

    async fn extract(
        &self,
        _text: &str,
        _entities: &[EntityMention],
        _relation_types: &[String],
        _threshold: f64,
    ) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.raw.clone())
    }
}

fn config(relation_types: &[&str]) -> ExtractionConfig {
    ExtractionConfig {
        relation_types: relation_types.iter().map(|s| s.to_string()).collect(),
        ..ExtractionConfig::default()
    }
}

#[tokio::test]
async fn extracts_and_normalizes_a_segment() {
    let (re, _) = FixtureRe::new(json!([
        {"head": "e1", "tail": "e2", "relation": "has_ceo", "confidence": 0.91}
    ]));
    let pipeline = ExtractionPipeline::new(
        Box::new(FixtureNer::new()),
        Some(Box::new(re)),
        config(&["has_ceo"]),
    );

    let result = pipeline.extract(TEXT).await.unwrap();

    assert_eq!(result.entity_mentions.len(), 2);
    assert_eq!(result.relation_mentions.len(), 1);

    let relation = &result.relation_mentions[0];
    assert_eq!(relation.relation_type, "has_ceo");
    assert_eq!(relation.confidence, Some(0.91));
    assert_eq!(relation.subject.mention_id, "e1");
    assert_eq!(relation.object.mention_id, "e2");
    assert_eq!(relation.evidence["span"], json!([0, 23]));
    assert_eq!(relation.evidence["snippet"], "Apple Inc. CEO Tim Cook");

    assert!(result.run.ner.run_id.starts_with("ner_"));
    assert_eq!(result.run.re.as_ref().unwrap().backend, "fixture_re");
}

#[tokio::test]
async fn drops_relations_with_dangling_endpoints() {
    let (re, _) = FixtureRe::new(json!([
        {"head": "e1", "tail": "e2", "relation": "has_ceo"},
        {"head": "e1", "tail": 99, "relation": "broken"},
    ]));
    let pipeline = ExtractionPipeline::new(
        Box::new(FixtureNer::new()),
        Some(Box::new(re)),
        config(&["has_ceo", "broken"]),
    );

    let result = pipeline.extract(TEXT).await.unwrap();

    assert_eq!(result.relation_mentions.len(), 1);
    assert_eq!(result.relation_mentions[0].relation_type, "has_ceo");
}

#[tokio::test]
async fn empty_vocabulary_short_circuits_without_backend_call() {
    let (re, calls) = FixtureRe::new(json!([["e1", "e2", "has_ceo"]]));
    let pipeline = ExtractionPipeline::new(
        Box::new(FixtureNer::new()),
        Some(Box::new(re)),
        config(&[]),
    );

    let result = pipeline.extract(TEXT).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(result.relation_mentions.is_empty());
    assert!(result.run.re.is_none());
}

#[tokio::test]
async fn serialized_output_has_the_run_document_shape() {
    let (re, _) = FixtureRe::new(json!({"relations": [["e1", "e2", "has_ceo", "0.87"]]}));
    let pipeline = ExtractionPipeline::new(
        Box::new(FixtureNer::new()),
        Some(Box::new(re)),
        config(&["has_ceo"]),
    );

    let result = pipeline.extract(TEXT).await.unwrap();
    let value = serde_json::to_value(&result).unwrap();

    assert!(value["run"]["ner"]["run_id"].is_string());
    assert_eq!(value["entity_mentions"][0]["id"], "e1");
    assert_eq!(value["relation_mentions"][0]["type"], "has_ceo");
    assert_eq!(value["relation_mentions"][0]["confidence"], 0.87);
}
