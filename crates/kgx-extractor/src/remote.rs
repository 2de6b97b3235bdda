//! Remote inference backends
//!
//! Adapters for a GLiNER-style inference server speaking JSON over HTTP.
//! The server owns model loading and device placement; these clients only
//! shape requests, decode responses, and stamp run metadata.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use kgx_core::config::BackendParams;
use kgx_core::{
    Clock, EntityMention, IdSource, KgxError, Result, RunMetadata, SystemClock, UuidIds,
};

use crate::{EntityBackend, RelationBackend};

const DEFAULT_ENDPOINT: &str = "http://localhost:9090";

// ============================================================================
// Shared plumbing
// ============================================================================

fn required_model(params: &BackendParams, backend: &str) -> Result<String> {
    params.model_name.clone().ok_or_else(|| {
        KgxError::Config(format!(
            "{backend} backend requires params.model_name (or params.name)"
        ))
    })
}

fn endpoint(params: &BackendParams) -> String {
    params
        .endpoint
        .clone()
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

fn backend_config(params: &BackendParams, model: &str, endpoint: &str) -> Map<String, Value> {
    let mut config = Map::new();
    config.insert("model_name".to_string(), json!(model));
    if let Some(device) = &params.device {
        config.insert("device".to_string(), json!(device));
    }
    config.insert("endpoint".to_string(), json!(endpoint));
    if !params.extra.is_empty() {
        config.insert("extra".to_string(), Value::Object(params.extra.clone()));
    }
    config
}

async fn read_error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("inference server returned {status}: {body}")
}

// ============================================================================
// NER backend
// ============================================================================

/// Entity-mention backend backed by a remote GLiNER-style server
pub struct RemoteNer {
    client: Client,
    endpoint: String,
    model: String,
    device: Option<String>,
    run_meta: RunMetadata,
    ids: Box<dyn IdSource>,
}

#[derive(Debug, Serialize)]
struct EntitiesRequest<'a> {
    model: &'a str,
    text: &'a str,
    labels: &'a [String],
    threshold: f64,
    include_spans: bool,
    include_confidence: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    /// Entities grouped by label, as the server reports them
    #[serde(default)]
    entities: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

impl RemoteNer {
    pub fn new(params: &BackendParams) -> Result<Self> {
        Self::with_provenance(params, &SystemClock, Box::new(UuidIds))
    }

    /// Construct with explicit provenance sources (tests pin fixtures here)
    pub fn with_provenance(
        params: &BackendParams,
        clock: &dyn Clock,
        ids: Box<dyn IdSource>,
    ) -> Result<Self> {
        let model = required_model(params, "gliner2")?;
        let endpoint = endpoint(params);

        let mut run_meta = RunMetadata::new("ner", "gliner2", clock, ids.as_ref())
            .with_config(backend_config(params, &model, &endpoint));
        run_meta.backend_version = params.version.clone();

        Ok(Self {
            client: Client::new(),
            endpoint,
            model,
            device: params.device.clone(),
            run_meta,
            ids,
        })
    }

    fn flatten(&self, grouped: Map<String, Value>) -> Result<Vec<EntityMention>> {
        let mut mentions = Vec::new();
        for (label, group) in grouped {
            let group: Vec<RawEntity> = serde_json::from_value(group).map_err(|e| {
                KgxError::Backend(format!("malformed entities payload for label {label:?}: {e}"))
            })?;
            for raw in group {
                mentions.push(EntityMention {
                    id: self.ids.new_id("ent"),
                    label: label.clone(),
                    text: raw.text,
                    start: raw.start,
                    end: raw.end,
                    confidence: raw.confidence,
                });
            }
        }
        Ok(mentions)
    }
}

#[async_trait]
impl EntityBackend for RemoteNer {
    fn name(&self) -> &str {
        "gliner2"
    }

    fn run_meta(&self) -> &RunMetadata {
        &self.run_meta
    }

    async fn extract(
        &self,
        text: &str,
        labels: &[String],
        threshold: f64,
        spans: bool,
    ) -> Result<Vec<EntityMention>> {
        let request = EntitiesRequest {
            model: &self.model,
            text,
            labels,
            threshold,
            include_spans: spans,
            include_confidence: true,
            device: self.device.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/v1/entities", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| KgxError::Backend(format!("entity request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(KgxError::Backend(read_error_body(response).await));
        }

        let payload: EntitiesResponse = response
            .json()
            .await
            .map_err(|e| KgxError::Backend(format!("malformed entities response: {e}")))?;

        self.flatten(payload.entities)
    }
}

// ============================================================================
// RE backend
// ============================================================================

/// Relation-mention backend backed by a remote GLiNER-style server.
///
/// The response body is returned verbatim; normalization happens in
/// `normalize::RelationNormalizer`.
pub struct RemoteRe {
    client: Client,
    endpoint: String,
    model: String,
    run_meta: RunMetadata,
}

#[derive(Debug, Serialize)]
struct RelationsRequest<'a> {
    model: &'a str,
    text: &'a str,
    relation_types: &'a [String],
    threshold: f64,
    entities: &'a [EntityMention],
}

impl RemoteRe {
    pub fn new(params: &BackendParams) -> Result<Self> {
        Self::with_provenance(params, &SystemClock, &UuidIds)
    }

    /// Construct with explicit provenance sources (tests pin fixtures here)
    pub fn with_provenance(
        params: &BackendParams,
        clock: &dyn Clock,
        ids: &dyn IdSource,
    ) -> Result<Self> {
        let model = required_model(params, "gliner2_re")?;
        let endpoint = endpoint(params);

        let mut run_meta = RunMetadata::new("re", "gliner2_re", clock, ids)
            .with_config(backend_config(params, &model, &endpoint));
        run_meta.backend_version = params.version.clone();

        Ok(Self {
            client: Client::new(),
            endpoint,
            model,
            run_meta,
        })
    }
}

#[async_trait]
impl RelationBackend for RemoteRe {
    fn name(&self) -> &str {
        "gliner2_re"
    }

    fn run_meta(&self) -> &RunMetadata {
        &self.run_meta
    }

    async fn extract(
        &self,
        text: &str,
        entities: &[EntityMention],
        relation_types: &[String],
        threshold: f64,
    ) -> Result<Value> {
        let request = RelationsRequest {
            model: &self.model,
            text,
            relation_types,
            threshold,
            entities,
        };

        let response = self
            .client
            .post(format!("{}/v1/relations", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| KgxError::Backend(format!("relation request failed: {e}")))?;

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
        ) {
            return Err(KgxError::Backend(
                "inference server does not expose a relations endpoint".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(KgxError::Backend(read_error_body(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| KgxError::Backend(format!("malformed relations response: {e}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
