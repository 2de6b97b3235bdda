//! Run metadata
//!
//! Provenance for one extraction invocation: which backend ran, when, and
//! with what configuration. Timestamps and identifiers come from injectable
//! sources so callers can pin deterministic fixtures in tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Injectable clock and identifier source
// ============================================================================

/// Source of the current UTC time
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of fresh, globally unique identifiers
pub trait IdSource: Send + Sync {
    /// Mint an identifier carrying the given prefix (e.g. `rel_` for
    /// relation mentions, `ner_` for NER runs)
    fn new_id(&self, prefix: &str) -> String;
}

/// Random v4 UUID identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn new_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4().simple())
    }
}

// ============================================================================
// Run metadata record
// ============================================================================

/// Provenance record attached to one extraction invocation.
///
/// Serializes to a mapping with null-valued fields dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Unique run identifier
    pub run_id: String,

    /// When the backend instance was created
    pub timestamp_utc: DateTime<Utc>,

    /// Stable backend name
    pub backend: String,

    /// Backend version, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,

    /// Configuration the backend was constructed with
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl RunMetadata {
    /// Stamp a new run record for a backend
    pub fn new(
        run_prefix: &str,
        backend: impl Into<String>,
        clock: &dyn Clock,
        ids: &dyn IdSource,
    ) -> Self {
        Self {
            run_id: ids.new_id(run_prefix),
            timestamp_utc: clock.now_utc(),
            backend: backend.into(),
            backend_version: None,
            config: serde_json::Map::new(),
        }
    }

    /// Record the backend configuration
    pub fn with_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
        self.config = config;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
