//! Backend registry
//!
//! Explicit mapping from backend name to constructor function, populated at
//! process start. Lookup failure is a configuration error that names the
//! registered backends.

use std::collections::HashMap;

use kgx_core::config::{AppConfig, BackendParams};
use kgx_core::{KgxError, Result};

use crate::remote::{RemoteNer, RemoteRe};
use crate::{EntityBackend, RelationBackend};

type NerBuilder = fn(&BackendParams) -> Result<Box<dyn EntityBackend>>;
type ReBuilder = fn(&BackendParams) -> Result<Box<dyn RelationBackend>>;

/// Create extractor backends from externalized config.
///
/// Expected config shape (TOML):
///
/// ```toml
/// [extraction.ner]
/// backend = "gliner2"
/// [extraction.ner.params]
/// model_name = "..."
///
/// [extraction.re]
/// backend = "none" # or "gliner2_re"
/// ```
#[derive(Default)]
pub struct ExtractorRegistry {
    ner: HashMap<&'static str, NerBuilder>,
    re: HashMap<&'static str, ReBuilder>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in backends
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register_ner("gliner2", |params| Ok(Box::new(RemoteNer::new(params)?)));
        registry.register_re("gliner2_re", |params| Ok(Box::new(RemoteRe::new(params)?)));
        registry
    }

    pub fn register_ner(&mut self, backend: &'static str, builder: NerBuilder) {
        self.ner.insert(backend, builder);
    }

    pub fn register_re(&mut self, backend: &'static str, builder: ReBuilder) {
        self.re.insert(backend, builder);
    }

    /// Construct the configured NER backend
    pub fn create_ner(&self, config: &AppConfig) -> Result<Box<dyn EntityBackend>> {
        let selection = &config.extraction.ner;
        let builder = self.ner.get(selection.backend.as_str()).ok_or_else(|| {
            KgxError::Config(format!(
                "Unknown NER backend {:?}. Registered: {:?}",
                selection.backend,
                sorted_names(&self.ner)
            ))
        })?;
        builder(&selection.params)
    }

    /// Construct the configured RE backend
    pub fn create_re(&self, config: &AppConfig) -> Result<Box<dyn RelationBackend>> {
        let selection = &config.extraction.re;
        let builder = self.re.get(selection.backend.as_str()).ok_or_else(|| {
            KgxError::Config(format!(
                "Unknown RE backend {:?}. Registered: {:?}",
                selection.backend,
                sorted_names(&self.re)
            ))
        })?;
        builder(&selection.params)
    }
}

fn sorted_names<T>(backends: &HashMap<&'static str, T>) -> Vec<&'static str> {
    let mut names: Vec<_> = backends.keys().copied().collect();
    names.sort_unstable();
    names
}
