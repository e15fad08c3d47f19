// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! WASM inference runtime.
//!
//! The runtime owns three model slots (error classifier, importance sampler,
//! entity extractor) and exposes one pure inference call per kind. Calls take
//! a feature record and return the model's JSON object result; results are
//! cached per kind by the record's fingerprint.
//!
//! The sandbox backend is the [`InferenceEngine`] trait with one concrete
//! implementation ([`WasmEngine`]); tests substitute scriptable fakes.

mod cache;
mod error;
mod wasm;

pub use cache::{CacheStats, JsonMap, ResultCache};
pub use error::{RuntimeError, RuntimeResult};
pub use wasm::WasmEngine;

use crate::features::FeatureRecord;
use crate::observability::messages::runtime::ResultCachingEnabled;
use crate::observability::messages::StructuredLog;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default memory cap for a model loaded without an explicit spec (reload of
/// a previously unconfigured kind).
const DEFAULT_MEMORY_LIMIT_MB: usize = 100;

/// Default per-call timeout for a model loaded without an explicit spec.
const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// Default TTL for cached inference results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// The three inference kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    ErrorClassifier,
    Sampler,
    EntityExtractor,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::ErrorClassifier,
        ModelKind::Sampler,
        ModelKind::EntityExtractor,
    ];

    /// The WASM export each kind invokes.
    pub fn export_name(self) -> &'static str {
        match self {
            ModelKind::ErrorClassifier => "classify_error",
            ModelKind::Sampler => "sample_telemetry",
            ModelKind::EntityExtractor => "extract_entities",
        }
    }

    /// The configuration/reload name of each kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::ErrorClassifier => "error_classifier",
            ModelKind::Sampler => "sampler",
            ModelKind::EntityExtractor => "entity_extractor",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "error_classifier" => Some(ModelKind::ErrorClassifier),
            "sampler" => Some(ModelKind::Sampler),
            "entity_extractor" => Some(ModelKind::EntityExtractor),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ModelKind::ErrorClassifier => 0,
            ModelKind::Sampler => 1,
            ModelKind::EntityExtractor => 2,
        }
    }
}

/// How to load one model: where it lives and its resource budgets.
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub path: PathBuf,
    pub memory_limit_mb: usize,
    pub timeout: Duration,
}

impl ModelSpec {
    pub fn with_defaults(path: PathBuf) -> Self {
        Self {
            path,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Runtime construction parameters: model specs plus result-cache sizing.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub error_classifier: Option<ModelSpec>,
    pub sampler: Option<ModelSpec>,
    pub entity_extractor: Option<ModelSpec>,
    pub cache_results: bool,
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
}

impl RuntimeConfig {
    fn specs(&self) -> [Option<ModelSpec>; 3] {
        [
            self.error_classifier.clone(),
            self.sampler.clone(),
            self.entity_extractor.clone(),
        ]
    }
}

/// The sandbox backend: one synchronous inference call per kind, atomic
/// per-kind reload, idempotent close.
///
/// Implementations never retry and never mutate their input; errors are
/// returned to the caller, which decides what to do with the affected item.
pub trait InferenceEngine: Send + Sync {
    fn infer(&self, kind: ModelKind, input: &str) -> RuntimeResult<String>;
    fn reload(&self, kind: ModelKind, path: &Path) -> RuntimeResult<()>;
    fn close(&self);
}

/// The public inference runtime: an engine plus per-kind result caches.
pub struct InferenceRuntime {
    engine: Box<dyn InferenceEngine>,
    caches: Option<[ResultCache; 3]>,
}

impl InferenceRuntime {
    /// Build a WASM-backed runtime, loading every configured model.
    pub fn new(config: &RuntimeConfig) -> RuntimeResult<Self> {
        let engine = WasmEngine::new(config.specs())?;
        Ok(Self::with_engine(Box::new(engine), config))
    }

    /// Build a runtime over an arbitrary engine (tests inject fakes here).
    pub fn with_engine(engine: Box<dyn InferenceEngine>, config: &RuntimeConfig) -> Self {
        let caches = if config.cache_results && config.cache_capacity > 0 {
            let ttl = config.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);
            ResultCachingEnabled {
                capacity: config.cache_capacity,
                ttl_seconds: ttl.as_secs(),
            }
            .log();
            Some([
                ResultCache::new(config.cache_capacity, ttl),
                ResultCache::new(config.cache_capacity, ttl),
                ResultCache::new(config.cache_capacity, ttl),
            ])
        } else {
            None
        };
        Self { engine, caches }
    }

    /// Classify an error item using the error-classifier model.
    pub fn classify_error(&self, features: &FeatureRecord) -> RuntimeResult<JsonMap> {
        self.call(ModelKind::ErrorClassifier, features)
    }

    /// Ask the importance sampler for a sampling decision.
    pub fn sample_telemetry(&self, features: &FeatureRecord) -> RuntimeResult<JsonMap> {
        self.call(ModelKind::Sampler, features)
    }

    /// Extract entities from a telemetry item.
    pub fn extract_entities(&self, features: &FeatureRecord) -> RuntimeResult<JsonMap> {
        self.call(ModelKind::EntityExtractor, features)
    }

    fn call(&self, kind: ModelKind, features: &FeatureRecord) -> RuntimeResult<JsonMap> {
        let input = features.canonical_json();
        let fingerprint = crate::telemetry::fnv1a_64(input.as_bytes());

        if let Some(cache) = self.cache(kind) {
            if let Some(hit) = cache.get(fingerprint) {
                return Ok(hit);
            }
        }

        let raw = self.engine.infer(kind, &input)?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| RuntimeError::ResultDecode(e.to_string()))?;
        let result = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(RuntimeError::ResultDecode(format!(
                    "expected JSON object, got {other}"
                )))
            }
        };

        if let Some(cache) = self.cache(kind) {
            cache.put(fingerprint, &result);
        }

        Ok(result)
    }

    /// Atomically replace one model. `kind` uses the configuration names
    /// (`error_classifier`, `sampler`, `entity_extractor`).
    pub fn reload_model(&self, kind: &str, path: &Path) -> RuntimeResult<()> {
        let kind =
            ModelKind::parse(kind).ok_or_else(|| RuntimeError::UnsupportedKind(kind.to_string()))?;
        self.engine.reload(kind, path)?;
        // Results from the prior module must not satisfy lookups against the
        // new one.
        if let Some(cache) = self.cache(kind) {
            cache.clear();
        }
        Ok(())
    }

    pub fn cache_stats(&self, kind: ModelKind) -> Option<CacheStats> {
        self.cache(kind).map(|c| c.stats())
    }

    /// Clear caches and release the engine's models.
    pub fn close(&self) {
        if let Some(caches) = &self.caches {
            for cache in caches {
                cache.clear();
            }
        }
        self.engine.close();
    }

    fn cache(&self, kind: ModelKind) -> Option<&ResultCache> {
        self.caches.as_ref().map(|caches| &caches[kind.index()])
    }
}
