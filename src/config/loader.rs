// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration schema and YAML loading.
//!
//! The raw [`Config`] tree is permissive on purpose: sizes and timeouts are
//! signed so a negative value survives parsing and is rejected with a real
//! error message by validation, instead of failing somewhere inside serde.
//! Every field has a default; an empty config file is a valid config.

use crate::config::consts::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration for the AI processor.
///
/// # Example
/// ```yaml
/// models:
///   error_classifier:
///     path: /models/error-classifier.wasm
///     memory_limit_mb: 100
///     timeout_ms: 50
/// features:
///   error_classification: true
///   smart_sampling: true
/// sampling:
///   error_events: 1.0
///   normal_spans: 0.25
/// output:
///   attribute_namespace: "ai."
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WASM model locations and per-model resource budgets.
    pub models: ModelsConfig,
    /// Batching, concurrency, and caching knobs.
    pub processing: ProcessingConfig,
    /// Feature toggles.
    pub features: FeaturesConfig,
    /// Smart-sampling rates.
    pub sampling: SamplingConfig,
    /// How AI-generated attributes are written.
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: ModelsConfig::default(),
            processing: ProcessingConfig::default(),
            features: FeaturesConfig::default(),
            sampling: SamplingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// The three inference models.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub error_classifier: ModelConfig,
    pub importance_sampler: ModelConfig,
    pub entity_extractor: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            error_classifier: ModelConfig {
                path: DEFAULT_ERROR_CLASSIFIER_PATH.to_string(),
                memory_limit_mb: DEFAULT_ERROR_CLASSIFIER_MEMORY_MB,
                timeout_ms: DEFAULT_ERROR_CLASSIFIER_TIMEOUT_MS,
            },
            importance_sampler: ModelConfig {
                path: DEFAULT_SAMPLER_PATH.to_string(),
                memory_limit_mb: DEFAULT_SAMPLER_MEMORY_MB,
                timeout_ms: DEFAULT_SAMPLER_TIMEOUT_MS,
            },
            entity_extractor: ModelConfig {
                path: DEFAULT_ENTITY_EXTRACTOR_PATH.to_string(),
                memory_limit_mb: DEFAULT_ENTITY_EXTRACTOR_MEMORY_MB,
                timeout_ms: DEFAULT_ENTITY_EXTRACTOR_TIMEOUT_MS,
            },
        }
    }
}

/// One model's location and budgets. An empty `path` disables the model and
/// every feature that depends on it.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_model_memory")]
    pub memory_limit_mb: i64,
    #[serde(default = "default_model_timeout")]
    pub timeout_ms: i64,
}

fn default_model_memory() -> i64 {
    DEFAULT_MODEL_MEMORY_MB
}

fn default_model_timeout() -> i64 {
    DEFAULT_MODEL_TIMEOUT_MS
}

/// Processing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// How many telemetry items the surrounding pipeline batches together.
    pub batch_size: i64,
    /// How many concurrent model executions the pipeline plans for.
    pub concurrency: i64,
    /// Maximum queue size for pending telemetry in the pipeline.
    pub queue_size: i64,
    /// Overall processing timeout for a batch.
    pub timeout_ms: i64,
    /// Process items of one batch in parallel through the worker pool.
    pub enable_parallel_processing: bool,
    /// Worker count for parallel processing.
    pub max_parallel_workers: i64,
    /// Attribute-conversion cache size (0 disables).
    pub attribute_cache_size: i64,
    /// Resource-hash cache size (0 disables).
    pub resource_cache_size: i64,
    /// Cache model results for identical feature records.
    pub model_cache_results: bool,
    /// Model results cache size, per model.
    pub model_results_cache_size: i64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            queue_size: DEFAULT_QUEUE_SIZE,
            timeout_ms: DEFAULT_PROCESSING_TIMEOUT_MS,
            enable_parallel_processing: true,
            max_parallel_workers: DEFAULT_MAX_PARALLEL_WORKERS,
            attribute_cache_size: DEFAULT_ATTRIBUTE_CACHE_SIZE,
            resource_cache_size: DEFAULT_RESOURCE_CACHE_SIZE,
            model_cache_results: true,
            model_results_cache_size: DEFAULT_MODEL_RESULTS_CACHE_SIZE,
        }
    }
}

/// Feature toggles. `context_linking` is reserved and currently has no
/// effect beyond passthrough.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub error_classification: bool,
    pub smart_sampling: bool,
    pub entity_extraction: bool,
    pub context_linking: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            error_classification: true,
            smart_sampling: true,
            entity_extraction: false,
            context_linking: false,
        }
    }
}

/// Smart-sampling rates. Rates are probabilities in [0, 1]; out-of-range
/// values are clamped during validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub error_events: f64,
    pub slow_spans: f64,
    pub normal_spans: f64,
    pub threshold_ms: i64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            error_events: DEFAULT_ERROR_EVENTS_RATE,
            slow_spans: DEFAULT_SLOW_SPANS_RATE,
            normal_spans: DEFAULT_NORMAL_SPANS_RATE,
            threshold_ms: DEFAULT_SLOW_SPAN_THRESHOLD_MS,
        }
    }
}

/// Output shaping for AI-generated attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix for every attribute the processor writes.
    pub attribute_namespace: String,
    /// Write `confidence` fields from inference results.
    pub include_confidence_scores: bool,
    /// Maximum byte length for written string attributes (0 disables).
    pub max_attribute_length: i64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            attribute_namespace: DEFAULT_ATTRIBUTE_NAMESPACE.to_string(),
            include_confidence_scores: true,
            max_attribute_length: DEFAULT_MAX_ATTRIBUTE_LENGTH,
        }
    }
}

/// Load a config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load a config from a YAML file and validate it.
pub fn load_and_validate_config<P: AsRef<Path>>(
    path: P,
) -> Result<Config, Box<dyn std::error::Error>> {
    let cfg = load_config(path)?;
    cfg.validate()?;
    Ok(cfg)
}
