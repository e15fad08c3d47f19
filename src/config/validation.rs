// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! Validation converts the permissive serde [`Config`] tree into typed
//! [`Settings`] the rest of the crate consumes. Every problem found is
//! accumulated so operators see all of them at once. Sampling rates are
//! clamped into [0, 1] with a warning rather than rejected; sizes and
//! timeouts must be non-negative; a model with an empty path is disabled,
//! not an error.

use crate::config::consts::DEFAULT_MAX_PARALLEL_WORKERS;
use crate::config::{Config, FeaturesConfig, ModelConfig};
use crate::errors::{ConfigError, ConfigErrors};
use crate::runtime::{ModelSpec, RuntimeConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Validated, typed settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub models: ModelsSettings,
    pub processing: ProcessingSettings,
    pub features: FeaturesSettings,
    pub sampling: SamplingSettings,
    pub output: OutputSettings,
}

/// Models that survived validation; `None` means the model is disabled.
#[derive(Debug, Clone, Default)]
pub struct ModelsSettings {
    pub error_classifier: Option<ModelSpec>,
    pub importance_sampler: Option<ModelSpec>,
    pub entity_extractor: Option<ModelSpec>,
}

#[derive(Debug, Clone)]
pub struct ProcessingSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub queue_size: usize,
    pub timeout: Duration,
    pub enable_parallel_processing: bool,
    pub max_parallel_workers: usize,
    pub attribute_cache_size: usize,
    pub resource_cache_size: usize,
    pub model_cache_results: bool,
    pub model_results_cache_size: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FeaturesSettings {
    pub error_classification: bool,
    pub smart_sampling: bool,
    pub entity_extraction: bool,
    pub context_linking: bool,
}

impl FeaturesSettings {
    /// Any feature that applies to trace batches.
    pub fn any_trace_feature(&self) -> bool {
        self.error_classification
            || self.smart_sampling
            || self.entity_extraction
            || self.context_linking
    }

    /// Any feature that applies to log batches.
    pub fn any_log_feature(&self) -> bool {
        self.error_classification || self.smart_sampling || self.entity_extraction
    }

    /// Any feature that applies to metric batches. Error classification does
    /// not apply to metrics.
    pub fn any_metric_feature(&self) -> bool {
        self.smart_sampling || self.entity_extraction
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SamplingSettings {
    pub error_events: f64,
    pub slow_spans: f64,
    pub normal_spans: f64,
    pub threshold_ms: u64,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub attribute_namespace: String,
    pub include_confidence_scores: bool,
    pub max_attribute_length: usize,
}

impl Settings {
    /// Runtime construction parameters derived from these settings.
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            error_classifier: self.models.error_classifier.clone(),
            sampler: self.models.importance_sampler.clone(),
            entity_extractor: self.models.entity_extractor.clone(),
            cache_results: self.processing.model_cache_results,
            cache_capacity: self.processing.model_results_cache_size,
            cache_ttl: None,
        }
    }
}

impl Config {
    /// Validate this configuration into typed [`Settings`].
    pub fn validate(&self) -> Result<Settings, ConfigErrors> {
        let mut errors = Vec::new();

        let error_classifier = validate_model(
            &self.models.error_classifier,
            "models.error_classifier",
            &mut errors,
        );
        let importance_sampler = validate_model(
            &self.models.importance_sampler,
            "models.importance_sampler",
            &mut errors,
        );
        let entity_extractor = validate_model(
            &self.models.entity_extractor,
            "models.entity_extractor",
            &mut errors,
        );

        let processing = &self.processing;
        check_non_negative("processing.batch_size", processing.batch_size, &mut errors);
        check_non_negative("processing.concurrency", processing.concurrency, &mut errors);
        check_non_negative("processing.queue_size", processing.queue_size, &mut errors);
        check_non_negative("processing.timeout_ms", processing.timeout_ms, &mut errors);
        check_non_negative(
            "processing.max_parallel_workers",
            processing.max_parallel_workers,
            &mut errors,
        );
        check_non_negative(
            "processing.attribute_cache_size",
            processing.attribute_cache_size,
            &mut errors,
        );
        check_non_negative(
            "processing.resource_cache_size",
            processing.resource_cache_size,
            &mut errors,
        );
        check_non_negative(
            "processing.model_results_cache_size",
            processing.model_results_cache_size,
            &mut errors,
        );
        check_non_negative("sampling.threshold_ms", self.sampling.threshold_ms, &mut errors);
        check_non_negative(
            "output.max_attribute_length",
            self.output.max_attribute_length,
            &mut errors,
        );

        let error_events = validate_rate("error_events", self.sampling.error_events, &mut errors);
        let slow_spans = validate_rate("slow_spans", self.sampling.slow_spans, &mut errors);
        let normal_spans = validate_rate("normal_spans", self.sampling.normal_spans, &mut errors);

        if self.output.attribute_namespace.is_empty() {
            errors.push(ConfigError::EmptyAttributeNamespace);
        }

        if !errors.is_empty() {
            return Err(ConfigErrors(errors));
        }

        Ok(Settings {
            models: ModelsSettings {
                error_classifier,
                importance_sampler,
                entity_extractor,
            },
            processing: ProcessingSettings {
                batch_size: processing.batch_size as usize,
                concurrency: processing.concurrency as usize,
                queue_size: processing.queue_size as usize,
                timeout: Duration::from_millis(processing.timeout_ms as u64),
                enable_parallel_processing: processing.enable_parallel_processing,
                max_parallel_workers: if processing.max_parallel_workers == 0 {
                    DEFAULT_MAX_PARALLEL_WORKERS as usize
                } else {
                    processing.max_parallel_workers as usize
                },
                attribute_cache_size: processing.attribute_cache_size as usize,
                resource_cache_size: processing.resource_cache_size as usize,
                model_cache_results: processing.model_cache_results,
                model_results_cache_size: processing.model_results_cache_size as usize,
            },
            features: features_settings(&self.features),
            sampling: SamplingSettings {
                error_events,
                slow_spans,
                normal_spans,
                threshold_ms: self.sampling.threshold_ms as u64,
            },
            output: OutputSettings {
                attribute_namespace: self.output.attribute_namespace.clone(),
                include_confidence_scores: self.output.include_confidence_scores,
                max_attribute_length: self.output.max_attribute_length as usize,
            },
        })
    }
}

fn features_settings(features: &FeaturesConfig) -> FeaturesSettings {
    FeaturesSettings {
        error_classification: features.error_classification,
        smart_sampling: features.smart_sampling,
        entity_extraction: features.entity_extraction,
        context_linking: features.context_linking,
    }
}

/// Validate one model's budgets. An empty path disables the model.
fn validate_model(
    model: &ModelConfig,
    field: &'static str,
    errors: &mut Vec<ConfigError>,
) -> Option<ModelSpec> {
    if model.memory_limit_mb < 0 {
        errors.push(ConfigError::NegativeValue {
            field,
            value: model.memory_limit_mb,
        });
        return None;
    }
    if model.timeout_ms < 0 {
        errors.push(ConfigError::NegativeValue {
            field,
            value: model.timeout_ms,
        });
        return None;
    }

    if model.path.is_empty() {
        return None;
    }

    if model.memory_limit_mb == 0 {
        errors.push(ConfigError::NonPositiveValue {
            field,
            value: model.memory_limit_mb,
        });
        return None;
    }
    if model.timeout_ms == 0 {
        errors.push(ConfigError::NonPositiveValue {
            field,
            value: model.timeout_ms,
        });
        return None;
    }

    Some(ModelSpec {
        path: PathBuf::from(&model.path),
        memory_limit_mb: model.memory_limit_mb as usize,
        timeout: Duration::from_millis(model.timeout_ms as u64),
    })
}

fn check_non_negative(field: &'static str, value: i64, errors: &mut Vec<ConfigError>) {
    if value < 0 {
        errors.push(ConfigError::NegativeValue { field, value });
    }
}

/// Rates must be finite; values outside [0, 1] are clamped with a warning.
fn validate_rate(field: &'static str, value: f64, errors: &mut Vec<ConfigError>) -> f64 {
    if !value.is_finite() {
        errors.push(ConfigError::NonFiniteRate { field });
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        tracing::warn!(
            field = field,
            value = value,
            clamped = clamped,
            "sampling rate out of [0, 1], clamping"
        );
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let settings = Config::default().validate().unwrap();
        assert!(settings.models.error_classifier.is_some());
        assert_eq!(settings.processing.max_parallel_workers, 8);
        assert_eq!(settings.sampling.normal_spans, 0.1);
        assert_eq!(settings.output.max_attribute_length, 256);
    }

    #[test]
    fn test_empty_model_path_disables_model() {
        let mut cfg = Config::default();
        cfg.models.entity_extractor.path = String::new();
        let settings = cfg.validate().unwrap();
        assert!(settings.models.entity_extractor.is_none());
        assert!(settings.models.error_classifier.is_some());
    }

    #[test]
    fn test_rates_are_clamped_not_rejected() {
        let mut cfg = Config::default();
        cfg.sampling.normal_spans = 1.7;
        cfg.sampling.slow_spans = -0.3;
        let settings = cfg.validate().unwrap();
        assert_eq!(settings.sampling.normal_spans, 1.0);
        assert_eq!(settings.sampling.slow_spans, 0.0);
    }

    #[test]
    fn test_nan_rate_rejected() {
        let mut cfg = Config::default();
        cfg.sampling.error_events = f64::NAN;
        let err = cfg.validate().unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, ConfigError::NonFiniteRate { field: "error_events" })));
    }

    #[test]
    fn test_negative_sizes_accumulate() {
        let mut cfg = Config::default();
        cfg.processing.queue_size = -1;
        cfg.processing.batch_size = -2;
        cfg.models.error_classifier.memory_limit_mb = -3;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.0.len(), 3, "{err}");
    }

    #[test]
    fn test_zero_budgets_rejected_for_configured_model() {
        let mut cfg = Config::default();
        cfg.models.error_classifier.timeout_ms = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.0.iter().any(|e| matches!(
            e,
            ConfigError::NonPositiveValue {
                field: "models.error_classifier",
                ..
            }
        )));
    }

    #[test]
    fn test_zero_budgets_fine_for_disabled_model() {
        let mut cfg = Config::default();
        cfg.models.error_classifier.path = String::new();
        cfg.models.error_classifier.timeout_ms = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut cfg = Config::default();
        cfg.output.attribute_namespace = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err
            .0
            .iter()
            .any(|e| matches!(e, ConfigError::EmptyAttributeNamespace)));
    }

    #[test]
    fn test_zero_workers_falls_back_to_default() {
        let mut cfg = Config::default();
        cfg.processing.max_parallel_workers = 0;
        let settings = cfg.validate().unwrap();
        assert_eq!(settings.processing.max_parallel_workers, 8);
    }

    #[test]
    fn test_feature_applicability_by_signal() {
        let features = FeaturesSettings {
            error_classification: true,
            smart_sampling: false,
            entity_extraction: false,
            context_linking: false,
        };
        assert!(features.any_trace_feature());
        assert!(features.any_log_feature());
        assert!(!features.any_metric_feature());
    }

    #[test]
    fn test_runtime_config_mirrors_models_and_cache() {
        let settings = Config::default().validate().unwrap();
        let runtime = settings.runtime_config();
        assert!(runtime.cache_results);
        assert_eq!(runtime.cache_capacity, 1000);
        assert!(runtime.error_classifier.is_some());
        assert_eq!(
            runtime.sampler.as_ref().unwrap().timeout,
            Duration::from_millis(30)
        );
    }
}
