// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Processor factory.
//!
//! Each `create_*` call validates the configuration, builds one inference
//! runtime for the processor instance, and wires the processor to its
//! downstream consumer. Configuration problems and model-load failures are
//! fatal here; everything later is per-item and non-fatal.

use crate::config::Config;
use crate::errors::ProcessorError;
use crate::processors::{LogsProcessor, MetricsProcessor, Sampler, TracesProcessor};
use crate::runtime::InferenceRuntime;
use crate::traits::{LogsConsumer, MetricsConsumer, TracesConsumer};
use std::sync::Arc;

/// Create a traces processor wired to `next`.
pub fn create_traces(
    config: &Config,
    next: Arc<dyn TracesConsumer>,
) -> Result<TracesProcessor, ProcessorError> {
    let settings = config.validate()?;
    let runtime = InferenceRuntime::new(&settings.runtime_config())?;
    Ok(TracesProcessor::new(
        Arc::new(settings),
        Arc::new(runtime),
        Sampler::new(),
        next,
    ))
}

/// Create a metrics processor wired to `next`.
pub fn create_metrics(
    config: &Config,
    next: Arc<dyn MetricsConsumer>,
) -> Result<MetricsProcessor, ProcessorError> {
    let settings = config.validate()?;
    let runtime = InferenceRuntime::new(&settings.runtime_config())?;
    Ok(MetricsProcessor::new(
        Arc::new(settings),
        Arc::new(runtime),
        Sampler::new(),
        next,
    ))
}

/// Create a logs processor wired to `next`.
pub fn create_logs(
    config: &Config,
    next: Arc<dyn LogsConsumer>,
) -> Result<LogsProcessor, ProcessorError> {
    let settings = config.validate()?;
    let runtime = InferenceRuntime::new(&settings.runtime_config())?;
    Ok(LogsProcessor::new(
        Arc::new(settings),
        Arc::new(runtime),
        Sampler::new(),
        next,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TraceBatch;
    use crate::traits::Capabilities;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct NullConsumer;

    #[async_trait]
    impl TracesConsumer for NullConsumer {
        async fn consume_traces(
            &self,
            _ctx: &CancellationToken,
            _batch: TraceBatch,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn config_without_models() -> Config {
        let mut cfg = Config::default();
        cfg.models.error_classifier.path = String::new();
        cfg.models.importance_sampler.path = String::new();
        cfg.models.entity_extractor.path = String::new();
        cfg
    }

    #[test]
    fn test_create_traces_with_no_models() {
        // No models configured: every feature falls back to un-enriched
        // behavior, but the processor itself is valid.
        let processor = create_traces(&config_without_models(), Arc::new(NullConsumer)).unwrap();
        assert_eq!(processor.capabilities(), Capabilities { mutates_data: true });
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut cfg = config_without_models();
        cfg.processing.queue_size = -1;
        let err = create_traces(&cfg, Arc::new(NullConsumer)).unwrap_err();
        assert!(matches!(err, ProcessorError::Config(_)));
    }

    #[test]
    fn test_missing_model_file_is_fatal() {
        let mut cfg = config_without_models();
        cfg.models.error_classifier.path = "/nonexistent/classifier.wasm".to_string();
        let err = create_traces(&cfg, Arc::new(NullConsumer)).unwrap_err();
        assert!(matches!(err, ProcessorError::ModuleLoad(_)));
    }
}
