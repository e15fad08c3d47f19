// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Signal processors.
//!
//! The three processors (traces, metrics, logs) share one scaffold: build a
//! feature record per item, fan per-item enrichment out (optionally through
//! the worker pool), apply the computed attribute writes serially, then run
//! a single-threaded sampling pass that rebuilds the outgoing batch in input
//! order.
//!
//! Enrichment never mutates items concurrently: workers compute attribute
//! writes off to the side and the processor applies them after the barrier,
//! one item at a time.

pub mod factory;
mod logs;
mod metrics;
mod sampler;
mod traces;


pub use factory::{create_logs, create_metrics, create_traces};
pub use logs::LogsProcessor;
pub use metrics::MetricsProcessor;
pub use sampler::Sampler;
pub use traces::TracesProcessor;

use crate::config::{OutputSettings, Settings};
use crate::errors::ProcessorError;
use crate::features::FeatureRecord;
use crate::observability::messages::runtime::InferenceCallFailed;
use crate::observability::messages::StructuredLog;
use crate::pool::WorkerPool;
use crate::runtime::{InferenceRuntime, ModelKind, RuntimeError};
use crate::telemetry::{set_attribute, AttrMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One item's enrichment work order.
pub(crate) struct EnrichJob {
    pub features: FeatureRecord,
    pub classify: bool,
    pub extract: bool,
}

/// Attribute writes computed for one item, keyed without the namespace
/// prefix. Applied by [`apply_writes`].
pub(crate) type AttrWrites = Vec<(String, serde_json::Value)>;

/// Rate limiter for per-item inference failure logs: the first few failures
/// log in full, then one in every `EVERY`.
pub(crate) struct LogLimiter {
    count: AtomicU64,
}

impl LogLimiter {
    const DETAILED: u64 = 16;
    const EVERY: u64 = 1024;

    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    pub fn log(&self, kind: ModelKind, error: &RuntimeError) {
        let n = self.count.fetch_add(1, Ordering::Relaxed);
        if n < Self::DETAILED || n % Self::EVERY == 0 {
            InferenceCallFailed {
                kind: kind.as_str(),
                error,
            }
            .log();
        }
    }
}

/// Compute one item's attribute writes. Classification and extraction run
/// sequentially for the item; failures are logged and swallowed, leaving the
/// item un-enriched for that call.
pub(crate) fn enrich_item(
    runtime: &InferenceRuntime,
    limiter: &LogLimiter,
    job: &EnrichJob,
) -> AttrWrites {
    let mut writes = AttrWrites::new();
    if job.classify {
        match runtime.classify_error(&job.features) {
            Ok(result) => writes.extend(result.into_iter()),
            Err(e) => limiter.log(ModelKind::ErrorClassifier, &e),
        }
    }
    if job.extract {
        match runtime.extract_entities(&job.features) {
            Ok(result) => writes.extend(result.into_iter()),
            Err(e) => limiter.log(ModelKind::EntityExtractor, &e),
        }
    }
    writes
}

/// Run a batch's enrichment jobs, serially or fanned out through the worker
/// pool, returning per-job writes in submission order.
pub(crate) async fn run_enrichment(
    ctx: &CancellationToken,
    settings: &Settings,
    runtime: &Arc<InferenceRuntime>,
    limiter: &Arc<LogLimiter>,
    jobs: Vec<EnrichJob>,
) -> Result<Vec<AttrWrites>, ProcessorError> {
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    if !settings.processing.enable_parallel_processing {
        let mut writes = Vec::with_capacity(jobs.len());
        for job in &jobs {
            if ctx.is_cancelled() {
                return Err(ProcessorError::Cancelled);
            }
            writes.push(enrich_item(runtime, limiter, job));
        }
        return Ok(writes);
    }

    let pool = WorkerPool::new(settings.processing.max_parallel_workers);
    let slots: Arc<Vec<Mutex<Option<AttrWrites>>>> =
        Arc::new((0..jobs.len()).map(|_| Mutex::new(None)).collect());

    let mut cancelled = false;
    for (index, job) in jobs.into_iter().enumerate() {
        if ctx.is_cancelled() {
            cancelled = true;
            break;
        }
        let runtime = Arc::clone(runtime);
        let limiter = Arc::clone(limiter);
        let slots = Arc::clone(&slots);
        let submitted = pool
            .submit(ctx, move |token| async move {
                if token.is_cancelled() {
                    return;
                }
                let writes = enrich_item(&runtime, &limiter, &job);
                *slots[index].lock().unwrap() = Some(writes);
            })
            .await;
        if submitted.is_err() {
            break;
        }
    }

    // Barrier: in-flight items drain even when cancellation stopped the
    // submission loop early.
    pool.wait().await;
    pool.close().await;

    if cancelled || ctx.is_cancelled() {
        return Err(ProcessorError::Cancelled);
    }

    Ok(slots
        .iter()
        .map(|slot| slot.lock().unwrap().take().unwrap_or_default())
        .collect())
}

/// Apply one item's writes to its attribute map, namespaced and truncated
/// per the output settings. Pre-existing attributes are never overwritten
/// because every written key carries the namespace prefix.
pub(crate) fn apply_writes(attrs: &mut AttrMap, writes: &AttrWrites, output: &OutputSettings) {
    for (key, value) in writes {
        if !output.include_confidence_scores && key == "confidence" {
            continue;
        }
        let attr_key = format!("{}{}", output.attribute_namespace, key);
        set_attribute(attrs, &attr_key, value, output.max_attribute_length);
    }
}

/// Ask the importance sampler for a keep/drop verdict.
///
/// On success, keep with probability `normal_rate * importance` (clamped to
/// [0, 1]). On any failure (call error, missing or non-numeric importance)
/// fall back to the plain `normal_rate`.
pub(crate) fn model_sampling_decision(
    runtime: &InferenceRuntime,
    sampler: &Sampler,
    limiter: &LogLimiter,
    features: &FeatureRecord,
    normal_rate: f64,
) -> bool {
    match runtime.sample_telemetry(features) {
        Ok(result) => match result.get("importance").and_then(|v| v.as_f64()) {
            Some(importance) => sampler.sample((normal_rate * importance).clamp(0.0, 1.0)),
            None => sampler.sample(normal_rate),
        },
        Err(e) => {
            limiter.log(ModelKind::Sampler, &e);
            sampler.sample(normal_rate)
        }
    }
}
