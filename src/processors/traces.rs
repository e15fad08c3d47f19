// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Traces processor.
//!
//! Per-span work, in order: error classification (error spans only), entity
//! extraction, then a second single-threaded sampling pass that copies kept
//! spans into a fresh batch. Output `(resource, scope)` groups match input
//! groups by resource attribute hash and scope (name, version), and spans
//! keep their input order within a group.

use crate::config::Settings;
use crate::errors::ProcessorError;
use crate::features::FeatureRecord;
use crate::observability::messages::processor::{BatchCancelled, BatchSampled};
use crate::observability::messages::StructuredLog;
use crate::processors::{
    apply_writes, model_sampling_decision, run_enrichment, EnrichJob, LogLimiter, Sampler,
};
use crate::runtime::InferenceRuntime;
use crate::telemetry::{Span, TraceBatch};
use crate::traits::{Capabilities, TracesConsumer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct TracesProcessor {
    settings: Arc<Settings>,
    runtime: Arc<InferenceRuntime>,
    sampler: Sampler,
    limiter: Arc<LogLimiter>,
    next: Arc<dyn TracesConsumer>,
}

impl std::fmt::Debug for TracesProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracesProcessor").finish_non_exhaustive()
    }
}

impl TracesProcessor {
    pub fn new(
        settings: Arc<Settings>,
        runtime: Arc<InferenceRuntime>,
        sampler: Sampler,
        next: Arc<dyn TracesConsumer>,
    ) -> Self {
        Self {
            settings,
            runtime,
            sampler,
            limiter: Arc::new(LogLimiter::new()),
            next,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities { mutates_data: true }
    }

    pub async fn start(&self) -> Result<(), ProcessorError> {
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<(), ProcessorError> {
        self.runtime.close();
        Ok(())
    }

    /// Process one batch and hand the result to the next consumer. Returns
    /// only after every kept span has been forwarded.
    pub async fn consume_traces(
        &self,
        ctx: &CancellationToken,
        mut batch: TraceBatch,
    ) -> Result<(), ProcessorError> {
        let features = &self.settings.features;
        if !features.any_trace_feature() {
            return self.forward(ctx, batch).await;
        }

        // One feature record per span, in traversal order; the same record
        // feeds classification, extraction, and the sampling verdict so
        // logically identical spans share cache entries.
        let records = self.build_records(&batch);

        if features.error_classification || features.entity_extraction {
            self.enrich(ctx, &mut batch, &records).await?;
        }

        let batch = if features.smart_sampling {
            self.sample(ctx, &batch, &records)?
        } else {
            batch
        };

        self.forward(ctx, batch).await
    }

    async fn forward(&self, ctx: &CancellationToken, batch: TraceBatch) -> Result<(), ProcessorError> {
        if ctx.is_cancelled() {
            BatchCancelled { signal: "traces" }.log();
            return Err(ProcessorError::Cancelled);
        }
        self.next
            .consume_traces(ctx, batch)
            .await
            .map_err(ProcessorError::Pipeline)
    }

    fn build_records(&self, batch: &TraceBatch) -> Vec<FeatureRecord> {
        let mut records = Vec::with_capacity(batch.span_count());
        for rs in &batch.resource_spans {
            for ss in &rs.scopes {
                for span in &ss.spans {
                    records.push(span_features(span, &rs.resource.attributes));
                }
            }
        }
        records
    }

    async fn enrich(
        &self,
        ctx: &CancellationToken,
        batch: &mut TraceBatch,
        records: &[FeatureRecord],
    ) -> Result<(), ProcessorError> {
        let features = &self.settings.features;
        let mut jobs = Vec::with_capacity(records.len());
        let mut index = 0;
        for rs in &batch.resource_spans {
            for ss in &rs.scopes {
                for span in &ss.spans {
                    jobs.push(EnrichJob {
                        features: records[index].clone(),
                        classify: features.error_classification && span.is_error(),
                        extract: features.entity_extraction,
                    });
                    index += 1;
                }
            }
        }

        let writes =
            run_enrichment(ctx, &self.settings, &self.runtime, &self.limiter, jobs).await?;

        let mut index = 0;
        for rs in &mut batch.resource_spans {
            for ss in &mut rs.scopes {
                for span in &mut ss.spans {
                    apply_writes(&mut span.attributes, &writes[index], &self.settings.output);
                    index += 1;
                }
            }
        }
        Ok(())
    }

    /// Single-threaded sampling pass: rebuild the batch from kept spans in
    /// input order.
    fn sample(
        &self,
        ctx: &CancellationToken,
        batch: &TraceBatch,
        records: &[FeatureRecord],
    ) -> Result<TraceBatch, ProcessorError> {
        let mut sampled = TraceBatch::new();
        let mut index = 0;
        let mut kept = 0;

        for rs in &batch.resource_spans {
            if ctx.is_cancelled() {
                BatchCancelled { signal: "traces" }.log();
                return Err(ProcessorError::Cancelled);
            }
            let resource_hash = rs.resource.fnv_hash();
            for ss in &rs.scopes {
                for span in &ss.spans {
                    let keep = self.keep_span(span, &records[index]);
                    index += 1;
                    if keep {
                        sampled
                            .get_or_create_resource(&rs.resource, resource_hash)
                            .get_or_create_scope(&ss.scope)
                            .spans
                            .push(span.clone());
                        kept += 1;
                    }
                }
            }
        }

        BatchSampled {
            signal: "traces",
            input_items: batch.span_count(),
            kept_items: kept,
        }
        .log();
        Ok(sampled)
    }

    fn keep_span(&self, span: &Span, features: &FeatureRecord) -> bool {
        let sampling = &self.settings.sampling;

        // Error spans are always kept at a full error_events rate.
        if span.is_error() && sampling.error_events >= 1.0 {
            return true;
        }

        // Slow spans are always kept at a full slow_spans rate.
        if span.duration_ms() > sampling.threshold_ms as i64 && sampling.slow_spans >= 1.0 {
            return true;
        }

        model_sampling_decision(
            &self.runtime,
            &self.sampler,
            &self.limiter,
            features,
            sampling.normal_spans,
        )
    }
}

fn span_features(span: &Span, resource: &crate::telemetry::AttrMap) -> FeatureRecord {
    FeatureRecord::new(
        &span.name,
        &span.status.message,
        span.kind.as_str(),
        span.duration_ms(),
        &span.attributes,
        resource,
    )
}
