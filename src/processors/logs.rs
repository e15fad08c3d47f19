// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Logs processor.
//!
//! Mirrors the traces processor minus span-only concerns: classification
//! applies to records at ERROR severity (severity number ≥ 17), sampling has
//! no slow-item rule because log records carry no duration.

use crate::config::Settings;
use crate::errors::ProcessorError;
use crate::features::FeatureRecord;
use crate::observability::messages::processor::{BatchCancelled, BatchSampled};
use crate::observability::messages::StructuredLog;
use crate::processors::{
    apply_writes, model_sampling_decision, run_enrichment, EnrichJob, LogLimiter, Sampler,
};
use crate::runtime::InferenceRuntime;
use crate::telemetry::{LogBatch, LogRecord};
use crate::traits::{Capabilities, LogsConsumer};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct LogsProcessor {
    settings: Arc<Settings>,
    runtime: Arc<InferenceRuntime>,
    sampler: Sampler,
    limiter: Arc<LogLimiter>,
    next: Arc<dyn LogsConsumer>,
}

impl LogsProcessor {
    pub fn new(
        settings: Arc<Settings>,
        runtime: Arc<InferenceRuntime>,
        sampler: Sampler,
        next: Arc<dyn LogsConsumer>,
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

    pub async fn consume_logs(
        &self,
        ctx: &CancellationToken,
        mut batch: LogBatch,
    ) -> Result<(), ProcessorError> {
        let features = &self.settings.features;
        if !features.any_log_feature() {
            return self.forward(ctx, batch).await;
        }

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

    async fn forward(&self, ctx: &CancellationToken, batch: LogBatch) -> Result<(), ProcessorError> {
        if ctx.is_cancelled() {
            BatchCancelled { signal: "logs" }.log();
            return Err(ProcessorError::Cancelled);
        }
        self.next
            .consume_logs(ctx, batch)
            .await
            .map_err(ProcessorError::Pipeline)
    }

    fn build_records(&self, batch: &LogBatch) -> Vec<FeatureRecord> {
        let mut records = Vec::with_capacity(batch.record_count());
        for rl in &batch.resource_logs {
            for sl in &rl.scopes {
                for record in &sl.records {
                    records.push(log_features(record, &rl.resource.attributes));
                }
            }
        }
        records
    }

    async fn enrich(
        &self,
        ctx: &CancellationToken,
        batch: &mut LogBatch,
        records: &[FeatureRecord],
    ) -> Result<(), ProcessorError> {
        let features = &self.settings.features;
        let mut jobs = Vec::with_capacity(records.len());
        let mut index = 0;
        for rl in &batch.resource_logs {
            for sl in &rl.scopes {
                for record in &sl.records {
                    jobs.push(EnrichJob {
                        features: records[index].clone(),
                        classify: features.error_classification && record.is_error(),
                        extract: features.entity_extraction,
                    });
                    index += 1;
                }
            }
        }

        let writes =
            run_enrichment(ctx, &self.settings, &self.runtime, &self.limiter, jobs).await?;

        let mut index = 0;
        for rl in &mut batch.resource_logs {
            for sl in &mut rl.scopes {
                for record in &mut sl.records {
                    apply_writes(&mut record.attributes, &writes[index], &self.settings.output);
                    index += 1;
                }
            }
        }
        Ok(())
    }

    fn sample(
        &self,
        ctx: &CancellationToken,
        batch: &LogBatch,
        records: &[FeatureRecord],
    ) -> Result<LogBatch, ProcessorError> {
        let mut sampled = LogBatch::new();
        let mut index = 0;
        let mut kept = 0;

        for rl in &batch.resource_logs {
            if ctx.is_cancelled() {
                BatchCancelled { signal: "logs" }.log();
                return Err(ProcessorError::Cancelled);
            }
            let resource_hash = rl.resource.fnv_hash();
            for sl in &rl.scopes {
                for record in &sl.records {
                    let keep = self.keep_record(record, &records[index]);
                    index += 1;
                    if keep {
                        sampled
                            .get_or_create_resource(&rl.resource, resource_hash)
                            .get_or_create_scope(&sl.scope)
                            .records
                            .push(record.clone());
                        kept += 1;
                    }
                }
            }
        }

        BatchSampled {
            signal: "logs",
            input_items: batch.record_count(),
            kept_items: kept,
        }
        .log();
        Ok(sampled)
    }

    fn keep_record(&self, record: &LogRecord, features: &FeatureRecord) -> bool {
        let sampling = &self.settings.sampling;

        // Error-severity records are always kept at a full error_events rate.
        if record.is_error() && sampling.error_events >= 1.0 {
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

fn log_features(record: &LogRecord, resource: &crate::telemetry::AttrMap) -> FeatureRecord {
    // A log record has no operation name or duration; the severity text
    // stands in for the name and the body for the status message.
    FeatureRecord::new(
        &record.severity_text,
        &record.body.render(),
        "",
        0,
        &record.attributes,
        resource,
    )
}
