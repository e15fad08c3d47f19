// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Metrics processor.
//!
//! Inference operates at number-data-point granularity: gauge and sum points
//! are enriched and sampled individually. Histogram, summary, and
//! exponential-histogram points are traversed but opaque; they pass through
//! unconditionally. A metric left with zero kept points is dropped from its
//! scope, an empty scope from its resource.

use crate::config::Settings;
use crate::errors::ProcessorError;
use crate::features::FeatureRecord;
use crate::observability::messages::processor::{BatchCancelled, BatchSampled};
use crate::observability::messages::StructuredLog;
use crate::processors::{
    apply_writes, model_sampling_decision, run_enrichment, EnrichJob, LogLimiter, Sampler,
};
use crate::runtime::InferenceRuntime;
use crate::telemetry::{Metric, MetricBatch, MetricData, NumberDataPoint};
use crate::traits::{Capabilities, MetricsConsumer};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct MetricsProcessor {
    settings: Arc<Settings>,
    runtime: Arc<InferenceRuntime>,
    sampler: Sampler,
    limiter: Arc<LogLimiter>,
    next: Arc<dyn MetricsConsumer>,
}

impl MetricsProcessor {
    pub fn new(
        settings: Arc<Settings>,
        runtime: Arc<InferenceRuntime>,
        sampler: Sampler,
        next: Arc<dyn MetricsConsumer>,
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

    pub async fn consume_metrics(
        &self,
        ctx: &CancellationToken,
        mut batch: MetricBatch,
    ) -> Result<(), ProcessorError> {
        let features = &self.settings.features;
        if !features.any_metric_feature() {
            return self.forward(ctx, batch).await;
        }

        // One feature record per number data point, in traversal order.
        // Opaque point types never get records.
        let records = self.build_records(&batch);

        if features.entity_extraction {
            self.enrich(ctx, &mut batch, &records).await?;
        }

        let batch = if features.smart_sampling {
            self.sample(ctx, &batch, &records)?
        } else {
            batch
        };

        self.forward(ctx, batch).await
    }

    async fn forward(
        &self,
        ctx: &CancellationToken,
        batch: MetricBatch,
    ) -> Result<(), ProcessorError> {
        if ctx.is_cancelled() {
            BatchCancelled { signal: "metrics" }.log();
            return Err(ProcessorError::Cancelled);
        }
        self.next
            .consume_metrics(ctx, batch)
            .await
            .map_err(ProcessorError::Pipeline)
    }

    fn build_records(&self, batch: &MetricBatch) -> Vec<FeatureRecord> {
        let mut records = Vec::new();
        for rm in &batch.resource_metrics {
            for sm in &rm.scopes {
                for metric in &sm.metrics {
                    match &metric.data {
                        MetricData::Gauge { data_points } => {
                            for dp in data_points {
                                records.push(point_features(
                                    metric,
                                    dp,
                                    None,
                                    &rm.resource.attributes,
                                ));
                            }
                        }
                        MetricData::Sum {
                            data_points,
                            is_monotonic,
                            temporality,
                        } => {
                            for dp in data_points {
                                records.push(point_features(
                                    metric,
                                    dp,
                                    Some((*is_monotonic, temporality.as_str())),
                                    &rm.resource.attributes,
                                ));
                            }
                        }
                        // Opaque point types carry no feature records.
                        _ => {}
                    }
                }
            }
        }
        records
    }

    async fn enrich(
        &self,
        ctx: &CancellationToken,
        batch: &mut MetricBatch,
        records: &[FeatureRecord],
    ) -> Result<(), ProcessorError> {
        let jobs: Vec<EnrichJob> = records
            .iter()
            .map(|features| EnrichJob {
                features: features.clone(),
                classify: false,
                extract: true,
            })
            .collect();

        let writes =
            run_enrichment(ctx, &self.settings, &self.runtime, &self.limiter, jobs).await?;

        let mut index = 0;
        for rm in &mut batch.resource_metrics {
            for sm in &mut rm.scopes {
                for metric in &mut sm.metrics {
                    match &mut metric.data {
                        MetricData::Gauge { data_points }
                        | MetricData::Sum { data_points, .. } => {
                            for dp in data_points {
                                apply_writes(
                                    &mut dp.attributes,
                                    &writes[index],
                                    &self.settings.output,
                                );
                                index += 1;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// Rebuild the batch from kept data points. Number points are sampled
    /// individually; opaque metrics are retained whole.
    fn sample(
        &self,
        ctx: &CancellationToken,
        batch: &MetricBatch,
        records: &[FeatureRecord],
    ) -> Result<MetricBatch, ProcessorError> {
        let mut sampled = MetricBatch::new();
        let mut index = 0;
        let mut kept = 0;

        for rm in &batch.resource_metrics {
            if ctx.is_cancelled() {
                BatchCancelled { signal: "metrics" }.log();
                return Err(ProcessorError::Cancelled);
            }
            let resource_hash = rm.resource.fnv_hash();
            for sm in &rm.scopes {
                for metric in &sm.metrics {
                    let kept_metric = match &metric.data {
                        MetricData::Gauge { data_points } => {
                            let points = self.keep_points(data_points, records, &mut index);
                            (!points.is_empty()).then(|| {
                                kept += points.len();
                                Metric {
                                    data: MetricData::Gauge {
                                        data_points: points,
                                    },
                                    ..metric_header(metric)
                                }
                            })
                        }
                        MetricData::Sum {
                            data_points,
                            is_monotonic,
                            temporality,
                        } => {
                            let points = self.keep_points(data_points, records, &mut index);
                            (!points.is_empty()).then(|| {
                                kept += points.len();
                                Metric {
                                    data: MetricData::Sum {
                                        data_points: points,
                                        is_monotonic: *is_monotonic,
                                        temporality: *temporality,
                                    },
                                    ..metric_header(metric)
                                }
                            })
                        }
                        // Opaque types are retained unconditionally.
                        _ => {
                            kept += metric.point_count();
                            Some(metric.clone())
                        }
                    };

                    if let Some(kept_metric) = kept_metric {
                        sampled
                            .get_or_create_resource(&rm.resource, resource_hash)
                            .get_or_create_scope(&sm.scope)
                            .metrics
                            .push(kept_metric);
                    }
                }
            }
        }

        BatchSampled {
            signal: "metrics",
            input_items: batch.data_point_count(),
            kept_items: kept,
        }
        .log();
        Ok(sampled)
    }

    fn keep_points(
        &self,
        data_points: &[NumberDataPoint],
        records: &[FeatureRecord],
        index: &mut usize,
    ) -> Vec<NumberDataPoint> {
        let sampling = &self.settings.sampling;
        let mut kept = Vec::new();
        for dp in data_points {
            let keep = model_sampling_decision(
                &self.runtime,
                &self.sampler,
                &self.limiter,
                &records[*index],
                sampling.normal_spans,
            );
            *index += 1;
            if keep {
                kept.push(dp.clone());
            }
        }
        kept
    }
}

fn metric_header(metric: &Metric) -> Metric {
    Metric {
        name: metric.name.clone(),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        data: MetricData::Gauge {
            data_points: Vec::new(),
        },
    }
}

fn point_features(
    metric: &Metric,
    dp: &NumberDataPoint,
    sum_metadata: Option<(bool, &str)>,
    resource: &crate::telemetry::AttrMap,
) -> FeatureRecord {
    let mut record = FeatureRecord::new(&metric.name, "", "", 0, &dp.attributes, resource);
    record.insert_extra("description", json!(metric.description));
    record.insert_extra("unit", json!(metric.unit));
    record.insert_extra("value", dp.value.to_json());
    if let Some((is_monotonic, temporality)) = sum_metadata {
        record.insert_extra("is_monotonic", json!(is_monotonic));
        record.insert_extra("aggregation_temporality", json!(temporality));
    }
    record
}
