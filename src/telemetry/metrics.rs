// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Metric batch model: `MetricBatch → ResourceMetrics → ScopeMetrics → Metric`.
//!
//! Each metric carries a type-specific body. Number points (gauge, sum) are
//! the only points passed through inference; histogram, summary, and
//! exponential-histogram points are traversed but treated as opaque.

use crate::telemetry::{AttrMap, Resource, Scope};

/// Aggregation temporality for sums and histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Temporality {
    #[default]
    Unspecified,
    Delta,
    Cumulative,
}

impl Temporality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Temporality::Unspecified => "Unspecified",
            Temporality::Delta => "Delta",
            Temporality::Cumulative => "Cumulative",
        }
    }
}

/// A numeric data-point value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Double(f64),
}

impl NumberValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            NumberValue::Int(i) => serde_json::Value::from(*i),
            NumberValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
        }
    }
}

impl Default for NumberValue {
    fn default() -> Self {
        NumberValue::Int(0)
    }
}

/// A gauge or sum data point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberDataPoint {
    pub attributes: AttrMap,
    pub start_time_unix_nano: u64,
    pub time_unix_nano: u64,
    pub value: NumberValue,
}

/// A histogram data point (opaque to inference).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistogramDataPoint {
    pub attributes: AttrMap,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: f64,
    pub bucket_counts: Vec<u64>,
    pub explicit_bounds: Vec<f64>,
}

/// A summary quantile value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueAtQuantile {
    pub quantile: f64,
    pub value: f64,
}

/// A summary data point (opaque to inference).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryDataPoint {
    pub attributes: AttrMap,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: f64,
    pub quantile_values: Vec<ValueAtQuantile>,
}

/// One side of an exponential histogram's bucket layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExponentialBuckets {
    pub offset: i32,
    pub bucket_counts: Vec<u64>,
}

/// An exponential-histogram data point (opaque to inference).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExponentialHistogramDataPoint {
    pub attributes: AttrMap,
    pub time_unix_nano: u64,
    pub count: u64,
    pub sum: f64,
    pub scale: i32,
    pub zero_count: u64,
    pub positive: ExponentialBuckets,
    pub negative: ExponentialBuckets,
}

/// Type-specific metric body.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricData {
    Gauge {
        data_points: Vec<NumberDataPoint>,
    },
    Sum {
        data_points: Vec<NumberDataPoint>,
        is_monotonic: bool,
        temporality: Temporality,
    },
    Histogram {
        data_points: Vec<HistogramDataPoint>,
        temporality: Temporality,
    },
    Summary {
        data_points: Vec<SummaryDataPoint>,
    },
    ExponentialHistogram {
        data_points: Vec<ExponentialHistogramDataPoint>,
        temporality: Temporality,
    },
}

impl MetricData {
    pub fn point_count(&self) -> usize {
        match self {
            MetricData::Gauge { data_points } => data_points.len(),
            MetricData::Sum { data_points, .. } => data_points.len(),
            MetricData::Histogram { data_points, .. } => data_points.len(),
            MetricData::Summary { data_points } => data_points.len(),
            MetricData::ExponentialHistogram { data_points, .. } => data_points.len(),
        }
    }
}

/// A single metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub description: String,
    pub unit: String,
    pub data: MetricData,
}

impl Metric {
    pub fn point_count(&self) -> usize {
        self.data.point_count()
    }
}

/// Metrics sharing one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeMetrics {
    pub scope: Scope,
    pub metrics: Vec<Metric>,
}

/// Scope groups sharing one resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceMetrics {
    pub resource: Resource,
    pub scopes: Vec<ScopeMetrics>,
}

impl ResourceMetrics {
    pub fn get_or_create_scope(&mut self, scope: &Scope) -> &mut ScopeMetrics {
        if let Some(idx) = self.scopes.iter().position(|sm| sm.scope.matches(scope)) {
            return &mut self.scopes[idx];
        }
        self.scopes.push(ScopeMetrics {
            scope: scope.clone(),
            metrics: Vec::new(),
        });
        self.scopes.last_mut().unwrap()
    }
}

/// A batch of metric data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricBatch {
    pub resource_metrics: Vec<ResourceMetrics>,
}

impl MetricBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of data points across all metrics.
    pub fn data_point_count(&self) -> usize {
        self.resource_metrics
            .iter()
            .flat_map(|rm| rm.scopes.iter())
            .flat_map(|sm| sm.metrics.iter())
            .map(|m| m.point_count())
            .sum()
    }

    pub fn get_or_create_resource(
        &mut self,
        resource: &Resource,
        hash: u64,
    ) -> &mut ResourceMetrics {
        if let Some(idx) = self
            .resource_metrics
            .iter()
            .position(|rm| rm.resource.fnv_hash() == hash)
        {
            return &mut self.resource_metrics[idx];
        }
        self.resource_metrics.push(ResourceMetrics {
            resource: resource.clone(),
            scopes: Vec::new(),
        });
        self.resource_metrics.last_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_point_count_spans_metric_types() {
        let mut batch = MetricBatch::new();
        let resource = Resource::default();
        let hash = resource.fnv_hash();
        let rm = batch.get_or_create_resource(&resource, hash);
        let sm = rm.get_or_create_scope(&Scope::new("lib", "1.0"));
        sm.metrics.push(Metric {
            name: "requests".into(),
            description: String::new(),
            unit: "1".into(),
            data: MetricData::Sum {
                data_points: vec![NumberDataPoint::default(), NumberDataPoint::default()],
                is_monotonic: true,
                temporality: Temporality::Cumulative,
            },
        });
        sm.metrics.push(Metric {
            name: "latency".into(),
            description: String::new(),
            unit: "ms".into(),
            data: MetricData::Histogram {
                data_points: vec![HistogramDataPoint::default()],
                temporality: Temporality::Delta,
            },
        });

        assert_eq!(batch.data_point_count(), 3);
    }
}
