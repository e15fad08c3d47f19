// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory telemetry data model.
//!
//! The model mirrors the OTLP batch shape: resource groups containing scope
//! groups containing items. Wire formats are not a concern here; receivers and
//! exporters live outside this crate; processors consume and produce these
//! batches directly.

pub mod attrs;
pub mod logs;
pub mod metrics;
pub mod traces;

pub use attrs::{fnv1a_64, set_attribute, truncate_utf8, AttrMap, AttrValue};
pub use logs::{LogBatch, LogRecord, ResourceLogs, ScopeLogs, SEVERITY_ERROR};
pub use metrics::{
    Metric, MetricBatch, MetricData, NumberDataPoint, NumberValue, ResourceMetrics, ScopeMetrics,
    Temporality,
};
pub use traces::{
    ResourceSpans, ScopeSpans, Span, SpanEvent, SpanKind, SpanStatus, StatusCode, TraceBatch,
};

/// The origin of a group of telemetry items: a set of attributes describing
/// the producing service and environment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resource {
    pub attributes: AttrMap,
}

impl Resource {
    pub fn new(attributes: AttrMap) -> Self {
        Self { attributes }
    }

    /// Stable hash of the resource's attributes; two resources are considered
    /// equal when their hashes match.
    pub fn fnv_hash(&self) -> u64 {
        self.attributes.fnv_hash()
    }
}

/// An instrumentation-scope identifier within a resource group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

impl Scope {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Scopes match on (name, version).
    pub fn matches(&self, other: &Scope) -> bool {
        self.name == other.name && self.version == other.version
    }
}
