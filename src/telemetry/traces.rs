// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Trace batch model: `TraceBatch → ResourceSpans → ScopeSpans → Span`.

use crate::telemetry::{AttrMap, Resource, Scope};

/// Span status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Unset => "Unset",
            StatusCode::Ok => "Ok",
            StatusCode::Error => "Error",
        }
    }
}

/// Span status: a code plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanStatus {
    pub code: StatusCode,
    pub message: String,
}

impl SpanStatus {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }
}

/// Span kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpanKind {
    #[default]
    Unspecified,
    Internal,
    Server,
    Client,
    Producer,
    Consumer,
}

impl SpanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanKind::Unspecified => "Unspecified",
            SpanKind::Internal => "Internal",
            SpanKind::Server => "Server",
            SpanKind::Client => "Client",
            SpanKind::Producer => "Producer",
            SpanKind::Consumer => "Consumer",
        }
    }
}

/// A timestamped event attached to a span.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpanEvent {
    pub name: String,
    pub time_unix_nano: u64,
    pub attributes: AttrMap,
}

/// A single span.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Span {
    pub name: String,
    pub kind: SpanKind,
    pub status: SpanStatus,
    pub start_unix_nano: u64,
    pub end_unix_nano: u64,
    pub attributes: AttrMap,
    pub events: Vec<SpanEvent>,
}

impl Span {
    /// Span duration in whole milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.end_unix_nano.saturating_sub(self.start_unix_nano) / 1_000_000) as i64
    }

    pub fn is_error(&self) -> bool {
        self.status.code == StatusCode::Error
    }
}

/// Spans sharing one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeSpans {
    pub scope: Scope,
    pub spans: Vec<Span>,
}

/// Scope groups sharing one resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceSpans {
    pub resource: Resource,
    pub scopes: Vec<ScopeSpans>,
}

impl ResourceSpans {
    /// Find the scope group matching `scope` by (name, version), creating it
    /// at the end if absent.
    pub fn get_or_create_scope(&mut self, scope: &Scope) -> &mut ScopeSpans {
        if let Some(idx) = self.scopes.iter().position(|ss| ss.scope.matches(scope)) {
            return &mut self.scopes[idx];
        }
        self.scopes.push(ScopeSpans {
            scope: scope.clone(),
            spans: Vec::new(),
        });
        self.scopes.last_mut().unwrap()
    }
}

/// A batch of trace data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceBatch {
    pub resource_spans: Vec<ResourceSpans>,
}

impl TraceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of spans across all groups.
    pub fn span_count(&self) -> usize {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scopes.iter())
            .map(|ss| ss.spans.len())
            .sum()
    }

    /// Find the resource group whose attribute hash matches `hash`, creating
    /// a group for `resource` at the end if absent.
    pub fn get_or_create_resource(&mut self, resource: &Resource, hash: u64) -> &mut ResourceSpans {
        if let Some(idx) = self
            .resource_spans
            .iter()
            .position(|rs| rs.resource.fnv_hash() == hash)
        {
            return &mut self.resource_spans[idx];
        }
        self.resource_spans.push(ResourceSpans {
            resource: resource.clone(),
            scopes: Vec::new(),
        });
        self.resource_spans.last_mut().unwrap()
    }
}
