// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for inference-runtime lifecycle and call events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A WASM model was loaded at startup.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModelLoaded<'a> {
    pub kind: &'a str,
    pub module_path: &'a str,
    pub memory_limit_mb: usize,
    pub timeout_ms: u64,
}

impl Display for ModelLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} model from {} (memory_limit={}MB, timeout={}ms)",
            self.kind, self.module_path, self.memory_limit_mb, self.timeout_ms
        )
    }
}

impl StructuredLog for ModelLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            kind = self.kind,
            module_path = self.module_path,
            memory_limit_mb = self.memory_limit_mb,
            timeout_ms = self.timeout_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            kind = self.kind,
            module_path = self.module_path,
        )
    }
}

/// A WASM model was swapped by a reload.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModelReloaded<'a> {
    pub kind: &'a str,
    pub module_path: &'a str,
}

impl Display for ModelReloaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Reloaded {} model from {}", self.kind, self.module_path)
    }
}

impl StructuredLog for ModelReloaded<'_> {
    fn log(&self) {
        tracing::info!(
            kind = self.kind,
            module_path = self.module_path,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            kind = self.kind,
            module_path = self.module_path,
        )
    }
}

/// Result caching is active for this runtime.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ResultCachingEnabled {
    pub capacity: usize,
    pub ttl_seconds: u64,
}

impl Display for ResultCachingEnabled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Enabled model result caching (capacity={}, ttl={}s)",
            self.capacity, self.ttl_seconds
        )
    }
}

impl StructuredLog for ResultCachingEnabled {
    fn log(&self) {
        tracing::info!(
            capacity = self.capacity,
            ttl_seconds = self.ttl_seconds,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            capacity = self.capacity,
            ttl_seconds = self.ttl_seconds,
        )
    }
}

/// A single inference call failed; the affected item continues un-enriched.
///
/// # Log Level
/// `debug!` - Expected per-item failure, rate-limited by the caller
pub struct InferenceCallFailed<'a> {
    pub kind: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for InferenceCallFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Inference call to {} failed: {}", self.kind, self.error)
    }
}

impl StructuredLog for InferenceCallFailed<'_> {
    fn log(&self) {
        tracing::debug!(
            kind = self.kind,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            kind = self.kind,
            error = %self.error,
        )
    }
}
