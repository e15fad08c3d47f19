// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-batch processing and sampling events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A batch finished its sampling pass.
///
/// # Log Level
/// `debug!` - High-frequency operational detail
pub struct BatchSampled<'a> {
    pub signal: &'a str,
    pub input_items: usize,
    pub kept_items: usize,
}

impl Display for BatchSampled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sampled {} batch: kept {} of {} items",
            self.signal, self.kept_items, self.input_items
        )
    }
}

impl StructuredLog for BatchSampled<'_> {
    fn log(&self) {
        tracing::debug!(
            signal = self.signal,
            input_items = self.input_items,
            kept_items = self.kept_items,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            signal = self.signal,
            input_items = self.input_items,
            kept_items = self.kept_items,
        )
    }
}

/// A consume call was cancelled before the batch completed.
///
/// # Log Level
/// `warn!` - Work was abandoned on purpose, but callers should know
pub struct BatchCancelled<'a> {
    pub signal: &'a str,
}

impl Display for BatchCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cancelled {} batch mid-processing", self.signal)
    }
}

impl StructuredLog for BatchCancelled<'_> {
    fn log(&self) {
        tracing::warn!(signal = self.signal, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            signal = self.signal,
        )
    }
}
