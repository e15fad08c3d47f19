// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements:
//!
//! * `Display` - Human-readable output
//! * [`StructuredLog`] - Machine-readable fields emitted through `tracing`
//!
//! Keeping messages as structs eliminates magic strings at call sites and
//! keeps field names stable for log queries and alerting.

pub mod processor;
pub mod runtime;

use tracing::Span;

/// Trait for messages that support structured logging.
///
/// `log()` emits the event at the level matching the message's semantics,
/// with both the human-readable `Display` text and the message's fields.
/// `span()` creates a `tracing::Span` carrying the same fields for work that
/// should be grouped under the event.
pub trait StructuredLog {
    /// Emit a log event with structured fields.
    fn log(&self);

    /// Create a span with this message's fields as attributes.
    fn span(&self, name: &str) -> Span;
}
