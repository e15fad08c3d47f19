// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus the [`messages::StructuredLog`] trait, keeping log
//! strings out of the processing code and fields machine-readable.
//!
//! Messages are organized by subsystem:
//! * `messages::runtime` - model lifecycle and inference call events
//! * `messages::processor` - per-batch processing and sampling events

pub mod messages;
