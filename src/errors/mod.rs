// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;

pub use config::{ConfigError, ConfigErrors};

use crate::runtime::RuntimeError;
use thiserror::Error;

/// Errors surfaced by a signal processor to its caller.
///
/// Per-item inference failures are deliberately absent: those are logged and
/// swallowed so the affected item continues un-enriched. Only startup
/// problems, cancellation, and downstream forwarding failures propagate.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Invalid or incoherent configuration; fatal to startup.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigErrors),

    /// A required WASM model failed to compile or instantiate at startup.
    #[error("failed to initialize inference runtime: {0}")]
    ModuleLoad(#[from] RuntimeError),

    /// The downstream consumer rejected the forwarded batch.
    #[error("downstream consumer failed: {0}")]
    Pipeline(#[source] anyhow::Error),

    /// The caller's context was cancelled mid-batch.
    #[error("processing cancelled")]
    Cancelled,
}
