// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use thiserror::Error;

/// Per-call and lifecycle failures of the inference runtime.
///
/// Call failures are non-fatal by contract: the caller skips the enrichment
/// the failed call would have produced and the telemetry item continues
/// through the pipeline.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The requested model kind has no module configured or loaded.
    #[error("model '{0}' is not loaded")]
    ModuleNotLoaded(&'static str),

    /// The module invoked its `env.abort` import.
    #[error("module aborted (msg={msg_ptr}, file={file_ptr}, line={line}, col={col})")]
    ModuleAbort {
        msg_ptr: i32,
        file_ptr: i32,
        line: i32,
        col: i32,
    },

    /// The call exceeded its wall-clock or computational budget.
    #[error("inference call timed out after {0:?}")]
    Timeout(Duration),

    /// An allocation would have exceeded the module's memory cap, or the
    /// module failed to allocate call buffers.
    #[error("memory limit exceeded: {0}")]
    Memory(String),

    /// The module returned something that is not a JSON object.
    #[error("failed to decode inference result: {0}")]
    ResultDecode(String),

    /// Reload was asked for a model kind this runtime does not know.
    #[error("unsupported model kind: {0}")]
    UnsupportedKind(String),

    /// WASM compilation or instantiation failed.
    #[error("failed to load module: {0}")]
    ModuleLoad(String),

    /// The module file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sandbox trapped for a reason other than the budgets above.
    #[error("WASM execution error: {0}")]
    Execution(#[from] anyhow::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
