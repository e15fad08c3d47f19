// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Downstream consumer abstractions.
//!
//! The processing stage hands its output batches to the next pipeline
//! component through these traits. The wire format and transport behind a
//! consumer are not this crate's concern.

use crate::telemetry::{LogBatch, MetricBatch, TraceBatch};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// What a pipeline component does with the data it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Whether the component mutates the batches passing through it.
    pub mutates_data: bool,
}

/// Sink for trace batches.
#[async_trait]
pub trait TracesConsumer: Send + Sync {
    async fn consume_traces(
        &self,
        ctx: &CancellationToken,
        batch: TraceBatch,
    ) -> anyhow::Result<()>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Sink for metric batches.
#[async_trait]
pub trait MetricsConsumer: Send + Sync {
    async fn consume_metrics(
        &self,
        ctx: &CancellationToken,
        batch: MetricBatch,
    ) -> anyhow::Result<()>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Sink for log batches.
#[async_trait]
pub trait LogsConsumer: Send + Sync {
    async fn consume_logs(&self, ctx: &CancellationToken, batch: LogBatch) -> anyhow::Result<()>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}
