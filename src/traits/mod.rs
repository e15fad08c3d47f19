pub mod consumer;

pub use consumer::{Capabilities, LogsConsumer, MetricsConsumer, TracesConsumer};
