// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in configuration defaults.

pub const DEFAULT_ERROR_CLASSIFIER_PATH: &str = "/models/error-classifier.wasm";
pub const DEFAULT_ERROR_CLASSIFIER_MEMORY_MB: i64 = 100;
pub const DEFAULT_ERROR_CLASSIFIER_TIMEOUT_MS: i64 = 50;

pub const DEFAULT_SAMPLER_PATH: &str = "/models/importance-sampler.wasm";
pub const DEFAULT_SAMPLER_MEMORY_MB: i64 = 80;
pub const DEFAULT_SAMPLER_TIMEOUT_MS: i64 = 30;

pub const DEFAULT_ENTITY_EXTRACTOR_PATH: &str = "/models/entity-extractor.wasm";
pub const DEFAULT_ENTITY_EXTRACTOR_MEMORY_MB: i64 = 150;
pub const DEFAULT_ENTITY_EXTRACTOR_TIMEOUT_MS: i64 = 50;

pub const DEFAULT_MODEL_MEMORY_MB: i64 = 100;
pub const DEFAULT_MODEL_TIMEOUT_MS: i64 = 50;

pub const DEFAULT_BATCH_SIZE: i64 = 50;
pub const DEFAULT_CONCURRENCY: i64 = 4;
pub const DEFAULT_QUEUE_SIZE: i64 = 1000;
pub const DEFAULT_PROCESSING_TIMEOUT_MS: i64 = 500;
pub const DEFAULT_MAX_PARALLEL_WORKERS: i64 = 8;
pub const DEFAULT_ATTRIBUTE_CACHE_SIZE: i64 = 1000;
pub const DEFAULT_RESOURCE_CACHE_SIZE: i64 = 100;
pub const DEFAULT_MODEL_RESULTS_CACHE_SIZE: i64 = 1000;

pub const DEFAULT_ERROR_EVENTS_RATE: f64 = 1.0;
pub const DEFAULT_SLOW_SPANS_RATE: f64 = 1.0;
pub const DEFAULT_NORMAL_SPANS_RATE: f64 = 0.1;
pub const DEFAULT_SLOW_SPAN_THRESHOLD_MS: i64 = 500;

pub const DEFAULT_ATTRIBUTE_NAMESPACE: &str = "ai.";
pub const DEFAULT_MAX_ATTRIBUTE_LENGTH: i64 = 256;
