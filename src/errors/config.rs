// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// A single configuration validation failure.
///
/// Validation accumulates every problem it finds rather than stopping at the
/// first, so operators can fix a config file in one pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must not be negative (got {value})")]
    NegativeValue { field: &'static str, value: i64 },

    #[error("{field} must be greater than zero (got {value})")]
    NonPositiveValue { field: &'static str, value: i64 },

    #[error("output.attribute_namespace must not be empty")]
    EmptyAttributeNamespace,

    #[error("sampling.{field} is not a finite number")]
    NonFiniteRate { field: &'static str },
}

/// Every validation failure found in one pass over a configuration.
#[derive(Debug)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ConfigErrors {}
