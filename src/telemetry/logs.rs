// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Log batch model: `LogBatch → ResourceLogs → ScopeLogs → LogRecord`.

use crate::telemetry::{AttrMap, AttrValue, Resource, Scope};

/// Severity numbers are ordinals 1..=24; 17 and above mean ERROR.
pub const SEVERITY_ERROR: i32 = 17;

/// A single log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub time_unix_nano: u64,
    pub severity_number: i32,
    pub severity_text: String,
    pub body: AttrValue,
    pub attributes: AttrMap,
}

impl Default for LogRecord {
    fn default() -> Self {
        Self {
            time_unix_nano: 0,
            severity_number: 0,
            severity_text: String::new(),
            body: AttrValue::Str(String::new()),
            attributes: AttrMap::new(),
        }
    }
}

impl LogRecord {
    pub fn is_error(&self) -> bool {
        self.severity_number >= SEVERITY_ERROR
    }
}

/// Log records sharing one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeLogs {
    pub scope: Scope,
    pub records: Vec<LogRecord>,
}

/// Scope groups sharing one resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceLogs {
    pub resource: Resource,
    pub scopes: Vec<ScopeLogs>,
}

impl ResourceLogs {
    pub fn get_or_create_scope(&mut self, scope: &Scope) -> &mut ScopeLogs {
        if let Some(idx) = self.scopes.iter().position(|sl| sl.scope.matches(scope)) {
            return &mut self.scopes[idx];
        }
        self.scopes.push(ScopeLogs {
            scope: scope.clone(),
            records: Vec::new(),
        });
        self.scopes.last_mut().unwrap()
    }
}

/// A batch of log data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogBatch {
    pub resource_logs: Vec<ResourceLogs>,
}

impl LogBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of log records across all groups.
    pub fn record_count(&self) -> usize {
        self.resource_logs
            .iter()
            .flat_map(|rl| rl.scopes.iter())
            .map(|sl| sl.records.len())
            .sum()
    }

    pub fn get_or_create_resource(&mut self, resource: &Resource, hash: u64) -> &mut ResourceLogs {
        if let Some(idx) = self
            .resource_logs
            .iter()
            .position(|rl| rl.resource.fnv_hash() == hash)
        {
            return &mut self.resource_logs[idx];
        }
        self.resource_logs.push(ResourceLogs {
            resource: resource.clone(),
            scopes: Vec::new(),
        });
        self.resource_logs.last_mut().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_threshold() {
        let mut record = LogRecord::default();
        record.severity_number = 16;
        assert!(!record.is_error());
        record.severity_number = 17;
        assert!(record.is_error());
        record.severity_number = 24;
        assert!(record.is_error());
    }

    #[test]
    fn test_record_count() {
        let mut batch = LogBatch::new();
        let resource = Resource::default();
        let hash = resource.fnv_hash();
        let rl = batch.get_or_create_resource(&resource, hash);
        let sl = rl.get_or_create_scope(&Scope::new("applog", ""));
        sl.records.push(LogRecord::default());
        sl.records.push(LogRecord::default());
        assert_eq!(batch.record_count(), 2);
    }
}
