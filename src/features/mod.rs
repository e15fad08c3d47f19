// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Feature records: the canonical inference input.
//!
//! A feature record is the JSON object handed to a WASM inference call and,
//! in canonical form, the cache key for its result. Canonical form is UTF-8
//! JSON with sorted keys and no insignificant whitespace. The record stores
//! its fields in a `BTreeMap`, so sorted serialization is structural and does
//! not depend on `serde_json` feature flags.

use crate::telemetry::{fnv1a_64, AttrMap};
use serde_json::Value;
use std::collections::BTreeMap;

/// The per-item inference input.
///
/// Every record carries the fixed keys `name`, `status`, `kind`, `duration`,
/// `attributes`, and `resource`. Metric records add type metadata and the
/// point value through [`FeatureRecord::insert_extra`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    fields: BTreeMap<String, Value>,
}

impl FeatureRecord {
    /// Build a record from the fixed key set.
    ///
    /// `duration_ms` is the item's duration in whole milliseconds; items
    /// without a duration (logs, metrics) pass zero.
    pub fn new(
        name: &str,
        status: &str,
        kind: &str,
        duration_ms: i64,
        attributes: &AttrMap,
        resource: &AttrMap,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("status".to_string(), Value::String(status.to_string()));
        fields.insert("kind".to_string(), Value::String(kind.to_string()));
        fields.insert("duration".to_string(), Value::from(duration_ms));
        fields.insert("attributes".to_string(), attributes.to_json());
        fields.insert("resource".to_string(), resource.to_json());
        Self { fields }
    }

    /// Add a signal-specific key (metric metadata, point value).
    pub fn insert_extra(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Look up a field (used by tests and fake engines).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Serialize to canonical JSON: sorted keys, no whitespace, shortest
    /// round-trip number formatting.
    pub fn canonical_json(&self) -> String {
        // BTreeMap iterates keys in sorted order; serde_json emits integers
        // without a trailing `.0` and doubles via shortest round-trip.
        serde_json::to_string(&self.fields).expect("feature record is always serializable")
    }

    /// FNV-1a 64-bit fingerprint of the canonical JSON.
    pub fn fingerprint(&self) -> u64 {
        fnv1a_64(self.canonical_json().as_bytes())
    }
}
