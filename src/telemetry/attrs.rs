// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Attribute values and attribute maps.
//!
//! Attribute polymorphism is modeled as a tagged sum consumed by a single
//! dispatching [`set_attribute`] function. Maps are ordered (`BTreeMap`) so
//! canonical serialization and hashing fall out of plain iteration.

use serde_json::Value;
use std::collections::BTreeMap;

/// FNV-1a offset basis (64-bit).
const FNV_OFFSET: u64 = 14695981039346656037;
/// FNV-1a prime (64-bit).
const FNV_PRIME: u64 = 1099511628211;

/// FNV-1a 64-bit hash over a byte slice.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for b in bytes {
        h ^= *b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// A single telemetry attribute value.
///
/// The four scalar kinds are the interchange set; richer shapes coming out of
/// inference results (arrays, nested objects) are flattened to JSON-encoded
/// strings before they reach an attribute map.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl AttrValue {
    /// Render the value as a display string (log bodies, diagnostics).
    pub fn render(&self) -> String {
        match self {
            AttrValue::Str(s) => s.clone(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Double(d) => d.to_string(),
        }
    }

    /// Convert to a JSON value for feature-record serialization.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Str(s) => Value::String(s.clone()),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Double(d) => {
                // Non-finite doubles have no JSON representation; fall back to
                // their display form so the record stays serializable.
                serde_json::Number::from_f64(*d)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(d.to_string()))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<f64> for AttrValue {
    fn from(d: f64) -> Self {
        AttrValue::Double(d)
    }
}

/// An ordered attribute map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttrMap(BTreeMap<String, AttrValue>);

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Convert to a JSON object for feature-record serialization.
    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        for (k, v) in &self.0 {
            obj.insert(k.clone(), v.to_json());
        }
        Value::Object(obj)
    }

    /// FNV-1a hash over the map's sorted key/value pairs.
    ///
    /// Keys iterate in sorted order already, so logically identical maps hash
    /// identically regardless of insertion order.
    pub fn fnv_hash(&self) -> u64 {
        let mut h = FNV_OFFSET;
        for (k, v) in &self.0 {
            for b in k.as_bytes() {
                h ^= *b as u64;
                h = h.wrapping_mul(FNV_PRIME);
            }
            match v {
                AttrValue::Str(s) => {
                    for b in s.as_bytes() {
                        h ^= *b as u64;
                        h = h.wrapping_mul(FNV_PRIME);
                    }
                }
                AttrValue::Bool(b) => {
                    h ^= if *b { 1 } else { 0 };
                    h = h.wrapping_mul(FNV_PRIME);
                }
                AttrValue::Int(i) => {
                    h ^= *i as u64;
                    h = h.wrapping_mul(FNV_PRIME);
                }
                AttrValue::Double(d) => {
                    h ^= d.to_bits();
                    h = h.wrapping_mul(FNV_PRIME);
                }
            }
        }
        h
    }
}

impl FromIterator<(String, AttrValue)> for AttrMap {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        AttrMap(iter.into_iter().collect())
    }
}

/// Write one inference-result field into an attribute map, dispatching on the
/// JSON value's shape.
///
/// Scalars map onto the four attribute kinds. Arrays and objects are written
/// as a single attribute holding the JSON-encoded value. Nulls are skipped.
/// String payloads are truncated to `max_len` bytes on a UTF-8 boundary.
pub fn set_attribute(map: &mut AttrMap, key: &str, value: &Value, max_len: usize) {
    match value {
        Value::Null => {}
        Value::Bool(b) => map.insert(key, *b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                map.insert(key, i);
            } else if let Some(d) = n.as_f64() {
                map.insert(key, d);
            }
        }
        Value::String(s) => map.insert(key, truncate_utf8(s, max_len)),
        Value::Array(_) | Value::Object(_) => {
            let encoded = value.to_string();
            map.insert(key, truncate_utf8(&encoded, max_len));
        }
    }
}

/// Truncate a string to at most `max_bytes` bytes without splitting a UTF-8
/// code point. A `max_bytes` of zero disables truncation.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if max_bytes == 0 || s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_hash_insertion_order_independent() {
        let mut a = AttrMap::new();
        a.insert("service.name", "user-service");
        a.insert("db.system", "postgresql");

        let mut b = AttrMap::new();
        b.insert("db.system", "postgresql");
        b.insert("service.name", "user-service");

        assert_eq!(a.fnv_hash(), b.fnv_hash());
    }

    #[test]
    fn test_fnv_hash_value_sensitive() {
        let mut a = AttrMap::new();
        a.insert("retries", 3i64);

        let mut b = AttrMap::new();
        b.insert("retries", 4i64);

        assert_ne!(a.fnv_hash(), b.fnv_hash());
    }

    #[test]
    fn test_set_attribute_scalars() {
        let mut map = AttrMap::new();
        set_attribute(&mut map, "ai.category", &Value::String("database_error".into()), 256);
        set_attribute(&mut map, "ai.confidence", &serde_json::json!(0.85), 256);
        set_attribute(&mut map, "ai.retryable", &Value::Bool(true), 256);
        set_attribute(&mut map, "ai.count", &serde_json::json!(7), 256);

        assert_eq!(map.get("ai.category"), Some(&AttrValue::Str("database_error".into())));
        assert_eq!(map.get("ai.confidence"), Some(&AttrValue::Double(0.85)));
        assert_eq!(map.get("ai.retryable"), Some(&AttrValue::Bool(true)));
        assert_eq!(map.get("ai.count"), Some(&AttrValue::Int(7)));
    }

    #[test]
    fn test_set_attribute_array_becomes_json_string() {
        let mut map = AttrMap::new();
        set_attribute(&mut map, "ai.services", &serde_json::json!(["auth", "billing"]), 256);

        match map.get("ai.services") {
            Some(AttrValue::Str(s)) => {
                let parsed: Vec<String> = serde_json::from_str(s).unwrap();
                assert_eq!(parsed, vec!["auth", "billing"]);
            }
            other => panic!("expected JSON string attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_set_attribute_skips_null() {
        let mut map = AttrMap::new();
        set_attribute(&mut map, "ai.owner", &Value::Null, 256);
        assert!(map.is_empty());
    }

    #[test]
    fn test_truncate_utf8_respects_boundaries() {
        // "héllo" is 6 bytes: h(1) é(2) l(1) l(1) o(1)
        assert_eq!(truncate_utf8("héllo", 2), "h");
        assert_eq!(truncate_utf8("héllo", 3), "hé");
        assert_eq!(truncate_utf8("héllo", 6), "héllo");
        assert_eq!(truncate_utf8("héllo", 100), "héllo");
    }

    #[test]
    fn test_truncate_utf8_zero_disables() {
        let long = "x".repeat(1024);
        assert_eq!(truncate_utf8(&long, 0), long);
    }

    #[test]
    fn test_set_attribute_truncates_long_strings() {
        let mut map = AttrMap::new();
        let long = "a".repeat(400);
        set_attribute(&mut map, "ai.impact", &Value::String(long), 256);
        match map.get("ai.impact") {
            Some(AttrValue::Str(s)) => assert_eq!(s.len(), 256),
            other => panic!("expected string attribute, got {:?}", other),
        }
    }
}
