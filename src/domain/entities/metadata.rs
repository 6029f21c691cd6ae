use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::warn;

use crate::domain::{DomainError, Result};

/// Metadata exactly as a caller supplied it, before validation.
pub type RawMetadata = serde_json::Map<String, Value>;

/// Reserved key holding a chunk record's own id.
pub const CHUNK_ID_KEY: &str = "chunkId";
/// Reserved key holding the owning document id.
pub const DOCUMENT_ID_KEY: &str = "id";
/// Reserved key holding the chunk's literal text.
pub const CONTENT_KEY: &str = "content";

/// A scalar value an index can store and filter on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

impl MetadataValue {
    /// Converts a JSON value, refusing arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as an index filter sees it: `1` and `1.0` are the same number.
    pub fn filter_eq(&self, other: &MetadataValue) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            },
            _ => self == other,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

/// Validated, flat metadata attached to a chunk record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts caller metadata for storage.
    ///
    /// Every value must be a string, number, boolean or null. All offending
    /// keys are logged before the whole map is rejected.
    pub fn validate(raw: &RawMetadata) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut invalid = Vec::new();

        for (key, value) in raw {
            match MetadataValue::from_json(value) {
                Some(v) => {
                    values.insert(key.clone(), v);
                }
                None => {
                    warn!(key = %key, value = %value, "Invalid metadata value");
                    invalid.push(key.as_str());
                }
            }
        }

        if invalid.is_empty() {
            Ok(Self(values))
        } else {
            Err(DomainError::validation(format!(
                "metadata values must be scalar or null, offending keys: {}",
                invalid.join(", ")
            )))
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetadataValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, MetadataValue)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (String, MetadataValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Equality conjunction over metadata keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, MetadataValue>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter selecting every chunk of one document.
    pub fn for_document(document_id: &str) -> Self {
        Self::new().eq(DOCUMENT_ID_KEY, document_id)
    }

    /// Builds a query filter from caller metadata, dropping (and logging)
    /// keys whose values cannot be filtered on.
    pub fn from_raw(raw: &RawMetadata) -> Self {
        let mut conditions = BTreeMap::new();

        for (key, value) in raw {
            match MetadataValue::from_json(value) {
                Some(v) => {
                    conditions.insert(key.clone(), v);
                }
                None => warn!(key = %key, value = %value, "Invalid metadata filter value"),
            }
        }

        Self(conditions)
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// True when every condition holds. A `null` condition only matches an
    /// explicit null, never a missing key.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| actual.filter_eq(expected))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawMetadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_accepts_scalars_and_null() {
        let metadata =
            Metadata::validate(&raw(json!({"a": 1, "b": "x", "c": true, "d": null}))).unwrap();

        assert_eq!(metadata.len(), 4);
        assert_eq!(metadata.get("a"), Some(&MetadataValue::from(1_i64)));
        assert_eq!(metadata.get_str("b"), Some("x"));
        assert_eq!(metadata.get("c"), Some(&MetadataValue::Bool(true)));
        assert_eq!(metadata.get("d"), Some(&MetadataValue::Null));
    }

    #[test]
    fn test_validate_rejects_nested_values() {
        let err = Metadata::validate(&raw(json!({"a": {"nested": 1}}))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = Metadata::validate(&raw(json!({"ok": 1, "tags": ["x", "y"]}))).unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_filter_drops_invalid_keys() {
        let filter = MetadataFilter::from_raw(&raw(json!({
            "folder": "inbox",
            "nested": {"x": 1},
            "list": [1, 2],
        })));

        assert_eq!(filter.len(), 1);
        assert!(filter.matches(&Metadata::new().with("folder", "inbox")));
    }

    #[test]
    fn test_filter_matches_equality_conjunction() {
        let filter = MetadataFilter::new().eq("kind", "note").eq("rank", 2_i64);
        let hit = Metadata::new().with("kind", "note").with("rank", 2.0_f64).with("x", true);
        let miss = Metadata::new().with("kind", "note").with("rank", 3_i64);

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
        assert!(!filter.matches(&Metadata::new().with("kind", "note")));
    }

    #[test]
    fn test_null_condition_requires_explicit_null() {
        let filter = MetadataFilter::new().eq("archived", MetadataValue::Null);

        assert!(filter.matches(&Metadata::new().with("archived", MetadataValue::Null)));
        assert!(!filter.matches(&Metadata::new()));
    }

    #[test]
    fn test_metadata_serializes_flat() {
        let metadata = Metadata::new().with("a", 1_i64).with("b", MetadataValue::Null);
        assert_eq!(serde_json::to_value(&metadata).unwrap(), json!({"a": 1, "b": null}));

        let back: Metadata = serde_json::from_value(json!({"a": 1, "b": null})).unwrap();
        assert_eq!(back, metadata);
    }
}
