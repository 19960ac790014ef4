//! Event metadata and its JSON serialization.
//!
//! Metadata is a flat map of string keys to stringlike values. It is sent to the
//! collection endpoint as a JSON-encoded *string* rather than a nested object,
//! so it is serialized here ahead of building the event.
//!
//! Serialization is best-effort: an empty map yields no metadata, and an
//! encoding failure is logged and dropped instead of failing the send.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while encoding metadata.
///
/// With string keys and values the encoder has nothing to reject, so this is
/// not expected in practice; it exists for callers of [`try_serialize`].
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The map could not be encoded as JSON.
    #[error("metadata serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// String-keyed metadata attached to a pageview or event.
///
/// Values are stored as their `ToString` representation. Keys are kept sorted
/// so that the serialized form is canonical.
///
/// # Example
///
/// ```
/// use simpleanalytics::metadata::Metadata;
///
/// let mut metadata = Metadata::new();
/// metadata.insert("plan", "premium").insert("seats", 5);
///
/// assert_eq!(metadata.get("seats"), Some("5"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Creates an empty metadata map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.insert(key.into(), value.to_string());
        self
    }

    /// Returns the stored value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Metadata
where
    K: Into<String>,
    V: ToString,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// Serializes metadata to a JSON string, surfacing encoding errors.
///
/// Returns `Ok(None)` for absent or empty metadata.
///
/// # Errors
///
/// Returns `MetadataError::SerializationFailed` if the map cannot be
/// represented as JSON.
pub fn try_serialize(metadata: Option<&Metadata>) -> Result<Option<String>, MetadataError> {
    match metadata {
        Some(metadata) if !metadata.is_empty() => Ok(Some(serde_json::to_string(metadata)?)),
        _ => Ok(None),
    }
}

/// Serializes metadata to a JSON string.
///
/// Returns `None` for absent or empty metadata, and also when encoding fails;
/// the failure is logged since metadata never blocks sending an event.
///
/// ```
/// use simpleanalytics::metadata::{serialize, Metadata};
///
/// let metadata = Metadata::from([("plan", "premium")]);
/// assert_eq!(serialize(Some(&metadata)).as_deref(), Some(r#"{"plan":"premium"}"#));
/// assert_eq!(serialize(None), None);
/// ```
#[must_use]
pub fn serialize(metadata: Option<&Metadata>) -> Option<String> {
    try_serialize(metadata).unwrap_or_else(|e| {
        warn!(error = %e, "Dropping metadata that could not be serialized");
        None
    })
}
