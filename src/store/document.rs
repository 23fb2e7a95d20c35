use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::StoreError;

/// Trait that any domain type must implement to be kept in the document store.
///
/// Documents are stored as JSON objects. The `id` field of the serialized form
/// must match the id part of the document's path.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the collection this document type lives in.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn path(&self) -> DocPath {
        DocPath::new(Self::COLLECTION, self.id())
    }

    fn path_for(id: impl Into<String>) -> DocPath {
        DocPath::new(Self::COLLECTION, id)
    }
}

/// Address of a single document: `collection/id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document as read from the store, tagged with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocPath,
    pub version: u64,
    pub data: Value,
}

impl DocumentSnapshot {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            StoreError::Codec(format!("{}: {}", self.path, e))
        })
    }
}

/// Serialize a document into the object form the store keeps.
pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    let value = serde_json::to_value(value)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(StoreError::Codec("documents must serialize to a JSON object".to_string()))
    }
}

/// A single staged mutation inside a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Replace the whole document, creating it when absent.
    Set { path: DocPath, data: Value },
    /// Shallow-merge top-level fields into an existing document.
    Update { path: DocPath, fields: Map<String, Value> },
    Delete { path: DocPath },
}

impl Write {
    pub fn path(&self) -> &DocPath {
        match self {
            Write::Set { path, .. } | Write::Update { path, .. } | Write::Delete { path } => path,
        }
    }
}

/// What a commit expects a document to look like before it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Missing,
    Version(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Precondition {
    pub path: DocPath,
    pub expected: Expected,
}

impl Precondition {
    pub fn missing(path: DocPath) -> Self {
        Self {
            path,
            expected: Expected::Missing,
        }
    }

    pub fn version(path: DocPath, version: u64) -> Self {
        Self {
            path,
            expected: Expected::Version(version),
        }
    }

    pub(crate) fn holds(&self, current: Option<u64>) -> bool {
        match (self.expected, current) {
            (Expected::Missing, None) => true,
            (Expected::Version(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_matches_only_expected_state() {
        let path = DocPath::new("products", "p1");

        assert!(Precondition::missing(path.clone()).holds(None));
        assert!(!Precondition::missing(path.clone()).holds(Some(1)));
        assert!(Precondition::version(path.clone(), 3).holds(Some(3)));
        assert!(!Precondition::version(path.clone(), 3).holds(Some(4)));
        assert!(!Precondition::version(path, 3).holds(None));
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&42).is_err());
        assert!(encode(&serde_json::json!({ "id": "x" })).is_ok());
    }
}
