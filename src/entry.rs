use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Reserved metadata key carrying a part's raw `Content-Type` value.
///
/// It rides in the metadata map next to the `Content-Disposition`
/// parameters, but the encoder emits it on its own header line, never
/// inside the disposition line.
pub const CONTENT_TYPE_KEY: &str = "content-type";

/// A part's payload, either text or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 text, encoded as `text/plain`.
    Text(String),
    /// Opaque bytes; the media type comes from the entry metadata.
    Bytes(Bytes),
}

impl Value {
    /// Views the payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::Bytes(b) => b,
        }
    }

    /// The payload size in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Whether the payload is textual.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(v))
    }
}

/// Ordered key-value parameters of a part, insertion order preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter; an existing key is overwritten in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Looks a parameter up by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Removes a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let i = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(i).1)
    }

    /// Iterates parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

/// A decoded or to-be-encoded part: name, payload and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The field name from `Content-Disposition`.
    pub name: String,
    /// The part payload.
    pub value: Value,
    /// `Content-Disposition` parameters plus the raw `Content-Type` value,
    /// keyed by [`CONTENT_TYPE_KEY`], when one was declared.
    pub metadata: Metadata,
}

impl Entry {
    /// Creates an entry without extra parameters.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::with_metadata(name, value, Metadata::new())
    }

    /// Creates an entry with parameters.
    pub fn with_metadata(
        name: impl Into<String>,
        value: impl Into<Value>,
        metadata: Metadata,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            metadata,
        }
    }

    /// The declared media type, `None` when unset.
    pub fn content_type(&self) -> Option<&str> {
        self.metadata.get(CONTENT_TYPE_KEY)
    }

    /// The `filename` disposition parameter, if any.
    pub fn filename(&self) -> Option<&str> {
        self.metadata.get("filename")
    }
}
