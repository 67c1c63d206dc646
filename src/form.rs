use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Decoded, Diagnostic, RawPart};
use crate::entry::{Entry, Metadata, Value, CONTENT_TYPE_KEY};
use crate::utils::{default_boundary, parse_content_disposition, parse_part_headers, CRLF};
use crate::{DecodeConfig, Encoded, Error, Result};

/// Ordered collection of named entries, the codec's in-memory form.
///
/// Duplicate names are preserved: the wire format permits repeated field
/// names, so the store is a true multi-map. [`FormData::get`] returns the
/// first entry of a name, [`FormData::get_all`] every one of them in
/// insertion order.
///
/// The store carries no internal synchronization; callers sharing one
/// across threads serialize access themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    boundary: String,
    entries: Vec<Entry>,
}

impl FormData {
    /// Creates an empty store with a timestamp-derived boundary.
    pub fn new() -> Self {
        Self::with_boundary(default_boundary())
    }

    /// Creates an empty store with the given boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            entries: Vec::new(),
        }
    }

    /// The boundary entries will be encoded with.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Decodes a buffer with the default engine, failing on a stream that
    /// does not terminate cleanly.
    pub fn decode(bytes: &[u8], boundary: &str) -> Result<Self> {
        Self::decode_with(bytes, boundary, &DecodeConfig::default())
    }

    /// Decodes a buffer with the configured engine, failing on a stream
    /// that does not terminate cleanly.
    pub fn decode_with(bytes: &[u8], boundary: &str, config: &DecodeConfig) -> Result<Self> {
        let (form, diagnostic) = Self::decode_partial(bytes, boundary, config)?;
        match diagnostic {
            None => Ok(form),
            Some(d) => Err(Error::TruncatedInput(d)),
        }
    }

    /// Decodes a buffer, keeping the entries recovered before a truncation
    /// and reporting it as a [`Diagnostic`] instead of an error.
    pub fn decode_partial(
        bytes: &[u8],
        boundary: &str,
        config: &DecodeConfig,
    ) -> Result<(Self, Option<Diagnostic>)> {
        let mut engine = config.build();
        engine.ensure_ready()?;

        let Decoded { parts, diagnostic } = engine.decode(bytes, boundary)?;
        if let Some(d) = diagnostic {
            debug!("decode stopped early: {d}");
        }

        let mut form = Self::with_boundary(boundary);
        for part in parts {
            form.append_entry(promote(part)?);
        }
        Ok((form, diagnostic))
    }

    /// Appends an entry; an existing name is kept, not overwritten.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.append_entry(Entry::new(name, value));
    }

    /// Appends an entry with parameters.
    pub fn append_with(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        metadata: Metadata,
    ) {
        self.append_entry(Entry::with_metadata(name, value, metadata));
    }

    /// Appends a prebuilt entry.
    pub fn append_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Replaces every entry of `name` with a single one, keeping the first
    /// occurrence's position; appends when the name is absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let entry = Entry::new(name.clone(), value);
        match self.entries.iter().position(|e| e.name == name) {
            None => self.entries.push(entry),
            Some(i) => {
                self.entries[i] = entry;
                let mut idx = 0;
                self.entries.retain(|e| {
                    let keep = idx <= i || e.name != name;
                    idx += 1;
                    keep
                });
            }
        }
    }

    /// The first entry of `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Every entry of `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |e| e.name == name)
    }

    /// Whether any entry carries `name`.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes every entry of `name`, reporting whether any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        before != self.entries.len()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entry names in insertion order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Entry payloads in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the store into a multipart byte stream tagged with its
    /// `Content-Type` header value.
    ///
    /// Double quotes in names and parameter values pass through
    /// unescaped, and decoding strips every quote from a parameter, so
    /// quote-bearing values do not survive a round trip.
    pub fn serialize(&self) -> Result<Encoded> {
        crate::encode::serialize(self)
    }
}

impl IntoIterator for FormData {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a FormData {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Promotes a raw part into an entry: validates the header block, pulls
/// the field name out of `Content-Disposition` and files the remaining
/// parameters plus the raw `Content-Type` value into the metadata.
fn promote(part: RawPart) -> Result<Entry> {
    let mut block = Vec::new();
    for line in &part.headers {
        block.extend_from_slice(line.as_bytes());
        block.extend_from_slice(&CRLF);
    }
    block.extend_from_slice(&CRLF);

    let mut headers = parse_part_headers(&block)?;

    let disposition = headers
        .remove(CONTENT_DISPOSITION)
        .ok_or(Error::InvalidContentDisposition)?;
    let disposition = disposition
        .to_str()
        .map_err(|_| Error::InvalidContentDisposition)?;

    let mut name = None;
    let mut metadata = Metadata::new();
    for (key, value) in parse_content_disposition(disposition)? {
        if key == "name" && name.is_none() {
            name = Some(value);
        } else {
            metadata.insert(key, value);
        }
    }
    let name = name.ok_or(Error::InvalidContentDisposition)?;

    if let Some(content_type) = headers.remove(CONTENT_TYPE) {
        let content_type = content_type.to_str().map_err(|_| Error::HeaderParse)?;
        let content_type = content_type.trim();
        // An empty value means unset, never a literal empty media type.
        if !content_type.is_empty() {
            metadata.insert(CONTENT_TYPE_KEY, content_type);
        }
    }

    Ok(Entry::with_metadata(name, Value::Bytes(part.body), metadata))
}
