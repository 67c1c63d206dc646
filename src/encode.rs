use bytes::{Bytes, BytesMut};
use memchr::memmem;
use tracing::trace;

use crate::entry::{Entry, Value, CONTENT_TYPE_KEY};
use crate::utils::{validate_boundary, CRLF, DASHES};
use crate::{Error, FormData, Result};

/// An encoded multipart stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// The wire bytes.
    pub bytes: Bytes,
    /// `Content-Type` header value announcing the stream,
    /// `multipart/form-data; boundary={boundary}`.
    pub content_type: String,
}

pub(crate) fn serialize(form: &FormData) -> Result<Encoded> {
    validate_boundary(form.boundary())?;

    let delimiter = format!("--{}", form.boundary());

    // A body with a line starting in the delimiter would make the stream
    // undecodable; refuse to emit it.
    for entry in form.entries() {
        if contains_delimiter_line(entry.value.as_bytes(), delimiter.as_bytes()) {
            return Err(Error::BoundaryCollision(form.boundary().to_owned()));
        }
    }

    let mut buf = BytesMut::new();
    for entry in form.entries() {
        buf.extend_from_slice(delimiter.as_bytes());
        buf.extend_from_slice(&CRLF);

        buf.extend_from_slice(b"Content-Disposition: form-data; name=\"");
        buf.extend_from_slice(entry.name.as_bytes());
        buf.extend_from_slice(b"\"");
        for (key, value) in entry.metadata.iter() {
            if key == CONTENT_TYPE_KEY {
                continue;
            }
            buf.extend_from_slice(b"; ");
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(b"=\"");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\"");
        }
        buf.extend_from_slice(&CRLF);

        buf.extend_from_slice(b"Content-Type: ");
        buf.extend_from_slice(resolved_type(entry).as_bytes());
        buf.extend_from_slice(&CRLF);

        buf.extend_from_slice(&CRLF);
        buf.extend_from_slice(entry.value.as_bytes());
        buf.extend_from_slice(&CRLF);
    }
    buf.extend_from_slice(delimiter.as_bytes());
    buf.extend_from_slice(&DASHES);
    buf.extend_from_slice(&CRLF);

    trace!("encoded {} entries", form.len());

    Ok(Encoded {
        bytes: buf.freeze(),
        content_type: format!(
            "{}; boundary={}",
            mime::MULTIPART_FORM_DATA,
            form.boundary()
        ),
    })
}

fn resolved_type(entry: &Entry) -> &str {
    match &entry.value {
        Value::Text(_) => mime::TEXT_PLAIN.as_ref(),
        Value::Bytes(_) => entry
            .metadata
            .get(CONTENT_TYPE_KEY)
            .unwrap_or_else(|| mime::TEXT_PLAIN.as_ref()),
    }
}

/// Whether any line of `body` starts with `delimiter`. Both engines
/// terminate a part on such a line regardless of what follows it, so the
/// prefix alone already makes the body undecodable.
fn contains_delimiter_line(body: &[u8], delimiter: &[u8]) -> bool {
    let mut from = 0;
    while let Some(i) = memmem::find(&body[from..], delimiter) {
        let pos = from + i;
        if pos == 0 || body[..pos].ends_with(&CRLF) {
            return true;
        }
        from = pos + 1;
    }
    false
}
