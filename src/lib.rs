//! Whole-buffer codec for the `multipart/form-data` wire format, a subset
//! of [rfc7578]: CRLF line endings, `--{boundary}` part delimiters, a
//! `--{boundary}--` terminator line and one empty line between a part's
//! headers and its body.
//!
//! Decoding runs over a fully materialized buffer through a swappable
//! [`Decode`] engine; encoding turns a [`FormData`] store back into a
//! tagged byte stream. Streaming, nested multipart bodies and general MIME
//! parsing are out of scope.
//!
//! # Example
//!
//! ```rust
//! use multipart_codec::FormData;
//!
//! # fn main() -> Result<(), multipart_codec::Error> {
//! let mut form = FormData::with_boundary("AaB03x");
//! form.append("field1", "hello");
//!
//! let encoded = form.serialize()?;
//! assert_eq!(encoded.content_type, "multipart/form-data; boundary=AaB03x");
//!
//! let decoded = FormData::decode(&encoded.bytes, "AaB03x")?;
//! assert_eq!(
//!     decoded.get("field1").map(|e| e.value.as_bytes()),
//!     Some(&b"hello"[..]),
//! );
//! # Ok(()) }
//! ```
//!
//! [rfc7578]: <https://tools.ietf.org/html/rfc7578>

#![forbid(unsafe_code)]
#![deny(nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod encode;
mod engine;
mod entry;
mod error;
mod form;
mod state;
mod utils;

pub use encode::Encoded;

pub use engine::{Decode, DecodeConfig, Decoded, DelimiterSearch, Diagnostic, Engine, RawPart};

pub use entry::{Entry, Metadata, Value, CONTENT_TYPE_KEY};

pub use error::Error;

pub use form::FormData;

pub use state::StateMachine;

pub use utils::boundary_from_content_type;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
