use thiserror::Error;

use crate::Diagnostic;

/// Codec Error
#[derive(Debug, Error)]
pub enum Error {
    /// Boundary is empty or contains bytes the wire format cannot carry
    #[error("malformed boundary `{0}`")]
    MalformedBoundary(String),

    /// Input ended while more of the stream was expected
    #[error("input truncated: {0}")]
    TruncatedInput(Diagnostic),

    /// Invalid part header
    #[error("invalid part header")]
    HeaderParse,

    /// Invalid content disposition
    #[error("invalid content disposition")]
    InvalidContentDisposition,

    /// A part body contains the boundary as a standalone line
    #[error("boundary `{0}` occurs inside a part body")]
    BoundaryCollision(String),
}
