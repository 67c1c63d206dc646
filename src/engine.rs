use std::fmt;

use bytes::Bytes;
use memchr::memmem;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::state::StateMachine;
use crate::utils::{validate_boundary, CRLF, CRLFS, DASHES};
use crate::Result;

/// One boundary-delimited section of the stream: raw header lines plus
/// body bytes. Ephemeral; consumed when promoted to an [`Entry`].
///
/// [`Entry`]: crate::Entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    /// Header lines in encounter order, without line terminators.
    pub headers: Vec<String>,
    /// Accumulated body bytes.
    pub body: Bytes,
}

/// Why a decode stopped short of a cleanly terminated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// No opening `--{boundary}` line was found.
    BoundaryNotFound,
    /// The buffer ended inside a part's header block.
    TruncatedHeaders,
    /// The buffer ended inside a part body, before its closing delimiter.
    UnterminatedPart,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BoundaryNotFound => "boundary not found",
            Self::TruncatedHeaders => "part headers truncated",
            Self::UnterminatedPart => "part body unterminated",
        })
    }
}

/// Decode outcome: the parts recovered so far, plus a diagnostic when the
/// stream did not terminate cleanly. Malformed input never aborts a decode;
/// it yields fewer parts and a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Raw parts in encounter order.
    pub parts: Vec<RawPart>,
    /// Present when the stream was incomplete or never started.
    pub diagnostic: Option<Diagnostic>,
}

impl Decoded {
    /// Demands a cleanly terminated stream, turning a diagnostic into
    /// [`Error::TruncatedInput`].
    ///
    /// [`Error::TruncatedInput`]: crate::Error::TruncatedInput
    pub fn require_complete(self) -> Result<Vec<RawPart>> {
        match self.diagnostic {
            None => Ok(self.parts),
            Some(d) => Err(crate::Error::TruncatedInput(d)),
        }
    }
}

/// A swappable decoding engine over a fully materialized buffer.
///
/// Implementations share one contract and are chosen per call through
/// [`DecodeConfig`]; they are never combined on the same input.
pub trait Decode {
    /// Prepares the engine. Engines with setup cost do it here, as an
    /// explicit step rather than hidden process-wide state.
    fn ensure_ready(&mut self) -> Result<()> {
        Ok(())
    }

    /// Splits `bytes` into raw parts delimited by `boundary`.
    fn decode(&self, bytes: &[u8], boundary: &str) -> Result<Decoded>;
}

/// Engine selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    /// Baseline byte-cursor scanner, [`StateMachine`].
    #[default]
    StateMachine,
    /// Substring-search engine, [`DelimiterSearch`].
    DelimiterSearch,
}

/// Decode configuration, picked once per call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Which engine runs the decode.
    pub engine: Engine,
}

impl DecodeConfig {
    /// Configuration for the given engine.
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub(crate) fn build(&self) -> Box<dyn Decode> {
        match self.engine {
            Engine::StateMachine => Box::<StateMachine>::default(),
            Engine::DelimiterSearch => Box::<DelimiterSearch>::default(),
        }
    }
}

/// Fast decoding engine based on `memchr::memmem` delimiter search.
///
/// Splits on exact `\r\n--{boundary}` occurrences, so it requires strict
/// CRLF framing; on well-formed streams it agrees with [`StateMachine`],
/// which additionally tolerates stray lone CR/LF bytes.
#[derive(Debug, Default)]
pub struct DelimiterSearch;

impl Decode for DelimiterSearch {
    fn decode(&self, bytes: &[u8], boundary: &str) -> Result<Decoded> {
        validate_boundary(boundary)?;

        // `--boundary` and `\r\n--boundary`
        let mut open = Vec::with_capacity(2 + boundary.len());
        open.extend_from_slice(&DASHES);
        open.extend_from_slice(boundary.as_bytes());
        let mut delimiter = Vec::with_capacity(2 + open.len());
        delimiter.extend_from_slice(&CRLF);
        delimiter.extend_from_slice(&open);
        let finder = memmem::Finder::new(&delimiter);

        let mut parts = Vec::new();

        // The opening delimiter must stand alone on a line.
        let mut cursor = match find_opening(bytes, &open) {
            Opening::At(n) => n + open.len(),
            Opening::Closed => {
                return Ok(Decoded {
                    parts,
                    diagnostic: None,
                })
            }
            Opening::Missing => {
                return Ok(Decoded {
                    parts,
                    diagnostic: Some(Diagnostic::BoundaryNotFound),
                })
            }
        };

        let diagnostic = loop {
            // After a delimiter line: `--` closes the stream, CRLF opens a
            // header block, anything else ends the decode.
            let rest = &bytes[cursor..];
            if rest.starts_with(&DASHES) || rest.is_empty() {
                break None;
            }
            if !rest.starts_with(&CRLF) {
                // Garbage where the next header block or the terminator
                // belongs; anything past it is unrecoverable.
                break Some(Diagnostic::UnterminatedPart);
            }
            cursor += 2;

            // Header block runs to the empty line.
            let headers = if bytes[cursor..].starts_with(&CRLF) {
                cursor += 2;
                Vec::new()
            } else {
                match memmem::find(&bytes[cursor..], &CRLFS) {
                    None => break Some(Diagnostic::TruncatedHeaders),
                    Some(n) => {
                        let block = &bytes[cursor..cursor + n];
                        cursor += n + CRLFS.len();
                        split_header_lines(block)
                    }
                }
            };

            // Body runs to the next delimiter.
            let region = &bytes[cursor..];
            let body = match finder.find(region) {
                Some(n) => {
                    cursor += n + delimiter.len();
                    Bytes::copy_from_slice(&region[..n])
                }
                // Empty part body, delimiter not preceded by CRLF.
                None if region.starts_with(&open) => {
                    cursor += open.len();
                    Bytes::new()
                }
                None => break Some(Diagnostic::UnterminatedPart),
            };

            trace!("part decoded from buffer");
            parts.push(RawPart { headers, body });
        };

        Ok(Decoded { parts, diagnostic })
    }
}

enum Opening {
    At(usize),
    Closed,
    Missing,
}

fn find_opening(bytes: &[u8], open: &[u8]) -> Opening {
    let mut from = 0;
    while let Some(i) = memmem::find(&bytes[from..], open) {
        let pos = from + i;
        let line_start = pos == 0 || bytes[..pos].ends_with(&CRLF);
        let rest = &bytes[pos + open.len()..];
        if line_start && rest.starts_with(&CRLF) {
            return Opening::At(pos);
        }
        if line_start && rest.starts_with(&DASHES) {
            // Terminator with no parts before it.
            return Opening::Closed;
        }
        from = pos + 1;
    }
    Opening::Missing
}

fn split_header_lines(block: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = block;
    while let Some(i) = memmem::find(rest, &CRLF) {
        lines.push(String::from_utf8_lossy(&rest[..i]).into_owned());
        rest = &rest[i + CRLF.len()..];
    }
    if !rest.is_empty() {
        lines.push(String::from_utf8_lossy(rest).into_owned());
    }
    lines
}
