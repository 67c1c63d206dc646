use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::engine::{Decode, Decoded, Diagnostic, RawPart};
use crate::utils::{validate_boundary, DASHES};
use crate::Result;

#[derive(Debug, PartialEq)]
enum Flag {
    Init,
    ReadingHeaders,
    ReadingData,
    ReadingPartSeparator,
}

/// Accumulates the candidate current line for boundary comparison.
///
/// A line ends only on an exact CR,LF pair. A lone CR or LF is dropped
/// from the accumulated text without terminating the line, so stray bare
/// newline bytes are tolerated rather than treated as terminators; the
/// [`DelimiterSearch`] engine requires exact CRLF framing instead.
///
/// [`DelimiterSearch`]: crate::DelimiterSearch
#[derive(Debug)]
struct LineScanner {
    line: Vec<u8>,
    prev: Option<u8>,
}

impl LineScanner {
    fn new(capacity: usize) -> Self {
        Self {
            line: Vec::with_capacity(capacity),
            prev: None,
        }
    }

    /// Feeds one byte; returns `true` when CRLF completes the line.
    fn feed(&mut self, byte: u8) -> bool {
        let terminated = byte == b'\n' && self.prev == Some(b'\r');
        if byte != b'\n' && byte != b'\r' {
            self.line.push(byte);
        }
        self.prev = Some(byte);
        terminated
    }

    fn as_slice(&self) -> &[u8] {
        &self.line
    }

    fn len(&self) -> usize {
        self.line.len()
    }

    fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    fn clear(&mut self) {
        self.line.clear();
    }
}

/// Baseline decoding engine: a four-state scanner driven by an index
/// cursor over the byte slice.
///
/// The terminating `--{boundary}--` line is not treated as a state of its
/// own; decoding simply stops at the end of the buffer and the outcome is
/// reported through [`Decoded::diagnostic`].
#[derive(Debug, Default)]
pub struct StateMachine;

impl Decode for StateMachine {
    fn decode(&self, bytes: &[u8], boundary: &str) -> Result<Decoded> {
        validate_boundary(boundary)?;

        let delimiter = format!("--{boundary}");
        let closing = format!("--{boundary}--");
        // A line longer than this can never match the delimiter.
        let keep = delimiter.len() + 2;

        let mut flag = Flag::Init;
        let mut scanner = LineScanner::new(keep);
        let mut headers = Vec::<String>::new();
        let mut body = BytesMut::new();
        let mut parts = Vec::new();
        let mut closed = false;

        for &byte in bytes {
            let terminated = scanner.feed(byte);

            match flag {
                Flag::Init => {
                    if terminated {
                        if scanner.as_slice() == delimiter.as_bytes() {
                            flag = Flag::ReadingHeaders;
                        } else if scanner.as_slice() == closing.as_bytes() {
                            closed = true;
                        }
                        scanner.clear();
                    }
                }
                Flag::ReadingHeaders => {
                    if terminated {
                        if scanner.is_empty() {
                            flag = Flag::ReadingData;
                            body.clear();
                        } else {
                            headers.push(String::from_utf8_lossy(scanner.as_slice()).into_owned());
                        }
                        scanner.clear();
                    }
                }
                Flag::ReadingData => {
                    // Bounded scratch: clear a line that already outgrew
                    // the delimiter.
                    if scanner.len() > keep {
                        scanner.clear();
                    }
                    if scanner.as_slice() == delimiter.as_bytes() {
                        // Drop the matched delimiter and its preceding
                        // CRLF from the body.
                        let cut = body.len().saturating_sub(scanner.len() + 1);
                        body.truncate(cut);

                        trace!("part decoded from buffer");
                        parts.push(RawPart {
                            headers: std::mem::take(&mut headers),
                            body: body.split().freeze(),
                        });

                        scanner.clear();
                        flag = Flag::ReadingPartSeparator;
                    } else {
                        body.put_u8(byte);
                    }
                    if terminated {
                        scanner.clear();
                    }
                }
                Flag::ReadingPartSeparator => {
                    if terminated {
                        flag = Flag::ReadingHeaders;
                    }
                }
            }
        }

        let diagnostic = match flag {
            Flag::Init => (!closed).then_some(Diagnostic::BoundaryNotFound),
            Flag::ReadingHeaders => {
                // The `--` tail of the closing delimiter parks here.
                let after_close = (headers.is_empty() && scanner.as_slice() == &DASHES[..])
                    || (scanner.is_empty() && headers.len() == 1 && headers[0] == "--");
                (!after_close).then_some(Diagnostic::TruncatedHeaders)
            }
            Flag::ReadingData => Some(Diagnostic::UnterminatedPart),
            Flag::ReadingPartSeparator => None,
        };

        Ok(Decoded { parts, diagnostic })
    }
}
