use std::time::{SystemTime, UNIX_EPOCH};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::{parse_headers, Status, EMPTY_HEADER};

use crate::{Error, Result};

pub(crate) const MAX_HEADERS: usize = 8 * 2;
pub(crate) const DASHES: [u8; 2] = [b'-', b'-']; // `--`
pub(crate) const CRLF: [u8; 2] = [b'\r', b'\n']; // `\r\n`
pub(crate) const CRLFS: [u8; 4] = [b'\r', b'\n', b'\r', b'\n']; // `\r\n\r\n`

pub(crate) fn validate_boundary(boundary: &str) -> Result<()> {
    if boundary.is_empty() || boundary.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(Error::MalformedBoundary(boundary.to_owned()));
    }
    Ok(())
}

/// Default boundary for a store created without one: the current Unix
/// timestamp in hex. Callers needing guaranteed non-collision with content
/// bytes must supply their own sufficiently random boundary.
pub(crate) fn default_boundary() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{millis:x}")
}

/// Extracts the boundary parameter from a `Content-Type` header value,
/// e.g. `multipart/form-data; boundary=AaB03x`.
pub fn boundary_from_content_type(value: &str) -> Option<String> {
    let m = value.parse::<mime::Mime>().ok()?;
    if m.type_() != mime::MULTIPART || m.subtype() != mime::FORM_DATA {
        return None;
    }
    m.get_param(mime::BOUNDARY).map(|b| b.as_str().to_owned())
}

pub(crate) fn parse_part_headers(bytes: &[u8]) -> Result<HeaderMap> {
    let mut headers = [EMPTY_HEADER; MAX_HEADERS];
    match parse_headers(bytes, &mut headers) {
        Ok(Status::Complete((_, hs))) => {
            let mut header_map = HeaderMap::with_capacity(hs.len());
            for h in hs {
                header_map.append(
                    HeaderName::from_bytes(h.name.as_bytes()).map_err(|_| Error::HeaderParse)?,
                    HeaderValue::from_bytes(h.value).map_err(|_| Error::HeaderParse)?,
                );
            }
            Ok(header_map)
        }
        Ok(Status::Partial) | Err(_) => Err(Error::HeaderParse),
    }
}

/// Splits a `Content-Disposition` value into its parameters, discarding
/// the leading disposition-type token. Every double quote in a token is
/// stripped, not only a surrounding pair.
pub(crate) fn parse_content_disposition(hv: &str) -> Result<Vec<(String, String)>> {
    let mut tokens = hv.split(';');
    if tokens
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .is_none()
    {
        return Err(Error::InvalidContentDisposition);
    }

    let mut params = Vec::new();
    for token in tokens {
        let token = token.replace('"', "");
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = token
            .split_once('=')
            .ok_or(Error::InvalidContentDisposition)?;
        params.push((key.trim().to_owned(), value.trim().to_owned()));
    }
    Ok(params)
}
