//! Request parsing for a single read buffer.
//!
//! The accepted grammar is deliberately small:
//!
//! ```text
//! request     = start-line *( CRLF line )
//! start-line  = method SP path SP version
//! header-line = name ":" value     ; name must be non-empty
//! ```
//!
//! Only `\r\n` separates lines. A start line that does not split into exactly
//! three tokens on single spaces is malformed. Every later line is offered to
//! the header parser; lines that are not `name: value` (including the blank
//! line) are dropped rather than rejected.
//!
//! Parsing works on raw bytes throughout, so paths and header values reach the
//! router exactly as they arrived on the wire.

use thiserror::Error;

use super::{Headers, Request};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed start line: expected 3 space-separated tokens, found {tokens}")]
    MalformedStartLine { tokens: usize },
}

/// Iterator over the CRLF-separated lines of a buffer.
///
/// Like `str::split`, empty input yields a single empty line and a trailing
/// CRLF yields a final empty line.
pub struct Lines<'a> {
    rest: Option<&'a [u8]>,
}

pub fn lines(buf: &[u8]) -> Lines<'_> {
    Lines { rest: Some(buf) }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = self.rest?;
        match rest.windows(CRLF.len()).position(|w| w == CRLF) {
            Some(idx) => {
                self.rest = Some(&rest[idx + CRLF.len()..]);
                Some(&rest[..idx])
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }
}

/// Parses the bytes of one read into a [`Request`].
///
/// No decoding happens, so the only failure is a malformed start line.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let mut lines = lines(buf);

    // `Lines` always yields at least one item, even for empty input
    let start_line = lines.next().unwrap_or(&b""[..]);
    let (method, path, http_version) = parse_start_line(start_line)?;
    log::trace!(
        "Start line: method={} path={} version={}",
        String::from_utf8_lossy(method),
        String::from_utf8_lossy(path),
        String::from_utf8_lossy(http_version)
    );

    let headers = parse_headers(lines);
    log::trace!("Parsed {} headers", headers.len());

    Ok(Request {
        method: method.to_vec(),
        path: path.to_vec(),
        http_version: http_version.to_vec(),
        headers,
    })
}

/// Splits a start line into `(method, path, version)`, verbatim.
pub fn parse_start_line(line: &[u8]) -> Result<(&[u8], &[u8], &[u8]), ParseError> {
    let tokens: Vec<&[u8]> = line.split(|&b| b == b' ').collect();
    match tokens.as_slice() {
        [method, path, version] => Ok((*method, *path, *version)),
        _ => Err(ParseError::MalformedStartLine { tokens: tokens.len() }),
    }
}

/// Collects `name: value` pairs from every line given, skipping the rest.
pub fn parse_headers<'a, I>(lines: I) -> Headers
    where I: IntoIterator<Item=&'a [u8]> {
    let mut headers = Headers::default();

    for line in lines {
        match line.iter().position(|&b| b == b':') {
            Some(colon) if colon > 0 => headers.set(&line[..colon], trim(&line[colon + 1..])),
            _ => log::trace!("Skipping header line without a name: {:?}", String::from_utf8_lossy(line)),
        }
    }

    headers
}

fn trim(mut value: &[u8]) -> &[u8] {
    while value.len() > 0 && value[0].is_ascii_whitespace() {
        value = &value[1..];
    }
    while value.len() > 0 && value[value.len()-1].is_ascii_whitespace() {
        value = &value[..value.len()-1];
    }
    value
}
