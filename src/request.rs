use std::io::{self, BufRead, Read};

use crate::error::ServeError;

/// The only method this server answers.
pub const READ_VERB: &str = "GET";

/// Protocol token used in the status line when the request line didn't carry one.
pub const FALLBACK_PROTOCOL: &str = "HTTP/1.1";

// To prevent a client from eating up memory with an endless line, give up once the request line
// exceeds this many bytes:
pub const MAX_REQUEST_LINE: usize = 4000;

/// A parsed request line like "GET / HTTP/1.1", borrowing from the line it was parsed from.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest<'a> {
    pub verb: &'a str,
    pub raw_path: &'a str,
    pub protocol: &'a str,
}

/// Read the first line of a connection, including its `\n` terminator.
///
/// Fails with `ServeError::Read` if the client closes the connection, the read fails, or the line
/// grows past `MAX_REQUEST_LINE` before a terminator shows up.
pub fn read_request_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>, ServeError> {
    let mut line = Vec::new();
    reader
        .take(MAX_REQUEST_LINE as u64)
        .read_until(b'\n', &mut line)
        .map_err(ServeError::Read)?;
    if line.ends_with(b"\n") {
        return Ok(line);
    }
    let e = if line.len() >= MAX_REQUEST_LINE {
        io::Error::new(io::ErrorKind::InvalidData, "request line too long")
    } else {
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before end of request line",
        )
    };
    Err(ServeError::Read(e))
}

/// Split a request line into verb, path and protocol.
///
/// The path is taken as-is; percent-encoded sequences are not decoded. Tokens past the third are
/// ignored.
pub fn parse(line: &str) -> Result<ParsedRequest<'_>, ServeError> {
    let mut tokens = line.trim().split(' ');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(verb), Some(raw_path), Some(protocol)) => Ok(ParsedRequest {
            verb,
            raw_path,
            protocol,
        }),
        _ => Err(ServeError::MalformedRequestLine),
    }
}

impl<'a> ParsedRequest<'a> {
    /// Reject anything but the read verb.
    pub fn check_verb(&self) -> Result<(), ServeError> {
        if self.verb == READ_VERB {
            Ok(())
        } else {
            Err(ServeError::UnsupportedMethod(self.verb.to_string()))
        }
    }
}
