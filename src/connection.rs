//! Everything that happens to one accepted connection: read a line, answer it, close.

use std::fs::{metadata, read};
use std::io::{self, BufReader, Read};
use std::net::{IpAddr, Shutdown, TcpStream};
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::ServerConfig;
use crate::error::ServeError;
use crate::listing::generate_dir_listing;
use crate::log::AccessLogEntry;
use crate::mime::MimeMap;
use crate::request::{parse, read_request_line, ParsedRequest, FALLBACK_PROTOCOL};
use crate::resolve::{clean_path, resolve, ResolvedTarget, TargetKind};
use crate::response::{Response, Status};

pub const DEFAULT_INDEX_NAME: &str = "index.html";

// After replying, wait this long for the client to stop sending before closing, so unread
// request headers don't turn the close into a reset that eats the response.
const LINGER_TIMEOUT: Duration = Duration::from_secs(1);
const LINGER_LIMIT: u64 = 1 << 16;

/// Serve one connection to completion. Errors are logged, never propagated.
pub fn handle_connection(config: &ServerConfig, stream: TcpStream, client: IpAddr) {
    let mut reader = BufReader::new(&stream);
    let line = match read_request_line(&mut reader) {
        Ok(line) => line,
        Err(e) => {
            eprintln!("warning: {}: {}", client, e);
            return;
        }
    };

    let (protocol, response) = process_request(config, &line);

    let mut writer = &stream;
    let bytes_sent = match response.write_to(&mut writer, protocol) {
        Ok(bytes_sent) => bytes_sent,
        Err(e) => {
            eprintln!("warning: failed to write response to {}: {}", client, e);
            return;
        }
    };

    let request_line = String::from_utf8_lossy(&line);
    let entry = AccessLogEntry {
        client,
        time: SystemTime::now(),
        request_line: request_line.trim(),
        status: response.status().code(),
        bytes_sent,
    };
    if let Err(e) = config.log_sink.log(&entry.to_string()) {
        eprintln!("warning: failed to write access log: {}", e);
    }

    linger(&stream, reader);
}

/// Half-close and drain whatever the client still sends, up to a limit.
fn linger<R: Read>(stream: &TcpStream, reader: R) {
    if stream.shutdown(Shutdown::Write).is_err() {
        return;
    }
    if stream.set_read_timeout(Some(LINGER_TIMEOUT)).is_err() {
        return;
    }
    io::copy(&mut reader.take(LINGER_LIMIT), &mut io::sink()).ok();
}

/// Build the response for a raw request line. Returns the protocol token to echo with it.
///
/// Never fails: every error becomes a status.
pub fn process_request<'a>(config: &ServerConfig, line: &'a [u8]) -> (&'a str, Response) {
    let request = std::str::from_utf8(line)
        .map_err(|_| ServeError::MalformedRequestLine)
        .and_then(parse);
    let request = match request {
        Ok(request) => request,
        Err(e) => return (FALLBACK_PROTOCOL, error_reply(&e)),
    };
    let response = serve(config, &request).unwrap_or_else(|e| error_reply(&e));
    (request.protocol, response)
}

fn serve(config: &ServerConfig, request: &ParsedRequest<'_>) -> Result<Response, ServeError> {
    request.check_verb()?;
    let target = resolve(request.raw_path, &config.root)?;
    respond(target, request.raw_path, &config.mime_map)
}

/// Map a resolved target to a response.
pub fn respond(
    target: ResolvedTarget,
    raw_path: &str,
    mime_map: &MimeMap,
) -> Result<Response, ServeError> {
    let ResolvedTarget { path, kind } = target;
    match kind {
        TargetKind::Missing => Err(ServeError::NotFound(path)),
        TargetKind::Unreadable(source) => Err(ServeError::StatOrRead { path, source }),
        TargetKind::Directory => {
            // does an index exist? Only a regular file counts, a FIFO would block the read.
            let index = path.join(DEFAULT_INDEX_NAME);
            let index_is_file = metadata(&index)
                .map(|metadata| metadata.is_file())
                .unwrap_or(false);
            if index_is_file {
                if let Ok(body) = read(&index) {
                    return Ok(file_reply(&index, body, mime_map));
                }
            }
            match generate_dir_listing(&path, &clean_path(raw_path)) {
                Ok(listing) => Ok(Response::ok("text/html", listing.into_bytes())),
                Err(source) => Err(ServeError::DirectoryEnumeration { path, source }),
            }
        }
        TargetKind::RegularFile => match read(&path) {
            Ok(body) => Ok(file_reply(&path, body, mime_map)),
            Err(source) => Err(ServeError::StatOrRead { path, source }),
        },
    }
}

fn file_reply(path: &Path, body: Vec<u8>, mime_map: &MimeMap) -> Response {
    Response::ok(mime_map.content_type(path), body)
}

/// A default reply for any (erroneous) occasion.
fn error_reply(e: &ServeError) -> Response {
    let status = e.status();
    if status == Status::InternalServerError {
        eprintln!("warning: {}", e);
    }
    Response::error(status)
}
