use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::response::Status;

/// Failures while serving a single connection. None of these leave the connection's thread.
#[derive(Debug, Error)]
pub enum ServeError {
    /// No terminated request line arrived. The connection is closed without a reply.
    #[error("failed to read request line: {0}")]
    Read(#[source] io::Error),

    #[error("malformed request line")]
    MalformedRequestLine,

    #[error("method `{0}' is not allowed")]
    UnsupportedMethod(String),

    #[error("path `{0}' escapes the root directory")]
    PathEscape(String),

    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    StatOrRead { path: PathBuf, source: io::Error },

    #[error("failed to list directory {}: {source}", .path.display())]
    DirectoryEnumeration { path: PathBuf, source: io::Error },
}

impl ServeError {
    /// Status the client sees for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::Read(_) | Self::MalformedRequestLine => Status::BadRequest,
            Self::UnsupportedMethod(_) => Status::MethodNotAllowed,
            Self::PathEscape(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::StatOrRead { .. } | Self::DirectoryEnumeration { .. } => {
                Status::InternalServerError
            }
        }
    }
}
