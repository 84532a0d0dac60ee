//! A minimal static file server: one request line in, one response out, then close.
//!
//! Each accepted connection runs on its own thread through [`connection::handle_connection`]:
//! read the request line, resolve the path below the root directory, and reply with the file,
//! the directory's `index.html`, a generated listing, or an empty-bodied error status.

pub mod config;
pub mod connection;
pub mod error;
pub mod listener;
pub mod listing;
pub mod log;
pub mod mime;
pub mod request;
pub mod resolve;
pub mod response;
