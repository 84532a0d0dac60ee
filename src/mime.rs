use std::collections::HashMap;
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const DEFAULT_EXTENSIONS_MAP: &[&str] = &[
    "application/json        json",
    "application/ogg         ogg",
    "application/pdf         pdf",
    "application/wasm        wasm",
    "application/xml         xsl xml",
    "application/xml-dtd     dtd",
    "application/xslt+xml    xslt",
    "application/zip         zip",
    "audio/mpeg              mp2 mp3 mpga",
    "font/woff               woff",
    "font/woff2              woff2",
    "image/avif              avif",
    "image/gif               gif",
    "image/jpeg              jpeg jpe jpg",
    "image/png               png",
    "image/svg+xml           svg",
    "image/vnd.microsoft.icon ico",
    "image/webp              webp",
    "text/css                css",
    "text/html               html htm",
    "text/javascript         js mjs",
    "text/plain              txt asc",
    "video/mpeg              mpeg mpe mpg",
    "video/quicktime         qt mov",
    "video/x-msvideo         avi",
    "video/mp4               mp4",
];

/// Extension to content type lookup. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct MimeMap {
    mimetypes: HashMap<String, String>,
    pub default_mimetype: String,
}

impl MimeMap {
    /// Add extension map from a file of `type ext ext...` lines.
    pub fn parse_extension_map_file(&mut self, filename: &Path) -> Result<()> {
        let file = File::open(filename)
            .with_context(|| format!("failed to open {}", filename.display()))?;
        for line in std::io::BufReader::new(file).lines() {
            let line = line.with_context(|| format!("failed to read {}", filename.display()))?;
            self.add_mimetype_line(&line);
        }
        Ok(())
    }

    /// Add line from an extension map.
    pub fn add_mimetype_line(&mut self, line: &str) {
        let mut fields = line
            .split(|c: char| c.is_ascii_whitespace())
            .filter(|field| !field.is_empty());
        let mimetype = match fields.next() {
            Some(mimetype) => mimetype,
            None => return, // empty line
        };
        if mimetype.starts_with('#') {
            return; // comment
        }
        for extension in fields {
            self.mimetypes
                .insert(extension.to_string(), mimetype.to_string());
        }
    }

    /// Content type for an extension, if known. Falls back to a lowercase match.
    pub fn lookup(&self, extension: &str) -> Option<&str> {
        self.mimetypes
            .get(extension)
            .or_else(|| self.mimetypes.get(&extension.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// Content type for a file, by its extension.
    pub fn content_type(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(|extension| self.lookup(extension))
            .unwrap_or(self.default_mimetype.as_str())
    }
}

impl Default for MimeMap {
    /// Create MimeMap using the default extension map.
    fn default() -> Self {
        let mut mime_map = Self {
            mimetypes: HashMap::new(),
            default_mimetype: DEFAULT_MIME_TYPE.to_string(),
        };
        for line in DEFAULT_EXTENSIONS_MAP {
            mime_map.add_mimetype_line(line);
        }
        mime_map
    }
}
