use std::io::{self, Write};

/// Status codes this server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

/// A complete reply: built once, written once.
#[derive(Debug, PartialEq)]
pub struct Response {
    status: Status,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Response {
    /// A 200 reply carrying `body`.
    pub fn ok(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            headers: vec![
                ("Content-Length", body.len().to_string()),
                ("Content-Type", content_type.to_string()),
            ],
            body,
        }
    }

    /// An empty-bodied reply for any (erroneous) occasion.
    pub fn error(status: Status) -> Self {
        Self {
            status,
            headers: vec![("Content-Length", "0".to_string())],
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header_name, _)| *header_name == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Status line, header lines and blank line, with `protocol` echoed from the request.
    fn head(&self, protocol: &str) -> String {
        let mut head = format!("{} {}\r\n", protocol, self.status);
        for (name, value) in &self.headers {
            head += &format!("{}: {}\r\n", name, value);
        }
        head += "\r\n";
        head
    }

    /// Write the whole response. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W, protocol: &str) -> io::Result<usize> {
        let head = self.head(protocol);
        writer.write_all(head.as_bytes())?;
        writer.write_all(&self.body)?;
        writer.flush()?;
        Ok(head.len() + self.body.len())
    }
}
