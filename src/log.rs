use std::ffi::CString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// Where to put the access log.
#[derive(Debug)]
pub enum LogSink {
    Stdout,
    Syslog,
    File(Mutex<BufWriter<File>>),
}

impl LogSink {
    pub fn log(&self, message: &str) -> io::Result<()> {
        match self {
            Self::Stdout => {
                print!("{}", message);
            }
            Self::Syslog => {
                let message = CString::new(message)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                unsafe {
                    libc::syslog(
                        libc::LOG_INFO,
                        b"%s\0".as_ptr() as *const libc::c_char,
                        message.as_ptr(),
                    )
                };
            }
            Self::File(file) => {
                let mut file = file
                    .lock()
                    .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
                write!(file, "{}", message)?;
                file.flush()?;
            }
        }
        Ok(())
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::Stdout
    }
}

/// Common Log Format (CLF) formatted date in local timezone.
pub struct ClfDate(pub SystemTime);

impl std::fmt::Display for ClfDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let datetime = DateTime::<Local>::from(self.0);
        write!(f, "{}", datetime.format("[%d/%b/%Y:%H:%M:%S %z]"))
    }
}

/// Encode string for logging. Logs should not contain control characters or double quotes.
pub struct LogEncoded<'a>(pub &'a str);

impl<'a> std::fmt::Display for LogEncoded<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in self.0.chars() {
            if !c.is_ascii() || c.is_ascii_control() || c == '"' {
                let mut buf = [0; 4];
                c.encode_utf8(&mut buf);
                for b in buf.iter().take(c.len_utf8()) {
                    write!(f, "%{:02X}", b)?;
                }
            } else {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

/// One line of the access log, in Common Log Format.
pub struct AccessLogEntry<'a> {
    pub client: IpAddr,
    pub time: SystemTime,
    pub request_line: &'a str,
    pub status: u16,
    pub bytes_sent: usize,
}

impl<'a> std::fmt::Display for AccessLogEntry<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} - - {} \"{}\" {} {}",
            self.client,
            ClfDate(self.time),
            LogEncoded(self.request_line),
            self.status,
            self.bytes_sent,
        )
    }
}
