use std::fs::{canonicalize, OpenOptions};
use std::io::BufWriter;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};

use crate::log::LogSink;
use crate::mime::{MimeMap, DEFAULT_MIME_TYPE};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ROOT: &str = ".";

/// Startup configuration. Shared read-only with every connection once the listener is bound.
#[derive(Debug)]
pub struct ServerConfig {
    /// Absolute, canonical path of the directory being served.
    pub root: PathBuf,
    pub port: u16,
    pub addr: IpAddr,
    pub mime_map: MimeMap,
    pub log_sink: LogSink,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the root and port.
    pub fn new<P: AsRef<Path>>(root: P, port: u16) -> Result<Self> {
        Ok(Self {
            root: resolve_root(root.as_ref())?,
            port,
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            mime_map: MimeMap::default(),
            log_sink: LogSink::default(),
        })
    }

    pub fn from_command_line() -> Result<Self> {
        let mut args = std::env::args();
        let name = args.next().unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        Self::from_args(&name, args)
    }

    /// Parse flags (everything after argv[0]). `--help` and `--version` print and exit.
    pub fn from_args<I: Iterator<Item = String>>(argv0: &str, mut args: I) -> Result<Self> {
        let mut root = PathBuf::from(DEFAULT_ROOT);
        let mut port = DEFAULT_PORT;
        let mut addr = None;
        let mut mime_map = MimeMap::default();
        let mut log_sink = LogSink::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--root" => {
                    root = PathBuf::from(args.next().context("missing directory after --root")?);
                }
                "--port" => {
                    let number = args.next().context("missing number after --port")?;
                    port = number
                        .parse()
                        .with_context(|| format!("port number {} is invalid", number))?;
                }
                "--addr" => {
                    let ip = args.next().context("missing ip after --addr")?;
                    addr = Some(
                        ip.parse::<IpAddr>()
                            .with_context(|| format!("address {} is invalid", ip))?,
                    );
                }
                "--log" => {
                    let filename = args.next().context("missing filename after --log")?;
                    log_sink = LogSink::File(Mutex::new(BufWriter::new(
                        OpenOptions::new()
                            .append(true)
                            .create(true)
                            .open(&filename)
                            .with_context(|| format!("failed to open log file {}", filename))?,
                    )));
                }
                "--syslog" => log_sink = LogSink::Syslog,
                "--mimetypes" => {
                    let filename = args.next().context("missing filename after --mimetypes")?;
                    mime_map.parse_extension_map_file(Path::new(&filename))?;
                }
                "--default-mimetype" => {
                    mime_map.default_mimetype = args
                        .next()
                        .context("missing string after --default-mimetype")?;
                }
                "--version" => {
                    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                    std::process::exit(0);
                }
                "--help" => {
                    usage(argv0);
                    std::process::exit(0);
                }
                _ => {
                    return Err(anyhow!("unknown argument `{}'", arg));
                }
            }
        }
        let mut config = Self::new(root, port)?;
        if let Some(addr) = addr {
            config.addr = addr;
        }
        config.mime_map = mime_map;
        config.log_sink = log_sink;
        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// Make the root absolute and canonical, and check that it is a directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = canonicalize(root)
        .with_context(|| format!("failed to resolve root directory {}", root.display()))?;
    if !root.is_dir() {
        return Err(anyhow!("root path {} is not a directory", root.display()));
    }
    Ok(root)
}

fn usage(argv0: &str) {
    print!(
        "usage:\t{} [flags]\n\n\
        flags:\t--root dir (default: {})\n\
        \t\tDirectory to serve files from.\n\n\
        \t--port number (default: {})\n\
        \t\tSpecifies which port to listen on for connections.\n\
        \t\tPass 0 to let the system choose any free port for you.\n\n\
        \t--addr ip (default: all)\n\
        \t\tIf multiple interfaces are present, specifies\n\
        \t\twhich one to bind the listening port to.\n\n\
        \t--log filename (default: stdout)\n\
        \t\tSpecifies which file to append the request log to.\n\n\
        \t--syslog\n\
        \t\tUse syslog for request log.\n\n\
        \t--mimetypes filename (optional)\n\
        \t\tParses specified file for extension-MIME associations.\n\n\
        \t--default-mimetype string (optional, default: {})\n\
        \t\tFiles with unknown extensions are served as this mimetype.\n\n\
        \t--version\n\
        \t\tPrint the version and exit.\n\n",
        argv0, DEFAULT_ROOT, DEFAULT_PORT, DEFAULT_MIME_TYPE,
    );
}
