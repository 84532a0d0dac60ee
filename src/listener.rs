use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::select::{select, FdSet};
use nix::sys::signal::{signal, SigHandler, Signal};

use crate::config::ServerConfig;
use crate::connection::handle_connection;

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn stop_running(_signal: libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

fn is_running() -> bool {
    RUNNING.load(Ordering::Relaxed)
}

/// Ignore SIGPIPE so a vanished client is a write error, and stop the accept loop on SIGINT or
/// SIGTERM.
pub fn install_signal_handlers() -> Result<()> {
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) }
        .context("failed to set SIGPIPE handler")?;
    unsafe { signal(Signal::SIGINT, SigHandler::Handler(stop_running)) }
        .context("failed to set SIGINT handler")?;
    unsafe { signal(Signal::SIGTERM, SigHandler::Handler(stop_running)) }
        .context("failed to set SIGTERM handler")?;
    Ok(())
}

/// The listening socket plus the configuration every connection gets a handle to.
pub struct Listener {
    socket: TcpListener,
    config: Arc<ServerConfig>,
}

impl Listener {
    /// Bind the listening socket. Failure here is fatal; there is no retry.
    pub fn bind(config: ServerConfig) -> Result<Self> {
        let socket_addr = config.socket_addr();
        // Sets `SO_REUSEADDR` implicitly.
        let socket = TcpListener::bind(socket_addr)
            .with_context(|| format!("failed to create listening socket for {}", socket_addr))?;
        Ok(Self {
            socket,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept connections until a stop signal arrives. Each connection gets its own thread.
    pub fn run(&self) -> Result<()> {
        while is_running() {
            if self.wait_for_connection()? {
                self.accept_connection();
            }
        }
        Ok(())
    }

    /// Block until the socket is ready to accept. Returns false if a signal interrupted the wait.
    fn wait_for_connection(&self) -> Result<bool> {
        let mut recv_set = FdSet::new();
        recv_set.insert(self.socket.as_raw_fd());
        match select(None, Some(&mut recv_set), None, None, None) {
            Ok(_) => Ok(recv_set.contains(self.socket.as_raw_fd())),
            Err(e) if e.as_errno() == Some(Errno::EINTR) => Ok(false),
            Err(e) => Err(e).context("select() failed"),
        }
    }

    /// Accept one connection and hand it to a new thread.
    fn accept_connection(&self) {
        let (stream, addr) = match self.socket.accept() {
            Ok((stream, addr)) => (stream, addr),
            Err(e) => {
                // Failed to accept, but keep listening.
                eprintln!("warning: accept() failed: {}", e);
                return;
            }
        };

        let config = Arc::clone(&self.config);
        let spawned = thread::Builder::new()
            .name(format!("conn-{}", addr))
            .spawn(move || handle_connection(&config, stream, addr.ip()));
        if let Err(e) = spawned {
            eprintln!("warning: failed to spawn thread for {}: {}", addr, e);
        }
    }
}
