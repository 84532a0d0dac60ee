use anyhow::Result;

use fileserve::config::ServerConfig;
use fileserve::listener::{install_signal_handlers, Listener};

fn main() -> Result<()> {
    println!("{}/{}.", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from_command_line()?;
    let listener = Listener::bind(config)?;
    install_signal_handlers()?;

    println!("serving {}", listener.config().root.display());
    println!("listening on: http://{}/", listener.local_addr()?);

    listener.run()
}
