//! frame-server: a length-prefixed request/response server
//!
//! Every request and response on a connection is one frame:
//! a 4-byte little-endian payload length followed by the payload.
//!
//! Features:
//! - Binary-safe payloads, many exchanges per connection
//! - Frame size limit enforced before the body is read
//! - Serial (one connection at a time) or thread-per-connection serving
//! - Configuration via CLI arguments or TOML file

use frame_server::{Config, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        backlog = config.backlog,
        max_message = config.max_message,
        handler = ?config.handler,
        mode = ?config.mode,
        "Starting frame-server"
    );

    // Bind failures end the process; connection failures never do.
    let server = Server::bind(config)?;
    server.run()
}
