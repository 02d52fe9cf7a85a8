//! Real-time chat server.
//!
//! Accepts WebSocket clients on `/api/v1/chat`, replays recent history and
//! broadcasts every accepted message.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chatline-server -- --backend memory
//! ```

use chatline_server::{config::ServerConfig, ui::spawn_signal_listener};
use chatline_shared::logger::setup_logger;
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "debug");
    let config = ServerConfig::parse();

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    if let Err(e) = chatline_server::run_server(config, shutdown).await {
        tracing::error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
