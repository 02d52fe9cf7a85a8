//! UI 層
//!
//! axum のルーター、WebSocket セッション、HTTP API、グレースフルシャットダウンを提供します。

mod handler;
pub mod runner;
pub mod session;
pub mod signal;
pub mod state;

pub use runner::{create_router, serve};
pub use signal::spawn_signal_listener;
pub use state::{AppState, WebSocketBuffers};
