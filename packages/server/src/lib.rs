//! Real-time chat relay with a decoupled persistence pipeline.
//!
//! The server fans accepted messages out to every WebSocket client and
//! publishes them to a broker; the storage service consumes the broker and
//! writes PostgreSQL and Redis.

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use bootstrap::{MemoryBackend, run_server, run_storage};
