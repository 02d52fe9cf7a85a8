//! Data transfer objects for the wire and the HTTP API.

pub mod http;
pub mod websocket;
