//! Shared utilities for Chatline binaries.

pub mod logger;
pub mod time;
