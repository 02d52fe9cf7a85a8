//! Fan-out of accepted messages to every registered connection.

use std::sync::Arc;

use crate::domain::{BroadcastReport, MessageBroadcaster};

use super::registry::ConnectionRegistry;

/// Broadcaster backed by the connection registry.
pub struct RegistryBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl RegistryBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

impl MessageBroadcaster for RegistryBroadcaster {
    /// Queue `payload` for every connection in a fresh snapshot.
    ///
    /// A failed connection is logged and skipped; removing it is left to its
    /// own session.
    fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for connection in self.registry.snapshot() {
            match connection.send(payload.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        error = %e,
                        "cannot send the message"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
