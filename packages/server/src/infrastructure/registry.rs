//! Registry of live connections.
//!
//! A single mutex guards only the membership map. `snapshot` copies the
//! members out under the lock and releases it before anything is delivered,
//! so a slow client never blocks registration of new ones.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::ConnectionId;

/// Frames a connection may have queued before further sends fail.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Send-only handle to one connection's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<String>,
}

/// Why a frame could not be queued for a connection.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// The client is not draining its queue
    #[error("outbound queue is full")]
    Full,

    /// The connection's writer has gone away
    #[error("connection is closing")]
    Closed,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<String>) -> Self {
        Self { id, sender }
    }

    /// A handle with a fresh queue of [`OUTBOUND_QUEUE_CAPACITY`] frames,
    /// and the receiving end for the connection's writer.
    pub fn channel(id: ConnectionId) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        (Self::new(id, sender), receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame for this connection without waiting.
    pub fn send(&self, text: String) -> Result<(), SendFailure> {
        self.sender.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => SendFailure::Full,
            TrySendError::Closed(_) => SendFailure::Closed,
        })
    }
}

/// Concurrent set of live connections keyed by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        // The map stays consistent even if a holder panicked mid-call.
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection. Returns `false` if it was already present.
    pub fn add(&self, handle: ConnectionHandle) -> bool {
        let mut connections = self.lock();
        if connections.contains_key(&handle.id) {
            return false;
        }
        connections.insert(handle.id, handle);
        true
    }

    /// Deregister a connection. Returns `false` if it was absent.
    pub fn remove(&self, id: &ConnectionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Point-in-time view of the members.
    pub fn snapshot(&self) -> Snapshot {
        let members: Vec<ConnectionHandle> = self.lock().values().cloned().collect();
        Snapshot {
            inner: members.into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Register `handle` for the lifetime of the returned guard.
    pub fn register(self: &Arc<Self>, handle: ConnectionHandle) -> Registration {
        let id = handle.id;
        self.add(handle);
        Registration {
            registry: Arc::clone(self),
            id,
        }
    }
}

/// Single-pass iterator over a registry snapshot.
#[derive(Debug)]
pub struct Snapshot {
    inner: std::vec::IntoIter<ConnectionHandle>,
}

impl Iterator for Snapshot {
    type Item = ConnectionHandle;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Snapshot {}

/// Deregisters its connection exactly once, when dropped.
///
/// Dropping also runs during unwinding, so a panicking session still leaves
/// the registry.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ConnectionRegistry>,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.remove(&self.id);
    }
}
