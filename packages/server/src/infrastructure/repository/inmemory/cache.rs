//! InMemory MessageCache 実装
//!
//! VecDeque の先頭を最新としてリストを再現します。

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::domain::{ChatError, MessageCache};

/// インメモリ MessageCache 実装
#[derive(Debug, Default)]
pub struct InMemoryMessageCache {
    entries: Mutex<VecDeque<Vec<u8>>>,
}

impl InMemoryMessageCache {
    /// 新しい InMemoryMessageCache を作成
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageCache for InMemoryMessageCache {
    async fn push_recent(&self, payload: &[u8]) -> Result<(), ChatError> {
        self.lock().push_front(payload.to_vec());
        Ok(())
    }

    async fn range_recent(&self, count: usize) -> Result<Vec<Vec<u8>>, ChatError> {
        Ok(self.lock().iter().take(count).cloned().collect())
    }
}
