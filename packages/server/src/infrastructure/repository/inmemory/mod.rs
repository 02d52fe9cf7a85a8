//! InMemory Repository 実装
//!
//! 単一プロセスで動かす場合とテストで使用します。

mod cache;
mod store;

pub use cache::InMemoryMessageCache;
pub use store::InMemoryMessageStore;
