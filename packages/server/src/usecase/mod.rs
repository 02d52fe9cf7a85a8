//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層とパイプラインのコンシューマから呼び出され、Domain 層の trait を操作します。

pub mod load_history;
pub mod persist_message;
pub mod send_message;
pub mod validate_message;

pub use load_history::LoadHistoryUseCase;
pub use persist_message::PersistMessageUseCase;
pub use send_message::{BroadcastOrdering, SendMessageUseCase};
pub use validate_message::validate_message;
