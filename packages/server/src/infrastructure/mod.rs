//! Infrastructure 層
//!
//! Domain 層が定義する trait の具体的な実装（Kafka / PostgreSQL / Redis /
//! インメモリ）と、接続レジストリ、パイプラインのコンシューマを提供します。

pub mod broadcaster;
pub mod broker;
pub mod dto;
pub mod pipeline;
pub mod registry;
pub mod repository;

pub use broadcaster::RegistryBroadcaster;
pub use pipeline::DurablePipelineConsumer;
pub use registry::{ConnectionHandle, ConnectionRegistry, Registration, SendFailure};
