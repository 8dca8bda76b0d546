//! 应用层实现。
//!
//! 围绕领域模型提供用例服务：访问控制、限流、房间注册表、消息日志，
//! 以及对外部适配器（键值存储、事件发布）的抽象。

pub mod access;
pub mod broadcaster;
pub mod clock;
pub mod error;
pub mod local_broadcast;
pub mod memory_store;
pub mod message_log;
pub mod rate_limiter;
pub mod registry;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

pub use access::{AccessControl, RoomAccess, RoomCredentials};
pub use broadcaster::{
    BroadcastError, EventPublisher, EventSubscriber, RoomBroadcast, RoomEvent, RoomEventStream,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::ApplicationError;
pub use local_broadcast::LocalEventPublisher;
pub use memory_store::MemoryStore;
pub use message_log::{LocatedMessage, MessageLog};
pub use rate_limiter::RateLimiter;
pub use registry::RoomRegistry;
pub use services::{
    DeleteMessageRequest, EditMessageRequest, JoinRoomRequest, PostMessageRequest, RoomService,
    RoomServiceDependencies,
};
pub use store::{Batch, KeyValueStore, RoomKeys, StoreError, StoreOp, StoreResult};
