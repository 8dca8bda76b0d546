//! 基础设施层实现。
//!
//! 提供 Redis 键值存储、房间频道发布订阅等适配器，实现应用层定义的接口。

pub mod builder;
pub mod redis;

pub use builder::{Infrastructure, InfrastructureError};
pub use self::redis::{RedisError, RedisEventPublisher, RedisEventSubscriber, RedisStore};
