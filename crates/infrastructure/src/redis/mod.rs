//! Redis 模块
//!
//! 提供键值存储与房间频道的发布订阅适配器。

pub mod error;
pub mod publisher;
pub mod store;
pub mod subscriber;

// 重新导出
pub use error::*;
pub use publisher::*;
pub use store::*;
pub use subscriber::*;
