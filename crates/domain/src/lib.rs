//! 阅后即焚聊天室核心领域模型
//!
//! 包含房间元数据、消息、能力令牌等实体，以及容量、TTL、长度等业务规则。

pub mod business_rules;
pub mod chat_room;
pub mod entities;
pub mod errors;
pub mod value_objects;

// 重新导出常用类型
pub use business_rules::*;
pub use chat_room::RoomMeta;
pub use errors::*;
pub use entities::Message;
pub use value_objects::*;
