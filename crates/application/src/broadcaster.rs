//! 房间事件与发布契约
//!
//! 已提交的状态变化被翻译成房间频道上的事件。投递是尽力而为、至多一次的：
//! 客户端收到事件后应重新读取消息列表，而不是把事件负载当作唯一事实来源。

use async_trait::async_trait;
use domain::{Message, MessageId, RoomId};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestroyedPayload {
    pub is_destroyed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedPayload {
    pub message_id: MessageId,
    pub room_id: RoomId,
}

/// 房间频道上的事件，序列化为 `{"event": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RoomEvent {
    #[serde(rename = "chat.message")]
    Message(Message),
    #[serde(rename = "chat.destroy")]
    Destroy(DestroyedPayload),
    #[serde(rename = "chat.message.edit")]
    MessageEdit(Message),
    #[serde(rename = "chat.message.delete")]
    MessageDelete(DeletedPayload),
}

impl RoomEvent {
    /// 新消息事件，负载不含作者令牌
    pub fn message_posted(message: &Message) -> Self {
        Self::Message(message.public())
    }

    pub fn destroyed() -> Self {
        Self::Destroy(DestroyedPayload { is_destroyed: true })
    }

    /// 编辑事件，负载为编辑后的公开视图
    pub fn message_edited(message: &Message) -> Self {
        Self::MessageEdit(message.public())
    }

    pub fn message_deleted(message: &Message) -> Self {
        Self::MessageDelete(DeletedPayload {
            message_id: message.id.clone(),
            room_id: message.room_id.clone(),
        })
    }

    /// 事件名
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Message(_) => "chat.message",
            RoomEvent::Destroy(_) => "chat.destroy",
            RoomEvent::MessageEdit(_) => "chat.message.edit",
            RoomEvent::MessageDelete(_) => "chat.message.delete",
        }
    }
}

/// 携带房间ID的广播单元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBroadcast {
    pub room_id: RoomId,
    pub event: RoomEvent,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 房间事件流
pub type RoomEventStream = BoxStream<'static, RoomEvent>;

/// 发布端：`publish(channel, event, payload)`，无确认
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, room_id: &RoomId, event: RoomEvent) -> Result<(), BroadcastError>;
}

/// 订阅端：只接收订阅之后发布的事件
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn subscribe(&self, room_id: &RoomId) -> Result<RoomEventStream, BroadcastError>;
}
