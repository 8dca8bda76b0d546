//! 房间消息日志
//!
//! 每个房间一条有序、只追加的列表。编辑和软删除先线性扫描定位下标，
//! 再整条覆盖该位置；两步之间没有比较并交换，同一房间的并发修改按
//! “该下标最后一次写入为准”处理。

use std::sync::Arc;

use domain::{DomainError, Message, MessageId, RoomId, Token};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::registry::RoomRegistry;
use crate::store::{Batch, KeyValueStore, RoomKeys, StoreError};

/// 扫描定位到的消息及其下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedMessage {
    pub index: usize,
    pub message: Message,
}

pub struct MessageLog {
    store: Arc<dyn KeyValueStore>,
    registry: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
}

impl MessageLog {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        registry: Arc<RoomRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    /// 追加消息，并在同一批次里把房间所有键的 TTL 按滑动策略统一续期
    pub async fn append(&self, room_id: &RoomId, message: Message) -> Result<Message, ApplicationError> {
        self.registry.ensure_live(room_id).await?;

        let ttl = self.registry.extended_ttl(room_id).await?;
        let keys = RoomKeys::new(room_id);
        let batch = Batch::new().list_push(&keys.messages, encode(&message)?);
        let batch = RoomRegistry::touch_batch(batch, room_id, ttl);
        self.store.execute(batch).await?;

        tracing::debug!(room_id = %room_id, message_id = %message.id, ttl, "消息已追加");
        Ok(message)
    }

    /// 按追加顺序返回完整日志；非作者看不到令牌
    pub async fn list(
        &self,
        room_id: &RoomId,
        requester: &Token,
    ) -> Result<Vec<Message>, ApplicationError> {
        self.registry.ensure_live(room_id).await?;

        let messages = self.load_all(room_id).await?;
        Ok(messages
            .iter()
            .map(|message| message.redacted_for(requester))
            .collect())
    }

    /// 线性扫描定位消息
    pub async fn find_index(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> Result<LocatedMessage, ApplicationError> {
        self.load_all(room_id)
            .await?
            .into_iter()
            .enumerate()
            .find(|(_, message)| &message.id == message_id)
            .map(|(index, message)| LocatedMessage { index, message })
            .ok_or_else(|| DomainError::MessageNotFound.into())
    }

    /// 覆盖指定下标为编辑后的消息
    pub async fn edit_at(
        &self,
        room_id: &RoomId,
        located: &LocatedMessage,
        new_text: &str,
        requester: &Token,
    ) -> Result<Message, ApplicationError> {
        ensure_owner(&located.message, requester)?;
        let updated = located.message.edited(new_text, self.clock.now())?;
        self.overwrite(room_id, located.index, &updated).await?;
        Ok(updated)
    }

    /// 覆盖指定下标为软删除后的消息
    pub async fn soft_delete_at(
        &self,
        room_id: &RoomId,
        located: &LocatedMessage,
        requester: &Token,
    ) -> Result<Message, ApplicationError> {
        ensure_owner(&located.message, requester)?;
        let deleted = located.message.soft_deleted(self.clock.now())?;
        self.overwrite(room_id, located.index, &deleted).await?;
        Ok(deleted)
    }

    /// 存活检查 → 定位 → 编辑
    pub async fn edit(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
        new_text: &str,
        requester: &Token,
    ) -> Result<Message, ApplicationError> {
        self.registry.ensure_live(room_id).await?;
        let located = self.find_index(room_id, message_id).await?;
        self.edit_at(room_id, &located, new_text, requester).await
    }

    /// 存活检查 → 定位 → 软删除
    pub async fn soft_delete(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
        requester: &Token,
    ) -> Result<Message, ApplicationError> {
        self.registry.ensure_live(room_id).await?;
        let located = self.find_index(room_id, message_id).await?;
        self.soft_delete_at(room_id, &located, requester).await
    }

    async fn load_all(&self, room_id: &RoomId) -> Result<Vec<Message>, ApplicationError> {
        let keys = RoomKeys::new(room_id);
        let raw = self.store.list_range(&keys.messages, 0, -1).await?;
        raw.iter()
            .map(|item| decode(item).map_err(ApplicationError::from))
            .collect()
    }

    async fn overwrite(
        &self,
        room_id: &RoomId,
        index: usize,
        message: &Message,
    ) -> Result<(), ApplicationError> {
        let keys = RoomKeys::new(room_id);
        if let Err(err) = self
            .store
            .list_set(&keys.messages, index, &encode(message)?)
            .await
        {
            // 扫描之后房间到期，列表已不存在
            if !self.registry.room_exists(room_id).await? {
                tracing::debug!(room_id = %room_id, error = %err, "覆盖前房间已过期");
                return Err(DomainError::RoomGone.into());
            }
            return Err(err.into());
        }
        tracing::debug!(room_id = %room_id, message_id = %message.id, index, "消息已原位覆盖");
        Ok(())
    }
}

fn ensure_owner(message: &Message, requester: &Token) -> Result<(), DomainError> {
    if !message.is_owned_by(requester) {
        tracing::warn!(message_id = %message.id, token = requester.short(), "非作者尝试修改消息");
        return Err(DomainError::NotAuthorized);
    }
    Ok(())
}

fn encode(message: &Message) -> Result<String, StoreError> {
    serde_json::to_string(message).map_err(|err| StoreError::corrupted(err.to_string()))
}

fn decode(raw: &str) -> Result<Message, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::corrupted(format!("message: {err}")))
}
