//! Redis 事件发布者
//!
//! 每个房间对应一个频道 `{prefix}{room_id}`，负载为 `{"event","data"}` 形式的 JSON。
//! 发布不等待确认，没有订阅者时事件直接丢失。

use application::{BroadcastError, EventPublisher, RoomEvent};
use async_trait::async_trait;
use config::RealtimeConfig;
use domain::RoomId;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{debug, info};

use crate::redis::{RedisError, RedisResult};

/// Redis 发布者
pub struct RedisEventPublisher {
    connection: ConnectionManager,
    config: RealtimeConfig,
}

impl RedisEventPublisher {
    /// 创建新的 Redis 发布者
    ///
    /// # 参数
    /// - `client`: Redis 客户端
    /// - `config`: 实时通道配置（频道前缀）
    pub async fn new(client: &Client, config: RealtimeConfig) -> RedisResult<Self> {
        let connection =
            client
                .get_connection_manager()
                .await
                .map_err(|e| RedisError::ConnectionError {
                    message: format!("创建发布连接失败: {}", e),
                })?;

        info!("Redis 发布者创建成功");
        Ok(Self { connection, config })
    }

    /// 发布到指定房间频道，返回收到消息的订阅者数量
    pub async fn publish_to_room(&self, room_id: &RoomId, event: &RoomEvent) -> RedisResult<u32> {
        let channel = self.config.channel_for(room_id.as_str());
        let payload = serde_json::to_string(event)?;

        let mut conn = self.connection.clone();
        let receivers: u32 = redis::cmd("PUBLISH")
            .arg(&channel)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| RedisError::PublishError {
                message: format!("发布到频道 {} 失败: {}", channel, e),
            })?;

        debug!(channel = %channel, event = event.name(), receivers, "事件已发布");
        Ok(receivers)
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, room_id: &RoomId, event: RoomEvent) -> Result<(), BroadcastError> {
        self.publish_to_room(room_id, &event).await?;
        Ok(())
    }
}
