//! Redis 事件订阅者
//!
//! 每次订阅独占一条 PubSub 连接，流被丢弃时连接随之关闭。

use application::{BroadcastError, EventSubscriber, RoomEvent, RoomEventStream};
use async_trait::async_trait;
use config::RealtimeConfig;
use domain::RoomId;
use futures_util::StreamExt;
use redis::Client;
use tracing::{info, warn};

use crate::redis::{RedisError, RedisResult};

/// Redis 消息订阅者
pub struct RedisEventSubscriber {
    client: Client,
    config: RealtimeConfig,
}

impl RedisEventSubscriber {
    pub fn new(client: Client, config: RealtimeConfig) -> Self {
        Self { client, config }
    }

    async fn open(&self, room_id: &RoomId) -> RedisResult<RoomEventStream> {
        let channel = self.config.channel_for(room_id.as_str());
        let mut pubsub =
            self.client
                .get_async_pubsub()
                .await
                .map_err(|e| RedisError::ConnectionError {
                    message: format!("获取 PubSub 连接失败: {}", e),
                })?;

        pubsub
            .subscribe(&channel)
            .await
            .map_err(|e| RedisError::SubscribeError {
                message: format!("订阅频道 {} 失败: {}", channel, e),
            })?;
        info!(channel = %channel, "已订阅房间频道");

        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let channel = channel.clone();
            async move {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(channel = %channel, error = %e, "读取频道负载失败");
                        return None;
                    }
                };
                decode_event(&payload)
                    .map_err(|e| warn!(channel = %channel, error = %e, "无法解析房间事件"))
                    .ok()
            }
        });
        Ok(stream.boxed())
    }
}

/// 解析频道负载
pub fn decode_event(payload: &str) -> RedisResult<RoomEvent> {
    Ok(serde_json::from_str(payload)?)
}

#[async_trait]
impl EventSubscriber for RedisEventSubscriber {
    async fn subscribe(&self, room_id: &RoomId) -> Result<RoomEventStream, BroadcastError> {
        Ok(self.open(room_id).await?)
    }
}
