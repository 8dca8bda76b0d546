// 单进程内的房间事件广播器
use async_trait::async_trait;
use domain::RoomId;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::broadcaster::{
    BroadcastError, EventPublisher, EventSubscriber, RoomBroadcast, RoomEvent, RoomEventStream,
};

#[derive(Clone)]
pub struct LocalEventPublisher {
    sender: broadcast::Sender<RoomBroadcast>,
}

impl LocalEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<RoomBroadcast> {
        self.sender.subscribe()
    }
}

impl Default for LocalEventPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for LocalEventPublisher {
    async fn publish(&self, room_id: &RoomId, event: RoomEvent) -> Result<(), BroadcastError> {
        // 没有订阅者时事件直接丢弃
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(RoomBroadcast {
                room_id: room_id.clone(),
                event,
            })
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for LocalEventPublisher {
    async fn subscribe(&self, room_id: &RoomId) -> Result<RoomEventStream, BroadcastError> {
        let room_id = room_id.clone();
        let stream = BroadcastStream::new(self.sender.subscribe()).filter_map(move |item| {
            match item {
                // 过滤只属于当前房间的事件
                Ok(broadcast) if broadcast.room_id == room_id => Some(broadcast.event),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(room_id = %room_id, error = %err, "本地订阅者落后，部分事件被跳过");
                    None
                }
            }
        });
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = LocalEventPublisher::new(8);
        let room = RoomId::parse("r1").unwrap();
        assert!(publisher.publish(&room, RoomEvent::destroyed()).await.is_ok());
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_its_room() {
        let publisher = LocalEventPublisher::new(8);
        let room_a = RoomId::parse("a").unwrap();
        let room_b = RoomId::parse("b").unwrap();

        let mut stream = publisher.subscribe(&room_a).await.unwrap();
        publisher.publish(&room_b, RoomEvent::destroyed()).await.unwrap();
        publisher.publish(&room_a, RoomEvent::destroyed()).await.unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event, RoomEvent::destroyed());
    }
}
