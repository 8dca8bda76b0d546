use application::{RoomAccess, RoomEvent, RoomEventStream};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};

/// 单个实时连接
///
/// 只做单向转发：房间频道上的事件按 `{"event","data"}` JSON 推给客户端。
/// 客户端发来的数据帧被忽略，关闭帧或底层断开即结束连接。
pub struct WebSocketConnection {
    socket: WebSocket,
    access: RoomAccess,
    events: RoomEventStream,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, access: RoomAccess, events: RoomEventStream) -> Self {
        Self {
            socket,
            access,
            events,
        }
    }

    pub async fn run(self) {
        let Self {
            socket,
            access,
            mut events,
        } = self;
        let room_id = access.room_id;
        let (mut sender, mut incoming) = socket.split();

        tracing::info!(room_id = %room_id, token = access.token.short(), "实时连接已建立");

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else {
                        tracing::debug!(room_id = %room_id, "房间事件流已结束");
                        break;
                    };
                    let destroyed = matches!(event, RoomEvent::Destroy(_));
                    let payload = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize websocket payload");
                            continue;
                        }
                    };
                    if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                        tracing::warn!(room_id = %room_id, "Failed to send text message");
                        break;
                    }
                    // 房间销毁后不会再有事件
                    if destroyed {
                        let _ = sender.send(WsMessage::Close(None)).await;
                        break;
                    }
                }
                incoming_message = incoming.next() => {
                    match incoming_message {
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::debug!(room_id = %room_id, error = %err, "WebSocket 接收失败");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(room_id = %room_id, "实时连接已关闭");
    }
}
