//! 房间服务
//!
//! 对外暴露的用例入口：每个操作先过访问控制，再修改注册表或消息日志，
//! 提交成功后才发布事件。发送消息在内容校验通过后、写入前额外经过限流。

use std::sync::Arc;

use config::{RateLimitConfig, RoomConfig};
use domain::{DomainError, Message, MessageId, RoomId, Token};

use crate::{
    access::{AccessControl, RoomAccess, RoomCredentials},
    broadcaster::{EventPublisher, RoomEvent},
    clock::Clock,
    error::ApplicationError,
    message_log::MessageLog,
    rate_limiter::RateLimiter,
    registry::RoomRegistry,
    store::KeyValueStore,
};

#[derive(Debug, Clone)]
pub struct JoinRoomRequest {
    pub room_id: Option<String>,
    /// 客户端已持有的令牌（重新进入房间时）
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostMessageRequest {
    pub credentials: RoomCredentials,
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EditMessageRequest {
    pub credentials: RoomCredentials,
    pub message_id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DeleteMessageRequest {
    pub credentials: RoomCredentials,
    pub message_id: String,
}

pub struct RoomServiceDependencies {
    pub store: Arc<dyn KeyValueStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
    pub room_config: RoomConfig,
    pub rate_limit_config: RateLimitConfig,
}

pub struct RoomService {
    registry: Arc<RoomRegistry>,
    access: AccessControl,
    limiter: RateLimiter,
    log: MessageLog,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        let registry = Arc::new(RoomRegistry::new(
            deps.store.clone(),
            deps.clock.clone(),
            deps.room_config,
        ));
        Self {
            access: AccessControl::new(registry.clone()),
            limiter: RateLimiter::new(deps.store.clone(), &deps.rate_limit_config),
            log: MessageLog::new(deps.store, registry.clone(), deps.clock.clone()),
            registry,
            publisher: deps.publisher,
            clock: deps.clock,
        }
    }

    /// 单独的授权入口，供实时订阅等不修改状态的调用方使用
    pub async fn authorize(
        &self,
        credentials: &RoomCredentials,
    ) -> Result<RoomAccess, ApplicationError> {
        self.access.authorize(credentials).await
    }

    pub async fn create_room(&self) -> Result<RoomId, ApplicationError> {
        self.registry.create_room().await
    }

    pub async fn join_room(&self, request: JoinRoomRequest) -> Result<Token, ApplicationError> {
        let room_id = request
            .room_id
            .as_deref()
            .and_then(|raw| RoomId::parse(raw).ok())
            .ok_or(DomainError::MissingCredentials)?;
        let presented = request.token.and_then(|raw| Token::parse(raw).ok());
        self.registry.join(&room_id, presented).await
    }

    pub async fn get_ttl(&self, credentials: &RoomCredentials) -> Result<u64, ApplicationError> {
        let access = self.access.authorize(credentials).await?;
        self.registry.remaining_ttl(&access.room_id).await
    }

    /// 销毁房间；房间已不存在时视为已经销毁，直接返回成功
    pub async fn destroy_room(&self, credentials: &RoomCredentials) -> Result<(), ApplicationError> {
        let access = match self.access.authorize(credentials).await {
            Ok(access) => access,
            Err(ApplicationError::Domain(DomainError::RoomNotFound)) => {
                tracing::debug!(room_id = ?credentials.room_id, "房间已不存在，销毁视为成功");
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        self.registry.destroy_room(&access.room_id).await?;
        self.emit(&access.room_id, RoomEvent::destroyed()).await;
        Ok(())
    }

    pub async fn post_message(
        &self,
        request: PostMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let access = self.access.authorize(&request.credentials).await?;
        // 校验不通过的请求不计入限流额度
        let message = Message::new(
            MessageId::generate(),
            access.room_id.clone(),
            access.token.clone(),
            request.sender,
            request.text,
            self.clock.now(),
        )?;
        self.limiter.check_and_increment(&access.token).await?;

        let committed = self.log.append(&access.room_id, message).await?;

        self.emit(&access.room_id, RoomEvent::message_posted(&committed))
            .await;
        Ok(committed)
    }

    pub async fn list_messages(
        &self,
        credentials: &RoomCredentials,
    ) -> Result<Vec<Message>, ApplicationError> {
        let access = self.access.authorize(credentials).await?;
        self.log.list(&access.room_id, &access.token).await
    }

    pub async fn edit_message(&self, request: EditMessageRequest) -> Result<(), ApplicationError> {
        let access = self.access.authorize(&request.credentials).await?;
        let message_id = MessageId::parse(request.message_id)?;

        let updated = self
            .log
            .edit(&access.room_id, &message_id, &request.text, &access.token)
            .await?;

        self.emit(&access.room_id, RoomEvent::message_edited(&updated))
            .await;
        Ok(())
    }

    pub async fn delete_message(
        &self,
        request: DeleteMessageRequest,
    ) -> Result<(), ApplicationError> {
        let access = self.access.authorize(&request.credentials).await?;
        let message_id = MessageId::parse(request.message_id)?;

        let deleted = self
            .log
            .soft_delete(&access.room_id, &message_id, &access.token)
            .await?;

        self.emit(&access.room_id, RoomEvent::message_deleted(&deleted))
            .await;
        Ok(())
    }

    /// 提交之后发布；发布失败只记录，不影响已提交的结果
    async fn emit(&self, room_id: &RoomId, event: RoomEvent) {
        let name = event.name();
        if let Err(err) = self.publisher.publish(room_id, event).await {
            tracing::warn!(
                room_id = %room_id,
                event = name,
                error = %err,
                "状态已提交，但事件发布失败"
            );
        }
    }
}
