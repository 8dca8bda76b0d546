use std::sync::Arc;

use domain::{DomainError, RoomId, Token};

use crate::error::ApplicationError;
use crate::registry::RoomRegistry;

/// 请求携带的原始凭证
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomCredentials {
    pub room_id: Option<String>,
    pub token: Option<String>,
}

impl RoomCredentials {
    pub fn new(room_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            room_id: Some(room_id.into()),
            token: Some(token.into()),
        }
    }
}

/// 通过授权后的上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAccess {
    pub room_id: RoomId,
    pub token: Token,
    pub connected: Vec<Token>,
}

/// 访问控制：每个请求都根据存储中的当前状态重新授权，
/// 令牌被移出 `connected` 后下一次请求即失效。
pub struct AccessControl {
    registry: Arc<RoomRegistry>,
}

impl AccessControl {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn authorize(
        &self,
        credentials: &RoomCredentials,
    ) -> Result<RoomAccess, ApplicationError> {
        let (room_id, token) = parse_credentials(credentials)?;

        let meta = self
            .registry
            .load_meta(&room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if let Err(err) = meta.authorize(&token, self.registry.config().max_capacity) {
            tracing::warn!(room_id = %room_id, token = token.short(), error = %err, "拒绝访问房间");
            return Err(err.into());
        }

        Ok(RoomAccess {
            room_id,
            token,
            connected: meta.connected,
        })
    }
}

fn parse_credentials(credentials: &RoomCredentials) -> Result<(RoomId, Token), DomainError> {
    let room_id = credentials
        .room_id
        .as_deref()
        .and_then(|raw| RoomId::parse(raw).ok())
        .ok_or(DomainError::MissingCredentials)?;
    let token = credentials
        .token
        .as_deref()
        .and_then(|raw| Token::parse(raw).ok())
        .ok_or(DomainError::MissingCredentials)?;
    Ok((room_id, token))
}
