use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{Timestamp, Token};

/// 房间元数据：已连接的令牌集合与创建时间。
///
/// TTL 不是字段，而是存储记录本身的属性。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMeta {
    pub connected: Vec<Token>,
    pub created_at: Timestamp,
}

impl RoomMeta {
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            connected: Vec::new(),
            created_at,
        }
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.connected.iter().any(|t| t == token)
    }

    pub fn is_full(&self, capacity: usize) -> bool {
        self.connected.len() >= capacity
    }

    /// 校验令牌能否访问房间。
    ///
    /// 房间已满且令牌不在其中时返回 `RoomFull`，否则不在其中返回 `InvalidToken`。
    pub fn authorize(&self, token: &Token, capacity: usize) -> Result<(), DomainError> {
        let member = self.contains(token);
        if self.is_full(capacity) && !member {
            return Err(DomainError::RoomFull);
        }
        if !member {
            return Err(DomainError::InvalidToken);
        }
        Ok(())
    }

    /// 接纳一个新令牌；已在房间内则不变。
    pub fn admit(&mut self, token: Token, capacity: usize) -> Result<(), DomainError> {
        if self.contains(&token) {
            return Ok(());
        }
        if self.is_full(capacity) {
            return Err(DomainError::RoomFull);
        }
        self.connected.push(token);
        Ok(())
    }
}
