//! 业务规则与边界校验
//!
//! 房间容量、TTL、限流窗口等对外约定的常量，以及消息字段的长度校验。

use crate::errors::{DomainError, DomainResult};

/// 房间最大在线令牌数
pub const MAX_ROOM_CAPACITY: usize = 2;

/// 房间基础存活时间（秒）
pub const BASE_TTL_SECONDS: u64 = 600;

/// 每次发送消息时房间续期的秒数
pub const TTL_EXTENSION_SECONDS: u64 = 5;

/// 限流窗口长度（秒）
pub const RATE_LIMIT_WINDOW_SECONDS: u64 = 5;

/// 每个窗口允许的消息数
pub const RATE_LIMIT_MAX_MESSAGES: u32 = 20;

/// 消息正文最大字符数
pub const MAX_TEXT_LEN: usize = 1000;

/// 发送者昵称最大字符数
pub const MAX_SENDER_LEN: usize = 100;

/// 消息字段校验规则
pub struct MessageRules;

impl MessageRules {
    /// 校验发送者昵称
    pub fn validate_sender(sender: &str) -> DomainResult<()> {
        if sender.chars().count() > MAX_SENDER_LEN {
            return Err(DomainError::invalid_argument(
                "sender",
                format!("must be at most {MAX_SENDER_LEN} characters"),
            ));
        }
        Ok(())
    }

    /// 校验消息正文
    pub fn validate_text(text: &str) -> DomainResult<()> {
        if text.chars().count() > MAX_TEXT_LEN {
            return Err(DomainError::invalid_argument(
                "text",
                format!("must be at most {MAX_TEXT_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// 滑动过期策略
pub struct SlidingTtl;

impl SlidingTtl {
    /// 根据当前剩余 TTL 计算续期后的 TTL。
    ///
    /// `current` 为存储返回的原始值：正数表示剩余秒数，0 或负数表示 TTL
    /// 已丢失或已过期，此时直接回到基础 TTL。
    pub fn extend(current: i64, extension: u64, base: u64) -> u64 {
        if current > 0 {
            (current as u64).saturating_add(extension).min(base)
        } else {
            base
        }
    }
}
