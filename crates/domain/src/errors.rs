//! 领域模型错误定义
//!
//! 定义了房间与消息生命周期中所有可能的业务错误。存储故障不属于这里，
//! 由应用层以基础设施错误单独表达。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 请求缺少房间ID或令牌
    #[error("缺少房间ID或令牌")]
    MissingCredentials,

    /// 房间元数据不存在
    #[error("房间不存在")]
    RoomNotFound,

    /// 房间已过期或已被销毁
    #[error("房间已过期或已被销毁")]
    RoomGone,

    /// 房间人数已满且令牌不在其中
    #[error("房间已满")]
    RoomFull,

    /// 令牌不属于该房间
    #[error("无效的令牌")]
    InvalidToken,

    /// 固定窗口内发送次数超限
    #[error("发送过于频繁: {current}/{max}")]
    RateLimitExceeded { current: i64, max: u32 },

    /// 消息不存在
    #[error("消息不存在")]
    MessageNotFound,

    /// 非消息作者尝试修改
    #[error("无权修改该消息")]
    NotAuthorized,

    /// 消息已被删除，不能再编辑或删除
    #[error("消息已被删除")]
    MessageDeleted,

    /// 参数校验失败
    #[error("参数无效: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    /// 创建参数错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
