use serde::{Deserialize, Serialize};

use crate::business_rules::MessageRules;
use crate::errors::DomainError;
use crate::value_objects::{MessageId, RoomId, Timestamp, Token};

fn is_false(value: &bool) -> bool {
    !*value
}

/// 房间日志中的一条消息。
///
/// 编辑与软删除都会生成整条记录的新副本，写回原位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    pub room_id: RoomId,
    /// 作者令牌；对非作者读取时置空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_edited: bool,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub edited_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_deleted: bool,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<Timestamp>,
}

impl Message {
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        token: Token,
        sender: impl Into<String>,
        text: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self, DomainError> {
        let sender = sender.into();
        let text = text.into();
        MessageRules::validate_sender(&sender)?;
        MessageRules::validate_text(&text)?;

        Ok(Self {
            id,
            sender,
            text,
            timestamp,
            room_id,
            token: Some(token),
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
        })
    }

    pub fn is_owned_by(&self, token: &Token) -> bool {
        self.token.as_ref() == Some(token)
    }

    /// 返回带新正文的副本。删除是终态，已删除的消息不可再编辑。
    pub fn edited(&self, text: impl Into<String>, at: Timestamp) -> Result<Self, DomainError> {
        if self.is_deleted {
            return Err(DomainError::MessageDeleted);
        }
        let text = text.into();
        MessageRules::validate_text(&text)?;

        Ok(Self {
            text,
            is_edited: true,
            edited_at: Some(at),
            ..self.clone()
        })
    }

    /// 返回软删除后的副本：清空正文，保留ID、发送者与时间戳。
    pub fn soft_deleted(&self, at: Timestamp) -> Result<Self, DomainError> {
        if self.is_deleted {
            return Err(DomainError::MessageDeleted);
        }
        Ok(Self {
            text: String::new(),
            is_deleted: true,
            deleted_at: Some(at),
            ..self.clone()
        })
    }

    /// 面向请求者的视图：只有作者本人能看到令牌。
    pub fn redacted_for(&self, requester: &Token) -> Self {
        let mut view = self.clone();
        if !self.is_owned_by(requester) {
            view.token = None;
        }
        view
    }

    /// 面向所有订阅者的公开视图。
    pub fn public(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }
}
