use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = DateTime<Utc>;

/// URL 安全的随机ID字母表。
const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// 默认ID长度（21个字符，约126位熵）。
const ID_LENGTH: usize = 21;

/// 生成指定长度的 URL 安全随机字符串。
pub fn random_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| URL_SAFE_ALPHABET[rng.random_range(0..URL_SAFE_ALPHABET.len())] as char)
        .collect()
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// 生成新的随机ID
            pub fn generate() -> Self {
                Self(random_id(ID_LENGTH))
            }

            /// 从外部输入解析，拒绝空白值
            pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::invalid_argument($field, "cannot be empty"));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// 房间唯一标识。
    RoomId,
    "room_id"
);

string_id!(
    /// 房间内的消息唯一标识。
    MessageId,
    "message_id"
);

string_id!(
    /// 能力令牌：持有即代表房间成员身份。
    Token,
    "token"
);

impl Token {
    /// 日志用的短前缀，避免完整令牌落入日志。
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(6)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_url_safe_and_distinct() {
        let a = RoomId::generate();
        let b = RoomId::generate();
        assert_eq!(a.as_str().len(), ID_LENGTH);
        assert_ne!(a, b);
        assert!(a
            .as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn parse_rejects_blank_values() {
        assert!(Token::parse("  ").is_err());
        assert_eq!(Token::parse("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn short_token_is_a_prefix() {
        let token = Token::parse("abcdefghijkl").unwrap();
        assert_eq!(token.short(), "abcdef");
        let tiny = Token::parse("ab").unwrap();
        assert_eq!(tiny.short(), "ab");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = MessageId::parse("m1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"m1\"");
    }
}
