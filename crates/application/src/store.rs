//! 键值存储契约
//!
//! 核心逻辑只通过这里列出的原语访问存储：哈希读写、列表追加/范围读取/按下标覆盖、
//! 原子自增、存在性检查、TTL 读写，以及全有或全无的批量执行。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{RoomId, Token};
use thiserror::Error;

/// 存储故障，与领域错误区分开
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 无法连接存储
    #[error("存储连接失败: {0}")]
    Connection(String),

    /// 命令执行失败（类型错误、下标越界等）
    #[error("存储命令失败: {0}")]
    Command(String),

    /// 存储中的数据无法解析
    #[error("存储数据损坏: {0}")]
    Corrupted(String),
}

impl StoreError {
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 批量操作中的单个写命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    ListPush {
        key: String,
        value: String,
    },
    Expire {
        key: String,
        seconds: u64,
    },
    Delete {
        key: String,
    },
}

/// 原子批量写：要么全部生效，要么全部不生效
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<StoreOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hash_set(mut self, key: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        self.ops.push(StoreOp::HashSet {
            key: key.into(),
            fields,
        });
        self
    }

    pub fn list_push(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.ops.push(StoreOp::ListPush {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn expire(mut self, key: impl Into<String>, seconds: u64) -> Self {
        self.ops.push(StoreOp::Expire {
            key: key.into(),
            seconds,
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(StoreOp::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<StoreOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// 存储访问能力，启动时创建一次并注入各组件
///
/// `ttl` 沿用 Redis 语义：键不存在返回 -2，存在但无过期时间返回 -1。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;
    async fn list_set(&self, key: &str, index: usize, value: &str) -> StoreResult<()>;
    async fn incr(&self, key: &str) -> StoreResult<i64>;
    async fn exists(&self, key: &str) -> StoreResult<bool>;
    async fn ttl(&self, key: &str) -> StoreResult<i64>;
    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool>;
    async fn execute(&self, batch: Batch) -> StoreResult<()>;
}

/// 一个房间占用的全部键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomKeys {
    /// 元数据哈希：`connected` 与 `createdAt`
    pub meta: String,
    /// 消息列表
    pub messages: String,
    /// 以房间ID命名的附属键
    pub aux: String,
}

impl RoomKeys {
    pub fn new(room_id: &RoomId) -> Self {
        Self {
            meta: format!("meta:{room_id}"),
            messages: format!("messages:{room_id}"),
            aux: room_id.to_string(),
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.meta, &self.messages, &self.aux]
    }
}

/// 限流计数器键
pub fn rate_key(token: &Token) -> String {
    format!("rate:{token}")
}
