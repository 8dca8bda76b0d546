//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - 存储后端（Redis / 内存）
//! - 房间容量与滑动过期
//! - 发送限流
//! - 实时推送频道
//!
//! 加载顺序：内置默认值 → `config/ephemeral.toml` → `EPHEMERAL_` 前缀的环境变量
//! （嵌套字段用双下划线分隔，例如 `EPHEMERAL_ROOM__BASE_TTL_SECONDS=300`）。

use std::path::Path;

use domain::{
    BASE_TTL_SECONDS, MAX_ROOM_CAPACITY, RATE_LIMIT_MAX_MESSAGES, RATE_LIMIT_WINDOW_SECONDS,
    TTL_EXTENSION_SECONDS,
};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/ephemeral.toml";

/// 环境变量前缀
pub const ENV_PREFIX: &str = "EPHEMERAL_";

/// 全局应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 存储配置
    #[serde(default)]
    pub store: StoreConfig,
    /// 房间配置
    #[serde(default)]
    pub room: RoomConfig,
    /// 限流配置
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// 实时推送配置
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// 单进程内存存储，仅用于开发和测试
    Memory,
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// 房间配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub max_capacity: usize,
    pub base_ttl_seconds: u64,
    pub ttl_extension_seconds: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_capacity: MAX_ROOM_CAPACITY,
            base_ttl_seconds: BASE_TTL_SECONDS,
            ttl_extension_seconds: TTL_EXTENSION_SECONDS,
        }
    }
}

/// 限流配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_messages: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: RATE_LIMIT_WINDOW_SECONDS,
            max_messages: RATE_LIMIT_MAX_MESSAGES,
        }
    }
}

/// 实时推送配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// 频道名前缀，频道名为 `{prefix}{room_id}`
    pub channel_prefix: String,
    /// 本地广播通道容量
    pub local_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_prefix: String::new(),
            local_capacity: 256,
        }
    }
}

impl RealtimeConfig {
    pub fn channel_for(&self, room_id: &str) -> String {
        format!("{}{}", self.channel_prefix, room_id)
    }
}

impl AppConfig {
    /// 从默认路径和环境变量加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// 从指定文件和环境变量加载配置；文件不存在时只使用默认值和环境变量
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|err| ConfigError::Load(Box::new(err)))?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "host cannot be empty".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.trim().is_empty() {
            return Err(ConfigError::InvalidStoreConfig(
                "redis_url is required for the redis backend".to_string(),
            ));
        }

        if self.room.max_capacity == 0 {
            return Err(ConfigError::InvalidRoomConfig(
                "max_capacity must be greater than 0".to_string(),
            ));
        }

        if self.room.base_ttl_seconds == 0 {
            return Err(ConfigError::InvalidRoomConfig(
                "base_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        if self.room.ttl_extension_seconds > self.room.base_ttl_seconds {
            return Err(ConfigError::InvalidRoomConfig(
                "ttl_extension_seconds cannot exceed base_ttl_seconds".to_string(),
            ));
        }

        if self.rate_limit.window_seconds == 0 || self.rate_limit.max_messages == 0 {
            return Err(ConfigError::InvalidRateLimitConfig(
                "window_seconds and max_messages must be greater than 0".to_string(),
            ));
        }

        if self.realtime.local_capacity == 0 {
            return Err(ConfigError::InvalidRealtimeConfig(
                "local_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[source] Box<figment::Error>),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid store configuration: {0}")]
    InvalidStoreConfig(String),
    #[error("Invalid room configuration: {0}")]
    InvalidRoomConfig(String),
    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimitConfig(String),
    #[error("Invalid realtime configuration: {0}")]
    InvalidRealtimeConfig(String),
}
