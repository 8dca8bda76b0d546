use std::sync::Arc;

use application::{
    EventPublisher, EventSubscriber, KeyValueStore, LocalEventPublisher, MemoryStore,
};
use config::{AppConfig, StoreBackend};
use thiserror::Error;
use tracing::info;

use crate::redis::{RedisError, RedisEventPublisher, RedisEventSubscriber, RedisStore};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("redis error: {0}")]
    Redis(#[from] RedisError),
}

/// 按配置组装好的外部适配器
#[derive(Clone)]
pub struct Infrastructure {
    pub store: Arc<dyn KeyValueStore>,
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn EventSubscriber>,
}

impl Infrastructure {
    pub async fn connect(config: &AppConfig) -> Result<Self, InfrastructureError> {
        match config.store.backend {
            StoreBackend::Redis => Self::redis(config).await,
            StoreBackend::Memory => Ok(Self::in_memory(config)),
        }
    }

    /// 单进程内存后端：存储与广播都不跨进程
    pub fn in_memory(config: &AppConfig) -> Self {
        let broadcaster = Arc::new(LocalEventPublisher::new(config.realtime.local_capacity));
        info!("使用内存存储后端");
        Self {
            store: Arc::new(MemoryStore::new()),
            publisher: broadcaster.clone(),
            subscriber: broadcaster,
        }
    }

    async fn redis(config: &AppConfig) -> Result<Self, InfrastructureError> {
        let url = config.store.redis_url.as_str();
        let client = redis::Client::open(url).map_err(RedisError::from)?;

        let store = RedisStore::connect(url).await?;
        let publisher = RedisEventPublisher::new(&client, config.realtime.clone()).await?;
        let subscriber = RedisEventSubscriber::new(client, config.realtime.clone());

        info!(url = %url, "使用 Redis 存储后端");
        Ok(Self {
            store: Arc::new(store),
            publisher: Arc::new(publisher),
            subscriber: Arc::new(subscriber),
        })
    }
}
