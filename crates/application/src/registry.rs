//! 房间注册表
//!
//! 持有房间元数据（已连接令牌、创建时间）与滑动过期策略。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::TimeZone;
use config::RoomConfig;
use domain::{DomainError, RoomId, RoomMeta, SlidingTtl, Token};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::store::{Batch, KeyValueStore, RoomKeys, StoreError};

const FIELD_CONNECTED: &str = "connected";
const FIELD_CREATED_AT: &str = "createdAt";

pub struct RoomRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: RoomConfig,
}

impl RoomRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: RoomConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// 创建房间：元数据与 TTL 在同一批次中写入
    pub async fn create_room(&self) -> Result<RoomId, ApplicationError> {
        let room_id = RoomId::generate();
        let keys = RoomKeys::new(&room_id);
        let meta = RoomMeta::new(self.clock.now());

        let batch = Batch::new()
            .hash_set(&keys.meta, encode_meta(&meta)?)
            .expire(&keys.meta, self.config.base_ttl_seconds);
        self.store.execute(batch).await?;

        tracing::info!(room_id = %room_id, ttl = self.config.base_ttl_seconds, "房间已创建");
        Ok(room_id)
    }

    /// 读取房间元数据；不存在时返回 `None`
    pub async fn load_meta(&self, room_id: &RoomId) -> Result<Option<RoomMeta>, ApplicationError> {
        let keys = RoomKeys::new(room_id);
        let fields = self.store.hash_get_all(&keys.meta).await?;
        Ok(decode_meta(&fields)?)
    }

    /// 存活检查。TTL 可能在两次操作之间到期，所以每条写路径开头都要重新检查
    pub async fn room_exists(&self, room_id: &RoomId) -> Result<bool, ApplicationError> {
        let keys = RoomKeys::new(room_id);
        Ok(self.store.exists(&keys.meta).await?)
    }

    /// 存活检查失败时返回 `RoomGone`
    pub async fn ensure_live(&self, room_id: &RoomId) -> Result<(), ApplicationError> {
        if !self.room_exists(room_id).await? {
            tracing::debug!(room_id = %room_id, "房间已过期");
            return Err(DomainError::RoomGone.into());
        }
        Ok(())
    }

    /// 剩余存活秒数，已过期或不存在时为 0
    pub async fn remaining_ttl(&self, room_id: &RoomId) -> Result<u64, ApplicationError> {
        let keys = RoomKeys::new(room_id);
        let ttl = self.store.ttl(&keys.meta).await?;
        Ok(if ttl > 0 { ttl as u64 } else { 0 })
    }

    /// 按滑动策略计算下一次的 TTL
    pub async fn extended_ttl(&self, room_id: &RoomId) -> Result<u64, ApplicationError> {
        let keys = RoomKeys::new(room_id);
        let current = self.store.ttl(&keys.meta).await?;
        Ok(SlidingTtl::extend(
            current,
            self.config.ttl_extension_seconds,
            self.config.base_ttl_seconds,
        ))
    }

    /// 把房间所有键的 TTL 重置为同一个值
    pub fn touch_batch(batch: Batch, room_id: &RoomId, ttl_seconds: u64) -> Batch {
        let keys = RoomKeys::new(room_id);
        keys.all()
            .into_iter()
            .fold(batch, |batch, key| batch.expire(key, ttl_seconds))
    }

    /// 销毁房间：一次批量删除全部键，键不存在时同样成功
    pub async fn destroy_room(&self, room_id: &RoomId) -> Result<(), ApplicationError> {
        let keys = RoomKeys::new(room_id);
        let batch = keys
            .all()
            .into_iter()
            .fold(Batch::new(), |batch, key| batch.delete(key));
        self.store.execute(batch).await?;

        tracing::info!(room_id = %room_id, "房间已销毁");
        Ok(())
    }

    /// 加入房间，签发或确认能力令牌
    ///
    /// 读改写而非原子操作：并发加入可能丢失其中一次写入，
    /// 但写回的集合永远不会超过容量。读到的元数据与写回之间房间可能到期，
    /// 写回时整份元数据连同剩余 TTL 一起提交，不会留下没有过期时间的键。
    pub async fn join(
        &self,
        room_id: &RoomId,
        presented: Option<Token>,
    ) -> Result<Token, ApplicationError> {
        let mut meta = self
            .load_meta(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if let Some(token) = presented.filter(|token| meta.contains(token)) {
            return Ok(token);
        }

        let keys = RoomKeys::new(room_id);
        let remaining = self.store.ttl(&keys.meta).await?;
        if remaining == -2 {
            tracing::debug!(room_id = %room_id, "房间在加入过程中过期");
            return Err(DomainError::RoomNotFound.into());
        }

        let token = Token::generate();
        meta.admit(token.clone(), self.config.max_capacity)?;

        let ttl = if remaining > 0 {
            remaining as u64
        } else {
            self.config.base_ttl_seconds
        };
        let batch = Batch::new()
            .hash_set(&keys.meta, encode_meta(&meta)?)
            .expire(&keys.meta, ttl);
        self.store.execute(batch).await?;

        tracing::info!(
            room_id = %room_id,
            token = token.short(),
            connected = meta.connected.len(),
            "令牌已加入房间"
        );
        Ok(token)
    }
}

fn encode_connected(connected: &[Token]) -> Result<String, StoreError> {
    serde_json::to_string(connected).map_err(|err| StoreError::corrupted(err.to_string()))
}

fn encode_meta(meta: &RoomMeta) -> Result<Vec<(String, String)>, StoreError> {
    Ok(vec![
        (FIELD_CONNECTED.to_string(), encode_connected(&meta.connected)?),
        (
            FIELD_CREATED_AT.to_string(),
            meta.created_at.timestamp_millis().to_string(),
        ),
    ])
}

fn decode_meta(fields: &HashMap<String, String>) -> Result<Option<RoomMeta>, StoreError> {
    let Some(connected) = fields.get(FIELD_CONNECTED) else {
        return Ok(None);
    };
    let connected: Vec<Token> = serde_json::from_str(connected)
        .map_err(|err| StoreError::corrupted(format!("connected: {err}")))?;

    let created_at = fields
        .get(FIELD_CREATED_AT)
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|millis| chrono::Utc.timestamp_millis_opt(millis).single())
        .ok_or_else(|| StoreError::corrupted("createdAt"))?;

    Ok(Some(RoomMeta {
        connected,
        created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory_store::MemoryStore;
    use crate::test_support::{ExpireAfter, ExpiringStore};
    use std::time::Duration;

    fn registry(store: Arc<MemoryStore>) -> RoomRegistry {
        RoomRegistry::new(store, Arc::new(SystemClock), RoomConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_room_sets_base_ttl_and_empty_membership() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());

        let room_id = registry.create_room().await.unwrap();
        assert!(registry.room_exists(&room_id).await.unwrap());
        assert_eq!(registry.remaining_ttl(&room_id).await.unwrap(), 600);

        let meta = registry.load_meta(&room_id).await.unwrap().unwrap();
        assert!(meta.connected.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_expires_passively() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store);
        let room_id = registry.create_room().await.unwrap();

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(!registry.room_exists(&room_id).await.unwrap());
        assert_eq!(registry.remaining_ttl(&room_id).await.unwrap(), 0);
        assert!(matches!(
            registry.ensure_live(&room_id).await,
            Err(ApplicationError::Domain(DomainError::RoomGone))
        ));
        assert!(registry.load_meta(&room_id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extended_ttl_is_capped_and_restored() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());
        let room_id = registry.create_room().await.unwrap();

        assert_eq!(registry.extended_ttl(&room_id).await.unwrap(), 600);

        tokio::time::advance(Duration::from_secs(100)).await;
        assert_eq!(registry.extended_ttl(&room_id).await.unwrap(), 505);

        // TTL 丢失时回到基础值
        store.hash_set("meta:other", "connected", "[]").await.unwrap();
        let other = RoomId::parse("other").unwrap();
        assert_eq!(registry.extended_ttl(&other).await.unwrap(), 600);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());
        let room_id = registry.create_room().await.unwrap();

        registry.destroy_room(&room_id).await.unwrap();
        assert!(!registry.room_exists(&room_id).await.unwrap());
        registry.destroy_room(&room_id).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_join_issues_tokens_up_to_capacity() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store);
        let room_id = registry.create_room().await.unwrap();

        let t1 = registry.join(&room_id, None).await.unwrap();
        let t2 = registry.join(&room_id, None).await.unwrap();
        assert_ne!(t1, t2);

        // 已在房间内的令牌重新进入时原样返回
        assert_eq!(registry.join(&room_id, Some(t1.clone())).await.unwrap(), t1);

        assert!(matches!(
            registry.join(&room_id, None).await,
            Err(ApplicationError::Domain(DomainError::RoomFull))
        ));
        assert!(matches!(
            registry.join(&room_id, Some(Token::generate())).await,
            Err(ApplicationError::Domain(DomainError::RoomFull))
        ));

        let meta = registry.load_meta(&room_id).await.unwrap().unwrap();
        assert_eq!(meta.connected, vec![t1, t2]);
    }

    #[tokio::test]
    async fn test_join_missing_room() {
        let registry = registry(Arc::new(MemoryStore::new()));
        assert!(matches!(
            registry.join(&RoomId::generate(), None).await,
            Err(ApplicationError::Domain(DomainError::RoomNotFound))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_racing_expiry_does_not_resurrect_room() {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(ExpiringStore::new(inner.clone(), ExpireAfter::HashGetAll));
        let registry = RoomRegistry::new(store.clone(), Arc::new(SystemClock), RoomConfig::default());
        let room_id = registry.create_room().await.unwrap();

        store.arm();
        assert!(matches!(
            registry.join(&room_id, None).await,
            Err(ApplicationError::Domain(DomainError::RoomNotFound))
        ));

        let keys = RoomKeys::new(&room_id);
        assert!(!inner.exists(&keys.meta).await.unwrap());
        assert_eq!(inner.ttl(&keys.meta).await.unwrap(), -2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_rewrites_full_meta_with_expiry() {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(ExpiringStore::new(inner.clone(), ExpireAfter::Ttl));
        let registry = RoomRegistry::new(store.clone(), Arc::new(SystemClock), RoomConfig::default());
        let room_id = registry.create_room().await.unwrap();
        let created = registry.load_meta(&room_id).await.unwrap().unwrap();

        // TTL 读取之后才到期，写回的键必须仍带过期时间
        store.arm();
        let token = registry.join(&room_id, None).await.unwrap();

        let keys = RoomKeys::new(&room_id);
        let ttl = inner.ttl(&keys.meta).await.unwrap();
        assert!(ttl > 0 && ttl <= 600, "ttl = {ttl}");

        let meta = registry.load_meta(&room_id).await.unwrap().unwrap();
        assert_eq!(meta.connected, vec![token]);
        assert_eq!(meta.created_at, created.created_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_keeps_remaining_ttl() {
        let store = Arc::new(MemoryStore::new());
        let registry = registry(store.clone());
        let room_id = registry.create_room().await.unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        registry.join(&room_id, None).await.unwrap();
        assert_eq!(registry.remaining_ttl(&room_id).await.unwrap(), 400);
    }

    #[tokio::test]
    async fn test_corrupted_meta_is_a_store_error() {
        let store = Arc::new(MemoryStore::new());
        store.hash_set("meta:bad", "connected", "not json").await.unwrap();
        let registry = registry(store);
        assert!(matches!(
            registry.load_meta(&RoomId::parse("bad").unwrap()).await,
            Err(ApplicationError::Store(StoreError::Corrupted(_)))
        ));
    }
}
