//! 测试用存储包装：在指定原语返回之后让时间越过房间寿命

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::memory_store::MemoryStore;
use crate::store::{Batch, KeyValueStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpireAfter {
    HashGetAll,
    Ttl,
    ListRange,
}

pub(crate) struct ExpiringStore {
    inner: Arc<MemoryStore>,
    after: ExpireAfter,
    armed: AtomicBool,
}

impl ExpiringStore {
    pub(crate) fn new(inner: Arc<MemoryStore>, after: ExpireAfter) -> Self {
        Self {
            inner,
            after,
            armed: AtomicBool::new(false),
        }
    }

    /// 下一次命中 `after` 时触发一次
    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    async fn fire(&self, op: ExpireAfter) {
        if op == self.after && self.armed.swap(false, Ordering::SeqCst) {
            tokio::time::advance(Duration::from_secs(601)).await;
        }
    }
}

#[async_trait]
impl KeyValueStore for ExpiringStore {
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let fields = self.inner.hash_get_all(key).await?;
        self.fire(ExpireAfter::HashGetAll).await;
        Ok(fields)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.inner.hash_set(key, field, value).await
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let items = self.inner.list_range(key, start, stop).await?;
        self.fire(ExpireAfter::ListRange).await;
        Ok(items)
    }

    async fn list_set(&self, key: &str, index: usize, value: &str) -> StoreResult<()> {
        self.inner.list_set(key, index, value).await
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.inner.incr(key).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let ttl = self.inner.ttl(key).await?;
        self.fire(ExpireAfter::Ttl).await;
        Ok(ttl)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.inner.expire(key, seconds).await
    }

    async fn execute(&self, batch: Batch) -> StoreResult<()> {
        self.inner.execute(batch).await
    }
}
