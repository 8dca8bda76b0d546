//! 单进程内存存储
//!
//! 实现与 Redis 相同语义的键值原语（含 TTL），用于开发模式和测试。
//! 过期时间基于 `tokio::time::Instant`，测试中可以用暂停的时钟推进。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::{Batch, KeyValueStore, StoreError, StoreOp, StoreResult};

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    List(Vec<String>),
    Counter(i64),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::command(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {key}"
    ))
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前存活的键数量
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries, Instant::now());
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, entry| !entry.is_expired(now));
}

fn purge(entries: &mut HashMap<String, Entry>, key: &str) {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
    }
}

fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    purge(entries, key);
    entries.get_mut(key)
}

fn apply(entries: &mut HashMap<String, Entry>, op: StoreOp) -> StoreResult<()> {
    match op {
        StoreOp::HashSet { key, fields } => {
            purge(entries, &key);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Value::Hash(HashMap::new())));
            match &mut entry.value {
                Value::Hash(hash) => {
                    hash.extend(fields);
                    Ok(())
                }
                _ => Err(wrong_type(&key)),
            }
        }
        StoreOp::ListPush { key, value } => {
            purge(entries, &key);
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(Value::List(Vec::new())));
            match &mut entry.value {
                Value::List(list) => {
                    list.push(value);
                    Ok(())
                }
                _ => Err(wrong_type(&key)),
            }
        }
        StoreOp::Expire { key, seconds } => {
            if let Some(entry) = live(entries, &key) {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
            }
            Ok(())
        }
        StoreOp::Delete { key } => {
            entries.remove(&key);
            Ok(())
        }
    }
}

/// 按 Redis 规则把可能为负的下标换算成区间
fn normalize_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(HashMap::new()),
            Some(Entry {
                value: Value::Hash(hash),
                ..
            }) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        apply(
            &mut entries,
            StoreOp::HashSet {
                key: key.to_string(),
                fields: vec![(field.to_string(), value.to_string())],
            },
        )
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(normalize_range(list.len(), start, stop)
                .map(|(from, to)| list[from..=to].to_vec())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_set(&self, key: &str, index: usize, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Err(StoreError::command("ERR no such key")),
            Some(Entry {
                value: Value::List(list),
                ..
            }) => {
                let slot = list
                    .get_mut(index)
                    .ok_or_else(|| StoreError::command("ERR index out of range"))?;
                *slot = value.to_string();
                Ok(())
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => {
                entries.insert(key.to_string(), Entry::new(Value::Counter(1)));
                Ok(1)
            }
            Some(Entry {
                value: Value::Counter(count),
                ..
            }) => {
                *count += 1;
                Ok(*count)
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(match live(&mut entries, key) {
            None => -2,
            Some(Entry {
                expires_at: None, ..
            }) => -1,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at.saturating_duration_since(now).as_millis() as i64;
                (remaining + 500) / 1000
            }
        })
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(false),
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
                Ok(true)
            }
        }
    }

    async fn execute(&self, batch: Batch) -> StoreResult<()> {
        let mut entries = self.entries.lock().await;
        // 在副本上执行，任何一步失败都不影响原数据
        let mut staged = entries.clone();
        for op in batch.into_ops() {
            apply(&mut staged, op)?;
        }
        *entries = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ttl_semantics() {
        let store = MemoryStore::new();
        assert_eq!(store.ttl("missing").await.unwrap(), -2);

        store.hash_set("h", "f", "v").await.unwrap();
        assert_eq!(store.ttl("h").await.unwrap(), -1);

        assert!(store.expire("h", 10).await.unwrap());
        assert_eq!(store.ttl("h").await.unwrap(), 10);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.ttl("h").await.unwrap(), 6);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!store.exists("h").await.unwrap());
        assert_eq!(store.ttl("h").await.unwrap(), -2);
        assert!(!store.expire("h", 10).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_operations() {
        let store = MemoryStore::new();
        store
            .execute(Batch::new().list_push("l", "a").list_push("l", "b").list_push("l", "c"))
            .await
            .unwrap();

        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), vec!["a", "b", "c"]);
        assert_eq!(store.list_range("l", 1, 1).await.unwrap(), vec!["b"]);
        assert_eq!(store.list_range("l", -2, -1).await.unwrap(), vec!["b", "c"]);
        assert!(store.list_range("missing", 0, -1).await.unwrap().is_empty());

        store.list_set("l", 1, "B").await.unwrap();
        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), vec!["a", "B", "c"]);
        assert!(store.list_set("l", 3, "x").await.is_err());
        assert!(store.list_set("missing", 0, "x").await.is_err());
    }

    #[tokio::test]
    async fn test_incr_and_wrong_type() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("c").await.unwrap(), 1);
        assert_eq!(store.incr("c").await.unwrap(), 2);
        assert!(store.hash_set("c", "f", "v").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        store.incr("counter").await.unwrap();

        let result = store
            .execute(
                Batch::new()
                    .list_push("l", "a")
                    .hash_set("counter", vec![("f".into(), "v".into())]),
            )
            .await;

        assert!(result.is_err());
        assert!(!store.exists("l").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let store = MemoryStore::new();
        store
            .execute(Batch::new().delete("nothing").delete("still-nothing"))
            .await
            .unwrap();
        assert!(store.is_empty().await);
    }
}
