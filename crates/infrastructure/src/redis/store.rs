//! Redis 键值存储
//!
//! 通过 `ConnectionManager` 复用同一条多路复用连接；断线后由管理器自动重连。
//! 批量写入使用 `MULTI`/`EXEC` 包裹的管道，要么全部生效要么全部不生效。

use std::collections::HashMap;

use application::{Batch, KeyValueStore, StoreOp, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Pipeline};
use tracing::{debug, info};

use crate::redis::{RedisError, RedisResult};

/// 基于 Redis 的 [`KeyValueStore`] 实现
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// 连接 Redis 并建立连接管理器
    pub async fn connect(url: &str) -> RedisResult<Self> {
        let client = Client::open(url).map_err(|e| RedisError::ConfigError {
            message: format!("创建 Redis 客户端失败: {}", e),
        })?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| RedisError::ConnectionError {
                message: format!("建立 Redis 连接失败: {}", e),
            })?;

        info!("Redis 存储连接成功");
        Ok(Self { connection })
    }

    fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }

    async fn query<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> RedisResult<T> {
        let mut conn = self.conn();
        Ok(cmd.query_async(&mut conn).await?)
    }
}

/// 把批量操作翻译成事务管道
fn build_pipeline(batch: Batch) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();

    for op in batch.into_ops() {
        match op {
            StoreOp::HashSet { key, fields } => {
                let cmd = pipe.cmd("HSET").arg(key);
                for (field, value) in fields {
                    cmd.arg(field).arg(value);
                }
                cmd.ignore();
            }
            StoreOp::ListPush { key, value } => {
                pipe.cmd("RPUSH").arg(key).arg(value).ignore();
            }
            StoreOp::Expire { key, seconds } => {
                pipe.cmd("EXPIRE").arg(key).arg(seconds).ignore();
            }
            StoreOp::Delete { key } => {
                pipe.cmd("DEL").arg(key).ignore();
            }
        }
    }
    pipe
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        Ok(self.query(redis::cmd("HGETALL").arg(key)).await?)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let _: i64 = self
            .query(redis::cmd("HSET").arg(key).arg(field).arg(value))
            .await?;
        Ok(())
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        Ok(self
            .query(redis::cmd("LRANGE").arg(key).arg(start).arg(stop))
            .await?)
    }

    async fn list_set(&self, key: &str, index: usize, value: &str) -> StoreResult<()> {
        let _: () = self
            .query(redis::cmd("LSET").arg(key).arg(index).arg(value))
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        Ok(self.query(redis::cmd("INCR").arg(key)).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let count: i64 = self.query(redis::cmd("EXISTS").arg(key)).await?;
        Ok(count > 0)
    }

    async fn ttl(&self, key: &str) -> StoreResult<i64> {
        Ok(self.query(redis::cmd("TTL").arg(key)).await?)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        let applied: i64 = self
            .query(redis::cmd("EXPIRE").arg(key).arg(seconds))
            .await?;
        Ok(applied == 1)
    }

    async fn execute(&self, batch: Batch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.ops().len();
        let pipe = build_pipeline(batch);

        let mut conn = self.conn();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(RedisError::from)?;

        debug!(ops = count, "Redis 事务批次已提交");
        Ok(())
    }
}
