use std::sync::Arc;

use config::RateLimitConfig;
use domain::{DomainError, Token};

use crate::error::ApplicationError;
use crate::store::{rate_key, KeyValueStore};

/// 消息限流器
///
/// 按令牌计数的固定窗口：计数器自增后值为 1 时打开窗口并设置过期时间，
/// 超过上限即拒绝。被拒绝的尝试同样计数，不做回退。
/// 自增与设置过期是两次独立调用，中途失败会留下一个没有过期时间的计数器。
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    /// 时间窗口长度（秒）
    window_seconds: u64,
    /// 每个窗口允许的最大消息数
    max_messages: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            window_seconds: config.window_seconds,
            max_messages: config.max_messages,
        }
    }

    /// 检查并占用一次发送配额
    pub async fn check_and_increment(&self, token: &Token) -> Result<(), ApplicationError> {
        let key = rate_key(token);
        let current = self.store.incr(&key).await?;

        if current == 1 {
            // 窗口内第一条消息：打开新窗口
            self.store.expire(&key, self.window_seconds).await?;
        }

        if current > i64::from(self.max_messages) {
            tracing::warn!(
                token = token.short(),
                current,
                max = self.max_messages,
                "发送频率超限"
            );
            return Err(DomainError::RateLimitExceeded {
                current,
                max: self.max_messages,
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use std::time::Duration;

    fn limiter(store: Arc<MemoryStore>, window_seconds: u64, max_messages: u32) -> RateLimiter {
        RateLimiter::new(
            store,
            &RateLimitConfig {
                window_seconds,
                max_messages,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiting() {
        let limiter = limiter(Arc::new(MemoryStore::new()), 5, 20);
        let token = Token::generate();

        // 前20条消息应该成功
        for i in 0..20 {
            let result = limiter.check_and_increment(&token).await;
            assert!(result.is_ok(), "Message {} should be allowed", i + 1);
        }

        // 第21条消息应该被限流
        match limiter.check_and_increment(&token).await {
            Err(ApplicationError::Domain(DomainError::RateLimitExceeded { current, max })) => {
                assert_eq!(current, 21);
                assert_eq!(max, 20);
            }
            other => panic!("Expected RateLimitExceeded error, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reset() {
        let limiter = limiter(Arc::new(MemoryStore::new()), 5, 2);
        let token = Token::generate();

        assert!(limiter.check_and_increment(&token).await.is_ok());
        assert!(limiter.check_and_increment(&token).await.is_ok());
        assert!(limiter.check_and_increment(&token).await.is_err());

        // 被拒绝的尝试也计数，窗口内持续拒绝
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(limiter.check_and_increment(&token).await.is_err());

        // 等待时间窗口重置
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.check_and_increment(&token).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_are_limited_independently() {
        let limiter = limiter(Arc::new(MemoryStore::new()), 5, 1);
        let a = Token::generate();
        let b = Token::generate();

        assert!(limiter.check_and_increment(&a).await.is_ok());
        assert!(limiter.check_and_increment(&a).await.is_err());
        assert!(limiter.check_and_increment(&b).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_opens_only_on_first_increment() {
        let store = Arc::new(MemoryStore::new());
        let limiter = limiter(store.clone(), 5, 20);
        let token = Token::generate();

        limiter.check_and_increment(&token).await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        limiter.check_and_increment(&token).await.unwrap();

        // 第二次自增不会延长窗口
        assert_eq!(store.ttl(&rate_key(&token)).await.unwrap(), 2);
    }
}
