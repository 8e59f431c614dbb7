//! Cache backend with L1 (DashMap) and optional L2 (Redis) tiers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;

/// A cached entry with TTL support.
///
/// The payload is wrapped in `Arc` so cache hits clone a pointer, not the
/// encoded collection.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Two-tier cache backend.
///
/// - **Local**: single-instance mode, DashMap only.
/// - **Redis**: multi-instance mode, DashMap (L1) + Redis (L2). Redis errors
///   degrade to a miss or no-op so the dispatch path never depends on Redis
///   being up.
#[derive(Clone)]
pub enum CacheBackend {
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis {
        redis: Pool,
        local: Arc<DashMap<String, CachedEntry>>,
    },
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis {
            redis: redis_pool,
            local: Arc::new(DashMap::new()),
        }
    }

    /// Get a value. L1 first, then L2; an L2 hit is promoted to L1.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => map
                .get(key)
                .filter(|entry| !entry.is_expired())
                .map(|entry| Arc::clone(&entry.data)),
            CacheBackend::Redis { redis, local } => {
                if let Some(entry) = local.get(key) {
                    if !entry.is_expired() {
                        tracing::debug!(key = %key, "cache hit (L1)");
                        return Some(Arc::clone(&entry.data));
                    } else {
                        drop(entry);
                        local.remove(key);
                    }
                }

                match redis.get().await {
                    Ok(mut conn) => match conn.get::<_, Option<Vec<u8>>>(key).await {
                        Ok(Some(data)) => {
                            tracing::debug!(key = %key, "cache hit (L2)");
                            let entry = CachedEntry::new(data, Duration::from_secs(300));
                            let data_arc = Arc::clone(&entry.data);
                            local.insert(key.to_string(), entry);
                            Some(data_arc)
                        }
                        Ok(None) => None,
                        Err(e) => {
                            tracing::warn!(key = %key, error = %e, "Redis GET error");
                            None
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get Redis connection");
                        None
                    }
                }
            }
        }
    }

    /// Set a value with TTL. Redis writes are fire-and-forget.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
            }
            CacheBackend::Redis { redis, local } => {
                let entry = CachedEntry::new(value, ttl);
                let data_for_redis = Arc::clone(&entry.data);
                local.insert(key.to_string(), entry);

                let redis = redis.clone();
                let key = key.to_string();
                let ttl_secs = ttl.as_secs();
                tokio::spawn(async move {
                    if let Ok(mut conn) = redis.get().await {
                        if let Err(e) = conn
                            .set_ex::<_, _, ()>(&key, &*data_for_redis, ttl_secs)
                            .await
                        {
                            tracing::warn!(key = %key, error = %e, "Redis SET error");
                        }
                    }
                });
            }
        }
    }

    /// Invalidate a key in both tiers. The L2 delete is fire-and-forget.
    pub async fn invalidate(&self, key: &str) {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
            }
            CacheBackend::Redis { redis, local } => {
                local.remove(key);

                let redis = redis.clone();
                let key = key.to_string();
                tokio::spawn(async move {
                    if let Ok(mut conn) = redis.get().await {
                        if let Err(e) = conn.del::<_, ()>(&key).await {
                            tracing::warn!(key = %key, error = %e, "Redis DEL error");
                        }
                    }
                });
            }
        }
    }

    /// L1-only statistics, for the health endpoint.
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                l1_entries: map.len(),
                mode: "local".to_string(),
            },
            CacheBackend::Redis { local, .. } => CacheStats {
                l1_entries: local.len(),
                mode: "redis".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub l1_entries: usize,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_set_get() {
        let cache = CacheBackend::new_local();
        cache
            .set("units:all", vec![1, 2, 3], Duration::from_secs(60))
            .await;
        let got = cache.get("units:all").await.unwrap();
        assert_eq!(&*got, &vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = CacheBackend::new_local();
        cache.set("k", vec![9], Duration::from_secs(0)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = CacheBackend::new_local();
        cache.set("k", vec![9], Duration::from_secs(60)).await;
        cache.invalidate("k").await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.stats().l1_entries, 0);
    }

    #[tokio::test]
    async fn test_stats_mode() {
        let cache = CacheBackend::new_local();
        assert_eq!(cache.stats().mode, "local");
    }
}
