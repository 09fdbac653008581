//! Durable store boundary.
//!
//! Everything the service persists — tracked items, price history, cooldown
//! records — goes through the [`Store`] trait: plain key-value entries with
//! optional expiry, key enumeration by prefix, and sorted sets keyed by
//! score. [`RedisStore`] is the production implementation over a Redis
//! connection manager; the tests run against an in-memory implementation.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::{debug, warn};

use crate::error::Result;

/// Abstract durable store: key-value with per-key expiry plus sorted sets.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set with a time-to-live in seconds.
    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<()>;

    /// Set with a time-to-live only if the key does not exist yet.
    /// Returns whether the write happened.
    async fn set_nx_ex(&self, key: &str, value: &str, seconds: u64) -> Result<bool>;

    /// Delete a key of any type. Returns the number of keys removed.
    async fn del(&self, key: &str) -> Result<u64>;

    /// Enumerate keys matching a `prefix:*` pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Add a member to a sorted set under the given score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Read members ordered by score. `start`/`stop` follow Redis index
    /// semantics (negative counts from the end, `-1` is the last member).
    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Remove members with score in `[min, max]`. Returns how many.
    async fn zrembyscore(&self, key: &str, min: f64, max: f64) -> Result<u64>;

    /// Liveness probe.
    async fn ping(&self) -> bool;
}

/// Redis-backed store.
pub struct RedisStore {
    /// Connection manager (handles reconnection automatically)
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    /// * `redis_url` - Redis connection string (e.g., "redis://127.0.0.1")
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        debug!("Redis store connected to {}", redis_url);

        Ok(Self { connection })
    }

    fn conn(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<()> {
        let mut conn = self.conn();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, seconds: u64) -> Result<bool> {
        let mut conn = self.conn();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn del(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn();
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn();
        conn.zadd::<_, _, _, ()>(key, member, score).await?;
        Ok(())
    }

    async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn();
        let members: Vec<String> = conn.zrange(key, start, stop).await?;
        Ok(members)
    }

    async fn zrembyscore(&self, key: &str, min: f64, max: f64) -> Result<u64> {
        let mut conn = self.conn();
        let removed: u64 = conn.zrembyscore(key, min, max).await?;
        Ok(removed)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.conn();
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(reply) if reply == "PONG" => true,
            Ok(_) => {
                warn!("Redis health check failed: unexpected response");
                false
            }
            Err(e) => {
                warn!("Redis health check failed: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// IN-MEMORY STORE (tests)
// ============================================================================

#[cfg(test)]
pub use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory [`Store`] used by the unit tests. Expiry is not simulated;
    /// callers that care about time carry explicit timestamps in the values
    /// they store.
    #[derive(Default)]
    pub struct MemoryStore {
        inner: Mutex<Inner>,
    }

    #[derive(Default)]
    struct Inner {
        strings: HashMap<String, String>,
        zsets: HashMap<String, HashMap<String, f64>>,
    }

    /// Resolve Redis-style range indices against a collection length.
    fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
        let len = len as isize;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if len == 0 || start > stop || start >= len || stop < 0 {
            return None;
        }
        Some((start as usize, stop as usize))
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner.strings.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.strings.insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn set_ex(&self, key: &str, value: &str, _seconds: u64) -> Result<()> {
            self.set(key, value).await
        }

        async fn set_nx_ex(&self, key: &str, value: &str, _seconds: u64) -> Result<bool> {
            let mut inner = self.inner.lock().unwrap();
            if inner.strings.contains_key(key) {
                return Ok(false);
            }
            inner.strings.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        async fn del(&self, key: &str) -> Result<u64> {
            let mut inner = self.inner.lock().unwrap();
            let mut removed = 0;
            if inner.strings.remove(key).is_some() {
                removed += 1;
            }
            if inner.zsets.remove(key).is_some() {
                removed += 1;
            }
            Ok(removed)
        }

        async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
            let inner = self.inner.lock().unwrap();
            let matches = |key: &str| match pattern.strip_suffix('*') {
                Some(prefix) => key.starts_with(prefix),
                None => key == pattern,
            };
            let mut keys: Vec<String> = inner
                .strings
                .keys()
                .chain(inner.zsets.keys())
                .filter(|k| matches(k))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        }

        async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .zsets
                .entry(key.to_string())
                .or_default()
                .insert(member.to_string(), score);
            Ok(())
        }

        async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
            let inner = self.inner.lock().unwrap();
            let Some(zset) = inner.zsets.get(key) else {
                return Ok(Vec::new());
            };
            let mut entries: Vec<(&String, f64)> =
                zset.iter().map(|(m, s)| (m, *s)).collect();
            entries.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });
            let Some((start, stop)) = resolve_range(entries.len(), start, stop) else {
                return Ok(Vec::new());
            };
            Ok(entries[start..=stop]
                .iter()
                .map(|(m, _)| (*m).clone())
                .collect())
        }

        async fn zrembyscore(&self, key: &str, min: f64, max: f64) -> Result<u64> {
            let mut inner = self.inner.lock().unwrap();
            let Some(zset) = inner.zsets.get_mut(key) else {
                return Ok(0);
            };
            let before = zset.len();
            zset.retain(|_, score| *score < min || *score > max);
            Ok((before - zset.len()) as u64)
        }

        async fn ping(&self) -> bool {
            true
        }
    }
}
