//! Thin abstraction over a single or clustered Redis deployment.
//!
//! Every repository goes through [`RedisGateway`] rather than holding a raw
//! connection; this is what lets the retry/backoff policy and the
//! hash-tagged transaction helper live in one place.

use std::time::{Duration, Instant};

use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Pipeline};
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::RedisConfig;
use crate::errors::{StoreError, StoreResult};

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(50);
const MAX_BACKOFF: Duration = Duration::from_millis(400);

/// Result of a liveness probe: whether the gateway reached Redis, and how
/// long the round trip took.
#[derive(Debug, Clone, Copy)]
pub struct HealthProbe {
    pub up: bool,
    pub latency: Duration,
}

/// Injects `REDIS_PASSWORD` into a `redis://host:port` URL as userinfo,
/// since [`RedisConfig`] keeps it as a separate field rather than asking
/// callers to embed credentials in the address list.
fn with_password(address: &str, password: &str) -> StoreResult<String> {
    let rest = address
        .strip_prefix("redis://")
        .or_else(|| address.strip_prefix("rediss://"))
        .ok_or_else(|| StoreError::fatal("Redis address must start with redis:// or rediss://"))?;
    let scheme = if address.starts_with("rediss://") {
        "rediss"
    } else {
        "redis"
    };
    Ok(format!("{scheme}://:{password}@{rest}"))
}

#[derive(Clone)]
pub struct RedisGateway {
    conn: std::sync::Arc<Mutex<MultiplexedConnection>>,
}

impl RedisGateway {
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let primary = config
            .addresses
            .first()
            .ok_or_else(|| StoreError::fatal("no Redis address configured"))?;

        let url = match &config.password {
            Some(password) => with_password(primary, password)?,
            None => primary.clone(),
        };

        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError::fatal(format!("invalid Redis address: {e}")))?;

        let conn = client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| StoreError::fatal(format!("failed to connect to Redis: {e}")))?;

        Ok(Self {
            conn: std::sync::Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `op` with up to [`MAX_RETRIES`] retries on transient failure,
    /// using exponential backoff with full jitter. Non-transient errors
    /// (including `Fatal`, `NotFound`, `Conflict`) are never retried.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> StoreResult<T>
    where
        F: FnMut(MultiplexedConnection) -> Fut,
        Fut: std::future::Future<Output = StoreResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let conn = self.conn.lock().await.clone();
            match op(conn).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                    let backoff = Self::jittered_backoff(attempt);
                    warn!(attempt, ?backoff, error = %err, "retrying transient redis error");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn jittered_backoff(attempt: u32) -> Duration {
        let exp = BASE_BACKOFF.as_millis() as u64 * 2u64.saturating_pow(attempt);
        let capped = exp.min(MAX_BACKOFF.as_millis() as u64);
        let jittered = rand::thread_rng().gen_range(0..=capped.max(1));
        Duration::from_millis(jittered)
    }

    pub async fn health(&self) -> HealthProbe {
        let start = Instant::now();
        let result = self
            .with_retry(|mut conn| async move {
                redis::cmd("PING")
                    .query_async::<_, String>(&mut conn)
                    .await
                    .map_err(StoreError::from)
            })
            .await;
        HealthProbe {
            up: result.is_ok(),
            latency: start.elapsed(),
        }
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.get(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: i64) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        let ttl = ttl_secs.max(1) as u64;
        self.with_retry(move |mut conn| {
            let key = key.clone();
            let value = value.clone();
            async move {
                conn.set_ex::<_, _, ()>(&key, value, ttl)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    /// Batched `GET` over many keys in one round trip. Used by the stats
    /// repository to sum a range of per-minute buckets without issuing one
    /// `GET` per minute.
    pub async fn mget(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let keys = keys.to_vec();
        self.with_retry(move |mut conn| {
            let keys = keys.clone();
            async move { conn.mget(&keys).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn del(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.del::<_, ()>(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn exists(&self, key: &str) -> StoreResult<bool> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.exists(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn expire(&self, key: &str, ttl_secs: i64) -> StoreResult<()> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move {
                conn.expire::<_, ()>(&key, ttl_secs.max(1))
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    pub async fn hset_all(&self, key: &str, fields: Vec<(String, String)>) -> StoreResult<()> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            let fields = fields.clone();
            async move {
                conn.hset_multiple::<_, _, _, ()>(&key, &fields)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    pub async fn hgetall(&self, key: &str) -> StoreResult<std::collections::HashMap<String, String>> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.hgetall(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn lpush(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            let value = value.clone();
            async move { conn.lpush::<_, _, ()>(&key, value).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn ltrim(&self, key: &str, start: isize, stop: isize) -> StoreResult<()> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move {
                conn.ltrim::<_, ()>(&key, start, stop)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    pub async fn lrange(&self, key: &str, offset: isize, limit: isize) -> StoreResult<Vec<String>> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move {
                conn.lrange(&key, offset, offset.saturating_add(limit).saturating_sub(1))
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    pub async fn llen(&self, key: &str) -> StoreResult<usize> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.llen(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn sadd(&self, key: &str, member: &str) -> StoreResult<()> {
        let key = key.to_string();
        let member = member.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            let member = member.clone();
            async move { conn.sadd::<_, _, ()>(&key, member).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn srem(&self, key: &str, member: &str) -> StoreResult<()> {
        let key = key.to_string();
        let member = member.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            let member = member.clone();
            async move { conn.srem::<_, _, ()>(&key, member).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.smembers(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn scard(&self, key: &str) -> StoreResult<u64> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move { conn.scard(&key).await.map_err(StoreError::from) }
        })
        .await
    }

    pub async fn sinterstore_card(&self, keys: &[String]) -> StoreResult<u64> {
        let keys = keys.to_vec();
        self.with_retry(move |mut conn| {
            let keys = keys.clone();
            async move {
                // SINTERCARD avoids materializing a temp key for a simple count.
                redis::cmd("SINTERCARD")
                    .arg(keys.len())
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }

    pub async fn sinter(&self, keys: &[String]) -> StoreResult<Vec<String>> {
        let keys = keys.to_vec();
        self.with_retry(move |mut conn| {
            let keys = keys.clone();
            async move { conn.sinter(&keys).await.map_err(StoreError::from) }
        })
        .await
    }

    /// Cursor-walks every key matching `pattern` via `SCAN ... MATCH`. Used
    /// to find a widget's stats buckets, which have no secondary index of
    /// their own (they're named by minute, not tracked in a set).
    pub async fn scan_match(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let pattern = pattern.to_string();
        self.with_retry(move |mut conn| {
            let pattern = pattern.clone();
            async move {
                let mut iter: redis::AsyncIter<'_, String> = conn
                    .scan_match(&pattern)
                    .await
                    .map_err(StoreError::from)?;
                let mut keys = Vec::new();
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
                Ok(keys)
            }
        })
        .await
    }

    /// Increments `key` and sets its TTL in the same pipelined round trip.
    /// Used both by the rate limiter (two of these back to back) and by the
    /// stats repository.
    pub async fn incr_with_expire(&self, key: &str, ttl_secs: i64) -> StoreResult<i64> {
        let key = key.to_string();
        self.with_retry(move |mut conn| {
            let key = key.clone();
            async move {
                let mut pipe = Pipeline::new();
                pipe.cmd("INCR").arg(&key).ignore();
                pipe.cmd("EXPIRE").arg(&key).arg(ttl_secs.max(1)).ignore();
                pipe.cmd("GET").arg(&key);
                let (value,): (i64,) = pipe
                    .query_async(&mut conn)
                    .await
                    .map_err(StoreError::from)?;
                Ok(value)
            }
        })
        .await
    }

    /// Runs two independent `incr_with_expire` units (per-IP and global) in
    /// a single pipeline, as required by the rate limiter's admission rule.
    pub async fn incr_pair_with_expire(
        &self,
        key_a: &str,
        key_b: &str,
        ttl_secs: i64,
    ) -> StoreResult<(i64, i64)> {
        let key_a = key_a.to_string();
        let key_b = key_b.to_string();
        self.with_retry(move |mut conn| {
            let key_a = key_a.clone();
            let key_b = key_b.clone();
            async move {
                let mut pipe = Pipeline::new();
                pipe.cmd("INCR").arg(&key_a);
                pipe.cmd("EXPIRE").arg(&key_a).arg(ttl_secs.max(1)).ignore();
                pipe.cmd("INCR").arg(&key_b);
                pipe.cmd("EXPIRE").arg(&key_b).arg(ttl_secs.max(1)).ignore();
                let (a, b): (i64, i64) = pipe
                    .query_async(&mut conn)
                    .await
                    .map_err(StoreError::from)?;
                Ok((a, b))
            }
        })
        .await
    }

    /// Groups a set of writes that share a hash tag so a clustered backend
    /// can execute them atomically. `ops` is built by the caller with a
    /// fresh [`Pipeline`] and run here inside a single retried round trip.
    pub async fn transaction<F>(&self, build: F) -> StoreResult<()>
    where
        F: Fn(&mut Pipeline) + Send + Sync + 'static,
    {
        let build = std::sync::Arc::new(build);
        self.with_retry(move |mut conn| {
            let build = build.clone();
            async move {
                let mut pipe = Pipeline::new();
                pipe.atomic();
                build(&mut pipe);
                pipe.query_async::<_, ()>(&mut conn)
                    .await
                    .map_err(StoreError::from)
            }
        })
        .await
    }
}
