//! Typed cache operations.
//!
//! [`Cache`] is the public surface the rest of the application consumes:
//! `get`/`set`/`delete`/`expire` with typed results. It is a stateless
//! wrapper over the shared [`ConnectionManager`] — cheap to clone and safe to
//! hand to any number of concurrent tasks for the life of the process.

use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::debug;

use crate::codec::KeyCodec;
use crate::connection::{ConnectionManager, is_transient};
use crate::error::{CacheError, CacheResult};

/// Typed cache facade over the shared connection manager.
///
/// Every operation runs under an overall deadline ([`CacheError::Timeout`] on
/// expiry) and acquires the connection through the manager, suspending until
/// it is ready. Operations are independently atomic at single-key
/// granularity; no multi-key transaction guarantee is provided.
#[derive(Clone)]
pub struct Cache {
    manager: Arc<ConnectionManager>,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    deadline: Duration,
}

impl Cache {
    pub(crate) fn new(
        manager: Arc<ConnectionManager>,
        codec: KeyCodec,
        default_ttl: Option<Duration>,
        deadline: Duration,
    ) -> Self {
        Self {
            manager,
            codec,
            default_ttl,
            deadline,
        }
    }

    /// Returns a facade whose operations use `deadline` as their overall
    /// time budget instead of the configured default.
    ///
    /// The clone shares the same connection manager; only the deadline
    /// differs.
    pub fn with_deadline(&self, deadline: Duration) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    /// Retrieves and decodes the value stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` when the key exists and decodes cleanly
    /// - `Ok(None)` when the key does not exist
    ///
    /// # Errors
    ///
    /// - [`CacheError::Decode`] when stored bytes cannot be decoded; this is
    ///   never retried and never collapsed into `Ok(None)`
    /// - [`CacheError::Connection`] when the connection cannot be established
    ///   within the retry budget
    /// - [`CacheError::Timeout`] when the deadline elapses first
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let full_key = self.codec.encode_key(key)?;

        let raw = self.with_timeout(self.get_raw(&full_key)).await?;

        match raw {
            Some(bytes) => {
                debug!("Cache HIT: {}", key);
                Ok(Some(self.codec.decode_value(&bytes, &full_key)?))
            }
            None => {
                debug!("Cache MISS: {}", key);
                Ok(None)
            }
        }
    }

    /// Stores `value` under `key`, unconditionally overwriting any existing
    /// entry (last-write-wins; no version check).
    ///
    /// `ttl` falls back to the configured default TTL when `None`; if no
    /// default is configured either, the entry does not expire. Sub-second
    /// TTLs are rounded up to one second (Redis expiry granularity).
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let full_key = self.codec.encode_key(key)?;
        let bytes = self.codec.encode_value(value)?;
        let effective_ttl = ttl.or(self.default_ttl);

        self.with_timeout(self.set_raw(&full_key, &bytes, effective_ttl))
            .await?;

        match effective_ttl {
            Some(t) => debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds(t)),
            None => debug!("Cache SET: {} (no expiry)", key),
        }
        Ok(())
    }

    /// Removes `key`, reporting whether an entry was actually present.
    ///
    /// Deleting a non-existent key is not an error; it returns `Ok(false)`.
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.codec.encode_key(key)?;

        let removed = self.with_timeout(self.delete_raw(&full_key)).await?;

        if removed {
            debug!("Cache DELETE: {}", key);
        }
        Ok(removed)
    }

    /// Updates the TTL on an existing key without altering its value.
    ///
    /// Returns whether the key existed.
    pub async fn expire(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let full_key = self.codec.encode_key(key)?;

        let existed = self.with_timeout(self.expire_raw(&full_key, ttl)).await?;

        debug!("Cache EXPIRE: {} (TTL: {}s, existed: {})", key, ttl_seconds(ttl), existed);
        Ok(existed)
    }

    async fn with_timeout<T>(
        &self,
        op: impl Future<Output = CacheResult<T>>,
    ) -> CacheResult<T> {
        timeout(self.deadline, op)
            .await
            .map_err(|_| CacheError::Timeout)?
    }

    async fn get_raw(&self, full_key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.manager.get_connection().await?;

        match conn.get::<_, Option<Vec<u8>>>(full_key).await {
            Ok(value) => Ok(value),
            Err(e) if is_transient(&e) => {
                // One reconnect cycle per operation; the manager applies its
                // full backoff budget inside get_connection().
                self.manager.mark_failed(&e).await;
                let mut conn = self.manager.get_connection().await?;
                conn.get::<_, Option<Vec<u8>>>(full_key)
                    .await
                    .map_err(connection_error)
            }
            Err(e) => Err(operation_error(e)),
        }
    }

    async fn set_raw(
        &self,
        full_key: &str,
        bytes: &[u8],
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        let mut conn = self.manager.get_connection().await?;

        match store(&mut conn, full_key, bytes, ttl).await {
            Ok(()) => Ok(()),
            Err(e) if is_transient(&e) => {
                self.manager.mark_failed(&e).await;
                let mut conn = self.manager.get_connection().await?;
                store(&mut conn, full_key, bytes, ttl)
                    .await
                    .map_err(connection_error)
            }
            Err(e) => Err(operation_error(e)),
        }
    }

    async fn delete_raw(&self, full_key: &str) -> CacheResult<bool> {
        let mut conn = self.manager.get_connection().await?;

        match conn.del::<_, i64>(full_key).await {
            Ok(removed) => Ok(removed > 0),
            Err(e) if is_transient(&e) => {
                self.manager.mark_failed(&e).await;
                let mut conn = self.manager.get_connection().await?;
                conn.del::<_, i64>(full_key)
                    .await
                    .map(|removed| removed > 0)
                    .map_err(connection_error)
            }
            Err(e) => Err(operation_error(e)),
        }
    }

    async fn expire_raw(&self, full_key: &str, ttl: Duration) -> CacheResult<bool> {
        let secs = ttl_seconds(ttl) as i64;
        let mut conn = self.manager.get_connection().await?;

        match conn.expire::<_, bool>(full_key, secs).await {
            Ok(existed) => Ok(existed),
            Err(e) if is_transient(&e) => {
                self.manager.mark_failed(&e).await;
                let mut conn = self.manager.get_connection().await?;
                conn.expire::<_, bool>(full_key, secs)
                    .await
                    .map_err(connection_error)
            }
            Err(e) => Err(operation_error(e)),
        }
    }
}

async fn store(
    conn: &mut redis::aio::MultiplexedConnection,
    full_key: &str,
    bytes: &[u8],
    ttl: Option<Duration>,
) -> Result<(), redis::RedisError> {
    match ttl {
        Some(t) => conn.set_ex::<_, _, ()>(full_key, bytes, ttl_seconds(t)).await,
        None => conn.set::<_, _, ()>(full_key, bytes).await,
    }
}

/// Redis expiry has one-second granularity; round sub-second TTLs up so a
/// short TTL still expires instead of being rejected.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn connection_error(e: redis::RedisError) -> CacheError {
    CacheError::Connection(e.to_string())
}

fn operation_error(e: redis::RedisError) -> CacheError {
    CacheError::Operation(e.to_string())
}
