//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single multiplexed connection to the Redis
//! server. It establishes the connection lazily, reconnects with exponential
//! backoff after failures, and tears the connection down on shutdown. Exactly
//! one manager exists per process; every [`Cache`](crate::facade::Cache)
//! handle delegates to it, so connection health and backoff state have a
//! single source of truth.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};

/// Observable lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been established yet.
    Disconnected,
    /// A connection attempt sequence is in flight.
    Connecting,
    /// A healthy connection is available.
    Ready,
    /// The last attempt sequence exhausted its budget without connecting.
    Failing,
    /// [`ConnectionManager::shutdown`] was called; the manager is permanently
    /// unusable.
    Closed,
}

struct Inner {
    /// The active connection, if any. `MultiplexedConnection` is a cheap
    /// handle onto a background driver task, so callers get clones.
    conn: Option<MultiplexedConnection>,
    closed: bool,
}

/// Owns the lifecycle of the connection to the Redis server.
///
/// Constructed once at startup (see [`CacheRegistry`](crate::registry::CacheRegistry))
/// and shared via `Arc`. Consumers never touch the connection directly; they
/// go through [`get_connection`](Self::get_connection), which suspends the
/// calling task until the connection is ready or the retry budget is spent.
pub struct ConnectionManager {
    client: Client,
    inner: Mutex<Inner>,
    state: RwLock<ConnectionState>,
    last_error: RwLock<Option<String>>,
    connect_attempts: AtomicU64,
    backoff_base: Duration,
    backoff_ceiling: Duration,
    max_connect_attempts: u32,
}

impl ConnectionManager {
    /// Creates a manager for the configured endpoint without connecting.
    ///
    /// The first call to [`connect`](Self::connect) or
    /// [`get_connection`](Self::get_connection) establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if the Redis URL cannot be parsed.
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            CacheError::Connection(format!("failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            inner: Mutex::new(Inner {
                conn: None,
                closed: false,
            }),
            state: RwLock::new(ConnectionState::Disconnected),
            last_error: RwLock::new(None),
            connect_attempts: AtomicU64::new(0),
            backoff_base: config.backoff_base,
            backoff_ceiling: config.backoff_ceiling,
            max_connect_attempts: config.max_connect_attempts,
        })
    }

    /// Establishes the connection if one is not already active.
    ///
    /// Idempotent: concurrent callers serialize on the manager's internal
    /// lock, so N concurrent calls produce a single attempt sequence, not N.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] once the configured attempt budget
    /// is exhausted, or [`CacheError::Closed`] after shutdown.
    pub async fn connect(&self) -> CacheResult<()> {
        self.get_connection().await.map(|_| ())
    }

    /// Returns a handle to the active connection, connecting first if needed.
    ///
    /// Suspends the calling task while a connection attempt sequence is in
    /// flight (whether driven by this caller or a concurrent one).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] when the retry budget is exhausted,
    /// or [`CacheError::Closed`] after shutdown.
    pub async fn get_connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            return Err(CacheError::Closed);
        }

        if let Some(conn) = &inner.conn {
            return Ok(conn.clone());
        }

        self.establish(&mut inner).await
    }

    /// Closes the active connection and transitions to [`ConnectionState::Closed`].
    ///
    /// Idempotent. Subsequent calls to [`get_connection`](Self::get_connection)
    /// fail with [`CacheError::Closed`] until a fresh manager is constructed.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;

        if inner.closed {
            return;
        }

        // Dropping the handle stops the multiplexed driver once all clones
        // held by in-flight operations are gone.
        inner.conn = None;
        inner.closed = true;
        self.set_state(ConnectionState::Closed);

        info!("Redis connection manager shut down");
    }

    /// Round-trips a PING over the active connection.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] if no connection can be established
    /// or the server does not answer.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        conn.ping::<()>()
            .await
            .map_err(|e| CacheError::Connection(format!("Redis PING failed: {}", e)))
    }

    /// Current lifecycle state, for health reporting and diagnostics.
    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// The error recorded by the most recent failed connect attempt, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Total number of underlying connect attempts made by this manager.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Drops the active connection after an operation hit a transport error,
    /// so the next caller re-drives the connect sequence.
    pub(crate) async fn mark_failed(&self, err: &redis::RedisError) {
        let mut inner = self.inner.lock().await;

        if inner.closed || inner.conn.is_none() {
            return;
        }

        warn!("Redis connection lost: {}", err);
        inner.conn = None;
        self.record_error(err);
        self.set_state(ConnectionState::Failing);
    }

    /// Runs the attempt sequence while holding the manager lock.
    ///
    /// A caller cancelled mid-sequence simply drops the lock guard; the next
    /// caller re-drives the state machine from scratch. The backoff schedule
    /// is rebuilt per sequence, so the delay resets to the base after any
    /// successful connection.
    async fn establish(&self, inner: &mut Inner) -> CacheResult<MultiplexedConnection> {
        self.set_state(ConnectionState::Connecting);

        // from_millis(2) doubles per attempt; factor scales the schedule so
        // the first delay equals the configured base.
        let factor = (self.backoff_base.as_millis() as u64 / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.backoff_ceiling)
            .take(self.max_connect_attempts.saturating_sub(1) as usize);

        match Retry::spawn(strategy, || self.attempt()).await {
            Ok(conn) => {
                inner.conn = Some(conn.clone());
                self.set_state(ConnectionState::Ready);
                info!("✓ Connected to Redis");
                Ok(conn)
            }
            Err(e) => {
                self.set_state(ConnectionState::Failing);
                Err(CacheError::Connection(format!(
                    "failed to connect to Redis after {} attempts: {}",
                    self.max_connect_attempts, e
                )))
            }
        }
    }

    /// One connect attempt: open the multiplexed connection and validate it
    /// with a PING.
    async fn attempt(&self) -> Result<MultiplexedConnection, redis::RedisError> {
        let n = self.connect_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Connecting to Redis (attempt {})", n);

        let result = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            conn.ping::<()>().await?;
            Ok(conn)
        }
        .await;

        if let Err(e) = &result {
            warn!("Redis connect attempt {} failed: {}", n, e);
            self.record_error(e);
        }

        result
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("Redis connection state -> {:?}", state);
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn record_error(&self, err: &redis::RedisError) {
        *self.last_error.write().unwrap_or_else(|e| e.into_inner()) = Some(err.to_string());
    }
}

/// Whether an operation error indicates the connection itself is unusable
/// (as opposed to the server rejecting the command).
pub(crate) fn is_transient(err: &redis::RedisError) -> bool {
    err.is_io_error()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.is_timeout()
}
