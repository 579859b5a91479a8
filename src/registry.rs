//! Cache wiring.
//!
//! [`CacheRegistry`] is the composition point: it constructs exactly one
//! [`ConnectionManager`] from a validated [`CacheConfig`] and mints [`Cache`]
//! facades bound to it. Construction happens once at startup and the facades
//! are passed by reference (cloned) to whatever consumes them — no global
//! state, no auto-registration.

use std::sync::Arc;
use std::time::Duration;

use crate::codec::KeyCodec;
use crate::config::CacheConfig;
use crate::connection::ConnectionManager;
use crate::error::CacheResult;
use crate::facade::Cache;

/// Constructs and owns the process-wide cache components.
///
/// All facades minted by one registry share one connection manager, so a
/// connection failure observed through one facade is visible to every other.
pub struct CacheRegistry {
    manager: Arc<ConnectionManager>,
    codec: KeyCodec,
    default_ttl: Option<Duration>,
    op_timeout: Duration,
}

impl CacheRegistry {
    /// Builds the registry from a configuration record.
    ///
    /// Validates the configuration and constructs the connection manager
    /// without connecting; the connection is established lazily on first use,
    /// or eagerly via [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation or the Redis
    /// URL cannot be parsed.
    pub fn init(config: CacheConfig) -> anyhow::Result<Self> {
        config.validate()?;
        config.print_summary();

        let manager = Arc::new(ConnectionManager::new(&config)?);

        Ok(Self {
            manager,
            codec: KeyCodec::new(config.namespace),
            default_ttl: config.default_ttl,
            op_timeout: config.op_timeout,
        })
    }

    /// Eagerly establishes the Redis connection.
    ///
    /// Optional: facades connect lazily on first use. Calling this at startup
    /// surfaces endpoint problems before the application starts serving.
    pub async fn connect(&self) -> CacheResult<()> {
        self.manager.connect().await
    }

    /// Mints a cache facade bound to the shared connection manager.
    pub fn cache(&self) -> Cache {
        Cache::new(
            Arc::clone(&self.manager),
            self.codec.clone(),
            self.default_ttl,
            self.op_timeout,
        )
    }

    /// The shared connection manager, for health checks and diagnostics.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Shuts the connection manager down.
    ///
    /// Every facade minted by this registry fails with [`CacheError::Closed`]
    /// afterwards.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;
    use crate::error::CacheError;

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = CacheConfig {
            namespace: String::new(),
            ..CacheConfig::default()
        };

        assert!(CacheRegistry::init(config).is_err());
    }

    #[tokio::test]
    async fn test_facades_share_one_manager() {
        let config = CacheConfig {
            redis_url: "redis://127.0.0.1:1/0".to_string(),
            backoff_base: Duration::from_millis(5),
            backoff_ceiling: Duration::from_millis(10),
            max_connect_attempts: 1,
            ..CacheConfig::default()
        };
        let registry = CacheRegistry::init(config).unwrap();

        let first = registry.cache();
        let _second = registry.cache();

        // A failure driven through one facade is visible in the shared
        // manager state observed by everyone else.
        let err = first.get::<String>("anything").await.unwrap_err();
        assert!(matches!(err, CacheError::Connection(_)));

        assert_eq!(registry.manager().state(), ConnectionState::Failing);
        assert!(registry.manager().last_error().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_closes_all_facades() {
        let registry = CacheRegistry::init(CacheConfig::default()).unwrap();
        let cache = registry.cache();

        registry.shutdown().await;

        assert!(matches!(
            cache.get::<String>("k").await,
            Err(CacheError::Closed)
        ));
    }
}
