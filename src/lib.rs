//! # Rediska
//!
//! A Redis-backed connection and caching layer: typed `get`/`set`/`delete`/
//! `expire` over a single managed connection, with namespace prefixing,
//! reconnect backoff and per-operation deadlines.
//!
//! ## Architecture
//!
//! The crate is composed of four pieces, wired together once at startup:
//!
//! - **Connection Manager** ([`connection`]) - Owns the connection lifecycle:
//!   connect, reconnect with exponential backoff, graceful shutdown
//! - **Key Codec** ([`codec`]) - Namespace prefixing and JSON value
//!   serialization
//! - **Cache Facade** ([`facade`]) - The typed public surface consumed by the
//!   rest of the application
//! - **Registry** ([`registry`]) - Explicit constructor wiring that shares
//!   one manager across every facade
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rediska::{CacheRegistry, config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Reads REDIS_URL, CACHE_NAMESPACE, backoff/TTL/timeout tunables from env
//! let registry = CacheRegistry::init(config::load_from_env()?)?;
//! registry.connect().await?;
//!
//! let cache = registry.cache();
//! cache.set("user:42", &"Artyom", None).await?;
//! let name: Option<String> = cache.get("user:42").await?;
//!
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure semantics
//!
//! Transient connection failures are retried internally up to the configured
//! budget before a [`CacheError::Connection`] surfaces. Decode failures are
//! never retried and never collapse into "absent" — see [`error`] for the
//! full taxonomy.
//!
//! ## Configuration
//!
//! Loaded from environment variables via [`config::CacheConfig`]. See the
//! [`config`] module for available options and defaults.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod facade;
pub mod registry;

pub use codec::KeyCodec;
pub use config::CacheConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{CacheError, CacheResult};
pub use facade::Cache;
pub use registry::CacheRegistry;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::config::CacheConfig;
    pub use crate::error::{CacheError, CacheResult};
    pub use crate::facade::Cache;
    pub use crate::registry::CacheRegistry;
}
