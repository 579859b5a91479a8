//! Cache error taxonomy.
//!
//! Every fallible operation in this crate returns a [`CacheError`]. Errors are
//! always surfaced to the caller; nothing is converted into a default value,
//! so an absent key and a corrupt value remain distinguishable outcomes.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Transport or connect failure after the reconnect budget was spent.
    ///
    /// Recoverable: the caller may retry later. The crate itself has already
    /// retried up to the configured attempt limit before surfacing this.
    #[error("cache connection error: {0}")]
    Connection(String),

    /// The caller-supplied deadline elapsed before the operation completed.
    ///
    /// Distinct from [`CacheError::Connection`] so callers can tell "slow"
    /// from "down".
    #[error("cache operation timed out")]
    Timeout,

    /// Stored bytes could not be decoded into the requested type.
    ///
    /// Never retried automatically: the bytes will not change.
    #[error("failed to decode cached value for key '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be serialized for storage.
    #[error("failed to encode value for cache: {0}")]
    Encode(#[source] serde_json::Error),

    /// A malformed logical key was supplied by the caller.
    ///
    /// This is a programming-error class; it is surfaced immediately and
    /// never retried.
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// The Redis server rejected a command (wrong type, bad arguments, ...).
    #[error("cache operation error: {0}")]
    Operation(String),

    /// An operation was attempted after the connection manager was shut down.
    #[error("cache has been shut down")]
    Closed,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_offending_key() {
        let source = serde_json::from_slice::<u64>(b"not-json").unwrap_err();
        let err = CacheError::Decode {
            key: "cache:user:42".to_string(),
            source,
        };

        assert!(err.to_string().contains("cache:user:42"));
    }

    #[test]
    fn timeout_and_connection_are_distinct() {
        let timeout = CacheError::Timeout;
        let connection = CacheError::Connection("refused".to_string());

        assert!(matches!(timeout, CacheError::Timeout));
        assert!(matches!(connection, CacheError::Connection(_)));
    }
}
