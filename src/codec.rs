//! Key and value codec.
//!
//! Maps application-level keys and values to/from their wire representation:
//! logical keys get a fixed namespace prefix, values are serialized as JSON.
//! Decoding never falls back to a default value, so a corrupt entry is
//! reported as [`CacheError::Decode`] rather than masquerading as a miss.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CacheError, CacheResult};

/// Encodes logical keys and values for storage in Redis.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    namespace: String,
}

impl KeyCodec {
    /// Creates a codec with the given namespace prefix.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Returns the namespace prefix this codec applies.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Constructs the full Redis key with namespace prefix.
    ///
    /// Deterministic: distinct logical keys always map to distinct Redis keys
    /// under the same namespace.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidKey`] if the logical key is empty.
    pub fn encode_key(&self, logical_key: &str) -> CacheResult<String> {
        if logical_key.is_empty() {
            return Err(CacheError::InvalidKey(
                "logical key must not be empty".to_string(),
            ));
        }

        Ok(format!("{}{}", self.namespace, logical_key))
    }

    /// Serializes a value to its wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Encode`] if the value cannot be serialized
    /// (e.g. a map with non-string keys).
    pub fn encode_value<T: Serialize>(&self, value: &T) -> CacheResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(CacheError::Encode)
    }

    /// Deserializes stored bytes back into a value.
    ///
    /// `key` is the namespaced key the bytes were read from; it is included
    /// in the error so corrupt entries can be located.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Decode`] on malformed input.
    pub fn decode_value<T: DeserializeOwned>(&self, bytes: &[u8], key: &str) -> CacheResult<T> {
        serde_json::from_slice(bytes).map_err(|source| CacheError::Decode {
            key: key.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Session {
        user_id: u64,
        token: String,
        scopes: Vec<String>,
    }

    #[test]
    fn test_encode_key_applies_namespace() {
        let codec = KeyCodec::new("cache:");

        assert_eq!(codec.encode_key("user:42").unwrap(), "cache:user:42");
    }

    #[test]
    fn test_encode_key_rejects_empty() {
        let codec = KeyCodec::new("cache:");

        assert!(matches!(
            codec.encode_key(""),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_distinct_keys_stay_distinct() {
        let codec = KeyCodec::new("cache:");

        assert_ne!(
            codec.encode_key("user:1").unwrap(),
            codec.encode_key("user:2").unwrap()
        );
    }

    #[test]
    fn test_namespace_isolation() {
        let a = KeyCodec::new("tenant-a:");
        let b = KeyCodec::new("tenant-b:");

        assert_ne!(
            a.encode_key("session").unwrap(),
            b.encode_key("session").unwrap()
        );
    }

    #[test]
    fn test_value_round_trip() {
        let codec = KeyCodec::new("cache:");
        let value = Session {
            user_id: 42,
            token: "abc123".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
        };

        let bytes = codec.encode_value(&value).unwrap();
        let decoded: Session = codec.decode_value(&bytes, "cache:session").unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn test_scalar_round_trip() {
        let codec = KeyCodec::new("cache:");

        let bytes = codec.encode_value(&12345u64).unwrap();
        let decoded: u64 = codec.decode_value(&bytes, "cache:counter").unwrap();
        assert_eq!(decoded, 12345);

        let bytes = codec.encode_value(&"plain string").unwrap();
        let decoded: String = codec.decode_value(&bytes, "cache:s").unwrap();
        assert_eq!(decoded, "plain string");
    }

    #[test]
    fn test_decode_malformed_bytes_fails() {
        let codec = KeyCodec::new("cache:");

        let result: CacheResult<Session> = codec.decode_value(b"not json at all", "cache:bad");

        match result {
            Err(CacheError::Decode { key, .. }) => assert_eq!(key, "cache:bad"),
            other => panic!("expected Decode error, got {:?}", other),
        }
    }
}
