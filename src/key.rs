//! Key derivation for remote backends.

use crate::error::{Error, Result};
use serde::Serialize;

/// Builds namespaced, hashed keys from arbitrary parameter values.
///
/// Format: `"{prefix}:{hex}"`, where `hex` is the BLAKE3 digest of the
/// parameter's postcard encoding. Equal parameters always map to the same
/// key across processes, which is what lets several processes share one
/// remote cache.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// # Errors
    /// Returns `Error::SerializationError` if the parameter cannot be encoded.
    pub fn build<K: Serialize>(prefix: &str, params: &K) -> Result<String> {
        let encoded =
            postcard::to_allocvec(params).map_err(|e| Error::SerializationError(e.to_string()))?;
        let digest = blake3::hash(&encoded);
        Ok(format!("{}:{}", prefix, digest.to_hex()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable() {
        let a = CacheKeyBuilder::build("users", &42u64).expect("Failed to build key");
        let b = CacheKeyBuilder::build("users", &42u64).expect("Failed to build key");
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = CacheKeyBuilder::build("users", &"alice").expect("Failed to build key");
        let (prefix, hash) = key.split_once(':').expect("missing separator");
        assert_eq!(prefix, "users");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_params_and_prefixes() {
        let a = CacheKeyBuilder::build("users", &1u32).expect("Failed to build key");
        let b = CacheKeyBuilder::build("users", &2u32).expect("Failed to build key");
        let c = CacheKeyBuilder::build("orders", &1u32).expect("Failed to build key");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_tuple_params() {
        let key = CacheKeyBuilder::build("pair", &("a", 1u8)).expect("Failed to build key");
        assert!(key.starts_with("pair:"));
    }
}
