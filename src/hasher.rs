//! Reproducibility fingerprints for export configurations
//!
//! The fingerprint is a DJB2-style rolling hash over the UTF-16 code units of
//! the canonical encoding, computed with wrapping 32-bit unsigned arithmetic.
//! It identifies configurations for debugging and cache keys only and must not
//! be used for anything security related: collisions are easy to construct.

use serde::Serialize;
use serde_json::Value;
use crate::canonical;
use crate::error::SerializationError;
use crate::types::ConfigHash;

/// Initial accumulator value
pub const HASH_SEED: u32 = 5381;

/// ConfigHasher computes reproducibility fingerprints for configurations
#[derive(Debug, Clone, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint an already canonical string
    pub fn hash_canonical(&self, canonical: &str) -> ConfigHash {
        let acc = canonical
            .encode_utf16()
            .fold(HASH_SEED, |acc, unit| acc.wrapping_mul(33) ^ u32::from(unit));
        ConfigHash(acc)
    }

    /// Fingerprint a JSON value, independent of key insertion order
    pub fn hash_value(&self, value: &Value) -> ConfigHash {
        self.hash_canonical(&canonical::encode(value))
    }

    /// Fingerprint any serializable configuration
    ///
    /// # Errors
    /// Returns an error when the value has no JSON representation.
    pub fn hash<T: Serialize + ?Sized>(&self, value: &T) -> Result<ConfigHash, SerializationError> {
        Ok(self.hash_canonical(&canonical::encode_serializable(value)?))
    }
}

/// Shorthand for `ConfigHasher::new().hash_value(value)`
pub fn config_hash(value: &Value) -> ConfigHash {
    ConfigHasher::new().hash_value(value)
}
