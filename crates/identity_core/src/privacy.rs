//! Pseudonymous fingerprints for log output
//!
//! Identifiers are personal data, so they never reach the logs. Spans carry a
//! short salted SHA-256 fingerprint instead, which is stable for one salt and
//! lets log lines of the same seed be correlated.

use crate::config::{ConfigError, PrivacyConfig};
use sha2::{Digest, Sha256};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use tracing::debug;

/// Number of hex characters kept from the salted digest
const FINGERPRINT_LEN: usize = 8;

/// Salted hashing of identifiers
#[derive(Clone)]
pub struct PrivacyProcessor {
    salt: Vec<u8>,
}

impl PrivacyProcessor {
    pub fn new(salt: Vec<u8>) -> Self {
        debug!("Privacy processor initialized with {}-byte salt", salt.len());
        Self { salt }
    }

    /// Use the configured hex salt, or a random per-process one when unset
    pub fn from_config(config: &PrivacyConfig) -> Result<Self, ConfigError> {
        match &config.salt {
            Some(salt) => {
                let bytes = hex::decode(salt).map_err(|e| ConfigError::Invalid {
                    field: "privacy.salt".to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Self::new(bytes))
            }
            None => Ok(Self::with_random_salt()),
        }
    }

    /// Salt drawn from the process' random hasher keys
    ///
    /// Fingerprints are not comparable across restarts.
    pub fn with_random_salt() -> Self {
        let mut salt = Vec::with_capacity(32);
        while salt.len() < 32 {
            let mut hasher = RandomState::new().build_hasher();
            hasher.write_usize(salt.len());
            salt.extend_from_slice(&hasher.finish().to_be_bytes());
        }
        Self::new(salt)
    }

    /// Hex-encoded SHA-256 of the salted, lower-cased value
    pub fn hash(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.salt);
        hasher.update(value.trim().to_lowercase().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Short form of [`hash`](Self::hash) used in spans
    pub fn fingerprint(&self, value: &str) -> String {
        let mut hash = self.hash(value);
        hash.truncate(FINGERPRINT_LEN);
        hash
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}
