//! Startup configuration (§6), following the teacher's `config` crate
//! pattern: a plain `serde` struct, a `Default` impl, and an explicit
//! `validate()` step rather than a config-format crate.

use nostr_core::is_key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// HTTP path the relay listens on, e.g. `"/"`.
    pub endpoint: String,
    /// Per-connection subscription cap (§3, §4.4). Must be >= 1.
    pub max_sub: usize,
    /// Whether `REQ` backfill ends with an `EOSE` frame (§4.6, §4.8).
    pub enable_eose: bool,

    pub name: Option<String>,
    pub description: Option<String>,
    pub contact: Option<String>,
    /// Operator pubkey for the info document; must pass [`is_key`] (§4.8).
    pub pubkey: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            endpoint: "/".to_string(),
            max_sub: 20,
            enable_eose: true,
            name: None,
            description: None,
            contact: None,
            pubkey: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_sub must be >= 1")]
    MaxSubTooSmall,
    #[error("configured pubkey is not a valid hex key")]
    InvalidPubkey,
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sub < 1 {
            return Err(ConfigError::MaxSubTooSmall);
        }
        if let Some(pubkey) = &self.pubkey {
            if !is_key(pubkey) {
                return Err(ConfigError::InvalidPubkey);
            }
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
