use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Environment variable holding the base64 KEK for the software plugin.
const SIMPLE_KEK_ENV: &str = "KEYWARDEN_SIMPLE_KEK";
/// Environment variable overriding the software plugin identity string.
const SIMPLE_IDENTITY_ENV: &str = "KEYWARDEN_SIMPLE_IDENTITY";

/// Development-only default key. Any real deployment must configure its own.
const DEV_KEK_B64: &str = "c2l4dGVlbl9ieXRlX2tleQ==";

/// Configuration for the software reference plugin.
///
/// Replaces the original process-wide configuration singleton with an
/// explicit struct passed into the plugin constructor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleCryptoConfig {
    /// Stable identity string recorded on KEK rows produced by this plugin.
    pub identity: String,
    /// Base64 of the 16-byte AES-128 key protecting all tenant payloads.
    pub kek: String,
}

impl Default for SimpleCryptoConfig {
    fn default() -> Self {
        Self {
            identity: "simple_crypto".to_string(),
            kek: DEV_KEK_B64.to_string(),
        }
    }
}

impl SimpleCryptoConfig {
    /// Build a config from the environment, falling back to the dev default
    /// key when `KEYWARDEN_SIMPLE_KEK` is unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(kek) = std::env::var(SIMPLE_KEK_ENV) {
            if !kek.trim().is_empty() {
                config.kek = kek;
            }
        }

        if let Ok(identity) = std::env::var(SIMPLE_IDENTITY_ENV) {
            if !identity.trim().is_empty() {
                config.identity = identity;
            }
        }

        config
    }

    /// Decode and validate the configured key material.
    pub(crate) fn key_bytes(&self) -> Result<[u8; 16]> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let decoded = STANDARD.decode(self.kek.trim()).map_err(|err| Error::Crypto {
            detail: format!("configured KEK is not valid base64: {err}"),
        })?;
        decoded.as_slice().try_into().map_err(|_| Error::Crypto {
            detail: format!("configured KEK must be 16 bytes, got {}", decoded.len()),
        })
    }
}
