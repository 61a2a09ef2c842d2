//! The contract every cryptographic backend implements.
//!
//! Plugins exchange only byte buffers and value objects; they never persist
//! anything themselves. That separation lets software and HSM-backed
//! implementations share one registry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::KekDatum;

pub mod simple;

/// Operations a plugin may declare support for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    EncryptDecrypt,
    SymmetricKeyGeneration,
    AsymmetricKeyGeneration,
}

/// Plaintext handed to a plugin for encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptDto {
    pub plaintext: Vec<u8>,
}

/// Ciphertext handed to a plugin for decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptDto {
    pub ciphertext: Vec<u8>,
}

/// Key-generation request parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateDto {
    pub algorithm: String,
    pub bit_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl GenerateDto {
    /// Construct a request for the given algorithm and size.
    pub fn new(algorithm: impl Into<String>, bit_length: u32) -> Self {
        let algorithm: String = algorithm.into();
        Self {
            algorithm: algorithm.to_ascii_lowercase(),
            bit_length,
            mode: None,
            passphrase: None,
        }
    }

    /// Attach a cipher mode.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Attach a passphrase for private-key protection.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }
}

/// Projection of a KEK row exposed across the plugin boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KekMeta {
    pub plugin_identity: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_meta: Option<String>,
}

impl KekMeta {
    /// Placeholder handed to `bind_kek_metadata`, carrying only the label
    /// and owning plugin identity.
    pub fn placeholder(plugin_identity: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            plugin_identity: plugin_identity.into(),
            label: label.into(),
            algorithm: None,
            bit_length: None,
            mode: None,
            plugin_meta: None,
        }
    }

    /// Project the plugin-visible fields of a stored KEK row.
    pub fn from_row(row: &KekDatum) -> Self {
        Self {
            plugin_identity: row.plugin_identity.clone(),
            label: row.label.clone(),
            algorithm: row.algorithm.clone(),
            bit_length: row.bit_length,
            mode: row.mode.clone(),
            plugin_meta: row.plugin_meta.clone(),
        }
    }
}

/// Ciphertext bytes paired with optional per-datum extended metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDto {
    pub ciphertext: Vec<u8>,
    pub kek_meta_extended: Option<String>,
}

impl ResponseDto {
    /// Response with no extended metadata.
    pub fn new(ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext,
            kek_meta_extended: None,
        }
    }
}

/// Key pair produced by asymmetric generation, each part already encrypted
/// by the plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsymmetricResponse {
    pub private_key: ResponseDto,
    pub public_key: ResponseDto,
    /// Present when the request carried a passphrase; the plugin's own
    /// encryption of that passphrase.
    pub passphrase: Option<ResponseDto>,
}

/// Contract implemented by every cryptographic backend.
///
/// `supports` must be callable before any other method and must have no
/// side effects. Implementations are invoked concurrently across tenants
/// and must hold no mutable per-call state.
pub trait CryptoPlugin: Send + Sync {
    /// Stable configured identity recorded on KEK rows this plugin binds.
    fn identity(&self) -> &str;

    /// Whether this plugin can perform the capability, optionally for the
    /// given key-generation parameters.
    fn supports(&self, capability: Capability, spec: Option<&GenerateDto>) -> bool;

    /// Encrypt plaintext under the KEK described by `kek_meta`.
    fn encrypt(
        &self,
        dto: &EncryptDto,
        kek_meta: &KekMeta,
        tenant_external: &str,
    ) -> Result<ResponseDto>;

    /// Decrypt ciphertext produced by an earlier `encrypt` or generate call.
    fn decrypt(
        &self,
        dto: &DecryptDto,
        kek_meta: &KekMeta,
        kek_meta_extended: Option<&str>,
        tenant_external: &str,
    ) -> Result<Vec<u8>>;

    /// Establish key material for a new KEK row.
    ///
    /// Called at most once per row, with a placeholder carrying only label
    /// and identity. Returning `None` signals that the plugin failed to
    /// establish its own key material and is fatal for the row.
    fn bind_kek_metadata(&self, placeholder: KekMeta) -> Result<Option<KekMeta>>;

    /// Generate fresh symmetric key material and return it encrypted under
    /// the KEK.
    fn generate_symmetric(
        &self,
        spec: &GenerateDto,
        kek_meta: &KekMeta,
        tenant_external: &str,
    ) -> Result<ResponseDto>;

    /// Generate an asymmetric key pair, each part encrypted under the KEK.
    fn generate_asymmetric(
        &self,
        spec: &GenerateDto,
        kek_meta: &KekMeta,
        tenant_external: &str,
    ) -> Result<AsymmetricResponse>;
}

impl core::fmt::Debug for dyn CryptoPlugin + '_ {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CryptoPlugin")
            .field("identity", &self.identity())
            .finish()
    }
}

macro_rules! forward_crypto_plugin {
    ($wrapper:ident) => {
        impl<T> CryptoPlugin for $wrapper<T>
        where
            T: CryptoPlugin + ?Sized,
        {
            fn identity(&self) -> &str {
                (**self).identity()
            }
            fn supports(&self, capability: Capability, spec: Option<&GenerateDto>) -> bool {
                (**self).supports(capability, spec)
            }
            fn encrypt(
                &self,
                dto: &EncryptDto,
                kek_meta: &KekMeta,
                tenant_external: &str,
            ) -> Result<ResponseDto> {
                (**self).encrypt(dto, kek_meta, tenant_external)
            }
            fn decrypt(
                &self,
                dto: &DecryptDto,
                kek_meta: &KekMeta,
                kek_meta_extended: Option<&str>,
                tenant_external: &str,
            ) -> Result<Vec<u8>> {
                (**self).decrypt(dto, kek_meta, kek_meta_extended, tenant_external)
            }
            fn bind_kek_metadata(&self, placeholder: KekMeta) -> Result<Option<KekMeta>> {
                (**self).bind_kek_metadata(placeholder)
            }
            fn generate_symmetric(
                &self,
                spec: &GenerateDto,
                kek_meta: &KekMeta,
                tenant_external: &str,
            ) -> Result<ResponseDto> {
                (**self).generate_symmetric(spec, kek_meta, tenant_external)
            }
            fn generate_asymmetric(
                &self,
                spec: &GenerateDto,
                kek_meta: &KekMeta,
                tenant_external: &str,
            ) -> Result<AsymmetricResponse> {
                (**self).generate_asymmetric(spec, kek_meta, tenant_external)
            }
        }
    };
}

forward_crypto_plugin!(Box);
forward_crypto_plugin!(Arc);
