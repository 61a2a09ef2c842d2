//! Plugin registry: capability dispatch over an ordered, statically
//! configured list of constructed plugin instances. First match wins; there
//! is deliberately no load balancing.

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::config::SimpleCryptoConfig;
use crate::errors::{Error, Result};
use crate::kek;
use crate::normalize;
use crate::plugin::simple::SimpleCryptoPlugin;
use crate::plugin::{Capability, CryptoPlugin, DecryptDto, EncryptDto, GenerateDto, KekMeta};
use crate::store::KekRepository;
use crate::types::{EncryptedDatum, KekDatum, Tenant};

/// Symmetric/asymmetric classification for key-generation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Symmetric,
    Asymmetric,
}

/// Fixed lookup table; anything outside it is rejected.
fn classify_algorithm(algorithm: &str) -> Result<KeyKind> {
    match algorithm.to_ascii_lowercase().as_str() {
        "aes" | "des" | "desede" => Ok(KeyKind::Symmetric),
        "rsa" | "dsa" => Ok(KeyKind::Asymmetric),
        other => Err(Error::AlgorithmNotSupported {
            algorithm: other.to_string(),
        }),
    }
}

/// The three datums produced by asymmetric generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsymmetricDatums {
    pub private_datum: EncryptedDatum,
    pub public_datum: EncryptedDatum,
    pub passphrase_datum: Option<EncryptedDatum>,
}

/// Dispatches encrypt/decrypt/generate operations to the first configured
/// plugin declaring the needed capability.
pub struct CryptoRegistry {
    plugins: Vec<Box<dyn CryptoPlugin>>,
}

impl CryptoRegistry {
    /// Build a registry from an explicit ordered plugin list.
    pub fn new(plugins: Vec<Box<dyn CryptoPlugin>>) -> Self {
        Self { plugins }
    }

    /// Registry holding only the software reference plugin.
    pub fn with_simple_crypto(config: &SimpleCryptoConfig) -> Result<Self> {
        Ok(Self::new(vec![Box::new(SimpleCryptoPlugin::new(config)?)]))
    }

    /// Number of configured plugins.
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    fn select(
        &self,
        capability: Capability,
        spec: Option<&GenerateDto>,
    ) -> Result<&dyn CryptoPlugin> {
        if self.plugins.is_empty() {
            return Err(Error::PluginNotFound);
        }
        let plugin = self
            .plugins
            .iter()
            .find(|plugin| plugin.supports(capability, spec))
            .ok_or(Error::SupportedPluginNotFound)?;
        debug!(plugin = plugin.identity(), ?capability, "selected crypto plugin");
        Ok(plugin.as_ref())
    }

    /// Encrypt a payload for a tenant and assemble the resulting
    /// (unpersisted) datum.
    ///
    /// `enforce_text_only` is set on the single-step inline-payload path,
    /// where octet-stream payloads must arrive base64-encoded.
    #[allow(clippy::too_many_arguments)]
    pub fn encrypt(
        &self,
        payload: Option<&str>,
        content_type: &str,
        content_encoding: Option<&str>,
        secret_id: Option<&str>,
        tenant: &Tenant,
        kek_repo: &dyn KekRepository,
        enforce_text_only: bool,
    ) -> Result<EncryptedDatum> {
        let plugin = self.select(Capability::EncryptDecrypt, None)?;

        let (plaintext, canonical_type) = normalize::normalize_before_encryption(
            payload,
            content_type,
            content_encoding,
            enforce_text_only,
        )?;

        let kek_row = kek::find_or_create_kek(kek_repo, tenant, plugin)?;
        let kek_meta = KekMeta::from_row(&kek_row);

        let response = plugin.encrypt(&EncryptDto { plaintext }, &kek_meta, &tenant.external_id)?;

        Ok(EncryptedDatum::new(
            secret_id.map(str::to_string),
            canonical_type,
            STANDARD.encode(response.ciphertext),
            kek_row.id,
            response.kek_meta_extended,
        ))
    }

    /// Decrypt the first datum whose recorded KEK owner matches a
    /// configured plugin.
    ///
    /// Datums arrive paired with the KEK row each one references. The
    /// plugin-major scan and the `PluginNotFound` outcome for "nothing
    /// matched" both mirror the behaviour existing deployments rely on.
    pub fn decrypt(
        &self,
        accept: &str,
        datums: &[(EncryptedDatum, KekDatum)],
        tenant: &Tenant,
    ) -> Result<Vec<u8>> {
        if datums.is_empty() {
            return Err(Error::NoSecretOrDataFound);
        }
        normalize::analyze_before_decryption(accept)?;

        for plugin in &self.plugins {
            for (datum, kek_row) in datums {
                if plugin.identity() != kek_row.plugin_identity {
                    continue;
                }

                let ciphertext =
                    STANDARD.decode(&datum.ciphertext).map_err(|err| Error::General {
                        detail: format!("stored ciphertext is not valid base64: {err}"),
                    })?;
                let kek_meta = KekMeta::from_row(kek_row);
                let plaintext = plugin.decrypt(
                    &DecryptDto { ciphertext },
                    &kek_meta,
                    datum.kek_meta_extended.as_deref(),
                    &tenant.external_id,
                )?;
                return normalize::denormalize_after_decryption(plaintext, &datum.content_type);
            }
        }

        Err(Error::PluginNotFound)
    }

    /// Generate fresh symmetric key material, returned encrypted in a new
    /// datum.
    pub fn generate_symmetric(
        &self,
        spec: &GenerateDto,
        content_type: &str,
        tenant: &Tenant,
        kek_repo: &dyn KekRepository,
    ) -> Result<EncryptedDatum> {
        if classify_algorithm(&spec.algorithm)? != KeyKind::Symmetric {
            return Err(Error::AlgorithmNotSupported {
                algorithm: spec.algorithm.clone(),
            });
        }

        let canonical_type = normalize::canonicalize_content_type(content_type)?;
        let plugin = self.select(Capability::SymmetricKeyGeneration, Some(spec))?;
        let kek_row = kek::find_or_create_kek(kek_repo, tenant, plugin)?;
        let kek_meta = KekMeta::from_row(&kek_row);

        let response = plugin.generate_symmetric(spec, &kek_meta, &tenant.external_id)?;

        Ok(EncryptedDatum::new(
            None,
            canonical_type,
            STANDARD.encode(response.ciphertext),
            kek_row.id,
            response.kek_meta_extended,
        ))
    }

    /// Generate an asymmetric key pair; up to three independently encoded
    /// datums (private key, public key, optional passphrase).
    pub fn generate_asymmetric(
        &self,
        spec: &GenerateDto,
        content_type: &str,
        tenant: &Tenant,
        kek_repo: &dyn KekRepository,
    ) -> Result<AsymmetricDatums> {
        if classify_algorithm(&spec.algorithm)? != KeyKind::Asymmetric {
            return Err(Error::AlgorithmNotSupported {
                algorithm: spec.algorithm.clone(),
            });
        }

        let canonical_type = normalize::canonicalize_content_type(content_type)?;
        let plugin = self.select(Capability::AsymmetricKeyGeneration, Some(spec))?;
        let kek_row = kek::find_or_create_kek(kek_repo, tenant, plugin)?;
        let kek_meta = KekMeta::from_row(&kek_row);

        let response = plugin.generate_asymmetric(spec, &kek_meta, &tenant.external_id)?;

        let datum = |dto: crate::plugin::ResponseDto| {
            EncryptedDatum::new(
                None,
                canonical_type.clone(),
                STANDARD.encode(dto.ciphertext),
                kek_row.id.clone(),
                dto.kek_meta_extended,
            )
        };

        Ok(AsymmetricDatums {
            private_datum: datum(response.private_key),
            public_datum: datum(response.public_key),
            passphrase_datum: response.passphrase.map(datum),
        })
    }

    /// Resolve (and bind, when new) the tenant's KEK row for the plugin
    /// that would handle encryption. Composition glue for the
    /// orchestration layer.
    pub fn find_or_create_kek(
        &self,
        tenant: &Tenant,
        kek_repo: &dyn KekRepository,
    ) -> Result<KekDatum> {
        let plugin = self.select(Capability::EncryptDecrypt, None)?;
        kek::find_or_create_kek(kek_repo, tenant, plugin)
    }
}
