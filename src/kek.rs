//! Per-tenant KEK lifecycle: row creation and one-time binding.
//!
//! A row moves Unbound → Bound exactly once and is terminal once bound.
//! Rotation happens outside this module: `active` only selects the row new
//! encryptions use, while decryption always follows the datum's own KEK
//! reference.

use tracing::info;

use crate::errors::{Error, Result};
use crate::plugin::{CryptoPlugin, KekMeta};
use crate::store::KekRepository;
use crate::types::{KekDatum, Tenant};

/// Resolve the active KEK row for (tenant, plugin), creating and binding
/// one when absent.
///
/// Lookup and creation are two separate repository calls, not an atomic
/// upsert. Two concurrent first requests for a brand-new (tenant, plugin)
/// pair can both attempt the create; the storage layer's uniqueness
/// constraint is expected to reject one, and that error propagates
/// unmodified. Likewise, if `save` fails after a successful
/// `bind_kek_metadata` call the error surfaces as-is: callers must not
/// assume the row stayed unbound, since plugin-side key material may
/// already exist.
pub fn find_or_create_kek(
    repo: &dyn KekRepository,
    tenant: &Tenant,
    plugin: &dyn CryptoPlugin,
) -> Result<KekDatum> {
    let row = match repo.get_active(&tenant.id, plugin.identity())? {
        Some(row) => row,
        None => {
            let row = KekDatum::unbound(tenant, plugin.identity());
            info!(
                tenant = %tenant.external_id,
                plugin = plugin.identity(),
                label = %row.label,
                "created KEK row"
            );
            repo.create(row.clone())?;
            row
        }
    };

    bind_if_needed(repo, row, plugin)
}

/// Run the one-time binding handshake when the row is still unbound.
///
/// Already-bound rows return untouched without invoking the plugin, which
/// makes the whole resolve path idempotent from the caller's view.
fn bind_if_needed(
    repo: &dyn KekRepository,
    mut row: KekDatum,
    plugin: &dyn CryptoPlugin,
) -> Result<KekDatum> {
    if row.bind_completed {
        return Ok(row);
    }

    let placeholder = KekMeta::placeholder(row.plugin_identity.as_str(), row.label.as_str());
    let bound = plugin
        .bind_kek_metadata(placeholder)?
        .ok_or_else(|| Error::KekBinding {
            label: row.label.clone(),
        })?;

    row.algorithm = bound.algorithm;
    row.bit_length = bound.bit_length;
    row.mode = bound.mode;
    row.plugin_meta = bound.plugin_meta;
    row.bind_completed = true;
    repo.save(row.clone())?;
    info!(label = %row.label, plugin = %row.plugin_identity, "KEK binding completed");

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{
        AsymmetricResponse, Capability, DecryptDto, EncryptDto, GenerateDto, ResponseDto,
    };
    use crate::store::MemoryKekStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Plugin double that counts binding calls and can refuse to bind.
    #[derive(Default)]
    struct CountingPlugin {
        bind_calls: AtomicUsize,
        refuse_bind: bool,
    }

    impl CryptoPlugin for CountingPlugin {
        fn identity(&self) -> &str {
            "counting"
        }
        fn supports(&self, _capability: Capability, _spec: Option<&GenerateDto>) -> bool {
            true
        }
        fn encrypt(
            &self,
            dto: &EncryptDto,
            _kek_meta: &KekMeta,
            _tenant_external: &str,
        ) -> Result<ResponseDto> {
            Ok(ResponseDto::new(dto.plaintext.clone()))
        }
        fn decrypt(
            &self,
            dto: &DecryptDto,
            _kek_meta: &KekMeta,
            _kek_meta_extended: Option<&str>,
            _tenant_external: &str,
        ) -> Result<Vec<u8>> {
            Ok(dto.ciphertext.clone())
        }
        fn bind_kek_metadata(&self, mut placeholder: KekMeta) -> Result<Option<KekMeta>> {
            self.bind_calls.fetch_add(1, Ordering::SeqCst);
            if self.refuse_bind {
                return Ok(None);
            }
            placeholder.algorithm = Some("noop".into());
            placeholder.bit_length = Some(0);
            placeholder.mode = Some("none".into());
            Ok(Some(placeholder))
        }
        fn generate_symmetric(
            &self,
            _spec: &GenerateDto,
            _kek_meta: &KekMeta,
            _tenant_external: &str,
        ) -> Result<ResponseDto> {
            Ok(ResponseDto::new(Vec::new()))
        }
        fn generate_asymmetric(
            &self,
            _spec: &GenerateDto,
            _kek_meta: &KekMeta,
            _tenant_external: &str,
        ) -> Result<AsymmetricResponse> {
            Ok(AsymmetricResponse {
                private_key: ResponseDto::new(Vec::new()),
                public_key: ResponseDto::new(Vec::new()),
                passphrase: None,
            })
        }
    }

    #[test]
    fn binding_happens_exactly_once() {
        let store = MemoryKekStore::new();
        let tenant = Tenant::new("t1", "acme");
        let plugin = CountingPlugin::default();

        let first = find_or_create_kek(&store, &tenant, &plugin).unwrap();
        assert!(first.bind_completed);
        assert_eq!(first.algorithm.as_deref(), Some("noop"));
        assert_eq!(plugin.bind_calls.load(Ordering::SeqCst), 1);

        let second = find_or_create_kek(&store, &tenant, &plugin).unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(plugin.bind_calls.load(Ordering::SeqCst), 1, "rebind attempted");
    }

    #[test]
    fn empty_bind_result_is_fatal() {
        let store = MemoryKekStore::new();
        let tenant = Tenant::new("t1", "acme");
        let plugin = CountingPlugin {
            refuse_bind: true,
            ..Default::default()
        };

        let err = find_or_create_kek(&store, &tenant, &plugin).unwrap_err();
        assert!(matches!(err, Error::KekBinding { .. }));
    }

    #[test]
    fn distinct_tenants_get_distinct_rows() {
        let store = MemoryKekStore::new();
        let plugin = CountingPlugin::default();

        let a = find_or_create_kek(&store, &Tenant::new("t1", "acme"), &plugin).unwrap();
        let b = find_or_create_kek(&store, &Tenant::new("t2", "globex"), &plugin).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(plugin.bind_calls.load(Ordering::SeqCst), 2);
    }
}
