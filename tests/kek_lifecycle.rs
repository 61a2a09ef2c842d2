use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use keywarden_core::{
    AsymmetricResponse, Capability, CryptoPlugin, CryptoRegistry, DecryptDto, EncryptDto,
    GenerateDto, KekMeta, KekRepository, MemoryKekStore, ResponseDto, Result, SimpleCryptoConfig,
    Tenant,
};

/// XOR plugin double with a binding-call counter.
struct XorPlugin {
    identity: String,
    bind_calls: Arc<AtomicUsize>,
}

impl XorPlugin {
    fn new(identity: &str) -> (Self, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        (
            Self {
                identity: identity.to_string(),
                bind_calls: counter.clone(),
            },
            counter,
        )
    }
}

impl CryptoPlugin for XorPlugin {
    fn identity(&self) -> &str {
        &self.identity
    }
    fn supports(&self, _capability: Capability, _spec: Option<&GenerateDto>) -> bool {
        true
    }
    fn encrypt(&self, dto: &EncryptDto, _: &KekMeta, _: &str) -> Result<ResponseDto> {
        Ok(ResponseDto::new(dto.plaintext.iter().map(|b| b ^ 0x55).collect()))
    }
    fn decrypt(&self, dto: &DecryptDto, _: &KekMeta, _: Option<&str>, _: &str) -> Result<Vec<u8>> {
        Ok(dto.ciphertext.iter().map(|b| b ^ 0x55).collect())
    }
    fn bind_kek_metadata(&self, mut placeholder: KekMeta) -> Result<Option<KekMeta>> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        placeholder.algorithm = Some("xor".into());
        placeholder.bit_length = Some(8);
        placeholder.mode = Some("stream".into());
        Ok(Some(placeholder))
    }
    fn generate_symmetric(&self, _: &GenerateDto, _: &KekMeta, _: &str) -> Result<ResponseDto> {
        Ok(ResponseDto::new(vec![0u8; 16]))
    }
    fn generate_asymmetric(
        &self,
        _: &GenerateDto,
        _: &KekMeta,
        _: &str,
    ) -> Result<AsymmetricResponse> {
        Ok(AsymmetricResponse {
            private_key: ResponseDto::new(vec![1]),
            public_key: ResponseDto::new(vec![2]),
            passphrase: None,
        })
    }
}

#[test]
fn find_or_create_is_idempotent_and_binds_once() {
    let (plugin, bind_calls) = XorPlugin::new("xor");
    let registry = CryptoRegistry::new(vec![Box::new(plugin)]);
    let store = MemoryKekStore::new();
    let tenant = Tenant::new("t1", "acme");

    let first = registry.find_or_create_kek(&tenant, &store).unwrap();
    assert!(first.bind_completed);
    assert_eq!(first.algorithm.as_deref(), Some("xor"));
    assert!(first.label.starts_with("project-acme-key-"));
    assert_eq!(bind_calls.load(Ordering::SeqCst), 1);

    let second = registry.find_or_create_kek(&tenant, &store).unwrap();
    assert_eq!(second, first);
    assert_eq!(bind_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn per_plugin_identity_rows_are_independent() {
    let (xor_a, _) = XorPlugin::new("xor_a");
    let store = MemoryKekStore::new();
    let tenant = Tenant::new("t1", "acme");

    let registry_a = CryptoRegistry::new(vec![Box::new(xor_a)]);
    let row_a = registry_a.find_or_create_kek(&tenant, &store).unwrap();

    let (xor_b, _) = XorPlugin::new("xor_b");
    let registry_b = CryptoRegistry::new(vec![Box::new(xor_b)]);
    let row_b = registry_b.find_or_create_kek(&tenant, &store).unwrap();

    assert_ne!(row_a.id, row_b.id);
    assert_eq!(row_a.plugin_identity, "xor_a");
    assert_eq!(row_b.plugin_identity, "xor_b");
}

#[test]
fn old_datums_survive_kek_rotation() {
    let registry = CryptoRegistry::with_simple_crypto(&SimpleCryptoConfig::default()).unwrap();
    let store = MemoryKekStore::new();
    let tenant = Tenant::new("t1", "acme");

    let old_datum = registry
        .encrypt(Some("pre-rotation"), "text/plain", None, None, &tenant, &store, true)
        .unwrap();
    let old_row = store.get(&old_datum.kek_id).unwrap();

    // Rotate: retire the active row; the next encrypt creates a fresh one.
    let mut retired = old_row.clone();
    retired.active = false;
    store.save(retired).unwrap();

    let new_datum = registry
        .encrypt(Some("post-rotation"), "text/plain", None, None, &tenant, &store, true)
        .unwrap();
    assert_ne!(new_datum.kek_id, old_datum.kek_id);

    // Decryption follows each datum's recorded KEK row, not the active one.
    let old_plain = registry
        .decrypt("text/plain", &[(old_datum, old_row)], &tenant)
        .unwrap();
    assert_eq!(old_plain, b"pre-rotation");

    let new_row = store.get(&new_datum.kek_id).unwrap();
    let new_plain = registry
        .decrypt("text/plain", &[(new_datum, new_row)], &tenant)
        .unwrap();
    assert_eq!(new_plain, b"post-rotation");
}
