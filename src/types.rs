use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Isolation boundary for all secrets and KEKs.
///
/// Carries an opaque internal id plus the external identity string used to
/// derive human-traceable KEK labels. Addressing key only; never mutated
/// by this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tenant {
    pub id: String,
    pub external_id: String,
}

impl Tenant {
    /// Construct a tenant reference.
    pub fn new(id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
        }
    }
}

/// Tenant-owned logical resource. A secret may own zero datums
/// (metadata-only), one, or several accumulated across rotations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Secret {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Secret {
    /// Construct a secret shell with a fresh id.
    pub fn new(name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
        }
    }
}

/// One stored ciphertext. Created once per successful encrypt or generate
/// call and never mutated afterwards; the ciphertext is persisted as
/// base64 text so it survives text-based transports and storage bit-for-bit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedDatum {
    pub id: String,
    /// Owning secret; absent while generation flows assemble datums before
    /// the secret row exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_id: Option<String>,
    /// Canonical content type recorded at encryption time.
    pub content_type: String,
    /// Base64 text of the plugin-produced ciphertext.
    pub ciphertext: String,
    /// The exact KEK row active when this datum was created. Decryption
    /// follows this reference, so rotation never strands old datums.
    pub kek_id: String,
    /// Opaque per-datum metadata returned by the plugin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kek_meta_extended: Option<String>,
}

impl EncryptedDatum {
    /// Assemble a new (unpersisted) datum.
    pub fn new(
        secret_id: Option<String>,
        content_type: impl Into<String>,
        ciphertext: String,
        kek_id: impl Into<String>,
        kek_meta_extended: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            secret_id,
            content_type: content_type.into(),
            ciphertext,
            kek_id: kek_id.into(),
            kek_meta_extended,
        }
    }
}

/// One key-encryption-key row per (tenant, plugin identity).
///
/// Invariants: at most one row with `active == true` per
/// (tenant, plugin identity); `bind_completed` transitions false→true
/// exactly once and never reverts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KekDatum {
    pub id: String,
    pub tenant_id: String,
    /// Stable configured identity of the owning plugin, recorded here and
    /// matched against at decrypt time.
    pub plugin_identity: String,
    /// Unique human-traceable label handed to the plugin during binding.
    pub label: String,
    /// Whether new encryptions for this (tenant, plugin) pair use this row.
    pub active: bool,
    /// Set once the plugin has reported concrete key parameters.
    pub bind_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Opaque plugin blob, e.g. a wrapped key or an HSM handle reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_meta: Option<String>,
}

impl KekDatum {
    /// Create an unbound active row for a (tenant, plugin) pair.
    pub fn unbound(tenant: &Tenant, plugin_identity: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.id.clone(),
            plugin_identity: plugin_identity.into(),
            label: derive_kek_label(&tenant.external_id),
            active: true,
            bind_completed: false,
            algorithm: None,
            bit_length: None,
            mode: None,
            plugin_meta: None,
        }
    }
}

/// Derive a unique KEK label from the tenant's external identity.
pub(crate) fn derive_kek_label(external_id: &str) -> String {
    format!("project-{external_id}-key-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kek_labels_are_traceable_and_unique() {
        let tenant = Tenant::new("t1", "acme");
        let a = KekDatum::unbound(&tenant, "simple_crypto");
        let b = KekDatum::unbound(&tenant, "simple_crypto");
        assert!(a.label.starts_with("project-acme-key-"));
        assert_ne!(a.label, b.label);
        assert!(a.active);
        assert!(!a.bind_completed);
    }

    #[test]
    fn serde_round_trip_rows() {
        let tenant = Tenant::new("t1", "acme");
        let kek = KekDatum::unbound(&tenant, "simple_crypto");
        let datum = EncryptedDatum::new(
            Some("s1".into()),
            "text/plain",
            "aGVsbG8=".into(),
            kek.id.clone(),
            None,
        );

        let kek_json = serde_json::to_string(&kek).unwrap();
        let datum_json = serde_json::to_string(&datum).unwrap();
        let kek_back: KekDatum = serde_json::from_str(&kek_json).unwrap();
        let datum_back: EncryptedDatum = serde_json::from_str(&datum_json).unwrap();

        assert_eq!(kek, kek_back);
        assert_eq!(datum, datum_back);
    }
}
