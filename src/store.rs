use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::errors::Result;
use crate::types::{EncryptedDatum, KekDatum};

/// Persistence contract for KEK rows.
///
/// A conforming persistent implementation must enforce a uniqueness
/// constraint over (tenant_id, plugin_identity, active); the lifecycle
/// manager performs look-then-create and relies on storage to reject one
/// of two concurrent first creates.
pub trait KekRepository: Send + Sync {
    /// Fetch the single active row for a (tenant, plugin identity) pair.
    fn get_active(&self, tenant_id: &str, plugin_identity: &str) -> Result<Option<KekDatum>>;

    /// Insert a freshly created row.
    fn create(&self, row: KekDatum) -> Result<()>;

    /// Update an existing row; idempotent.
    fn save(&self, row: KekDatum) -> Result<()>;
}

/// Persistence contract for encrypted datums.
pub trait DatumRepository: Send + Sync {
    /// Insert a new datum row.
    fn create(&self, datum: EncryptedDatum) -> Result<()>;
}

impl<T> KekRepository for Box<T>
where
    T: KekRepository + ?Sized,
{
    fn get_active(&self, tenant_id: &str, plugin_identity: &str) -> Result<Option<KekDatum>> {
        (**self).get_active(tenant_id, plugin_identity)
    }
    fn create(&self, row: KekDatum) -> Result<()> {
        (**self).create(row)
    }
    fn save(&self, row: KekDatum) -> Result<()> {
        (**self).save(row)
    }
}

impl<T> KekRepository for Arc<T>
where
    T: KekRepository + ?Sized,
{
    fn get_active(&self, tenant_id: &str, plugin_identity: &str) -> Result<Option<KekDatum>> {
        (**self).get_active(tenant_id, plugin_identity)
    }
    fn create(&self, row: KekDatum) -> Result<()> {
        (**self).create(row)
    }
    fn save(&self, row: KekDatum) -> Result<()> {
        (**self).save(row)
    }
}

impl<T> DatumRepository for Box<T>
where
    T: DatumRepository + ?Sized,
{
    fn create(&self, datum: EncryptedDatum) -> Result<()> {
        (**self).create(datum)
    }
}

impl<T> DatumRepository for Arc<T>
where
    T: DatumRepository + ?Sized,
{
    fn create(&self, datum: EncryptedDatum) -> Result<()> {
        (**self).create(datum)
    }
}

/// In-memory KEK store suitable for embedded usage and tests.
#[derive(Default)]
pub struct MemoryKekStore {
    rows: Mutex<HashMap<String, KekDatum>>,
}

impl MemoryKekStore {
    /// Construct a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a row by id, regardless of its active flag.
    pub fn get(&self, id: &str) -> Option<KekDatum> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

impl KekRepository for MemoryKekStore {
    fn get_active(&self, tenant_id: &str, plugin_identity: &str) -> Result<Option<KekDatum>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .values()
            .find(|row| {
                row.active && row.tenant_id == tenant_id && row.plugin_identity == plugin_identity
            })
            .cloned())
    }

    fn create(&self, row: KekDatum) -> Result<()> {
        self.rows.lock().unwrap().insert(row.id.clone(), row);
        Ok(())
    }

    fn save(&self, row: KekDatum) -> Result<()> {
        self.rows.lock().unwrap().insert(row.id.clone(), row);
        Ok(())
    }
}

/// In-memory datum store suitable for embedded usage and tests.
#[derive(Default)]
pub struct MemoryDatumStore {
    rows: Mutex<Vec<EncryptedDatum>>,
}

impl MemoryDatumStore {
    /// Construct a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of datums belonging to the given secret.
    pub fn for_secret(&self, secret_id: &str) -> Vec<EncryptedDatum> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|datum| datum.secret_id.as_deref() == Some(secret_id))
            .cloned()
            .collect()
    }

    /// Number of stored datums.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DatumRepository for MemoryDatumStore {
    fn create(&self, datum: EncryptedDatum) -> Result<()> {
        self.rows.lock().unwrap().push(datum);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tenant;

    #[test]
    fn active_lookup_matches_tenant_and_plugin() {
        let store = MemoryKekStore::new();
        let tenant = Tenant::new("t1", "acme");

        let row = KekDatum::unbound(&tenant, "simple_crypto");
        store.create(row.clone()).unwrap();

        let found = store.get_active("t1", "simple_crypto").unwrap();
        assert_eq!(found, Some(row));
        assert!(store.get_active("t1", "hsm").unwrap().is_none());
        assert!(store.get_active("t2", "simple_crypto").unwrap().is_none());
    }

    #[test]
    fn inactive_rows_are_invisible_to_active_lookup() {
        let store = MemoryKekStore::new();
        let tenant = Tenant::new("t1", "acme");

        let mut row = KekDatum::unbound(&tenant, "simple_crypto");
        row.active = false;
        store.create(row).unwrap();

        assert!(store.get_active("t1", "simple_crypto").unwrap().is_none());
    }
}
