//! Crypto core of a multi-tenant secret store: a capability-dispatched
//! plugin registry, a per-tenant KEK lifecycle with one-time binding, and a
//! content normalization pipeline guaranteeing byte-exact round trips over
//! text transports.

pub mod config;
pub mod errors;
pub mod kek;
pub mod normalize;
pub mod plugin;
pub mod registry;
pub mod store;
pub mod types;

pub use config::SimpleCryptoConfig;
pub use errors::{Error, Result};
pub use kek::find_or_create_kek;
pub use plugin::simple::SimpleCryptoPlugin;
pub use plugin::{
    AsymmetricResponse, Capability, CryptoPlugin, DecryptDto, EncryptDto, GenerateDto, KekMeta,
    ResponseDto,
};
pub use registry::{AsymmetricDatums, CryptoRegistry};
pub use store::{DatumRepository, KekRepository, MemoryDatumStore, MemoryKekStore};
pub use types::{EncryptedDatum, KekDatum, Secret, Tenant};
