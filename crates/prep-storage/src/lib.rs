//! Client-local storage with encryption at rest.
//! Uses AES-GCM under a per-client key kept in the same storage region, with
//! read-side fallback to a legacy key and to plain JSON.

pub mod cipher;
pub mod encrypted_store;
pub mod file_storage;
pub mod key_manager;

pub use encrypted_store::{EncryptedStore, Migration, StoreError, Tier};
pub use file_storage::FileStorage;
pub use key_manager::{KeyError, KeyManager, KeyMaterial, CLIENT_KEY_NAME};
