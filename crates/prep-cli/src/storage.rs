use std::{path::PathBuf, sync::Arc};

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
#[cfg(test)]
use prep_core::storage::InMemoryStorage;
use prep_storage::{EncryptedStore, FileStorage};
use tracing::debug;

pub type LocalStore = EncryptedStore<FileStorage>;

/// Resolve the default data directory for Prep.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("prep"))
}

/// Build the encrypted store, honoring the config's data directory override.
pub fn store_from_config(config: &Config) -> Result<Arc<LocalStore>> {
    let root = match &config.data_dir {
        Some(root) => {
            debug!(?root, "initializing encrypted store (config override)");
            root.clone()
        }
        None => {
            let root = default_data_dir()?;
            debug!(?root, "initializing encrypted store");
            root
        }
    };

    Ok(Arc::new(EncryptedStore::new(
        FileStorage::new(root),
        config.legacy_key_seed(),
    )))
}

/// Helper for tests to construct a store over in-memory storage.
#[cfg(test)]
pub fn test_store() -> Arc<EncryptedStore<InMemoryStorage>> {
    Arc::new(EncryptedStore::new(
        InMemoryStorage::new(),
        crate::config::DEFAULT_LEGACY_KEY_SEED,
    ))
}
