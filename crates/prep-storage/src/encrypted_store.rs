use prep_core::storage::{LocalStorage, StorageError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    cipher::{self, CipherError},
    key_manager::{legacy_key, KeyError, KeyManager, KeyMaterial, CLIENT_KEY_NAME},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key unavailable: {0}")]
    Key(#[from] KeyError),
    #[error("serialize failed: {reason}")]
    Serialize { reason: String },
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{name} is reserved for the client key")]
    ReservedName { name: String },
}

/// Decryption strategy that produced a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    ClientKey,
    LegacyKey,
    PlainJson,
}

impl Tier {
    /// Order in which reads try each strategy.
    pub const ORDER: [Tier; 3] = [Tier::ClientKey, Tier::LegacyKey, Tier::PlainJson];
}

/// Result of [`EncryptedStore::migrate_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    Missing,
    /// Already encrypted under the client key.
    Current,
    /// Re-encrypted under the client key; holds the tier it was read through.
    Upgraded(Tier),
    /// No strategy could read the entry; left untouched.
    Unreadable,
}

/// JSON values encrypted at rest in a `LocalStorage` region.
///
/// Writes always use the client key. Reads try the client key, then the
/// legacy key, then plain JSON, and yield `None` rather than an error when
/// nothing works. Callers own retention: the store never truncates.
#[derive(Debug, Clone)]
pub struct EncryptedStore<S> {
    storage: S,
    keys: KeyManager<S>,
    legacy: KeyMaterial,
}

impl<S: LocalStorage + Clone> EncryptedStore<S> {
    /// `legacy_seed` is the public configuration value the legacy key was derived from.
    pub fn new(storage: S, legacy_seed: &str) -> Self {
        Self {
            keys: KeyManager::new(storage.clone()),
            storage,
            legacy: legacy_key(legacy_seed),
        }
    }

    pub fn key_manager(&self) -> &KeyManager<S> {
        &self.keys
    }

    /// Serialize `value` and seal it under the client key.
    pub fn encrypt<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, StoreError> {
        let json = serde_json::to_vec(value).map_err(|e| StoreError::Serialize {
            reason: e.to_string(),
        })?;
        let key = self.keys.storage_key()?;
        Ok(cipher::seal(&key, &json)?)
    }

    /// Decode a stored string into `T`, or `None` if no strategy can read it.
    pub fn decrypt<T: DeserializeOwned>(&self, raw: &str) -> Option<T> {
        let (value, _) = self.decrypt_with_tier(raw)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                debug!(%err, "stored value does not match requested type");
                None
            }
        }
    }

    /// Run the strategies in [`Tier::ORDER`]; the first one that yields JSON wins.
    pub fn decrypt_with_tier(&self, raw: &str) -> Option<(Value, Tier)> {
        let client = self.keys.current();
        Tier::ORDER.into_iter().find_map(|tier| {
            let attempt = match tier {
                Tier::ClientKey => client.as_ref().and_then(|key| open_json(key, raw)),
                Tier::LegacyKey => open_json(&self.legacy, raw),
                Tier::PlainJson => serde_json::from_str(raw).ok(),
            };
            if attempt.is_none() {
                trace!(?tier, "decrypt strategy failed");
            }
            attempt.map(|value| (value, tier))
        })
    }

    /// Encrypt and write `value` under `name`, replacing any existing entry.
    #[instrument(skip_all, fields(name = %name))]
    pub fn set_item<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        ensure_not_reserved(name)?;
        let sealed = self.encrypt(value)?;
        self.storage.set_item(name, &sealed)?;
        Ok(())
    }

    /// Read and decrypt `name`. Absent, unreadable or mistyped entries are `None`.
    #[instrument(skip_all, fields(name = %name))]
    pub fn get_item<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.storage.get_item(name) {
            Ok(Some(raw)) => self.decrypt(&raw),
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "read failed, treating entry as empty");
                None
            }
        }
    }

    #[instrument(skip_all, fields(name = %name))]
    pub fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        ensure_not_reserved(name)?;
        self.storage.remove_item(name)?;
        Ok(())
    }

    /// Re-encrypt an entry under the client key if it is currently only
    /// readable through the legacy key or as plain JSON.
    #[instrument(skip_all, fields(name = %name))]
    pub fn migrate_item(&self, name: &str) -> Result<Migration, StoreError> {
        ensure_not_reserved(name)?;
        let Some(raw) = self.storage.get_item(name)? else {
            return Ok(Migration::Missing);
        };

        match self.decrypt_with_tier(&raw) {
            None => Ok(Migration::Unreadable),
            Some((_, Tier::ClientKey)) => Ok(Migration::Current),
            Some((value, tier)) => {
                self.set_item(name, &value)?;
                info!(?tier, "re-encrypted entry under client key");
                Ok(Migration::Upgraded(tier))
            }
        }
    }
}

fn open_json(key: &KeyMaterial, raw: &str) -> Option<Value> {
    let bytes = cipher::open(key, raw).ok()?;
    let text = std::str::from_utf8(&bytes).ok()?;
    serde_json::from_str(text).ok()
}

fn ensure_not_reserved(name: &str) -> Result<(), StoreError> {
    if name == CLIENT_KEY_NAME {
        return Err(StoreError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}
