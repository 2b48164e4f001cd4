use std::fmt;

use prep_core::storage::{LocalStorage, StorageError};
use rand::{
    rngs::{OsRng, StdRng},
    RngCore, SeedableRng,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Reserved storage name holding the raw client secret.
pub const CLIENT_KEY_NAME: &str = "prep.client-key";

/// Key material used for encryption at rest.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// Identifier for logging (never log key bytes).
    pub id: String,
    /// 256-bit symmetric key.
    pub bytes: [u8; 32],
}

impl KeyMaterial {
    /// Derive a 256-bit key from a textual secret.
    pub fn derive(id: impl Into<String>, secret: &str) -> Self {
        Self {
            id: id.into(),
            bytes: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Short, non-reversible tag that identifies the key in logs and output.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.bytes)
            .iter()
            .take(4)
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Guarantees a stable per-client secret exists in local storage.
///
/// The secret is stored unencrypted under [`CLIENT_KEY_NAME`] and is never
/// rotated; clearing storage is the only way to get a new one.
#[derive(Debug, Clone)]
pub struct KeyManager<S> {
    storage: S,
}

impl<S: LocalStorage> KeyManager<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Return the client key, generating and persisting one on first use.
    pub fn storage_key(&self) -> Result<KeyMaterial, KeyError> {
        self.get_or_create_with(&mut OsRng, || StdRng::from_rng(OsRng))
    }

    fn get_or_create_with<R, F>(
        &self,
        primary: &mut R,
        fallback: impl FnOnce() -> Result<F, rand::Error>,
    ) -> Result<KeyMaterial, KeyError>
    where
        R: RngCore,
        F: RngCore,
    {
        if let Some(secret) = self.stored_secret()? {
            return Ok(client_key(&secret));
        }

        let secret = generate_secret(primary, fallback)?;
        self.storage.set_item(CLIENT_KEY_NAME, &secret)?;
        let material = client_key(&secret);
        debug!(fingerprint = %material.fingerprint(), "generated client key");
        Ok(material)
    }

    /// Return the client key if one already exists. Never writes.
    pub fn current(&self) -> Option<KeyMaterial> {
        match self.stored_secret() {
            Ok(secret) => secret.map(|s| client_key(&s)),
            Err(err) => {
                debug!(%err, "client key unreadable");
                None
            }
        }
    }

    fn stored_secret(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get_item(CLIENT_KEY_NAME)?
            .filter(|secret| !secret.trim().is_empty()))
    }
}

/// Fixed fallback key derived from a public configuration value.
/// Only ever used to read data written before per-client keys existed.
pub fn legacy_key(seed: &str) -> KeyMaterial {
    KeyMaterial::derive("legacy", seed)
}

fn client_key(secret: &str) -> KeyMaterial {
    KeyMaterial::derive("client", secret)
}

/// UUID-shaped secret from `primary`. When it fails, a generator built by
/// `fallback` is tried; failure of both is a `KeyError::Generation`.
fn generate_secret<R, F>(
    primary: &mut R,
    fallback: impl FnOnce() -> Result<F, rand::Error>,
) -> Result<String, KeyError>
where
    R: RngCore,
    F: RngCore,
{
    let mut bytes = [0u8; 16];
    if let Err(err) = primary.try_fill_bytes(&mut bytes) {
        warn!(%err, "random source unavailable, trying fallback generator");
        fallback()
            .and_then(|mut rng| rng.try_fill_bytes(&mut bytes))
            .map_err(|e| KeyError::Generation(e.to_string()))?;
    }
    let secret = uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string();
    bytes.zeroize();
    Ok(secret)
}
