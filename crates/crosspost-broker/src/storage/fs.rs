use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Mutex, RwLock},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use crosspost_core::types::{Identity, Token};
use serde::{Deserialize, Serialize};

use super::{CredentialStore, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct VerifierRecord {
    verifier: String,
    /// Absolute deadline in epoch seconds, so the TTL survives restarts.
    expires_at: u64,
}

/// Filesystem-backed credential store with an in-memory read cache.
///
/// One JSON file per record under the base directory.
pub struct FsStore {
    base_dir: PathBuf,
    cache: RwLock<HashMap<String, Vec<u8>>>,
    verifier_guard: Mutex<()>,
}

impl FsStore {
    /// Create a store rooted at the provided directory.
    pub fn new(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            cache: RwLock::new(HashMap::new()),
            verifier_guard: Mutex::new(()),
        })
    }

    fn token_path(&self, identity: &Identity) -> PathBuf {
        self.base_dir
            .join("tokens")
            .join(sanitize(&identity.tenant))
            .join(identity.provider.as_str())
            .join(format!("{}.json", sanitize(&identity.user_id)))
    }

    fn verifier_path(&self, state: &str) -> PathBuf {
        self.base_dir
            .join("verifiers")
            .join(format!("{}.json", sanitize(state)))
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<Vec<u8>, StoreError> {
        let payload = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &payload)?;
        Ok(payload)
    }
}

/// Keep file names to a portable alphabet; identities may contain anything.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl CredentialStore for FsStore {
    fn save_token(&self, identity: &Identity, token: &Token) -> Result<(), StoreError> {
        let payload = self.write_json(self.token_path(identity), token)?;
        let mut cache = self.cache.write().expect("cache lock poisoned");
        cache.insert(identity.cache_key(), payload);
        Ok(())
    }

    fn get_token(&self, identity: &Identity) -> Result<Option<Token>, StoreError> {
        if let Some(bytes) = self
            .cache
            .read()
            .expect("cache lock poisoned")
            .get(&identity.cache_key())
            .cloned()
        {
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        match fs::read(self.token_path(identity)) {
            Ok(bytes) => {
                let token = serde_json::from_slice(&bytes)?;
                self.cache
                    .write()
                    .expect("cache lock poisoned")
                    .insert(identity.cache_key(), bytes);
                Ok(Some(token))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::from(err)),
        }
    }

    fn delete_token(&self, identity: &Identity) -> Result<(), StoreError> {
        self.cache
            .write()
            .expect("cache lock poisoned")
            .remove(&identity.cache_key());
        match fs::remove_file(self.token_path(identity)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::from(err)),
        }
    }

    fn save_verifier(&self, state: &str, verifier: &str, ttl: Duration) -> Result<(), StoreError> {
        let record = VerifierRecord {
            verifier: verifier.to_owned(),
            expires_at: epoch_seconds().saturating_add(ttl.as_secs()),
        };
        self.write_json(self.verifier_path(state), &record)?;
        Ok(())
    }

    fn take_verifier(&self, state: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.verifier_guard.lock().expect("verifier lock poisoned");
        let path = self.verifier_path(state);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::from(err)),
        };
        fs::remove_file(&path)?;
        let record: VerifierRecord = serde_json::from_slice(&bytes)?;
        if record.expires_at <= epoch_seconds() {
            return Ok(None);
        }
        Ok(Some(record.verifier))
    }

    fn health(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.base_dir)?;
        Ok(())
    }
}
