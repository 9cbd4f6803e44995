use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crosspost_core::types::{Identity, Token};

use super::{CredentialStore, StoreError};

#[derive(Debug)]
struct VerifierEntry {
    verifier: String,
    expires_at: Instant,
}

/// In-memory credential store backed by mutex protected hash maps.
///
/// Suitable for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tokens: Mutex<HashMap<String, Token>>,
    verifiers: Mutex<HashMap<String, VerifierEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(entries: &mut HashMap<String, VerifierEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl CredentialStore for MemoryStore {
    fn save_token(&self, identity: &Identity, token: &Token) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().expect("token map poisoned");
        tokens.insert(identity.cache_key(), token.clone());
        Ok(())
    }

    fn get_token(&self, identity: &Identity) -> Result<Option<Token>, StoreError> {
        let tokens = self.tokens.lock().expect("token map poisoned");
        Ok(tokens.get(&identity.cache_key()).cloned())
    }

    fn delete_token(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().expect("token map poisoned");
        tokens.remove(&identity.cache_key());
        Ok(())
    }

    fn save_verifier(&self, state: &str, verifier: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut verifiers = self.verifiers.lock().expect("verifier map poisoned");
        Self::purge_expired(&mut verifiers);
        verifiers.insert(
            state.to_owned(),
            VerifierEntry {
                verifier: verifier.to_owned(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn take_verifier(&self, state: &str) -> Result<Option<String>, StoreError> {
        let mut verifiers = self.verifiers.lock().expect("verifier map poisoned");
        Self::purge_expired(&mut verifiers);
        Ok(verifiers.remove(state).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.verifier)
            } else {
                None
            }
        }))
    }

    fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
