pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use std::time::Duration;

use crosspost_core::types::{Identity, Token};
use thiserror::Error;

/// How long a stored PKCE verifier stays retrievable, bounded by user
/// interaction time.
pub const VERIFIER_TTL: Duration = Duration::from_secs(30 * 60);

/// Shared credential storage keyed by identity tuple.
///
/// Tokens are read and written as whole records; the store is the only owner
/// of the persisted bytes. Verifiers are one-shot: `take_verifier` must not
/// return the same value twice.
pub trait CredentialStore: Send + Sync {
    fn save_token(&self, identity: &Identity, token: &Token) -> Result<(), StoreError>;
    /// `Ok(None)` means no credential is cached; faults are `Err`.
    fn get_token(&self, identity: &Identity) -> Result<Option<Token>, StoreError>;
    fn delete_token(&self, identity: &Identity) -> Result<(), StoreError>;
    fn save_verifier(&self, state: &str, verifier: &str, ttl: Duration) -> Result<(), StoreError>;
    /// Atomic get-and-delete. `Ok(None)` when missing, expired or already
    /// consumed.
    fn take_verifier(&self, state: &str) -> Result<Option<String>, StoreError>;
    fn health(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}
