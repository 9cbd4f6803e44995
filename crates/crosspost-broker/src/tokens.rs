use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use crosspost_core::types::{Identity, Token};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::{
    config::ProviderDirectory, error::AuthError, oauth::TokenGateway, storage::CredentialStore,
};

/// Pre-expiry safety margin. Uniform across providers: refreshing early is
/// cheap next to a failed downstream call with an expired token.
pub const FRESHNESS_MARGIN_SECS: u64 = 300;

/// Expiry-aware token cache over the credential store.
///
/// Refresh is lazy, triggered by the request that needs a fresh token; the
/// read-check-refresh-write sequence is serialized per identity so a
/// single-use refresh credential cannot be spent twice concurrently.
pub struct TokenManager {
    store: Arc<dyn CredentialStore>,
    directory: Arc<ProviderDirectory>,
    gateway: Arc<dyn TokenGateway>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        directory: Arc<ProviderDirectory>,
        gateway: Arc<dyn TokenGateway>,
    ) -> Self {
        Self {
            store,
            directory,
            gateway,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Return a token guaranteed fresh for at least the safety margin,
    /// refreshing and persisting it when the cached one is stale.
    pub fn get_valid_token(&self, identity: &Identity) -> Result<Token, AuthError> {
        let lock = self.identity_lock(identity);
        let _guard = lock.lock().expect("identity lock poisoned");

        let token = self
            .store
            .get_token(identity)?
            .ok_or(AuthError::TokenNotFound)?;

        if !token.is_stale_at(epoch_seconds(), FRESHNESS_MARGIN_SECS) {
            tracing::debug!(
                provider = identity.provider.as_str(),
                user_id = %identity.user_id,
                tenant = %identity.tenant,
                "cached token is valid"
            );
            return Ok(token);
        }

        tracing::info!(
            provider = identity.provider.as_str(),
            user_id = %identity.user_id,
            tenant = %identity.tenant,
            "cached token is stale; refreshing"
        );
        self.refresh_and_store(identity, token)
    }

    /// Read-only freshness check. Never refreshes; "not found" is `false`.
    pub fn is_token_valid(&self, identity: &Identity) -> Result<bool, AuthError> {
        match self.store.get_token(identity)? {
            Some(token) => Ok(!token.is_stale_at(epoch_seconds(), FRESHNESS_MARGIN_SECS)),
            None => Ok(false),
        }
    }

    /// Refresh regardless of expiry, for explicit user-triggered rotation.
    pub fn force_refresh(&self, identity: &Identity) -> Result<Token, AuthError> {
        let lock = self.identity_lock(identity);
        let _guard = lock.lock().expect("identity lock poisoned");

        let token = self
            .store
            .get_token(identity)?
            .ok_or(AuthError::TokenNotFound)?;
        self.refresh_and_store(identity, token)
    }

    /// HTTP client with the bearer token pre-attached: the hand-off point to
    /// the platform adapters.
    pub fn authenticated_client(&self, identity: &Identity) -> Result<reqwest::Client, AuthError> {
        let token = self.get_valid_token(identity)?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(|err| AuthError::Internal(format!("access token is not header-safe: {err}")))?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| AuthError::Internal(format!("failed to build http client: {err}")))
    }

    fn refresh_and_store(&self, identity: &Identity, current: Token) -> Result<Token, AuthError> {
        let resolved = self
            .directory
            .resolve(identity.provider, &identity.tenant, "")?;

        let credential = if resolved.endpoints.refresh_with_access_token {
            // The prior access token is the refresh credential.
            if current.access_token.is_empty() {
                return Err(AuthError::RefreshCredentialUnavailable);
            }
            current.access_token.clone()
        } else {
            match current.refresh_token.as_deref() {
                Some(value) if !value.is_empty() => value.to_owned(),
                _ => return Err(AuthError::RefreshCredentialUnavailable),
            }
        };

        let mut refreshed = self.gateway.refresh(&resolved, &credential)?;
        if refreshed.refresh_token.is_none() {
            // Providers may omit the refresh token on rotation; keep the one
            // we already hold.
            refreshed.refresh_token = current.refresh_token.clone();
        }
        self.store.save_token(identity, &refreshed)?;

        tracing::info!(
            provider = identity.provider.as_str(),
            user_id = %identity.user_id,
            tenant = %identity.tenant,
            access_token_len = refreshed.access_token.len(),
            expires_at = ?refreshed.expires_at,
            "token refreshed"
        );
        Ok(refreshed)
    }

    fn identity_lock(&self, identity: &Identity) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        locks.entry(identity.cache_key()).or_default().clone()
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
