use std::sync::Arc;

use crosspost_core::{
    pkce::PkcePair,
    state::{decode_state, encode_state},
    types::{DEFAULT_TENANT, Identity, ProviderId, Token},
};

use crate::{
    config::ProviderDirectory,
    error::AuthError,
    oauth::{TokenGateway, build_authorize_url},
    storage::{CredentialStore, VERIFIER_TTL},
    tokens::TokenManager,
};

/// Result of starting an authorization flow.
#[derive(Debug, Clone)]
pub struct BeginAuth {
    pub auth_url: String,
    pub state: String,
    /// Whether a PKCE verifier was stored for the returned state.
    pub pkce_stored: bool,
}

/// The surface the HTTP handlers call: authorization flows plus the token
/// lifecycle operations.
///
/// All collaborators are injected at construction time; there is no ambient
/// store or configuration.
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    directory: Arc<ProviderDirectory>,
    gateway: Arc<dyn TokenGateway>,
    tokens: TokenManager,
}

impl TokenService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        directory: Arc<ProviderDirectory>,
        gateway: Arc<dyn TokenGateway>,
    ) -> Self {
        let tokens = TokenManager::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            Arc::clone(&gateway),
        );
        Self {
            store,
            directory,
            gateway,
            tokens,
        }
    }

    /// Build the authorization URL for a provider, storing a PKCE verifier
    /// keyed by the state when the provider requires one.
    pub fn begin_auth(
        &self,
        provider: ProviderId,
        tenant: &str,
        redirect_uri: &str,
        user_id: &str,
    ) -> Result<BeginAuth, AuthError> {
        let tenant = normalize_tenant(tenant);
        let resolved = self.directory.resolve(provider, tenant, redirect_uri)?;
        let state = encode_state(user_id, tenant)?;

        if resolved.endpoints.uses_pkce {
            let pair = PkcePair::generate()
                .map_err(|err| AuthError::Internal(format!("pkce generation failed: {err}")))?;
            self.store
                .save_verifier(&state, &pair.verifier, VERIFIER_TTL)?;
            tracing::info!(
                provider = provider.as_str(),
                tenant,
                user_id,
                verifier_len = pair.verifier.len(),
                "authorization started with PKCE"
            );
            let url = build_authorize_url(&resolved, &state, Some(&pair.challenge))?;
            Ok(BeginAuth {
                auth_url: url.into(),
                state,
                pkce_stored: true,
            })
        } else {
            tracing::info!(
                provider = provider.as_str(),
                tenant,
                user_id,
                "authorization started"
            );
            let url = build_authorize_url(&resolved, &state, None)?;
            Ok(BeginAuth {
                auth_url: url.into(),
                state,
                pkce_stored: false,
            })
        }
    }

    /// Complete a callback: decode state, check tenant consistency, consume
    /// the PKCE verifier where required, exchange the code and persist the
    /// token under the identity recovered from state.
    pub fn complete_callback(
        &self,
        provider: ProviderId,
        tenant: &str,
        code: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<(Identity, Token), AuthError> {
        let payload = decode_state(state)?;
        let requested = normalize_tenant(tenant);
        if requested != payload.tenant {
            return Err(AuthError::TenantMismatch {
                requested: requested.to_owned(),
                expected: payload.tenant,
            });
        }

        let resolved = self
            .directory
            .resolve(provider, &payload.tenant, redirect_uri)?;

        let verifier = if resolved.endpoints.uses_pkce {
            match self.store.take_verifier(state)? {
                Some(verifier) => Some(verifier),
                None => return Err(AuthError::VerifierNotFound),
            }
        } else {
            None
        };

        let token = self.gateway.exchange(&resolved, code, verifier.as_deref())?;
        let identity = Identity::new(payload.user_id, provider, payload.tenant);
        self.store.save_token(&identity, &token)?;

        tracing::info!(
            provider = provider.as_str(),
            user_id = %identity.user_id,
            tenant = %identity.tenant,
            token_type = token.token_type.as_deref().unwrap_or(""),
            expires_at = ?token.expires_at,
            "authorization completed"
        );
        Ok((identity, token))
    }

    /// Drop the stored credential for an identity (logout / revoke).
    pub fn revoke(
        &self,
        provider: ProviderId,
        tenant: &str,
        user_id: &str,
    ) -> Result<(), AuthError> {
        let identity = Identity::new(user_id, provider, tenant);
        self.store.delete_token(&identity)?;
        tracing::info!(
            provider = provider.as_str(),
            user_id = %identity.user_id,
            tenant = %identity.tenant,
            "stored credential deleted"
        );
        Ok(())
    }

    pub fn get_valid_token(&self, identity: &Identity) -> Result<Token, AuthError> {
        self.tokens.get_valid_token(identity)
    }

    pub fn is_token_valid(&self, identity: &Identity) -> Result<bool, AuthError> {
        self.tokens.is_token_valid(identity)
    }

    pub fn force_refresh(&self, identity: &Identity) -> Result<Token, AuthError> {
        self.tokens.force_refresh(identity)
    }

    pub fn authenticated_client(&self, identity: &Identity) -> Result<reqwest::Client, AuthError> {
        self.tokens.authenticated_client(identity)
    }

    pub fn health(&self) -> Result<(), AuthError> {
        Ok(self.store.health()?)
    }
}

fn normalize_tenant(tenant: &str) -> &str {
    if tenant.is_empty() {
        DEFAULT_TENANT
    } else {
        tenant
    }
}
