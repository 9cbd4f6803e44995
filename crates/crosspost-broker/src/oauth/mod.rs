mod gateway;

pub use gateway::{DEFAULT_REFRESH_TTL_SECS, HttpGateway};

use crosspost_core::types::Token;
use url::Url;

use crate::{config::ResolvedProvider, error::AuthError};

/// Provider token endpoint operations.
///
/// The lifecycle manager and the callback flow talk to providers only
/// through this trait, so tests can substitute a stub.
pub trait TokenGateway: Send + Sync {
    /// Exchange an authorization code for a token, including the PKCE
    /// verifier when the provider requires one and performing the
    /// long-lived upgrade where the endpoint table says so.
    fn exchange(
        &self,
        provider: &ResolvedProvider,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<Token, AuthError>;

    /// Refresh a credential using the provider's refresh shape.
    fn refresh(&self, provider: &ResolvedProvider, credential: &str) -> Result<Token, AuthError>;
}

/// Build the authorization redirect URL for a provider.
///
/// PKCE providers get the S256 challenge parameters; the rest request
/// offline access, with a forced consent prompt where the table requires it
/// so a refresh token is actually issued.
pub fn build_authorize_url(
    provider: &ResolvedProvider,
    state: &str,
    challenge: Option<&str>,
) -> Result<Url, AuthError> {
    let mut url = Url::parse(&provider.endpoints.auth_url).map_err(|err| {
        AuthError::Internal(format!(
            "invalid auth url for provider {}: {err}",
            provider.provider
        ))
    })?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("response_type", "code");
        pairs.append_pair("client_id", &provider.client_id);
        pairs.append_pair("redirect_uri", &provider.redirect_uri);
        if !provider.scopes.is_empty() {
            pairs.append_pair("scope", &provider.scopes.join(" "));
        }
        pairs.append_pair("state", state);
        if let Some(challenge) = challenge {
            pairs.append_pair("code_challenge", challenge);
            pairs.append_pair("code_challenge_method", "S256");
        } else {
            pairs.append_pair("access_type", "offline");
            if provider.endpoints.offline_consent_prompt {
                pairs.append_pair("prompt", "consent");
            }
        }
    }
    Ok(url)
}
