use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crosspost_core::{
    endpoints::{RefreshStyle, UpgradeEndpoint},
    types::Token,
};
use serde::Deserialize;
use ureq::Agent;
use url::Url;

use crate::{config::ResolvedProvider, error::AuthError};

use super::TokenGateway;

/// Upper bound for a single provider token endpoint call.
const TOKEN_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Assumed lifetime when a refresh response carries no `expires_in`.
///
/// Leaving expiry unset would mark the token stale on the next check and
/// force a refresh on every call.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenEndpointResponse {
    fn into_token(self, now: u64) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
            expires_at: self.expires_in.map(|ttl| now.saturating_add(ttl)),
        }
    }
}

/// Blocking token gateway speaking the provider-specific wire shapes.
pub struct HttpGateway {
    agent: Agent,
}

impl HttpGateway {
    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TOKEN_CALL_TIMEOUT))
            .build()
            .into();
        Self { agent }
    }

    /// Form POST to a token endpoint, with optional HTTP Basic client
    /// credentials. Returns the failure detail as a plain string so callers
    /// can wrap it in the right error kind.
    fn post_form(
        &self,
        url: &str,
        params: &[(String, String)],
        basic_auth: Option<(&str, &str)>,
    ) -> Result<TokenEndpointResponse, String> {
        let mut request = self.agent.post(url);
        if let Some((client_id, client_secret)) = basic_auth {
            let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
            let header = format!("Basic {credentials}");
            request = request.header("Authorization", header.as_str());
        }
        let response = request
            .send_form(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(|err| format!("transport error: {err}"))?;
        read_token_response(response)
    }

    /// GET with query parameters, used by the exchange-grant endpoints.
    fn get_query(&self, url: &str, params: &[(String, String)]) -> Result<TokenEndpointResponse, String> {
        let mut url = Url::parse(url).map_err(|err| format!("invalid endpoint url: {err}"))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|err| format!("transport error: {err}"))?;
        read_token_response(response)
    }

    fn upgrade_long_lived(
        &self,
        provider: &ResolvedProvider,
        upgrade: &UpgradeEndpoint,
        short_lived: &str,
    ) -> Result<Token, String> {
        let mut params = vec![("grant_type".to_owned(), upgrade.grant_type.clone())];
        if upgrade.with_client_id {
            params.push(("client_id".to_owned(), provider.client_id.clone()));
        }
        if upgrade.with_client_secret {
            params.push(("client_secret".to_owned(), provider.client_secret.clone()));
        }
        params.push((upgrade.token_param.clone(), short_lived.to_owned()));

        let response = self.get_query(&upgrade.url, &params)?;
        let mut token = response.into_token(epoch_seconds());
        // The long-lived token doubles as the refresh credential.
        token.refresh_token = Some(token.access_token.clone());
        Ok(token)
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGateway for HttpGateway {
    fn exchange(
        &self,
        provider: &ResolvedProvider,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<Token, AuthError> {
        let endpoints = &provider.endpoints;
        let response = if endpoints.uses_pkce {
            // Hand-built request: the endpoint wants client credentials in a
            // Basic header, not in the form body.
            let verifier = verifier.ok_or(AuthError::VerifierNotFound)?;
            let params = vec![
                ("grant_type".to_owned(), "authorization_code".to_owned()),
                ("code".to_owned(), code.to_owned()),
                ("redirect_uri".to_owned(), provider.redirect_uri.clone()),
                ("client_id".to_owned(), provider.client_id.clone()),
                ("code_verifier".to_owned(), verifier.to_owned()),
            ];
            self.post_form(
                &endpoints.token_url,
                &params,
                Some((&provider.client_id, &provider.client_secret)),
            )
        } else {
            let mut params = vec![
                ("grant_type".to_owned(), "authorization_code".to_owned()),
                ("code".to_owned(), code.to_owned()),
                ("redirect_uri".to_owned(), provider.redirect_uri.clone()),
                ("client_id".to_owned(), provider.client_id.clone()),
                ("client_secret".to_owned(), provider.client_secret.clone()),
            ];
            if let Some(verifier) = verifier {
                params.push(("code_verifier".to_owned(), verifier.to_owned()));
            }
            self.post_form(&endpoints.token_url, &params, None)
        };

        let response = response.map_err(|detail| AuthError::ExchangeFailed { detail })?;
        let mut token = response.into_token(epoch_seconds());

        if let Some(upgrade) = &endpoints.upgrade {
            match self.upgrade_long_lived(provider, upgrade, &token.access_token) {
                Ok(long_lived) => token = long_lived,
                Err(detail) => {
                    // Shorter-lived session beats a failed login; keep the
                    // short-lived token but make the downgrade visible.
                    tracing::warn!(
                        provider = provider.provider.as_str(),
                        error = %detail,
                        "long-lived token upgrade failed; falling back to short-lived token"
                    );
                }
            }
        }

        Ok(token)
    }

    fn refresh(&self, provider: &ResolvedProvider, credential: &str) -> Result<Token, AuthError> {
        let endpoints = &provider.endpoints;
        let response = match &endpoints.refresh {
            RefreshStyle::Standard => {
                let params = vec![
                    ("grant_type".to_owned(), "refresh_token".to_owned()),
                    ("refresh_token".to_owned(), credential.to_owned()),
                    ("client_id".to_owned(), provider.client_id.clone()),
                    ("client_secret".to_owned(), provider.client_secret.clone()),
                ];
                self.post_form(&endpoints.token_url, &params, None)
            }
            RefreshStyle::BasicAuthForm => {
                let params = vec![
                    ("grant_type".to_owned(), "refresh_token".to_owned()),
                    ("refresh_token".to_owned(), credential.to_owned()),
                    ("client_id".to_owned(), provider.client_id.clone()),
                ];
                self.post_form(
                    &endpoints.token_url,
                    &params,
                    Some((&provider.client_id, &provider.client_secret)),
                )
            }
            RefreshStyle::ExchangeGrant {
                url,
                grant_type,
                token_param,
                with_client_id,
                with_client_secret,
            } => {
                let mut params = vec![("grant_type".to_owned(), grant_type.clone())];
                if *with_client_id {
                    params.push(("client_id".to_owned(), provider.client_id.clone()));
                }
                if *with_client_secret {
                    params.push(("client_secret".to_owned(), provider.client_secret.clone()));
                }
                params.push((token_param.clone(), credential.to_owned()));
                self.get_query(url, &params)
            }
        };

        let response = response.map_err(|detail| AuthError::RefreshFailed { detail })?;
        let now = epoch_seconds();
        let mut token = response.into_token(now);
        if matches!(endpoints.refresh, RefreshStyle::ExchangeGrant { .. }) {
            // The returned access token is the next refresh credential.
            token.refresh_token = Some(token.access_token.clone());
        }
        if token.expires_at.is_none() {
            token.expires_at = Some(now.saturating_add(DEFAULT_REFRESH_TTL_SECS));
        }
        Ok(token)
    }
}

fn read_token_response(mut response: ureq::http::Response<ureq::Body>) -> Result<TokenEndpointResponse, String> {
    let status = response.status();
    if !status.is_success() {
        let status_code = status.as_u16();
        let reason = status.canonical_reason().unwrap_or("token endpoint error");
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| String::new());
        return Err(format!(
            "token endpoint returned {status_code} {reason}: {body}"
        ));
    }
    response
        .body_mut()
        .read_json()
        .map_err(|err| format!("invalid token response: {err}"))
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
