use crosspost_core::{state::StateError, types::ProviderId};
use thiserror::Error;

use crate::storage::StoreError;

/// Service-level error taxonomy.
///
/// Provider HTTP failures are wrapped here at the gateway boundary and never
/// retried inside the broker; callers decide whether to offer a retry.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid state parameter: {0}")]
    InvalidState(#[from] StateError),
    #[error("tenant `{requested}` does not match tenant `{expected}` from state")]
    TenantMismatch { requested: String, expected: String },
    #[error("PKCE verifier not found or expired")]
    VerifierNotFound,
    #[error("token exchange failed: {detail}")]
    ExchangeFailed { detail: String },
    #[error("token refresh failed: {detail}")]
    RefreshFailed { detail: String },
    #[error("no refresh credential available; re-authorization required")]
    RefreshCredentialUnavailable,
    #[error("no token stored for this user and provider")]
    TokenNotFound,
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),
    #[error("tenant `{tenant}` has no configuration for provider `{provider}`")]
    TenantNotConfigured {
        tenant: String,
        provider: ProviderId,
    },
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code included in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidState(_) => "INVALID_STATE",
            AuthError::TenantMismatch { .. } => "TENANT_MISMATCH",
            AuthError::VerifierNotFound => "PKCE_VERIFIER_NOT_FOUND",
            AuthError::ExchangeFailed { .. } => "TOKEN_EXCHANGE_FAILED",
            AuthError::RefreshFailed { .. } => "TOKEN_REFRESH_FAILED",
            AuthError::RefreshCredentialUnavailable => "REFRESH_CREDENTIAL_UNAVAILABLE",
            AuthError::TokenNotFound => "TOKEN_NOT_FOUND",
            AuthError::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            AuthError::TenantNotConfigured { .. } => "TENANT_NOT_CONFIGURED",
            AuthError::Store(_) => "STORE_ERROR",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
