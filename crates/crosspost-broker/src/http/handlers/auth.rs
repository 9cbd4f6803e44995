use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State};
use crosspost_core::types::{Identity, ProviderId};
use serde::{Deserialize, Serialize};

use crate::{error::AuthError, http::AppContext};

fn parse_provider(slug: &str) -> Result<ProviderId, AuthError> {
    ProviderId::from_slug(slug).ok_or_else(|| AuthError::UnknownProvider(slug.to_owned()))
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Deserialize)]
pub struct StartAuthRequest {
    pub provider: String,
    #[serde(default)]
    pub tenant: String,
    pub user_id: String,
    pub redirect_uri: String,
}

#[derive(Serialize)]
pub struct StartAuthResponse {
    pub auth_url: String,
    pub state: String,
    pub provider: String,
    pub tenant: String,
    pub user_id: String,
}

pub async fn start(
    State(context): State<AppContext>,
    Json(request): Json<StartAuthRequest>,
) -> Result<Json<StartAuthResponse>, AuthError> {
    let provider = parse_provider(&request.provider)?;
    let begun = context.service.begin_auth(
        provider,
        &request.tenant,
        &request.redirect_uri,
        &request.user_id,
    )?;
    Ok(Json(StartAuthResponse {
        auth_url: begun.auth_url,
        state: begun.state,
        provider: provider.to_string(),
        tenant: request.tenant,
        user_id: request.user_id,
    }))
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub provider: String,
    #[serde(default)]
    pub tenant: String,
    pub code: String,
    pub state: String,
    #[serde(default)]
    pub redirect_uri: String,
}

#[derive(Serialize)]
pub struct CallbackResponse {
    pub provider: String,
    pub user_id: String,
    pub tenant: String,
    pub expires_at: Option<u64>,
    pub message: String,
}

pub async fn callback(
    State(context): State<AppContext>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, AuthError> {
    let provider = parse_provider(&request.provider)?;
    let service = context.service.clone();
    let (identity, token) = tokio::task::spawn_blocking(move || {
        service.complete_callback(
            provider,
            &request.tenant,
            &request.code,
            &request.state,
            &request.redirect_uri,
        )
    })
    .await
    .map_err(|err| AuthError::Internal(format!("callback task failed: {err}")))??;

    let message = format!(
        "authorization completed for user {} on {}; you may close this window",
        identity.user_id, identity.provider
    );
    Ok(Json(CallbackResponse {
        provider: identity.provider.to_string(),
        user_id: identity.user_id,
        tenant: identity.tenant,
        expires_at: token.expires_at,
        message,
    }))
}

#[derive(Deserialize)]
pub struct IdentityRequest {
    pub provider: String,
    #[serde(default)]
    pub tenant: String,
    pub user_id: String,
}

impl IdentityRequest {
    fn identity(&self) -> Result<Identity, AuthError> {
        let provider = parse_provider(&self.provider)?;
        Ok(Identity::new(
            self.user_id.clone(),
            provider,
            self.tenant.clone(),
        ))
    }
}

#[derive(Serialize)]
pub struct IsAuthorizedResponse {
    pub is_authorized: bool,
}

pub async fn is_authorized(
    State(context): State<AppContext>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<IsAuthorizedResponse>, AuthError> {
    let identity = request.identity()?;
    let is_authorized = context.service.is_token_valid(&identity)?;
    Ok(Json(IsAuthorizedResponse { is_authorized }))
}

#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub provider: String,
    pub user_id: String,
    pub tenant: String,
    pub expires_at: Option<u64>,
    pub refreshed_at: u64,
}

pub async fn refresh(
    State(context): State<AppContext>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<RefreshTokenResponse>, AuthError> {
    let identity = request.identity()?;
    let service = context.service.clone();
    let task_identity = identity.clone();
    let token = tokio::task::spawn_blocking(move || service.force_refresh(&task_identity))
        .await
        .map_err(|err| AuthError::Internal(format!("refresh task failed: {err}")))??;

    Ok(Json(RefreshTokenResponse {
        provider: identity.provider.to_string(),
        user_id: identity.user_id,
        tenant: identity.tenant,
        expires_at: token.expires_at,
        refreshed_at: epoch_seconds(),
    }))
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub revoked: bool,
}

pub async fn revoke(
    State(context): State<AppContext>,
    Json(request): Json<IdentityRequest>,
) -> Result<Json<RevokeResponse>, AuthError> {
    let provider = parse_provider(&request.provider)?;
    context
        .service
        .revoke(provider, &request.tenant, &request.user_id)?;
    Ok(Json(RevokeResponse { revoked: true }))
}
