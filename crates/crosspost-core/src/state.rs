use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pkce;

/// Nonce length in characters appended to every state blob.
pub const NONCE_LEN: usize = 16;

/// Context round-tripped through the OAuth `state` parameter.
///
/// The nonce makes the encoded string unguessable and unique per attempt; it
/// is never validated against a server-side record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    #[serde(rename = "uid")]
    pub user_id: String,
    #[serde(rename = "tenant")]
    pub tenant: String,
    #[serde(rename = "n")]
    pub nonce: String,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state parameter is empty")]
    Empty,
    #[error("state is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("state payload is malformed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("nonce generation failed: {0}")]
    Entropy(#[from] rand::rand_core::OsError),
}

/// Encode user and tenant into an opaque, URL-safe state string.
pub fn encode_state(user_id: &str, tenant: &str) -> Result<String, StateError> {
    let payload = StatePayload {
        user_id: user_id.to_owned(),
        tenant: tenant.to_owned(),
        nonce: pkce::random_url_safe(NONCE_LEN)?,
    };
    let bytes = serde_json::to_vec(&payload)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a state string back into its payload.
pub fn decode_state(raw: &str) -> Result<StatePayload, StateError> {
    if raw.is_empty() {
        return Err(StateError::Empty);
    }
    let bytes = URL_SAFE_NO_PAD.decode(raw)?;
    Ok(serde_json::from_slice(&bytes)?)
}
