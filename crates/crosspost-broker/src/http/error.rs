use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AuthError;

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    error: String,
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidState(_)
            | AuthError::TenantMismatch { .. }
            | AuthError::VerifierNotFound
            | AuthError::UnknownProvider(_)
            | AuthError::TenantNotConfigured { .. } => StatusCode::BAD_REQUEST,
            AuthError::TokenNotFound | AuthError::RefreshCredentialUnavailable => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::ExchangeFailed { .. } | AuthError::RefreshFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                code: self.code(),
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
