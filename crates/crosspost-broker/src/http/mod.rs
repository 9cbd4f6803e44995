pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::service::TokenService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<TokenService>,
}

pub fn router(context: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .route("/auth/start", post(handlers::auth::start))
        .route("/auth/callback", post(handlers::auth::callback))
        .route("/auth/is-authorized", post(handlers::auth::is_authorized))
        .route("/auth/refresh-token", post(handlers::auth::refresh))
        .route("/auth/token", delete(handlers::auth::revoke))
        .with_state(context)
}
