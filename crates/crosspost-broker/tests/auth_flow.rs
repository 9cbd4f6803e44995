use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Router,
    body::{self, Body},
    http::{Method, Request, StatusCode},
};
use crosspost_broker::{
    config::{ProviderCredentials, ProviderDirectory, ResolvedProvider, TenantConfig},
    error::AuthError,
    http::{self, AppContext},
    oauth::TokenGateway,
    service::TokenService,
    storage::{CredentialStore, MemoryStore},
};
use crosspost_core::types::{Identity, ProviderId, Token};
use serde_json::{Value, json};
use tower::ServiceExt;

const TENANT: &str = "tenant-x";

#[derive(Default)]
struct FakeGateway {
    exchanges: Mutex<Vec<(ProviderId, String, Option<String>)>>,
    refreshes: Mutex<Vec<(ProviderId, String)>>,
}

impl FakeGateway {
    fn exchange_count(&self) -> usize {
        self.exchanges.lock().expect("exchanges lock").len()
    }

    fn refresh_inputs(&self) -> Vec<(ProviderId, String)> {
        self.refreshes.lock().expect("refreshes lock").clone()
    }
}

impl TokenGateway for FakeGateway {
    fn exchange(
        &self,
        provider: &ResolvedProvider,
        code: &str,
        verifier: Option<&str>,
    ) -> Result<Token, AuthError> {
        self.exchanges.lock().expect("exchanges lock").push((
            provider.provider,
            code.to_owned(),
            verifier.map(ToOwned::to_owned),
        ));
        Ok(Token {
            access_token: format!("access:{}:{code}", provider.provider),
            refresh_token: Some("refresh-initial".into()),
            token_type: Some("Bearer".into()),
            expires_at: Some(now() + 7200),
        })
    }

    fn refresh(&self, provider: &ResolvedProvider, credential: &str) -> Result<Token, AuthError> {
        self.refreshes
            .lock()
            .expect("refreshes lock")
            .push((provider.provider, credential.to_owned()));
        let access = format!("refreshed:{}", provider.provider);
        let refresh_token = if provider.endpoints.refresh_with_access_token {
            // Exchange-grant providers hand back the new access token as the
            // next refresh credential.
            Some(access.clone())
        } else {
            Some("refresh-rotated".into())
        };
        Ok(Token {
            access_token: access,
            refresh_token,
            token_type: Some("Bearer".into()),
            expires_at: Some(now() + 5_184_000),
        })
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn build_app() -> (Arc<MemoryStore>, Arc<FakeGateway>, Router) {
    let credentials = ProviderCredentials {
        client_id: "client".into(),
        client_secret: "secret".into(),
        scopes: vec!["scope.a".into()],
    };
    let mut providers: TenantConfig = HashMap::new();
    for provider in ProviderId::ALL {
        providers.insert(provider, credentials.clone());
    }
    let mut tenants = HashMap::new();
    tenants.insert(TENANT.to_owned(), providers);

    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(FakeGateway::default());
    let service = Arc::new(TokenService::new(
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        Arc::new(ProviderDirectory::new(tenants)),
        Arc::clone(&gateway) as Arc<dyn TokenGateway>,
    ));
    let app = http::router(AppContext { service });
    (store, gateway, app)
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    send_json(app, Method::POST, uri, payload).await
}

async fn send_json(app: &Router, method: Method, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (_store, _gateway, app) = build_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn start_returns_authorization_url_with_state() {
    let (_store, _gateway, app) = build_app();
    let (status, body) = post_json(
        &app,
        "/auth/start",
        json!({
            "provider": "youtube",
            "tenant": TENANT,
            "user_id": "user-1",
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let auth_url = body["auth_url"].as_str().expect("auth_url");
    assert!(auth_url.contains("accounts.google.com"));
    assert!(auth_url.contains("prompt=consent"));
    assert!(body["state"].as_str().is_some());
}

#[tokio::test]
async fn full_flow_exchanges_and_persists_under_state_identity() {
    let (store, gateway, app) = build_app();

    let (status, begun) = post_json(
        &app,
        "/auth/start",
        json!({
            "provider": "x",
            "tenant": TENANT,
            "user_id": "user-7",
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let state = begun["state"].as_str().expect("state");

    let (status, completed) = post_json(
        &app,
        "/auth/callback",
        json!({
            "provider": "x",
            "tenant": TENANT,
            "code": "abc",
            "state": state,
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["user_id"], "user-7");
    assert_eq!(completed["tenant"], TENANT);
    assert!(completed["expires_at"].as_u64().is_some());

    let identity = Identity::new("user-7", ProviderId::X, TENANT);
    let stored = store.get_token(&identity).expect("get").expect("present");
    assert_eq!(stored.access_token, "access:x:abc");
    assert_eq!(gateway.exchange_count(), 1);

    let (status, authorized) = post_json(
        &app,
        "/auth/is-authorized",
        json!({ "provider": "x", "tenant": TENANT, "user_id": "user-7" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(authorized["is_authorized"], true);
}

#[tokio::test]
async fn tenant_mismatch_is_rejected_without_side_effects() {
    let (store, gateway, app) = build_app();

    let (_, begun) = post_json(
        &app,
        "/auth/start",
        json!({
            "provider": "x",
            "tenant": TENANT,
            "user_id": "user-7",
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;
    let state = begun["state"].as_str().expect("state");

    let (status, body) = post_json(
        &app,
        "/auth/callback",
        json!({
            "provider": "x",
            "tenant": "tenant-y",
            "code": "abc",
            "state": state,
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TENANT_MISMATCH");
    assert_eq!(gateway.exchange_count(), 0);
    let identity = Identity::new("user-7", ProviderId::X, TENANT);
    assert_eq!(store.get_token(&identity).expect("get"), None);
}

#[tokio::test]
async fn stale_instagram_token_refreshes_via_access_token() {
    let (store, gateway, app) = build_app();
    let identity = Identity::new("user-1", ProviderId::Instagram, TENANT);
    store
        .save_token(
            &identity,
            &Token {
                access_token: "tok123".into(),
                refresh_token: Some(String::new()),
                token_type: Some("Bearer".into()),
                expires_at: Some(now() - 1),
            },
        )
        .expect("seed");

    let (status, body) = post_json(
        &app,
        "/auth/refresh-token",
        json!({ "provider": "instagram", "tenant": TENANT, "user_id": "user-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["expires_at"].as_u64().expect("expires_at") > now());
    assert_eq!(
        gateway.refresh_inputs(),
        vec![(ProviderId::Instagram, "tok123".to_owned())]
    );

    let stored = store.get_token(&identity).expect("get").expect("present");
    assert_eq!(stored.access_token, "refreshed:instagram");
    assert_eq!(stored.refresh_token.as_deref(), Some("refreshed:instagram"));
}

#[tokio::test]
async fn refresh_with_nothing_cached_is_unauthorized() {
    let (_store, gateway, app) = build_app();
    let (status, body) = post_json(
        &app,
        "/auth/refresh-token",
        json!({ "provider": "x", "tenant": TENANT, "user_id": "ghost" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_NOT_FOUND");
    assert!(gateway.refresh_inputs().is_empty());
}

#[tokio::test]
async fn unknown_provider_slug_is_a_client_error() {
    let (_store, _gateway, app) = build_app();
    let (status, body) = post_json(
        &app,
        "/auth/start",
        json!({
            "provider": "myspace",
            "tenant": TENANT,
            "user_id": "user-1",
            "redirect_uri": "https://app.example.com/cb"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNKNOWN_PROVIDER");
}

#[tokio::test]
async fn revoke_deletes_the_stored_credential() {
    let (store, _gateway, app) = build_app();
    let identity = Identity::new("user-1", ProviderId::TikTok, TENANT);
    store
        .save_token(
            &identity,
            &Token {
                access_token: "a".into(),
                refresh_token: None,
                token_type: None,
                expires_at: Some(now() + 3600),
            },
        )
        .expect("seed");

    let (status, body) = send_json(
        &app,
        Method::DELETE,
        "/auth/token",
        json!({ "provider": "tiktok", "tenant": TENANT, "user_id": "user-1" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], true);
    assert_eq!(store.get_token(&identity).expect("get"), None);
}
