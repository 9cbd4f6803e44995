use crate::types::ProviderId;

/// How a provider refreshes an expired credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStyle {
    /// Form POST with `grant_type=refresh_token` and client credentials in
    /// the body.
    Standard,
    /// Form POST with `grant_type=refresh_token`, client id in the body and
    /// client credentials in an HTTP Basic header.
    BasicAuthForm,
    /// GET with a provider-specific exchange grant. The current access token
    /// is the input, and the returned access token doubles as the next
    /// refresh credential.
    ExchangeGrant {
        url: String,
        grant_type: String,
        token_param: String,
        with_client_id: bool,
        with_client_secret: bool,
    },
}

/// Second call converting a short-lived access token into a long-lived one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeEndpoint {
    pub url: String,
    pub grant_type: String,
    pub token_param: String,
    pub with_client_id: bool,
    pub with_client_secret: bool,
}

/// Per-provider endpoints and protocol flags.
///
/// Every divergent provider behavior is driven by this table; adding a
/// provider is a new row here plus at most one new exchange/refresh arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub auth_url: String,
    pub token_url: String,
    /// Authorization and code exchange carry a PKCE challenge/verifier.
    pub uses_pkce: bool,
    /// Authorization URL must force a consent prompt so a refresh token is
    /// actually issued.
    pub offline_consent_prompt: bool,
    /// Post-exchange upgrade to a long-lived token, when the provider has one.
    pub upgrade: Option<UpgradeEndpoint>,
    pub refresh: RefreshStyle,
    /// Refresh input is the prior access token rather than a refresh token.
    pub refresh_with_access_token: bool,
}

impl ProviderEndpoints {
    pub fn of(provider: ProviderId) -> Self {
        match provider {
            ProviderId::YouTube => Self {
                auth_url: "https://accounts.google.com/o/oauth2/auth".into(),
                token_url: "https://oauth2.googleapis.com/token".into(),
                uses_pkce: false,
                offline_consent_prompt: true,
                upgrade: None,
                refresh: RefreshStyle::Standard,
                refresh_with_access_token: false,
            },
            ProviderId::X => Self {
                auth_url: "https://x.com/i/oauth2/authorize".into(),
                token_url: "https://api.x.com/2/oauth2/token".into(),
                uses_pkce: true,
                offline_consent_prompt: false,
                upgrade: None,
                refresh: RefreshStyle::BasicAuthForm,
                refresh_with_access_token: false,
            },
            ProviderId::Facebook => Self {
                auth_url: "https://www.facebook.com/v18.0/dialog/oauth".into(),
                token_url: "https://graph.facebook.com/v18.0/oauth/access_token".into(),
                uses_pkce: false,
                offline_consent_prompt: false,
                upgrade: Some(UpgradeEndpoint {
                    url: "https://graph.facebook.com/oauth/access_token".into(),
                    grant_type: "fb_exchange_token".into(),
                    token_param: "fb_exchange_token".into(),
                    with_client_id: true,
                    with_client_secret: true,
                }),
                refresh: RefreshStyle::ExchangeGrant {
                    url: "https://graph.facebook.com/oauth/access_token".into(),
                    grant_type: "fb_exchange_token".into(),
                    token_param: "fb_exchange_token".into(),
                    with_client_id: true,
                    with_client_secret: true,
                },
                refresh_with_access_token: false,
            },
            ProviderId::TikTok => Self {
                auth_url: "https://www.tiktok.com/v2/auth/authorize/".into(),
                token_url: "https://open.tiktokapis.com/v2/oauth/token/".into(),
                uses_pkce: false,
                offline_consent_prompt: false,
                upgrade: None,
                refresh: RefreshStyle::Standard,
                refresh_with_access_token: false,
            },
            ProviderId::Instagram => Self {
                auth_url: "https://api.instagram.com/oauth/authorize".into(),
                token_url: "https://api.instagram.com/oauth/access_token".into(),
                uses_pkce: false,
                offline_consent_prompt: false,
                upgrade: Some(UpgradeEndpoint {
                    url: "https://graph.instagram.com/access_token".into(),
                    grant_type: "ig_exchange_token".into(),
                    token_param: "access_token".into(),
                    with_client_id: false,
                    with_client_secret: true,
                }),
                refresh: RefreshStyle::ExchangeGrant {
                    url: "https://graph.instagram.com/refresh_access_token".into(),
                    grant_type: "ig_refresh_token".into(),
                    token_param: "access_token".into(),
                    with_client_id: false,
                    with_client_secret: false,
                },
                refresh_with_access_token: true,
            },
        }
    }
}
