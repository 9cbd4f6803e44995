use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tenant name used when a request does not name one.
pub const DEFAULT_TENANT: &str = "default";

/// Stable identifier for a supported platform.
///
/// The broker serves a closed set of platforms; unknown slugs are a client
/// error, not a configuration escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    YouTube,
    X,
    Facebook,
    TikTok,
    Instagram,
}

/// Raised when a slug does not name a supported platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown provider slug `{0}`")]
pub struct UnknownProviderSlug(pub String);

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::YouTube,
        ProviderId::X,
        ProviderId::Facebook,
        ProviderId::TikTok,
        ProviderId::Instagram,
    ];

    /// Returns the slug form of the provider identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::YouTube => "youtube",
            ProviderId::X => "x",
            ProviderId::Facebook => "facebook",
            ProviderId::TikTok => "tiktok",
            ProviderId::Instagram => "instagram",
        }
    }

    /// Construct a provider identifier from a slug.
    pub fn from_slug(value: impl AsRef<str>) -> Option<Self> {
        match value.as_ref().to_ascii_lowercase().as_str() {
            "youtube" => Some(ProviderId::YouTube),
            "x" => Some(ProviderId::X),
            "facebook" => Some(ProviderId::Facebook),
            "tiktok" => Some(ProviderId::TikTok),
            "instagram" => Some(ProviderId::Instagram),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = UnknownProviderSlug;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s).ok_or_else(|| UnknownProviderSlug(s.to_owned()))
    }
}

impl Serialize for ProviderId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let slug = String::deserialize(deserializer)?;
        Self::from_slug(&slug)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown provider slug `{slug}`")))
    }
}

/// The tuple under which exactly one credential is cached.
///
/// `user_id` is the caller's own internal identifier, never the provider's
/// account id. The tenant disambiguates OAuth app configurations for the
/// same provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub provider: ProviderId,
    pub tenant: String,
}

impl Identity {
    /// Build an identity, normalizing an empty tenant to [`DEFAULT_TENANT`].
    pub fn new(user_id: impl Into<String>, provider: ProviderId, tenant: impl Into<String>) -> Self {
        let tenant = tenant.into();
        let tenant = if tenant.is_empty() {
            DEFAULT_TENANT.to_owned()
        } else {
            tenant
        };
        Self {
            user_id: user_id.into(),
            provider,
            tenant,
        }
    }

    /// Storage key under which the credential is cached.
    pub fn cache_key(&self) -> String {
        format!(
            "token:{}:{}:{}",
            self.tenant,
            self.provider.as_str(),
            self.user_id
        )
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tenant, self.provider, self.user_id)
    }
}

/// OAuth credential bundle as persisted in the credential store.
///
/// Replaced wholesale on every refresh; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Absolute expiry in epoch seconds. Unset means already expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl Token {
    /// Whether the token is stale at `now`, applying the pre-expiry margin.
    ///
    /// An unset or zero expiry counts as stale.
    pub fn is_stale_at(&self, now: u64, margin_secs: u64) -> bool {
        match self.expires_at {
            None | Some(0) => true,
            Some(expires_at) => expires_at <= now.saturating_add(margin_secs),
        }
    }
}
