use std::{collections::HashMap, env, fs, path::Path};

use crosspost_core::{
    endpoints::ProviderEndpoints,
    types::{DEFAULT_TENANT, ProviderId},
};
use serde::Deserialize;
use thiserror::Error;

use crate::error::AuthError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration, loaded from a YAML file with environment
/// overrides for deployment-specific values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Fs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Fs,
            path: "./credentials".to_owned(),
        }
    }
}

/// Per-tenant provider credentials, keyed by provider slug.
pub type TenantConfig = HashMap<ProviderId, ProviderCredentials>;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCredentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AppConfig {
    /// Load from the path in `CROSSPOST_CONFIG` (default `config.yaml`),
    /// then apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("CROSSPOST_CONFIG").unwrap_or_else(|_| "config.yaml".to_owned());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = env::var("CROSSPOST_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Some(port) = env::var("CROSSPOST_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(path) = env::var("CROSSPOST_STORE_DIR") {
            if !path.is_empty() {
                self.store.path = path;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tenants.is_empty() {
            return Err(ConfigError::Invalid("no tenants configured".to_owned()));
        }
        for (tenant, providers) in &self.tenants {
            for (provider, credentials) in providers {
                if credentials.client_id.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "tenant `{tenant}` provider `{provider}` has an empty client_id"
                    )));
                }
                if credentials.client_secret.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "tenant `{tenant}` provider `{provider}` has an empty client_secret"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Everything the engines need for one (provider, tenant) pair.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub provider: ProviderId,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub endpoints: ProviderEndpoints,
}

/// Resolves provider names to credentials and endpoints per tenant.
///
/// Immutable at runtime; constructed once from configuration and injected
/// into the services that need it.
#[derive(Debug, Default)]
pub struct ProviderDirectory {
    tenants: HashMap<String, TenantConfig>,
}

impl ProviderDirectory {
    pub fn new(tenants: HashMap<String, TenantConfig>) -> Self {
        Self { tenants }
    }

    pub fn resolve(
        &self,
        provider: ProviderId,
        tenant: &str,
        redirect_uri: &str,
    ) -> Result<ResolvedProvider, AuthError> {
        let tenant = if tenant.is_empty() {
            DEFAULT_TENANT
        } else {
            tenant
        };
        let credentials = self
            .tenants
            .get(tenant)
            .and_then(|providers| providers.get(&provider))
            .ok_or_else(|| AuthError::TenantNotConfigured {
                tenant: tenant.to_owned(),
                provider,
            })?;
        Ok(ResolvedProvider {
            provider,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scopes: credentials.scopes.clone(),
            redirect_uri: redirect_uri.to_owned(),
            endpoints: ProviderEndpoints::of(provider),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
server:
  host: 127.0.0.1
  port: 9090
store:
  backend: memory
tenants:
  acme:
    youtube:
      client_id: yt-client
      client_secret: yt-secret
      scopes: [ "https://www.googleapis.com/auth/youtube.upload" ]
    x:
      client_id: x-client
      client_secret: x-secret
      scopes: [ "tweet.read", "tweet.write", "offline.access" ]
"#
    }

    #[test]
    fn parses_tenant_provider_map() {
        let config: AppConfig = serde_yaml::from_str(sample_yaml()).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        let acme = config.tenants.get("acme").expect("tenant");
        assert_eq!(
            acme.get(&ProviderId::X).expect("x credentials").client_id,
            "x-client"
        );
    }

    #[test]
    fn rejects_empty_credentials() {
        let yaml = r#"
tenants:
  acme:
    x:
      client_id: ""
      client_secret: secret
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).expect("parse");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_provider_slug_in_config() {
        let yaml = r#"
tenants:
  acme:
    myspace:
      client_id: id
      client_secret: secret
"#;
        assert!(serde_yaml::from_str::<AppConfig>(yaml).is_err());
    }

    #[test]
    fn directory_resolves_configured_pairs() {
        let config: AppConfig = serde_yaml::from_str(sample_yaml()).expect("parse");
        let directory = ProviderDirectory::new(config.tenants);

        let resolved = directory
            .resolve(ProviderId::X, "acme", "https://app.example.com/cb")
            .expect("resolved");
        assert_eq!(resolved.client_id, "x-client");
        assert!(resolved.endpoints.uses_pkce);
        assert_eq!(resolved.redirect_uri, "https://app.example.com/cb");

        let missing = directory.resolve(ProviderId::TikTok, "acme", "");
        assert!(matches!(
            missing,
            Err(AuthError::TenantNotConfigured { .. })
        ));

        let unknown_tenant = directory.resolve(ProviderId::X, "globex", "");
        assert!(matches!(
            unknown_tenant,
            Err(AuthError::TenantNotConfigured { .. })
        ));
    }

    #[test]
    fn empty_tenant_resolves_via_default_name() {
        let yaml = r#"
tenants:
  default:
    tiktok:
      client_id: tt-client
      client_secret: tt-secret
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).expect("parse");
        let directory = ProviderDirectory::new(config.tenants);
        let resolved = directory
            .resolve(ProviderId::TikTok, "", "")
            .expect("resolved");
        assert_eq!(resolved.client_id, "tt-client");
    }
}
