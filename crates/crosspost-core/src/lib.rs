pub mod endpoints;
pub mod pkce;
pub mod state;
pub mod types;

pub use endpoints::{ProviderEndpoints, RefreshStyle, UpgradeEndpoint};
pub use state::{StateError, StatePayload, decode_state, encode_state};
pub use types::{DEFAULT_TENANT, Identity, ProviderId, Token};
