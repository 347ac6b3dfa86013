//! Gateway configuration.

use std::path::PathBuf;

use arkgate_session::{TokenConfig, VerifyConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RemoteConfig
// ---------------------------------------------------------------------------

/// Where the remote blob store is and which credentials to present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API root, without a trailing slash.
    pub base_url: String,

    /// Access credential to start with. When absent the first refresh
    /// provides one.
    pub access_token: Option<String>,

    /// Long-lived credential traded for access credentials. Without it
    /// session validation always fails with an auth error.
    pub refresh_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: arkgate_remote::DEFAULT_BASE_URL.to_string(),
            access_token: None,
            refresh_token: None,
        }
    }
}

impl RemoteConfig {
    /// Builds the HTTP client for [`base_url`](Self::base_url).
    #[cfg(feature = "http")]
    pub fn client(&self) -> Result<arkgate_remote::ArkacdnClient, arkgate_remote::RemoteError> {
        arkgate_remote::ArkacdnClient::new(&self.base_url)
    }
}

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Everything a [`Gateway`](crate::Gateway) needs besides its
/// collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Directory for `tokens.json`, `sessions.json` and `accounts.json`.
    /// `None` keeps all local state in memory.
    pub data_dir: Option<PathBuf>,

    pub remote: RemoteConfig,

    pub tokens: TokenConfig,

    /// Read-back polling after a session upload.
    pub verify: VerifyConfig,
}

/// File names of the persisted stores under `data_dir`.
pub(crate) const TOKENS_FILE: &str = "tokens.json";
pub(crate) const SESSIONS_FILE: &str = "sessions.json";
pub(crate) const ACCOUNTS_FILE: &str = "accounts.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = GatewayConfig::default();

        assert_eq!(config.data_dir, None);
        assert_eq!(config.remote.base_url, "https://api.arkacdn.cloud");
        assert_eq!(config.tokens.ttl_secs, 180);
        assert_eq!(config.verify.attempts, 3);
        assert_eq!(config.verify.delay_ms, 250);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{"remote": {"refresh_token": "rt"}, "tokens": {"ttl_secs": 60}}"#,
        )
        .unwrap();

        assert_eq!(config.remote.refresh_token.as_deref(), Some("rt"));
        assert_eq!(config.remote.base_url, arkgate_remote::DEFAULT_BASE_URL);
        assert_eq!(config.tokens.ttl_secs, 60);
        assert_eq!(config.verify, VerifyConfig::default());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_client_rejects_bad_base_url() {
        let config = RemoteConfig {
            base_url: "not a url".into(),
            ..RemoteConfig::default()
        };

        assert!(config.client().is_err());
    }
}
