use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ImageApiConfig;

/// Path appended to the configured base URL for edit calls
pub const IMAGE_EDITS_PATH: &str = "/v1/images/edits";

/// Credentials for the upstream image API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Both the base URL and the key are set
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Full URL of the edits endpoint (one trailing slash on the base is dropped)
    #[must_use]
    pub fn edits_url(&self) -> String {
        let base = self.base_url.strip_suffix('/').unwrap_or(&self.base_url);
        format!("{base}{IMAGE_EDITS_PATH}")
    }
}

impl From<&ImageApiConfig> for ApiConfig {
    fn from(config: &ImageApiConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }
}

/// Runtime-replaceable API configuration shared by every request
///
/// Updates apply to all later edit calls regardless of session.
#[derive(Debug, Default)]
pub struct ApiConfigStore {
    current: RwLock<ApiConfig>,
}

impl ApiConfigStore {
    #[must_use]
    pub fn new(initial: ApiConfig) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Copy of the configuration in effect right now
    #[must_use]
    pub fn get(&self) -> ApiConfig {
        self.current.read().clone()
    }

    pub fn update(&self, config: ApiConfig) {
        info!(
            base_url = %config.base_url,
            has_api_key = config.has_api_key(),
            "Image API configuration updated"
        );
        *self.current.write() = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_url_strips_one_trailing_slash() {
        assert_eq!(
            ApiConfig::new("https://api.example.com/", "k").edits_url(),
            "https://api.example.com/v1/images/edits"
        );
        assert_eq!(
            ApiConfig::new("https://api.example.com", "k").edits_url(),
            "https://api.example.com/v1/images/edits"
        );
    }

    #[test]
    fn test_is_complete() {
        assert!(ApiConfig::new("https://x", "k").is_complete());
        assert!(!ApiConfig::new("", "k").is_complete());
        assert!(!ApiConfig::new("https://x", "").is_complete());
    }

    #[test]
    fn test_store_update_replaces_config() {
        let store = ApiConfigStore::default();
        assert!(!store.get().has_api_key());

        store.update(ApiConfig::new("https://x", "k"));
        assert_eq!(store.get(), ApiConfig::new("https://x", "k"));
    }
}
