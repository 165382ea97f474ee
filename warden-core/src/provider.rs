//! Identity provider endpoint configuration.
//!
//! Warden federates with a single provider. [`ProviderConfig::google`] carries
//! its production endpoints; tests build a config pointing at a mock server.

use serde::{Deserialize, Serialize};

use crate::model::ProviderTag;

/// Endpoints and defaults for an OAuth identity provider.
///
/// # Example
///
/// ```
/// use warden_core::provider::ProviderConfig;
///
/// let google = ProviderConfig::google();
/// assert_eq!(google.tag.as_str(), "gmail");
/// assert!(google.default_scopes.contains(&"email".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Tag recorded on principals created through this provider.
    pub tag: ProviderTag,

    /// Human-readable name (e.g., "Google").
    pub name: String,

    /// OAuth authorization endpoint URL.
    pub auth_url: String,

    /// OAuth token endpoint URL.
    pub token_url: String,

    /// Endpoint returning the signed-in person's profile.
    pub userinfo_url: String,

    /// Scopes requested on every authorization.
    pub default_scopes: Vec<String>,
}

impl ProviderConfig {
    /// Create a new provider configuration with empty endpoints.
    pub fn new(tag: impl Into<ProviderTag>, name: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            name: name.into(),
            auth_url: String::new(),
            token_url: String::new(),
            userinfo_url: String::new(),
            default_scopes: Vec::new(),
        }
    }

    /// Google sign-in.
    pub fn google() -> Self {
        Self {
            tag: ProviderTag::gmail(),
            name: "Google".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            default_scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
        }
    }

    /// Set the authorization URL.
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Set the token URL.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Set the userinfo URL.
    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// Set the default scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::google()
    }
}
