//! Provider exchange: authorization URLs and code-for-profile exchange.
//!
//! This module provides:
//! - [`ProfileExchange`] - The seam between the web layer's OAuth callback and
//!   the strategy handlers
//! - [`google::GoogleExchange`] - Authorization code flow against Google
//!
//! # Features
//!
//! This module is only available when the `oauth` feature is enabled.

pub mod google;

pub use google::GoogleExchange;

use async_trait::async_trait;
use oauth2::{basic::BasicClient, AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PrincipalKind, ProviderProfile};
use crate::provider::ProviderConfig;

/// Error type for the provider exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The provider configuration is unusable.
    #[error("invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    /// The provider rejected the authorization code.
    #[error("code exchange failed: {message}")]
    CodeExchange { message: String },

    /// Fetching the profile failed.
    #[error("profile request failed: {message}")]
    Profile { message: String },
}

/// Where to send the browser, and the state to check on the way back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub url: String,

    /// CSRF state; the callback must present the same value.
    pub csrf_state: String,
}

/// Turns the provider's redirect into a [`ProviderProfile`].
///
/// Sign-in for each principal kind uses its own callback URL, so every
/// operation takes the kind.
#[async_trait]
pub trait ProfileExchange: Send + Sync {
    /// Build the authorization URL for `kind`'s sign-in.
    fn authorization_url(&self, kind: PrincipalKind) -> Result<AuthorizationRequest, ExchangeError>;

    /// Exchange an authorization code for the signed-in person's profile.
    async fn exchange_code(
        &self,
        kind: PrincipalKind,
        code: &str,
    ) -> Result<ProviderProfile, ExchangeError>;
}

/// Create an OAuth2 client from a provider configuration.
///
/// # Arguments
///
/// * `config` - Provider configuration
/// * `client_id` - OAuth client ID
/// * `client_secret` - OAuth client secret
/// * `redirect_uri` - Callback URL registered with the provider
pub fn create_oauth_client(
    config: &ProviderConfig,
    client_id: impl Into<String>,
    client_secret: impl Into<String>,
    redirect_uri: impl Into<String>,
) -> Result<BasicClient, ExchangeError> {
    let auth_url = AuthUrl::new(config.auth_url.clone()).map_err(|e| ExchangeError::InvalidConfig {
        message: format!("invalid auth URL: {}", e),
    })?;

    let token_url =
        TokenUrl::new(config.token_url.clone()).map_err(|e| ExchangeError::InvalidConfig {
            message: format!("invalid token URL: {}", e),
        })?;

    let redirect_url =
        RedirectUrl::new(redirect_uri.into()).map_err(|e| ExchangeError::InvalidConfig {
            message: format!("invalid redirect URL: {}", e),
        })?;

    let client = BasicClient::new(
        ClientId::new(client_id.into()),
        Some(ClientSecret::new(client_secret.into())),
        auth_url,
        Some(token_url),
    )
    .set_redirect_uri(redirect_url);

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_oauth_client() {
        let client = create_oauth_client(
            &ProviderConfig::google(),
            "test-client-id",
            "test-secret",
            "http://localhost:5000/api/v1/user/auth/google/callback",
        );

        assert!(client.is_ok());
    }

    #[test]
    fn test_create_oauth_client_invalid_urls() {
        let config = ProviderConfig::google().with_auth_url("not a valid url");

        let client = create_oauth_client(
            &config,
            "test-client-id",
            "test-secret",
            "http://localhost:5000/callback",
        );

        assert!(matches!(client, Err(ExchangeError::InvalidConfig { .. })));
    }
}
