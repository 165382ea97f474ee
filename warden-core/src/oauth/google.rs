//! Authorization code flow against Google.
//!
//! # Flow Overview
//!
//! 1. Build the authorization URL for the principal kind's callback
//! 2. The person signs in at Google and is redirected back with a code
//! 3. Exchange the code for a provider access token
//! 4. Fetch the OpenID userinfo document and map it to a [`ProviderProfile`]
//!
//! The provider's own tokens are discarded once the profile is read; Warden
//! issues its own credentials afterwards.

use async_trait::async_trait;
use oauth2::{
    AuthorizationCode, CsrfToken, Scope, TokenResponse, reqwest::async_http_client,
};
use serde::Deserialize;

use super::{AuthorizationRequest, ExchangeError, ProfileExchange, create_oauth_client};
use crate::config::AuthConfig;
use crate::model::{PrincipalKind, ProviderProfile};
use crate::provider::ProviderConfig;
use crate::secret::Secret;

/// The subset of the OpenID userinfo response Warden reads.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserInfo> for ProviderProfile {
    fn from(info: UserInfo) -> Self {
        ProviderProfile {
            subject: info.sub,
            display_name: info.name.unwrap_or_default(),
            emails: info.email.into_iter().collect(),
        }
    }
}

/// Google implementation of [`ProfileExchange`].
pub struct GoogleExchange {
    provider: ProviderConfig,
    client_id: String,
    client_secret: Secret,
    user_callback: String,
    expert_callback: String,
    http_client: reqwest::Client,
}

impl GoogleExchange {
    /// Create an exchange from explicit settings.
    ///
    /// # Arguments
    ///
    /// * `provider` - Endpoint configuration
    /// * `client_id` / `client_secret` - OAuth client credentials
    /// * `user_callback` / `expert_callback` - Redirect URIs per principal kind
    pub fn new(
        provider: ProviderConfig,
        client_id: impl Into<String>,
        client_secret: Secret,
        user_callback: impl Into<String>,
        expert_callback: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
            client_secret,
            user_callback: user_callback.into(),
            expert_callback: expert_callback.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Create an exchange against Google's production endpoints.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::with_provider(ProviderConfig::google(), config)
    }

    /// Create an exchange against `provider`'s endpoints with validated settings.
    pub fn with_provider(provider: ProviderConfig, config: &AuthConfig) -> Self {
        Self::new(
            provider,
            config.google.client_id.clone(),
            config.google.client_secret.clone(),
            config.callback_url(PrincipalKind::User),
            config.callback_url(PrincipalKind::Expert),
        )
    }

    fn callback(&self, kind: PrincipalKind) -> &str {
        match kind {
            PrincipalKind::User => &self.user_callback,
            PrincipalKind::Expert => &self.expert_callback,
        }
    }

    fn client(&self, kind: PrincipalKind) -> Result<oauth2::basic::BasicClient, ExchangeError> {
        create_oauth_client(
            &self.provider,
            &self.client_id,
            self.client_secret.expose(),
            self.callback(kind),
        )
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ExchangeError> {
        let response = self
            .http_client
            .get(&self.provider.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ExchangeError::Profile {
                message: format!("request failed: {}", e),
            })?
            .error_for_status()
            .map_err(|e| ExchangeError::Profile {
                message: format!("provider returned an error: {}", e),
            })?;

        let info: UserInfo = response.json().await.map_err(|e| ExchangeError::Profile {
            message: format!("invalid userinfo document: {}", e),
        })?;

        Ok(info.into())
    }
}

impl std::fmt::Debug for GoogleExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleExchange")
            .field("provider", &self.provider.name)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl ProfileExchange for GoogleExchange {
    fn authorization_url(
        &self,
        kind: PrincipalKind,
    ) -> Result<AuthorizationRequest, ExchangeError> {
        let client = self.client(kind)?;

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in &self.provider.default_scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, csrf_state) = request.url();
        Ok(AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_state.secret().to_string(),
        })
    }

    async fn exchange_code(
        &self,
        kind: PrincipalKind,
        code: &str,
    ) -> Result<ProviderProfile, ExchangeError> {
        let client = self.client(kind)?;

        let token = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| ExchangeError::CodeExchange {
                message: format!("{}", e),
            })?;

        tracing::debug!("Exchanged authorization code for {} sign-in", kind);

        self.fetch_profile(token.access_token().secret()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> GoogleExchange {
        GoogleExchange::new(
            ProviderConfig::google(),
            "client-123",
            Secret::new("shh"),
            "http://localhost:5000/api/v1/user/auth/google/callback",
            "http://localhost:5000/api/v1/expert/auth/google/callback",
        )
    }

    #[test]
    fn test_authorization_url_uses_kind_callback() {
        let request = exchange().authorization_url(PrincipalKind::Expert).unwrap();

        assert!(request.url.starts_with("https://accounts.google.com/o/oauth2/v2/auth"));
        assert!(request.url.contains("client_id=client-123"));
        assert!(request.url.contains("expert%2Fauth%2Fgoogle%2Fcallback"));
        assert!(request.url.contains(&format!("state={}", request.csrf_state)));
        assert!(!request.csrf_state.is_empty());
    }

    #[test]
    fn test_authorization_states_differ() {
        let exchange = exchange();
        let a = exchange.authorization_url(PrincipalKind::User).unwrap();
        let b = exchange.authorization_url(PrincipalKind::User).unwrap();
        assert_ne!(a.csrf_state, b.csrf_state);
    }

    #[test]
    fn test_userinfo_maps_to_profile() {
        let info: UserInfo = serde_json::from_str(
            r#"{"sub":"g123","name":"Jane Doe","email":"jane@x.com","email_verified":true}"#,
        )
        .unwrap();

        let profile = ProviderProfile::from(info);
        assert_eq!(profile.subject, "g123");
        assert_eq!(profile.display_name, "Jane Doe");
        assert_eq!(profile.emails, vec!["jane@x.com"]);
    }

    #[test]
    fn test_userinfo_without_email() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"g123"}"#).unwrap();

        let profile = ProviderProfile::from(info);
        assert!(profile.emails.is_empty());
        assert!(profile.display_name.is_empty());
    }

    #[test]
    fn test_debug_hides_client_secret() {
        let debug = format!("{:?}", exchange());
        assert!(!debug.contains("shh"));
    }
}
