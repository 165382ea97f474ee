//! Startup configuration for the authentication core.
//!
//! Everything here is validated once, before any request is served. A missing
//! signing secret or provider credential produces a [`ConfigError`] that the
//! surrounding service decides how to handle; nothing in the request path
//! re-checks configuration.
//!
//! # Environment
//!
//! | Variable               | Meaning                                   |
//! |------------------------|-------------------------------------------|
//! | `JWT_SECRET`           | HMAC secret for access/refresh tokens     |
//! | `GOOGLE_CLIENT_ID`     | OAuth client id                           |
//! | `GOOGLE_CLIENT_SECRET` | OAuth client secret                       |
//! | `BACKEND_URL`          | Public base URL, e.g. `http://localhost`  |
//! | `PORT`                 | Public port appended to `BACKEND_URL`     |

use thiserror::Error;
use url::Url;

use crate::model::PrincipalKind;
use crate::secret::Secret;

/// Configuration error raised during startup validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting: {name}")]
    Missing { name: String },

    /// A setting is present but unusable.
    #[error("invalid setting {name}: {message}")]
    Invalid { name: String, message: String },
}

/// OAuth client credentials for the identity provider.
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: Secret,
}

/// Validated configuration for the authentication core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret used to sign access and refresh tokens.
    pub signing_secret: Secret,

    /// Provider client credentials.
    pub google: GoogleCredentials,

    /// Public base URL, without the port.
    pub backend_url: Url,

    /// Public port appended to `backend_url` in callback URLs.
    pub port: u16,
}

impl AuthConfig {
    /// Read and validate configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read and validate configuration through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Secrets are kept byte for byte; whitespace only counts as blank.
        let raw = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::Missing {
                    name: name.to_string(),
                })
        };
        let required = |name: &str| raw(name).map(|v| v.trim().to_string());

        let signing_secret = Secret::new(raw("JWT_SECRET")?);
        let client_id = required("GOOGLE_CLIENT_ID")?;
        let client_secret = Secret::new(raw("GOOGLE_CLIENT_SECRET")?);
        let base = required("BACKEND_URL")?;
        let port = required("PORT")?;

        let port: u16 = port.parse().map_err(|e| ConfigError::Invalid {
            name: "PORT".to_string(),
            message: format!("{}", e),
        })?;

        let backend_url = Url::parse(&base).map_err(|e| ConfigError::Invalid {
            name: "BACKEND_URL".to_string(),
            message: format!("{}", e),
        })?;

        let config = Self {
            signing_secret,
            google: GoogleCredentials {
                client_id,
                client_secret,
            },
            backend_url,
            port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants on an already-built configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_blank() {
            return Err(ConfigError::Missing {
                name: "JWT_SECRET".to_string(),
            });
        }
        if self.google.client_id.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "GOOGLE_CLIENT_ID".to_string(),
            });
        }
        if self.google.client_secret.is_blank() {
            return Err(ConfigError::Missing {
                name: "GOOGLE_CLIENT_SECRET".to_string(),
            });
        }
        if self.backend_url.port().is_some() {
            return Err(ConfigError::Invalid {
                name: "BACKEND_URL".to_string(),
                message: "must not carry a port; set PORT instead".to_string(),
            });
        }
        if !matches!(self.backend_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                name: "BACKEND_URL".to_string(),
                message: format!("unsupported scheme '{}'", self.backend_url.scheme()),
            });
        }
        Ok(())
    }

    /// Redirect URI registered with the provider for `kind`'s sign-in.
    ///
    /// Shaped `{BACKEND_URL}:{PORT}/api/v1/{kind}/auth/google/callback`. The
    /// port is always written out, even when it is the scheme default.
    pub fn callback_url(&self, kind: PrincipalKind) -> String {
        format!(
            "{}:{}/api/v1/{}/auth/google/callback",
            self.base_url(),
            self.port,
            kind
        )
    }

    /// `BACKEND_URL` as configured, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.backend_url.as_str().trim_end_matches('/')
    }
}
