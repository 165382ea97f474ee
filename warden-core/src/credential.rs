//! Credential issuance.
//!
//! This module provides:
//! - [`Credential`] - A signed token plus its flavor and validity window
//! - [`CredentialKind`] - Access (short-lived) or refresh (long-lived)
//! - [`CredentialClaims`] - The exact claim set carried by every token
//! - [`CredentialIssuer`] - Signs tokens for a principal
//!
//! Credentials are never stored server-side. Their validity is a matter of
//! signature and expiry alone.
//!
//! # Wire format
//!
//! HS256-signed JWTs with claims `{"id": <storage id>, "userType": <kind>, "exp": <unix secs>}`
//! and nothing else.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::model::{Principal, PrincipalKind};
use crate::secret::Secret;

/// Access tokens expire one hour after issuance.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Refresh tokens expire seven days after issuance.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;

/// Error type for credential issuance.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Signing the token failed.
    #[error("failed to sign {kind} token: {message}")]
    Signing { kind: CredentialKind, message: String },
}

/// Flavor of an issued credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Short-lived token authorizing requests.
    Access,

    /// Long-lived token used to obtain new access tokens.
    Refresh,
}

impl CredentialKind {
    /// Lifetime of this flavor.
    pub fn ttl(&self) -> Duration {
        match self {
            Self::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            Self::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Storage identifier of the principal.
    pub id: String,

    /// Principal kind tag.
    #[serde(rename = "userType")]
    pub user_type: PrincipalKind,

    /// Expiry as unix seconds.
    pub exp: i64,
}

/// A signed credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The encoded, signed token.
    pub token: Secret,

    /// Access or refresh.
    pub kind: CredentialKind,

    /// When the token was signed.
    pub issued_at: DateTime<Utc>,

    /// When the token stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Check if this credential has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Signs access and refresh tokens for principals.
///
/// Construction validates the signing secret, so issuance never has to.
/// Issuers are cheap to share behind an `Arc` and safe to call concurrently.
#[derive(Clone)]
pub struct CredentialIssuer {
    encoding_key: EncodingKey,
    header: Header,
}

impl CredentialIssuer {
    /// Create an issuer from the signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the secret is blank.
    pub fn new(signing_secret: &Secret) -> Result<Self, ConfigError> {
        if signing_secret.is_blank() {
            return Err(ConfigError::Missing {
                name: "JWT_SECRET".to_string(),
            });
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_secret.expose().as_bytes()),
            header: Header::new(Algorithm::HS256),
        })
    }

    /// Issue an access token expiring one hour from now.
    pub fn issue_access_token(&self, principal: &Principal) -> Result<Credential, CredentialError> {
        self.issue_at(principal, CredentialKind::Access, Utc::now())
    }

    /// Issue a refresh token expiring seven days from now.
    pub fn issue_refresh_token(
        &self,
        principal: &Principal,
    ) -> Result<Credential, CredentialError> {
        self.issue_at(principal, CredentialKind::Refresh, Utc::now())
    }

    /// Issue an access token as if signed at `now`.
    pub fn issue_access_token_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        self.issue_at(principal, CredentialKind::Access, now)
    }

    /// Issue a refresh token as if signed at `now`.
    pub fn issue_refresh_token_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        self.issue_at(principal, CredentialKind::Refresh, now)
    }

    fn issue_at(
        &self,
        principal: &Principal,
        kind: CredentialKind,
        now: DateTime<Utc>,
    ) -> Result<Credential, CredentialError> {
        // JWT expiry has whole-second resolution.
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let expires_at = issued_at + kind.ttl();

        let claims = CredentialClaims {
            id: principal.id.to_string(),
            user_type: principal.kind,
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&self.header, &claims, &self.encoding_key).map_err(
            |e| CredentialError::Signing {
                kind,
                message: e.to_string(),
            },
        )?;

        tracing::debug!(
            "Issued {} token for {} {} (expires {})",
            kind,
            principal.kind,
            principal.id,
            expires_at.to_rfc3339()
        );

        Ok(Credential {
            token: Secret::new(token),
            kind,
            issued_at,
            expires_at,
        })
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("algorithm", &self.header.alg)
            .finish()
    }
}
