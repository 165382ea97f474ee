//! Error types for the authentication flow.

use thiserror::Error;

use crate::config::ConfigError;
use crate::credential::CredentialError;
use crate::model::{PrincipalId, PrincipalKind};
use crate::store::StoreError;

/// Error returned by the resolver, the strategy handlers and the session codec.
///
/// Any of these means no session is established; the caller redirects to a
/// failure page or answers with an error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider payload cannot be turned into a principal.
    #[error("malformed identity from provider: {reason}")]
    MalformedIdentity { reason: String },

    /// The principal store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// A session reference points at a principal that no longer exists.
    #[error("{kind} {id} not found")]
    PrincipalNotFound { kind: PrincipalKind, id: PrincipalId },

    /// Token signing failed.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),
}

impl AuthError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedIdentity {
            reason: reason.into(),
        }
    }

    /// Whether the caller should treat this as "not authenticated" rather
    /// than as a server fault.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::PrincipalNotFound { .. })
    }
}

/// Top-level error type encompassing all Warden errors.
#[derive(Debug, Error)]
pub enum WardenError {
    /// Error from the authentication flow.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Error from principal storage.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Startup configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error from the provider exchange.
    #[cfg(feature = "oauth")]
    #[error("exchange error: {0}")]
    Exchange(#[from] crate::oauth::ExchangeError),
}
