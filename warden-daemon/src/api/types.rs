//! API request/response types for the daemon JSON-RPC interface.

use serde::{Deserialize, Serialize};
use warden_core::{AuthOutcome, Principal, SessionReference};

/// Application-defined JSON-RPC error codes.
pub mod codes {
    /// The provider profile cannot be turned into a principal.
    pub const MALFORMED_IDENTITY: i32 = -32001;

    /// The session reference no longer points at a principal.
    pub const UNAUTHENTICATED: i32 = -32002;

    /// The code exchange is disabled or the provider rejected it.
    pub const EXCHANGE_FAILED: i32 = -32003;

    /// The callback's CSRF state was not issued by this daemon, was already
    /// used, or has expired.
    pub const INVALID_STATE: i32 = -32004;
}

/// Response to a successful sign-in.
///
/// The caller sets cookies from the tokens and stores `session` in its
/// session transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    /// The signed-in principal.
    pub principal: Principal,
    /// Signed access token
    pub access_token: String,
    /// Access token expiry (ISO 8601)
    pub access_token_expires_at: String,
    /// Signed refresh token
    pub refresh_token: String,
    /// Refresh token expiry (ISO 8601)
    pub refresh_token_expires_at: String,
    /// Session reference for the caller's session transport
    pub session: SessionReference,
}

impl AuthenticateResponse {
    pub fn new(outcome: AuthOutcome, session: SessionReference) -> Self {
        Self {
            access_token_expires_at: outcome.access_token.expires_at.to_rfc3339(),
            refresh_token_expires_at: outcome.refresh_token.expires_at.to_rfc3339(),
            access_token: outcome.access_token.token.expose().to_string(),
            refresh_token: outcome.refresh_token.token.expose().to_string(),
            principal: outcome.principal,
            session,
        }
    }
}

/// Response carrying an authorization URL to redirect the browser to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationUrlResponse {
    /// Provider authorization URL
    pub url: String,
    /// CSRF state the callback must echo back
    pub state: String,
}
