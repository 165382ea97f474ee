//! Session serialization.
//!
//! The session transport (a signed cookie, a server-side session table) only
//! ever sees a [`SessionReference`]: the principal's id and kind. Signing that
//! transport is the caller's job. On every later request the codec turns the
//! reference back into the full principal.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::model::{Principal, PrincipalId, PrincipalKind};
use crate::store::PrincipalStore;

/// Minimal session payload.
///
/// Serializes as `{"id": "...", "userType": "user"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionReference {
    pub id: PrincipalId,

    #[serde(rename = "userType")]
    pub kind: PrincipalKind,
}

impl SessionReference {
    pub fn new(id: PrincipalId, kind: PrincipalKind) -> Self {
        Self { id, kind }
    }
}

/// Translates between principals and session references.
pub struct SessionCodec<S: PrincipalStore> {
    store: S,
}

impl<S: PrincipalStore> SessionCodec<S> {
    /// Create a codec reading from `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Project a principal to its session reference.
    pub fn encode(&self, principal: &Principal) -> SessionReference {
        SessionReference::new(principal.id.clone(), principal.kind)
    }

    /// Reconstitute the principal a reference points at.
    ///
    /// # Errors
    ///
    /// - [`AuthError::PrincipalNotFound`] if the principal no longer exists;
    ///   treat as "not authenticated"
    /// - [`AuthError::Persistence`] if the store fails
    pub async fn decode(&self, reference: &SessionReference) -> Result<Principal, AuthError> {
        match self.store.find_by_id(reference.kind, &reference.id).await? {
            Some(principal) => Ok(principal),
            None => {
                debug!(
                    "Session references missing {} {}",
                    reference.kind, reference.id
                );
                Err(AuthError::PrincipalNotFound {
                    kind: reference.kind,
                    id: reference.id.clone(),
                })
            }
        }
    }
}
