//! Principal resolution: lookup-or-create by external identity.
//!
//! A returning identity always resolves to the principal created on its first
//! sign-in, with its stored fields untouched. Only an unknown identity causes a
//! write, and that write goes through the store's atomic constrained insert.

use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::model::{ExternalIdentity, NewPrincipal, Principal, PrincipalKind};
use crate::store::{PrincipalStore, StoreError};

/// Split a provider display name into first and last name.
///
/// The first whitespace-delimited token is the first name; the remaining
/// tokens, re-joined with single spaces, are the last name (possibly empty).
/// Returns `None` for a blank name.
///
/// # Examples
///
/// ```
/// use warden_core::resolver::split_display_name;
///
/// assert_eq!(
///     split_display_name("Mary Jane Watson"),
///     Some(("Mary".to_string(), "Jane Watson".to_string()))
/// );
/// assert_eq!(
///     split_display_name("Madonna"),
///     Some(("Madonna".to_string(), String::new()))
/// );
/// ```
pub fn split_display_name(display_name: &str) -> Option<(String, String)> {
    let mut tokens = display_name.split_whitespace();
    let first = tokens.next()?.to_string();
    let last = tokens.collect::<Vec<_>>().join(" ");
    Some((first, last))
}

/// Finds or creates principals for external identities.
///
/// # Type Parameters
///
/// * `S` - The principal store implementation to use
pub struct PrincipalResolver<S: PrincipalStore> {
    store: S,
}

impl<S: PrincipalStore> PrincipalResolver<S> {
    /// Create a resolver over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `identity` to a principal in `kind`'s partition.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedIdentity`] if the subject is blank, or if a new
    ///   principal has to be created and the display name or email is missing
    /// - [`AuthError::Persistence`] if the store fails
    pub async fn resolve(
        &self,
        kind: PrincipalKind,
        identity: &ExternalIdentity,
    ) -> Result<Principal, AuthError> {
        if identity.subject.trim().is_empty() {
            return Err(AuthError::malformed("missing subject identifier"));
        }

        if let Some(existing) = self
            .store
            .find_by_external(kind, &identity.subject, &identity.provider)
            .await?
        {
            debug!(
                "Found existing {} {} for {} subject {}",
                kind, existing.id, identity.provider, identity.subject
            );
            return Ok(existing);
        }

        let new_principal = new_principal_from(kind, identity)?;

        match self.store.insert(new_principal).await {
            Ok(created) => {
                info!(
                    "Created {} {} for {} subject {}",
                    kind, created.id, identity.provider, identity.subject
                );
                Ok(created)
            }
            Err(StoreError::Conflict { .. }) => {
                warn!(
                    "Concurrent first sign-in for {} subject {}; using the stored {}",
                    identity.provider, identity.subject, kind
                );
                self.store
                    .find_by_external(kind, &identity.subject, &identity.provider)
                    .await?
                    .ok_or_else(|| {
                        AuthError::Persistence(StoreError::BackendError {
                            message: format!(
                                "{} for subject {} conflicted on insert but cannot be read back",
                                kind, identity.subject
                            ),
                        })
                    })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Build the unsaved principal for a first sign-in.
fn new_principal_from(
    kind: PrincipalKind,
    identity: &ExternalIdentity,
) -> Result<NewPrincipal, AuthError> {
    let (first_name, last_name) = split_display_name(&identity.display_name)
        .ok_or_else(|| AuthError::malformed("missing display name"))?;

    let email = identity
        .emails
        .first()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::malformed("missing email address"))?
        .to_string();

    Ok(NewPrincipal {
        kind,
        first_name,
        last_name,
        email,
        gid: identity.subject.clone(),
        auth_type: identity.provider.clone(),
        // The provider has already verified the address.
        email_verified: true,
    })
}
