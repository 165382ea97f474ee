//! Authentication strategy handlers, one per principal kind.
//!
//! A handler runs after the provider exchange has already succeeded. Each call
//! walks the same states:
//!
//! ```text
//! Start -> Resolve -> Issue -> Done
//!             |         |
//!             +---------+--> Failed
//! ```
//!
//! Resolution may create a principal. That creation is not rolled back if
//! issuance fails afterwards; the orphaned principal is valid and the next
//! successful sign-in resolves to it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_core::{AuthStrategies, CredentialIssuer, MemoryPrincipalStore, PrincipalKind, ProviderProfile};
//!
//! let strategies = AuthStrategies::google(Arc::new(MemoryPrincipalStore::new()), issuer);
//! let profile = ProviderProfile::new("g123", "Jane Doe", vec!["jane@x.com".into()]);
//! let outcome = strategies.get(PrincipalKind::User).authenticate(profile).await?;
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::credential::{Credential, CredentialIssuer};
use crate::error::AuthError;
use crate::model::{Principal, PrincipalKind, ProviderProfile, ProviderTag};
use crate::resolver::PrincipalResolver;
use crate::store::PrincipalStore;

/// Result of a successful authentication callback.
///
/// The web layer turns this into cookies and a redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthOutcome {
    pub principal: Principal,
    pub access_token: Credential,
    pub refresh_token: Credential,
}

/// Handles provider callbacks for one principal kind.
pub struct AuthStrategy<S: PrincipalStore> {
    kind: PrincipalKind,
    provider: ProviderTag,
    resolver: Arc<PrincipalResolver<S>>,
    issuer: Arc<CredentialIssuer>,
}

impl<S: PrincipalStore> AuthStrategy<S> {
    /// Create a handler for `kind` sign-ins through `provider`.
    pub fn new(
        kind: PrincipalKind,
        provider: ProviderTag,
        resolver: Arc<PrincipalResolver<S>>,
        issuer: Arc<CredentialIssuer>,
    ) -> Self {
        Self {
            kind,
            provider,
            resolver,
            issuer,
        }
    }

    /// The principal kind this handler signs in.
    pub fn kind(&self) -> PrincipalKind {
        self.kind
    }

    /// The provider tag recorded on principals this handler creates.
    pub fn provider(&self) -> &ProviderTag {
        &self.provider
    }

    /// Complete one callback: resolve the principal, then issue both tokens.
    pub async fn authenticate(&self, profile: ProviderProfile) -> Result<AuthOutcome, AuthError> {
        let identity = profile.into_identity(self.provider.clone());

        let principal = self
            .resolver
            .resolve(self.kind, &identity)
            .await
            .inspect_err(|e| {
                warn!(
                    "{} sign-in failed resolving {} subject {}: {}",
                    self.kind, self.provider, identity.subject, e
                )
            })?;

        let (access_token, refresh_token) = self.issue(&principal).inspect_err(|e| {
            warn!(
                "{} sign-in failed issuing credentials for {}: {}",
                self.kind, principal.id, e
            )
        })?;

        info!("{} {} signed in via {}", self.kind, principal.id, self.provider);

        Ok(AuthOutcome {
            principal,
            access_token,
            refresh_token,
        })
    }

    fn issue(&self, principal: &Principal) -> Result<(Credential, Credential), AuthError> {
        let now = Utc::now();
        let access = self.issuer.issue_access_token_at(principal, now)?;
        let refresh = self.issuer.issue_refresh_token_at(principal, now)?;
        Ok((access, refresh))
    }
}

/// The per-kind handlers, selectable by [`PrincipalKind`].
///
/// Both handlers share one resolver (and so one store) and one issuer.
pub struct AuthStrategies<S: PrincipalStore> {
    user: AuthStrategy<S>,
    expert: AuthStrategy<S>,
}

impl<S: PrincipalStore> AuthStrategies<S> {
    /// Build both handlers for `provider`.
    pub fn new(store: S, issuer: CredentialIssuer, provider: ProviderTag) -> Self {
        let resolver = Arc::new(PrincipalResolver::new(store));
        let issuer = Arc::new(issuer);

        Self {
            user: AuthStrategy::new(
                PrincipalKind::User,
                provider.clone(),
                resolver.clone(),
                issuer.clone(),
            ),
            expert: AuthStrategy::new(PrincipalKind::Expert, provider, resolver, issuer),
        }
    }

    /// Build both handlers for Google sign-in (`gmail` provider tag).
    pub fn google(store: S, issuer: CredentialIssuer) -> Self {
        Self::new(store, issuer, ProviderTag::gmail())
    }

    /// The handler for `kind`.
    pub fn get(&self, kind: PrincipalKind) -> &AuthStrategy<S> {
        match kind {
            PrincipalKind::User => &self.user,
            PrincipalKind::Expert => &self.expert,
        }
    }

    /// Convenience for `self.get(kind).authenticate(profile)`.
    pub async fn authenticate(
        &self,
        kind: PrincipalKind,
        profile: ProviderProfile,
    ) -> Result<AuthOutcome, AuthError> {
        self.get(kind).authenticate(profile).await
    }

    /// The store shared by both handlers.
    pub fn store(&self) -> &S {
        self.user.resolver.store()
    }
}
