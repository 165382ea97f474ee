//! # Warden Core
//!
//! Federated sign-in for Warden: exchanging an identity provider's profile for
//! an internal principal plus signed access and refresh credentials, for two
//! principal kinds (`user` and `expert`).
//!
//! This crate provides:
//! - Domain types for principals, provider identities and session references
//! - The [`PrincipalStore`] trait with in-memory and JSON-file backends
//! - [`PrincipalResolver`] (lookup-or-create), [`CredentialIssuer`] (JWT signing)
//!   and [`AuthStrategies`] (one callback handler per kind)
//! - [`SessionCodec`] for turning session references back into principals
//! - Startup validation of signing and provider settings ([`AuthConfig`])
//! - (with the `oauth` feature) the Google code-for-profile exchange
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden_core::{AuthConfig, AuthStrategies, CredentialIssuer, FilePrincipalStore, PrincipalKind};
//!
//! let config = AuthConfig::from_env()?;
//! let issuer = CredentialIssuer::new(&config.signing_secret)?;
//! let strategies = AuthStrategies::google(FilePrincipalStore::load()?, issuer);
//!
//! let outcome = strategies.authenticate(PrincipalKind::User, profile).await?;
//! println!("signed in {}", outcome.principal.id);
//! ```

pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod secret;
pub mod session;
pub mod store;
pub mod strategy;

#[cfg(feature = "oauth")]
pub mod oauth;

// Re-export commonly used types at crate root
pub use model::{
    ExternalIdentity,
    NewPrincipal,
    Principal,
    PrincipalId,
    PrincipalKind,
    ProviderProfile,
    ProviderTag,
};

pub use store::{
    FilePrincipalStore,
    MemoryPrincipalStore,
    PrincipalStore,
    StoreError,
};

pub use credential::{
    Credential,
    CredentialClaims,
    CredentialError,
    CredentialIssuer,
    CredentialKind,
};

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, WardenError};
pub use resolver::PrincipalResolver;
pub use secret::Secret;
pub use session::{SessionCodec, SessionReference};
pub use strategy::{AuthOutcome, AuthStrategies, AuthStrategy};

#[cfg(feature = "oauth")]
pub use oauth::{AuthorizationRequest, ExchangeError, GoogleExchange, ProfileExchange};
