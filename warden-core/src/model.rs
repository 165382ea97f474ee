//! Domain model types for Warden.
//!
//! This module defines the core types used throughout Warden:
//! - [`PrincipalKind`] - Which partition a principal lives in (`user` or `expert`)
//! - [`PrincipalId`] - Opaque storage identifier assigned at creation
//! - [`ProviderTag`] - Identifies the identity provider (e.g., `gmail`)
//! - [`Principal`] - A stored, authenticated entity
//! - [`NewPrincipal`] - The unsaved form handed to a store
//! - [`ExternalIdentity`] / [`ProviderProfile`] - What the identity provider told us

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of principal, fixed at creation and never mutated.
///
/// Each kind has its own storage partition; the same external identity may
/// exist once per kind as unrelated principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// An ordinary user.
    User,

    /// An expert.
    Expert,
}

impl PrincipalKind {
    /// Every principal kind, in a stable order.
    pub const ALL: [PrincipalKind; 2] = [PrincipalKind::User, PrincipalKind::Expert];

    /// Get the kind tag as it appears in tokens and session references.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "expert" => Ok(Self::Expert),
            other => Err(ParseError::UnknownKind {
                got: other.to_string(),
            }),
        }
    }
}

/// Opaque storage identifier for a principal.
///
/// Assigned by the store at insert time and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Tag identifying the identity provider a principal signed in with.
///
/// Tags are normalized to lowercase.
///
/// # Examples
///
/// ```
/// use warden_core::ProviderTag;
///
/// assert_eq!(ProviderTag::gmail().as_str(), "gmail");
/// assert_eq!(ProviderTag::new("GMAIL"), ProviderTag::gmail());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderTag(String);

impl ProviderTag {
    /// Create a new provider tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().to_lowercase())
    }

    /// The tag recorded for Google sign-ins.
    pub fn gmail() -> Self {
        Self::new("gmail")
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProviderTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A stored principal.
///
/// Field names serialize in the camelCase shape the web layer already
/// consumes (`firstName`, `authType`, `userType`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Storage identifier.
    pub id: PrincipalId,

    /// Partition this principal lives in.
    #[serde(rename = "userType")]
    pub kind: PrincipalKind,

    pub first_name: String,

    pub last_name: String,

    pub email: String,

    /// The provider's stable subject identifier.
    pub gid: String,

    /// Provider the principal signed in with.
    pub auth_type: ProviderTag,

    pub email_verified: bool,

    /// When the principal was first created.
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Full display name, without a trailing space for single-token names.
    pub fn display_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

/// A principal that has not been persisted yet.
///
/// Stores turn this into a [`Principal`] by assigning an id and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrincipal {
    #[serde(rename = "userType")]
    pub kind: PrincipalKind,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gid: String,
    pub auth_type: ProviderTag,
    pub email_verified: bool,
}

impl NewPrincipal {
    /// Attach a storage identifier and creation time.
    pub fn into_principal(self, id: PrincipalId, created_at: DateTime<Utc>) -> Principal {
        Principal {
            id,
            kind: self.kind,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            gid: self.gid,
            auth_type: self.auth_type,
            email_verified: self.email_verified,
            created_at,
        }
    }
}

/// The profile an identity provider hands back after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    /// The provider's stable subject identifier.
    pub subject: String,

    /// Single display-name string, e.g. "Jane Doe".
    pub display_name: String,

    /// Email addresses, primary first.
    #[serde(default)]
    pub emails: Vec<String>,
}

impl ProviderProfile {
    /// Create a new profile.
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        emails: Vec<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            emails,
        }
    }

    /// Tag this profile with the provider it came from.
    pub fn into_identity(self, provider: ProviderTag) -> ExternalIdentity {
        ExternalIdentity {
            subject: self.subject,
            display_name: self.display_name,
            emails: self.emails,
            provider,
        }
    }
}

/// A provider profile together with the provider tag of the calling context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub subject: String,
    pub display_name: String,
    pub emails: Vec<String>,
    pub provider: ProviderTag,
}

/// Error parsing model values from strings.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown principal kind: '{got}' (expected 'user' or 'expert')")]
    UnknownKind { got: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in PrincipalKind::ALL {
            assert_eq!(kind.as_str().parse::<PrincipalKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = "admin".parse::<PrincipalKind>();
        assert!(matches!(result, Err(ParseError::UnknownKind { .. })));
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&PrincipalKind::Expert).unwrap();
        assert_eq!(json, "\"expert\"");
    }

    #[test]
    fn test_provider_tag_normalization() {
        assert_eq!(ProviderTag::new("GMail").as_str(), "gmail");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(PrincipalId::generate(), PrincipalId::generate());
    }

    #[test]
    fn test_principal_wire_shape() {
        let principal = NewPrincipal {
            kind: PrincipalKind::Expert,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            gid: "g1".to_string(),
            auth_type: ProviderTag::gmail(),
            email_verified: true,
        }
        .into_principal(PrincipalId::new("p1"), Utc::now());

        let value = serde_json::to_value(&principal).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["userType"], "expert");
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["authType"], "gmail");
        assert_eq!(value["emailVerified"], true);
    }

    #[test]
    fn test_display_name_single_token() {
        let principal = NewPrincipal {
            kind: PrincipalKind::User,
            first_name: "Madonna".to_string(),
            last_name: String::new(),
            email: "m@example.com".to_string(),
            gid: "g2".to_string(),
            auth_type: ProviderTag::gmail(),
            email_verified: true,
        }
        .into_principal(PrincipalId::generate(), Utc::now());

        assert_eq!(principal.display_name(), "Madonna");
    }
}
