//! Integration tests for the sign-in flow.
//!
//! These tests drive the strategy handlers end to end:
//! - First and repeat sign-in for the same identity
//! - Independence of the user and expert partitions
//! - The claims and lifetimes of issued tokens
//! - Concurrent first sign-ins racing on the same identity

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};
use warden_core::{
    AuthError, AuthStrategies, CredentialClaims, CredentialIssuer, MemoryPrincipalStore,
    NewPrincipal, Principal, PrincipalId, PrincipalKind, PrincipalStore, ProviderProfile,
    ProviderTag, Secret, StoreError,
};

const SECRET: &str = "integration-test-secret";

/// Store wrapper counting inserts.
#[derive(Default)]
struct CountingStore {
    inner: MemoryPrincipalStore,
    inserts: AtomicUsize,
}

#[async_trait]
impl PrincipalStore for CountingStore {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        self.inner.find_by_external(kind, gid, provider).await
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        self.inner.find_by_id(kind, id).await
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(principal).await
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        self.inner.remove(kind, id).await
    }
}

/// Store whose first external lookup misses, as if another request created
/// the principal between this request's lookup and its insert.
struct RacingStore {
    inner: MemoryPrincipalStore,
    missed_once: AtomicBool,
}

#[async_trait]
impl PrincipalStore for RacingStore {
    async fn find_by_external(
        &self,
        kind: PrincipalKind,
        gid: &str,
        provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        if !self.missed_once.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_by_external(kind, gid, provider).await
    }

    async fn find_by_id(
        &self,
        kind: PrincipalKind,
        id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        self.inner.find_by_id(kind, id).await
    }

    async fn insert(&self, principal: NewPrincipal) -> Result<Principal, StoreError> {
        self.inner.insert(principal).await
    }

    async fn remove(&self, kind: PrincipalKind, id: &PrincipalId) -> Result<bool, StoreError> {
        self.inner.remove(kind, id).await
    }
}

/// Store that always fails.
struct BrokenStore;

#[async_trait]
impl PrincipalStore for BrokenStore {
    async fn find_by_external(
        &self,
        _kind: PrincipalKind,
        _gid: &str,
        _provider: &ProviderTag,
    ) -> Result<Option<Principal>, StoreError> {
        Err(StoreError::BackendError {
            message: "connection refused".to_string(),
        })
    }

    async fn find_by_id(
        &self,
        _kind: PrincipalKind,
        _id: &PrincipalId,
    ) -> Result<Option<Principal>, StoreError> {
        Err(StoreError::BackendError {
            message: "connection refused".to_string(),
        })
    }

    async fn insert(&self, _principal: NewPrincipal) -> Result<Principal, StoreError> {
        Err(StoreError::BackendError {
            message: "connection refused".to_string(),
        })
    }

    async fn remove(&self, _kind: PrincipalKind, _id: &PrincipalId) -> Result<bool, StoreError> {
        Err(StoreError::BackendError {
            message: "connection refused".to_string(),
        })
    }
}

fn issuer() -> CredentialIssuer {
    CredentialIssuer::new(&Secret::new(SECRET)).unwrap()
}

fn jane() -> ProviderProfile {
    ProviderProfile::new("g123", "Jane Doe", vec!["jane@x.com".to_string()])
}

fn decode(token: &Secret) -> CredentialClaims {
    jsonwebtoken::decode::<CredentialClaims>(
        token.expose(),
        &DecodingKey::from_secret(SECRET.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .unwrap()
    .claims
}

#[tokio::test]
async fn test_first_google_login_then_repeat() {
    let store = Arc::new(CountingStore::default());
    let strategies = AuthStrategies::google(store.clone(), issuer());

    let first = strategies
        .authenticate(PrincipalKind::User, jane())
        .await
        .unwrap();

    assert_eq!(first.principal.kind, PrincipalKind::User);
    assert_eq!(first.principal.first_name, "Jane");
    assert_eq!(first.principal.last_name, "Doe");
    assert_eq!(first.principal.email, "jane@x.com");
    assert!(first.principal.email_verified);

    let access = decode(&first.access_token.token);
    assert_eq!(access.id, first.principal.id.to_string());
    assert_eq!(access.user_type, PrincipalKind::User);
    let refresh = decode(&first.refresh_token.token);
    assert_eq!(refresh.id, first.principal.id.to_string());

    // Expiry has whole-second resolution.
    sleep(Duration::from_millis(1100)).await;

    let second = strategies
        .authenticate(PrincipalKind::User, jane())
        .await
        .unwrap();

    assert_eq!(second.principal.id, first.principal.id);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert!(second.access_token.expires_at > first.access_token.expires_at);
    assert!(second.refresh_token.expires_at > first.refresh_token.expires_at);
}

#[tokio::test]
async fn test_resolution_is_idempotent_for_every_kind() {
    for kind in PrincipalKind::ALL {
        let store = Arc::new(CountingStore::default());
        let strategies = AuthStrategies::google(store.clone(), issuer());

        let a = strategies.authenticate(kind, jane()).await.unwrap();
        let b = strategies.authenticate(kind, jane()).await.unwrap();

        assert_eq!(a.principal.id, b.principal.id);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_user_and_expert_are_distinct_principals() {
    let store = Arc::new(CountingStore::default());
    let strategies = AuthStrategies::google(store.clone(), issuer());

    let user = strategies
        .authenticate(PrincipalKind::User, jane())
        .await
        .unwrap();
    let expert = strategies
        .authenticate(PrincipalKind::Expert, jane())
        .await
        .unwrap();

    assert_ne!(user.principal.id, expert.principal.id);
    assert_eq!(decode(&expert.access_token.token).user_type, PrincipalKind::Expert);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_token_lifetimes() {
    let strategies = AuthStrategies::google(MemoryPrincipalStore::new(), issuer());

    let outcome = strategies
        .authenticate(PrincipalKind::Expert, jane())
        .await
        .unwrap();

    let access = &outcome.access_token;
    let refresh = &outcome.refresh_token;
    assert_eq!((access.expires_at - access.issued_at).num_seconds(), 3600);
    assert_eq!((refresh.expires_at - refresh.issued_at).num_seconds(), 604_800);
    assert_eq!(decode(&access.token).exp, access.expires_at.timestamp());
    assert_eq!(decode(&refresh.token).exp, refresh.expires_at.timestamp());
}

#[tokio::test]
async fn test_insert_conflict_refetches_existing_principal() {
    let inner = MemoryPrincipalStore::new();
    let winner = inner
        .insert(NewPrincipal {
            kind: PrincipalKind::User,
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@x.com".to_string(),
            gid: "g123".to_string(),
            auth_type: ProviderTag::gmail(),
            email_verified: true,
        })
        .await
        .unwrap();

    let store = RacingStore {
        inner,
        missed_once: AtomicBool::new(false),
    };
    let strategies = AuthStrategies::google(store, issuer());

    let outcome = strategies
        .authenticate(PrincipalKind::User, jane())
        .await
        .unwrap();

    assert_eq!(outcome.principal, winner);
    assert_eq!(strategies.store().inner.len(PrincipalKind::User).unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_first_logins_create_one_principal() {
    let store = Arc::new(MemoryPrincipalStore::new());
    let strategies = Arc::new(AuthStrategies::google(store.clone(), issuer()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let strategies = strategies.clone();
        handles.push(tokio::spawn(async move {
            strategies.authenticate(PrincipalKind::Expert, jane()).await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().principal.id);
    }

    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(store.len(PrincipalKind::Expert).unwrap(), 1);
}

#[tokio::test]
async fn test_store_failure_surfaces_as_persistence_error() {
    let strategies = AuthStrategies::google(BrokenStore, issuer());

    let result = strategies.authenticate(PrincipalKind::User, jane()).await;

    match result {
        Err(AuthError::Persistence(StoreError::BackendError { message })) => {
            assert_eq!(message, "connection refused");
        }
        other => panic!("expected persistence error, got {:?}", other.map(|o| o.principal)),
    }
}

#[tokio::test]
async fn test_malformed_profile_creates_nothing() {
    let store = Arc::new(CountingStore::default());
    let strategies = AuthStrategies::google(store.clone(), issuer());

    let no_email = ProviderProfile::new("g1", "Jane Doe", vec![]);
    let no_name = ProviderProfile::new("g2", "", vec!["a@x.com".to_string()]);

    for profile in [no_email, no_name] {
        let result = strategies.authenticate(PrincipalKind::User, profile).await;
        assert!(matches!(result, Err(AuthError::MalformedIdentity { .. })));
    }
    assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
}
