//! JSON-RPC API handlers for the daemon.

use anyhow::{Context, Result};
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::{ErrorCode, ErrorObject, ErrorObjectOwned};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_core::{
    AuthConfig, AuthError, AuthStrategies, CredentialIssuer, FilePrincipalStore, GoogleExchange,
    Principal, PrincipalKind, PrincipalStore, ProfileExchange, ProviderProfile, SessionCodec,
    SessionReference,
};

use super::types::{AuthenticateResponse, AuthorizationUrlResponse, codes};
use crate::config::DaemonConfig;

/// Store handle shared by the strategies and the session codec.
pub type SharedStore = Arc<dyn PrincipalStore>;

/// How long an issued CSRF state stays redeemable.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// CSRF states handed out by `authorization_url` and not yet redeemed.
///
/// Each state is bound to the principal kind it was issued for and can be
/// redeemed once.
#[derive(Debug)]
pub struct PendingStates {
    ttl: Duration,
    states: Mutex<HashMap<String, (PrincipalKind, Instant)>>,
}

impl PendingStates {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Remember a freshly issued state.
    pub async fn issue(&self, state: String, kind: PrincipalKind) {
        let mut states = self.states.lock().await;
        let now = Instant::now();
        states.retain(|_, (_, issued)| now.duration_since(*issued) < self.ttl);
        states.insert(state, (kind, now));
    }

    /// Consume `state`. Returns false if it was never issued, already used,
    /// expired, or issued for the other kind.
    pub async fn redeem(&self, state: &str, kind: PrincipalKind) -> bool {
        match self.states.lock().await.remove(state) {
            Some((issued_kind, issued)) => issued_kind == kind && issued.elapsed() < self.ttl,
            None => false,
        }
    }
}

impl Default for PendingStates {
    fn default() -> Self {
        Self::new(STATE_TTL)
    }
}

/// State shared across RPC handlers.
pub struct ApiState {
    /// Sign-in handlers for both principal kinds
    pub strategies: Arc<AuthStrategies<SharedStore>>,
    /// Session reference translation
    pub sessions: Arc<SessionCodec<SharedStore>>,
    /// Provider exchange, absent when disabled in the config
    pub exchange: Option<Arc<dyn ProfileExchange>>,
    /// Outstanding CSRF states
    pub pending: Arc<PendingStates>,
}

impl ApiState {
    /// Create API state from validated configuration.
    pub fn new(config: &DaemonConfig, auth: &AuthConfig) -> Result<Self> {
        let path = config.principals_path();
        let store = FilePrincipalStore::load_from_path(&path)
            .with_context(|| format!("Failed to load principals from {:?}", path))?;
        let issuer = CredentialIssuer::new(&auth.signing_secret)?;

        let mut state = Self::with_store(Arc::new(store), issuer);
        if config.enable_exchange {
            state.exchange = Some(Arc::new(GoogleExchange::from_config(auth)));
        }
        Ok(state)
    }

    /// Create API state over an existing store, without a provider exchange
    /// (useful for tests).
    pub fn with_store(store: SharedStore, issuer: CredentialIssuer) -> Self {
        Self {
            strategies: Arc::new(AuthStrategies::google(store.clone(), issuer)),
            sessions: Arc::new(SessionCodec::new(store)),
            exchange: None,
            pending: Arc::new(PendingStates::default()),
        }
    }

    /// Attach a provider exchange.
    pub fn with_exchange(mut self, exchange: Arc<dyn ProfileExchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }
}

/// JSON-RPC API trait definition.
#[rpc(server)]
pub trait WardenApi {
    /// Complete a sign-in with a profile the caller already obtained.
    ///
    /// The caller is responsible for having verified the provider redirect.
    ///
    /// # Parameters
    ///
    /// - `kind`: `"user"` or `"expert"`
    /// - `profile`: `{subject, displayName, emails}`
    #[method(name = "authenticate")]
    async fn authenticate(
        &self,
        kind: String,
        profile: ProviderProfile,
    ) -> RpcResult<AuthenticateResponse>;

    /// Project a principal to its session reference.
    #[method(name = "encode_session")]
    async fn encode_session(&self, principal: Principal) -> RpcResult<SessionReference>;

    /// Reconstitute the principal behind a session reference.
    ///
    /// Fails with code `-32002` when the principal no longer exists.
    #[method(name = "decode_session")]
    async fn decode_session(&self, reference: SessionReference) -> RpcResult<Principal>;

    /// Build the provider authorization URL for `kind`'s sign-in.
    ///
    /// The returned `state` is remembered by the daemon and must come back
    /// through `complete_login` within ten minutes.
    #[method(name = "authorization_url")]
    async fn authorization_url(&self, kind: String) -> RpcResult<AuthorizationUrlResponse>;

    /// Exchange the provider's authorization code and complete the sign-in.
    ///
    /// `state` is the value the provider echoed back on the callback. It must
    /// match a state issued by `authorization_url` for the same kind, and is
    /// consumed whether or not the exchange succeeds. Otherwise the call fails
    /// with code `-32004` before the provider is contacted.
    #[method(name = "complete_login")]
    async fn complete_login(
        &self,
        kind: String,
        code: String,
        state: String,
    ) -> RpcResult<AuthenticateResponse>;
}

/// Implementation of the Warden API.
pub struct WardenApiImpl {
    state: ApiState,
}

impl WardenApiImpl {
    /// Create a new API implementation with the given state.
    pub fn new(state: ApiState) -> Self {
        Self { state }
    }

    fn exchange(&self) -> RpcResult<&Arc<dyn ProfileExchange>> {
        self.state.exchange.as_ref().ok_or_else(|| {
            ErrorObject::owned(
                codes::EXCHANGE_FAILED,
                "Provider exchange is not enabled",
                None::<()>,
            )
        })
    }

    async fn sign_in(
        &self,
        kind: PrincipalKind,
        profile: ProviderProfile,
    ) -> RpcResult<AuthenticateResponse> {
        let outcome = self
            .state
            .strategies
            .authenticate(kind, profile)
            .await
            .map_err(auth_error)?;
        let session = self.state.sessions.encode(&outcome.principal);
        Ok(AuthenticateResponse::new(outcome, session))
    }
}

#[async_trait::async_trait]
impl WardenApiServer for WardenApiImpl {
    async fn authenticate(
        &self,
        kind: String,
        profile: ProviderProfile,
    ) -> RpcResult<AuthenticateResponse> {
        info!("RPC: authenticate({}, subject {})", kind, profile.subject);
        let kind = parse_kind(&kind)?;
        self.sign_in(kind, profile).await
    }

    async fn encode_session(&self, principal: Principal) -> RpcResult<SessionReference> {
        debug!("RPC: encode_session({} {})", principal.kind, principal.id);
        Ok(self.state.sessions.encode(&principal))
    }

    async fn decode_session(&self, reference: SessionReference) -> RpcResult<Principal> {
        debug!("RPC: decode_session({} {})", reference.kind, reference.id);
        self.state
            .sessions
            .decode(&reference)
            .await
            .map_err(auth_error)
    }

    async fn authorization_url(&self, kind: String) -> RpcResult<AuthorizationUrlResponse> {
        debug!("RPC: authorization_url({})", kind);
        let kind = parse_kind(&kind)?;
        let request = self
            .exchange()?
            .authorization_url(kind)
            .map_err(exchange_error)?;

        self.state
            .pending
            .issue(request.csrf_state.clone(), kind)
            .await;

        Ok(AuthorizationUrlResponse {
            url: request.url,
            state: request.csrf_state,
        })
    }

    async fn complete_login(
        &self,
        kind: String,
        code: String,
        state: String,
    ) -> RpcResult<AuthenticateResponse> {
        info!("RPC: complete_login({})", kind);
        let kind = parse_kind(&kind)?;
        let exchange = self.exchange()?;

        if !self.state.pending.redeem(&state, kind).await {
            warn!("Rejected {} callback with an unknown or expired state", kind);
            return Err(ErrorObject::owned(
                codes::INVALID_STATE,
                "Unknown, reused or expired state",
                None::<()>,
            ));
        }

        let profile = exchange
            .exchange_code(kind, &code)
            .await
            .map_err(exchange_error)?;
        self.sign_in(kind, profile).await
    }
}

pub(crate) fn parse_kind(kind: &str) -> RpcResult<PrincipalKind> {
    kind.parse().map_err(|e| {
        ErrorObject::owned(
            ErrorCode::InvalidParams.code(),
            format!("{}", e),
            None::<()>,
        )
    })
}

fn auth_error(err: AuthError) -> ErrorObjectOwned {
    let code = match &err {
        AuthError::MalformedIdentity { .. } => codes::MALFORMED_IDENTITY,
        AuthError::PrincipalNotFound { .. } => codes::UNAUTHENTICATED,
        AuthError::Persistence(_) | AuthError::Credential(_) => {
            warn!("Authentication failed: {}", err);
            ErrorCode::InternalError.code()
        }
    };
    ErrorObject::owned(code, format!("{}", err), None::<()>)
}

fn exchange_error(err: warden_core::ExchangeError) -> ErrorObjectOwned {
    warn!("Provider exchange failed: {}", err);
    ErrorObject::owned(codes::EXCHANGE_FAILED, format!("{}", err), None::<()>)
}
