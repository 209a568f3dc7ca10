//! Resilient request gateway
//!
//! Every outgoing call goes through [`Gateway::execute`], which attaches
//! the stored credential, recognizes the backend's 401 rejection, and runs
//! the refresh-and-retry protocol: the first rejected request starts a
//! single refresh call, every request rejected while it is in flight waits
//! for the same outcome, and each rejected request is retried at most once
//! with the new token. When the refresh itself fails the credential store
//! is cleared and every waiter receives [`GatewayError::SessionExpired`].

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::auth::{AuthSession, LoginRequest, LOGIN_PATH, REFRESH_PATH};
use crate::credentials::CredentialStore;
use crate::request::{ApiClientConfig, ApiError, ApiRequest, ApiResponse};
use crate::transport::{HttpTransport, Transport};

/// Errors surfaced to gateway callers
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The credential could not be refreshed; the user must sign in again.
    /// Callers must not retry on this error.
    #[error("session expired - re-authentication required")]
    SessionExpired,

    /// The request was malformed at the gateway boundary
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Transport or application error, passed through verbatim
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Outcome of one refresh cycle, broadcast to every waiter at once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    /// New credential stored; waiters retry their original request once
    Refreshed,
    /// Refresh failed; waiters receive `SessionExpired` and must not retry
    Expired,
}

/// Whether a refresh call is currently outstanding.
///
/// Requests rejected while a refresh is in flight subscribe to its
/// receiver instead of issuing a second refresh.
enum RefreshState {
    Idle,
    InFlight(watch::Receiver<Option<RefreshOutcome>>),
}

struct GatewayInner {
    transport: Arc<dyn Transport>,
    store: CredentialStore,
    refresh: Mutex<RefreshState>,
    refresh_timeout: Duration,
}

impl GatewayInner {
    /// Perform the refresh call and settle the store accordingly.
    ///
    /// Invariant: this runs on at most one task at a time; the caller
    /// transitions the state machine before spawning it.
    async fn run_refresh(&self) -> RefreshOutcome {
        debug!("access token rejected, refreshing session");

        // No bearer attached: the refresh endpoint authenticates via the
        // long-lived cookie the transport carries.
        let request = ApiRequest::post(REFRESH_PATH);
        let sent = tokio::time::timeout(self.refresh_timeout, self.transport.send(request)).await;

        let session = match sent {
            Ok(Ok(response)) => match response.json::<AuthSession>() {
                Ok(session) => Some(session),
                Err(err) => {
                    warn!(error = %err, "session refresh returned an unreadable payload");
                    None
                }
            },
            Ok(Err(err)) => {
                warn!(error = %err, "session refresh rejected by the backend");
                None
            }
            Err(_) => {
                warn!("session refresh timed out");
                None
            }
        };

        match session {
            Some(session) => {
                self.store.set(session.into_credential());
                debug!("session refreshed");
                RefreshOutcome::Refreshed
            }
            None => {
                self.store.clear();
                RefreshOutcome::Expired
            }
        }
    }
}

/// Authenticated request gateway shared by all screens.
///
/// Cloning is cheap; every clone shares the same credential store and
/// refresh coordination, so concurrent screens cannot trigger more than
/// one refresh between them.
///
/// # Example
///
/// ```rust,no_run
/// use api_client::{ApiClientConfig, ApiRequest, CredentialStore, Gateway};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = CredentialStore::new();
///     let gateway = Gateway::with_config(ApiClientConfig::default(), store)?;
///
///     gateway.login("asha@example.com", "password").await?;
///
///     let temples = gateway.execute(ApiRequest::get("/temples")).await?;
///     println!("status: {}", temples.status);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

impl Gateway {
    /// Create a gateway over an injected transport
    pub fn new(transport: Arc<dyn Transport>, store: CredentialStore) -> Self {
        Self::with_refresh_timeout(transport, store, Duration::from_secs(10))
    }

    /// Create a gateway with a custom bound on the refresh call
    pub fn with_refresh_timeout(
        transport: Arc<dyn Transport>,
        store: CredentialStore,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                transport,
                store,
                refresh: Mutex::new(RefreshState::Idle),
                refresh_timeout,
            }),
        }
    }

    /// Create a gateway over an HTTP transport built from the config
    pub fn with_config(config: ApiClientConfig, store: CredentialStore) -> Result<Self> {
        let refresh_timeout = config.refresh_timeout;
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_refresh_timeout(
            Arc::new(transport),
            store,
            refresh_timeout,
        ))
    }

    /// Credential store backing this gateway
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Execute an authenticated request.
    ///
    /// Any outcome other than the backend's 401 rejection (success,
    /// application errors, network failures) is returned unchanged. A 401
    /// triggers one shared refresh and one retry of this request; a 401 on
    /// the retried request is returned as-is rather than starting another
    /// cycle.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.has_authorization() {
            return Err(GatewayError::InvalidRequest(
                "the Authorization header is managed by the gateway".to_string(),
            ));
        }

        match self.dispatch(request.clone()).await {
            Err(err) if err.is_unauthorized() => self.refresh_and_retry(request).await,
            other => other.map_err(GatewayError::from),
        }
    }

    /// Sign in and store the resulting session
    pub async fn login(
        &self,
        identifier: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<AuthSession> {
        let body = LoginRequest {
            identifier: identifier.into(),
            password: password.into(),
        };
        let request = ApiRequest::post(LOGIN_PATH)
            .json_body(&body)
            .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

        let response = self.inner.transport.send(request).await?;
        let session: AuthSession = response.json()?;

        self.inner.store.set(session.clone().into_credential());
        Ok(session)
    }

    /// Drop the active session.
    ///
    /// Purely local: the backend's refresh cookie is left to expire on its
    /// own, matching the mobile app's sign-out behavior.
    pub fn logout(&self) {
        self.inner.store.clear();
    }

    async fn dispatch(&self, mut request: ApiRequest) -> std::result::Result<ApiResponse, ApiError> {
        let credential = self.inner.store.get();
        if credential.is_authenticated() {
            request.headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", credential.access_token),
            );
        }
        self.inner.transport.send(request).await
    }

    async fn refresh_and_retry(&self, request: ApiRequest) -> Result<ApiResponse> {
        match self.refresh_outcome().await {
            RefreshOutcome::Refreshed => self.dispatch(request).await.map_err(GatewayError::from),
            RefreshOutcome::Expired => Err(GatewayError::SessionExpired),
        }
    }

    /// Join the in-flight refresh or start one.
    ///
    /// At most one refresh call is outstanding at any time, however many
    /// requests fail simultaneously. The refresh runs on a detached task
    /// so a caller dropped mid-wait cannot strand the state in flight.
    async fn refresh_outcome(&self) -> RefreshOutcome {
        let mut rx = {
            let mut state = self.inner.refresh.lock().await;
            match &*state {
                RefreshState::InFlight(rx) => rx.clone(),
                RefreshState::Idle => {
                    let (tx, rx) = watch::channel(None);
                    *state = RefreshState::InFlight(rx.clone());

                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        let outcome = inner.run_refresh().await;
                        // Back to Idle before broadcasting: a failure
                        // arriving after resolution must start a fresh
                        // cycle, not observe this one.
                        *inner.refresh.lock().await = RefreshState::Idle;
                        let _ = tx.send(Some(outcome));
                    });

                    rx
                }
            }
        };

        loop {
            if let Some(outcome) = *rx.borrow() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without resolving; treat as a failed refresh.
                return RefreshOutcome::Expired;
            }
        }
    }
}
