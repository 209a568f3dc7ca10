//! Credential storage
//!
//! Holds the bearer credential and user identity for the active session.
//! The store is the single source of truth for whether the app is
//! authenticated: the gateway reads it on every outgoing call, replaces it
//! wholesale after a refresh, and clears it when the session ends. No
//! other component mutates the credential directly.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The authenticated user as returned by the backend.
///
/// The request layer stores this value for screens to display and passes
/// it through untouched; unknown fields are preserved verbatim so the
/// backend can evolve its user object without client changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    /// Backend identifier for the user
    pub id: String,

    /// Remaining user fields, carried as-is
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl UserRef {
    /// Create a user reference with no extra fields
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Bearer credential attached to outgoing requests.
///
/// A credential with a non-empty access token means the app is considered
/// authenticated; the empty credential means it is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque bearer value for the `Authorization` header
    pub access_token: String,

    /// The principal the token belongs to, if the backend reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

impl Credential {
    /// Create a credential from a token and its user
    pub fn new(access_token: impl Into<String>, user: Option<UserRef>) -> Self {
        Self {
            access_token: access_token.into(),
            user,
        }
    }

    /// The unauthenticated credential
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this credential authenticates requests
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Session lifecycle events emitted by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credential replaced (login or refresh)
    Updated,
    /// Credential cleared; the app must stop issuing authenticated
    /// requests and present an unauthenticated entry point
    Ended,
}

/// Callback function type for session events
pub type SessionCallback = Arc<dyn Fn(SessionEvent, &Credential) + Send + Sync>;

#[derive(Default)]
struct StoreInner {
    credential: RwLock<Credential>,
    callbacks: RwLock<Vec<SessionCallback>>,
}

/// Shared store for the active credential.
///
/// Cloning is cheap and every clone observes the same state, so the
/// gateway, the app state layer, and tests can hold the store at once.
/// `set` and `clear` are atomic with respect to `get`: a reader always
/// sees a credential from exactly one write, never a mix of two.
///
/// # Example
///
/// ```
/// use api_client::{Credential, CredentialStore, UserRef};
///
/// let store = CredentialStore::new();
/// assert!(!store.is_authenticated());
///
/// store.set(Credential::new("token-1", Some(UserRef::new("user-7"))));
/// assert!(store.is_authenticated());
///
/// store.clear();
/// assert_eq!(store.get(), Credential::empty());
/// ```
#[derive(Clone, Default)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

impl CredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current credential
    pub fn get(&self) -> Credential {
        self.inner.credential.read().clone()
    }

    /// Whether a credential is currently held
    pub fn is_authenticated(&self) -> bool {
        self.inner.credential.read().is_authenticated()
    }

    /// Replace the stored credential wholesale.
    ///
    /// Fires [`SessionEvent::Updated`] so downstream consumers that show
    /// the identity pick up the change on their next read.
    pub fn set(&self, credential: Credential) {
        {
            let mut current = self.inner.credential.write();
            *current = credential.clone();
        }
        self.emit(SessionEvent::Updated, &credential);
    }

    /// Reset the store to the unauthenticated credential.
    ///
    /// Fires [`SessionEvent::Ended`], the signal for the embedding app to
    /// route the user to its unauthenticated entry point.
    pub fn clear(&self) {
        let credential = Credential::empty();
        {
            let mut current = self.inner.credential.write();
            *current = credential.clone();
        }
        self.emit(SessionEvent::Ended, &credential);
    }

    /// Register a callback for session events.
    ///
    /// Callbacks run synchronously on the thread that mutated the store,
    /// after the credential lock has been released.
    pub fn on_session_event<F>(&self, callback: F)
    where
        F: Fn(SessionEvent, &Credential) + Send + Sync + 'static,
    {
        self.inner.callbacks.write().push(Arc::new(callback));
    }

    fn emit(&self, event: SessionEvent, credential: &Credential) {
        let callbacks = self.inner.callbacks.read().clone();
        for callback in callbacks {
            callback(event, credential);
        }
    }
}
