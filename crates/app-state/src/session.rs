//! Reactive session status
//!
//! Bridges credential store events to a watch channel the navigation
//! layer subscribes to. When the session ends (explicit sign-out or a
//! failed refresh) every subscriber observes `Unauthenticated` and is
//! expected to stop issuing authenticated requests and present the
//! sign-in entry point. How that entry point is presented is the UI's
//! concern, not this crate's.

use api_client::{Credential, CredentialStore, SessionEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Whether the app currently holds a usable session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum AuthStatus {
    /// A credential is present
    Authenticated {
        /// Backend id of the signed-in user, when known
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    /// No credential; the user must sign in
    Unauthenticated,
}

impl AuthStatus {
    /// Whether this status represents a held session
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated { .. })
    }

    fn from_credential(credential: &Credential) -> Self {
        if credential.is_authenticated() {
            AuthStatus::Authenticated {
                user_id: credential.user.as_ref().map(|u| u.id.clone()),
            }
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

/// Publishes the credential store's session status to watchers.
///
/// # Example
///
/// ```
/// use api_client::{Credential, CredentialStore, UserRef};
/// use app_state::SessionState;
///
/// let store = CredentialStore::new();
/// let session = SessionState::new(store.clone());
/// assert!(!session.status().is_authenticated());
///
/// store.set(Credential::new("token-1", Some(UserRef::new("user-7"))));
/// assert!(session.status().is_authenticated());
/// ```
#[derive(Clone)]
pub struct SessionState {
    rx: watch::Receiver<AuthStatus>,
    store: CredentialStore,
}

impl SessionState {
    /// Wire a session state to the given credential store
    pub fn new(store: CredentialStore) -> Self {
        let (tx, rx) = watch::channel(AuthStatus::from_credential(&store.get()));

        store.on_session_event(move |event, credential| {
            if event == SessionEvent::Ended {
                info!("session ended, app must return to sign-in");
            }
            let _ = tx.send(AuthStatus::from_credential(credential));
        });

        Self { rx, store }
    }

    /// Snapshot of the current status
    pub fn status(&self) -> AuthStatus {
        self.rx.borrow().clone()
    }

    /// Subscribe to status changes.
    ///
    /// The navigation layer holds this receiver and awaits `changed()`;
    /// an `Unauthenticated` value is its cue to route to sign-in.
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.rx.clone()
    }

    /// The credential store backing this state
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }
}
