//! Authentication Flow Integration Tests
//!
//! End-to-end tests for the authenticated request layer: credential
//! injection, refresh-and-retry under concurrent failures, and session
//! teardown reaching the app state layer.

use api_client::test_utils::{tokens, FakeBackend, RefreshScript};
use api_client::{ApiRequest, Credential, CredentialStore, Gateway, GatewayError, UserRef};
use app_state::{AuthStatus, SessionState};
use std::sync::Arc;

fn store_with(token: &str) -> CredentialStore {
    let store = CredentialStore::new();
    store.set(Credential::new(token, Some(UserRef::new("user-7"))));
    store
}

/// A request carrying a valid credential comes back unchanged, with no
/// refresh traffic at all
#[tokio::test]
async fn test_valid_credential_round_trip() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID));
    let gateway = Gateway::new(backend.clone(), store_with(tokens::VALID));

    let response = gateway.execute(ApiRequest::get("/temples")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.data_calls(), 1);
}

/// An expired credential is refreshed once and the original request
/// retried with the new token
#[tokio::test]
async fn test_expired_credential_refreshed_and_retried() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID));
    let store = store_with(tokens::STALE);
    let gateway = Gateway::new(backend.clone(), store.clone());

    let response = gateway.execute(ApiRequest::get("/recipes")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.data_calls(), 2);
    assert_eq!(store.get().access_token, tokens::VALID);
}

/// Concurrent failures within the same window share a single refresh
#[tokio::test]
async fn test_thundering_herd_shares_one_refresh() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID).hold_refresh_until_unauthorized(3));
    let store = store_with(tokens::STALE);
    let gateway = Gateway::new(backend.clone(), store.clone());

    let mut handles = Vec::new();
    for path in ["/temples", "/recipes", "/yoga/programs"] {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.execute(ApiRequest::get(path)).await
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, 200);
    }

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.get().access_token, tokens::VALID);
}

/// A failed refresh surfaces `SessionExpired`, empties the store, and the
/// app state layer observes the teardown
#[tokio::test]
async fn test_failed_refresh_tears_down_session() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID).with_refresh(RefreshScript::Fail));
    let store = store_with(tokens::STALE);
    let session = SessionState::new(store.clone());
    let mut status_rx = session.subscribe();

    let gateway = Gateway::new(backend.clone(), store.clone());
    let err = gateway.execute(ApiRequest::get("/temples")).await.unwrap_err();

    assert!(matches!(err, GatewayError::SessionExpired));
    assert_eq!(store.get(), Credential::empty());
    assert_eq!(backend.refresh_calls(), 1);

    status_rx.changed().await.unwrap();
    assert_eq!(*status_rx.borrow(), AuthStatus::Unauthenticated);
}

/// Non-authorization errors pass through verbatim without touching the
/// session
#[tokio::test]
async fn test_non_auth_error_passes_through() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID).with_broken_path("/shop/orders"));
    let store = store_with(tokens::VALID);
    let gateway = Gateway::new(backend.clone(), store.clone());

    let err = gateway
        .execute(ApiRequest::get("/shop/orders"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Api(api) => {
            assert_eq!(api.status(), 500);
            assert_eq!(api.error(), "InternalError");
        }
        other => panic!("expected pass-through error, got {:?}", other),
    }
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.data_calls(), 1);
    assert_eq!(store.get().access_token, tokens::VALID);
}

/// A retried request rejected a second time is returned as-is instead of
/// starting another refresh cycle
#[tokio::test]
async fn test_second_rejection_returned_verbatim() {
    let backend = Arc::new(
        FakeBackend::new(tokens::VALID)
            .with_refresh(RefreshScript::IssueRejected(tokens::GHOST.to_string())),
    );
    let gateway = Gateway::new(backend.clone(), store_with(tokens::STALE));

    let err = gateway.execute(ApiRequest::get("/news")).await.unwrap_err();

    match err {
        GatewayError::Api(api) => assert!(api.is_unauthorized()),
        other => panic!("expected the second 401 verbatim, got {:?}", other),
    }
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.data_calls(), 2);
}

/// Login populates the store and flips the app state to authenticated
#[tokio::test]
async fn test_login_then_authenticated_requests() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID));
    let store = CredentialStore::new();
    let session = SessionState::new(store.clone());
    let gateway = Gateway::new(backend.clone(), store.clone());

    assert_eq!(session.status(), AuthStatus::Unauthenticated);

    gateway.login("asha@example.com", "password").await.unwrap();

    assert_eq!(
        session.status(),
        AuthStatus::Authenticated {
            user_id: Some("user-7".to_string())
        }
    );

    let response = gateway.execute(ApiRequest::get("/temples")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(backend.refresh_calls(), 0);
}

/// Sign-out clears the store and routes the app to the sign-in entry point
#[tokio::test]
async fn test_logout_routes_to_sign_in() {
    let backend = Arc::new(FakeBackend::new(tokens::VALID));
    let store = store_with(tokens::VALID);
    let session = SessionState::new(store.clone());
    let mut status_rx = session.subscribe();

    let gateway = Gateway::new(backend, store.clone());
    gateway.logout();

    status_rx.changed().await.unwrap();
    assert_eq!(*status_rx.borrow(), AuthStatus::Unauthenticated);
    assert!(!store.is_authenticated());
}

/// Waiters queued behind a failing refresh are all released with the
/// terminal error, none left suspended
#[tokio::test]
async fn test_failed_refresh_releases_every_waiter() {
    let backend = Arc::new(
        FakeBackend::new(tokens::VALID)
            .with_refresh(RefreshScript::Fail)
            .hold_refresh_until_unauthorized(4),
    );
    let gateway = Gateway::new(backend.clone(), store_with(tokens::STALE));

    let mut handles = Vec::new();
    for path in ["/temples", "/recipes", "/news", "/yoga/programs"] {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.execute(ApiRequest::get(path)).await
        }));
    }

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, GatewayError::SessionExpired));
    }

    assert_eq!(backend.refresh_calls(), 1);
}
