//! Test fixtures for exercising the request layer
//!
//! Provides a scripted in-memory backend that enforces bearer tokens the
//! way the real service does, so gateway tests can drive 401/refresh/retry
//! sequences deterministically without a network.

#![allow(dead_code)] // Test utilities may not all be used yet

use crate::auth::{LOGIN_PATH, REFRESH_PATH};
use crate::request::{ApiError, ApiRequest, ApiResponse};
use crate::transport::Transport;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Access tokens used across tests
pub mod tokens {
    /// Token the fake backend accepts
    pub const VALID: &str = "access-token-valid";

    /// Token the backend has already rotated away from
    pub const STALE: &str = "access-token-stale";

    /// Token no backend state ever accepts
    pub const GHOST: &str = "access-token-ghost";
}

/// What the fake backend does when its refresh endpoint is called
#[derive(Debug, Clone)]
pub enum RefreshScript {
    /// Start accepting this token and hand it to the client
    Rotate(String),
    /// Hand the client a token the backend keeps rejecting
    IssueRejected(String),
    /// Reject the refresh call outright
    Fail,
    /// Never resolve, to exercise the refresh timeout
    Hang,
}

/// Scripted transport that behaves like the Mandira backend.
///
/// Ordinary paths require `Authorization: Bearer <accepted token>` and
/// return 401 otherwise. The refresh endpoint follows the configured
/// [`RefreshScript`], and can be gated so it does not resolve until a
/// given number of requests have been rejected, which is how tests prove
/// that concurrent failures share one refresh.
pub struct FakeBackend {
    accepted: Mutex<String>,
    refresh: Mutex<RefreshScript>,
    refresh_calls: AtomicUsize,
    data_calls: AtomicUsize,
    login_calls: AtomicUsize,
    gate: Semaphore,
    gate_required: usize,
    broken_path: Mutex<Option<String>>,
}

impl FakeBackend {
    /// Create a backend that accepts `token` and re-issues it on refresh
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            accepted: Mutex::new(token.clone()),
            refresh: Mutex::new(RefreshScript::Rotate(token)),
            refresh_calls: AtomicUsize::new(0),
            data_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            gate: Semaphore::new(0),
            gate_required: 0,
            broken_path: Mutex::new(None),
        }
    }

    /// Override the refresh behavior
    pub fn with_refresh(self, script: RefreshScript) -> Self {
        *self.refresh.lock() = script;
        self
    }

    /// Hold the refresh call open until `count` requests have been
    /// rejected with 401
    pub fn hold_refresh_until_unauthorized(mut self, count: usize) -> Self {
        self.gate_required = count;
        self
    }

    /// Make requests to `path` fail with a 500, regardless of credentials
    pub fn with_broken_path(self, path: impl Into<String>) -> Self {
        *self.broken_path.lock() = Some(path.into());
        self
    }

    /// Replace the refresh behavior mid-test
    pub fn set_refresh(&self, script: RefreshScript) {
        *self.refresh.lock() = script;
    }

    /// Number of refresh calls the backend has seen
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of ordinary (non-auth) requests the backend has seen
    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }

    /// Number of login calls the backend has seen
    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    fn session_body(token: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "accessToken": token,
            "user": {"id": "user-7", "displayName": "Asha"}
        }))
        .unwrap()
    }

    fn json_ok(body: Vec<u8>) -> ApiResponse {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        ApiResponse::new(200, headers, body)
    }

    async fn handle_refresh(&self) -> Result<ApiResponse, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        if self.gate_required > 0 {
            let permits = self
                .gate
                .acquire_many(self.gate_required as u32)
                .await
                .expect("gate semaphore closed");
            permits.forget();
        }

        let script = self.refresh.lock().clone();
        match script {
            RefreshScript::Rotate(token) => {
                *self.accepted.lock() = token.clone();
                Ok(Self::json_ok(Self::session_body(&token)))
            }
            RefreshScript::IssueRejected(token) => Ok(Self::json_ok(Self::session_body(&token))),
            RefreshScript::Fail => Err(ApiError::new(
                401,
                "RefreshRejected",
                "refresh credential expired",
            )),
            RefreshScript::Hang => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(ApiError::new(0, "NetworkError", "refresh never resolved"))
            }
        }
    }

    fn handle_login(&self) -> Result<ApiResponse, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let token = self.accepted.lock().clone();
        Ok(Self::json_ok(Self::session_body(&token)))
    }

    fn handle_data(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.data_calls.fetch_add(1, Ordering::SeqCst);

        if self.broken_path.lock().as_deref() == Some(request.path.as_str()) {
            return Err(ApiError::new(500, "InternalError", "backend unavailable"));
        }

        let expected = format!("Bearer {}", self.accepted.lock());
        if request.headers.get("Authorization") == Some(&expected) {
            Ok(Self::json_ok(
                serde_json::to_vec(&serde_json::json!({"items": []})).unwrap(),
            ))
        } else {
            self.gate.add_permits(1);
            Err(ApiError::new(
                401,
                "AuthenticationRequired",
                "access token rejected",
            ))
        }
    }
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match request.path.as_str() {
            REFRESH_PATH => self.handle_refresh().await,
            LOGIN_PATH => self.handle_login(),
            _ => self.handle_data(&request),
        }
    }
}
