//! Wire types for the authentication endpoints
//!
//! Login and refresh both return the same session payload: a fresh access
//! token plus the user it belongs to. The long-lived refresh credential is
//! an HTTP cookie set by the backend and carried by the transport; it
//! never appears in these types.

use crate::credentials::{Credential, UserRef};
use serde::{Deserialize, Serialize};

/// Path of the login endpoint
pub const LOGIN_PATH: &str = "/auth/login";

/// Path of the session refresh endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

/// `POST /auth/login` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// User identifier (phone number or email)
    pub identifier: String,
    /// User password
    pub password: String,
}

/// Session payload returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Access token for subsequent requests
    pub access_token: String,

    /// The authenticated user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

impl AuthSession {
    /// Convert into the credential the store holds
    pub fn into_credential(self) -> Credential {
        Credential::new(self.access_token, self.user)
    }
}
