//! Authenticated API client for the Mandira backend
//!
//! This crate implements the request layer shared by every screen in the
//! app: a credential store, a transport abstraction over HTTP, and a
//! gateway that attaches the stored bearer credential to outgoing calls,
//! refreshes it once when the backend rejects it, and tears the session
//! down when the refresh itself fails.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod credentials;
pub mod gateway;
pub mod request;
pub mod test_utils;
pub mod transport;

pub use credentials::{Credential, CredentialStore, SessionEvent, UserRef};
pub use gateway::{Gateway, GatewayError};
pub use request::{ApiClientConfig, ApiError, ApiRequest, ApiResponse, HttpMethod};
pub use transport::{HttpTransport, Transport};
