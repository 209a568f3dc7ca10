//! Request and response model
//!
//! Logical descriptions of backend calls (method, path, params, body) and
//! the status-coded results that come back. The gateway consumes these
//! types; screens build them through the builder methods and never touch
//! the underlying HTTP client directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Error Types
// =============================================================================

/// Error returned by the backend or the transport.
///
/// This covers both network failures (status 0) and application-level
/// errors carrying an HTTP status. The gateway only ever interprets one of
/// them, the unauthorized rejection, and passes everything else through
/// to the calling screen untouched.
///
/// # Examples
/// ```
/// use api_client::ApiError;
///
/// let error = ApiError::new(404, "NotFound", "No such recipe");
/// assert_eq!(error.status(), 404);
/// assert!(!error.is_unauthorized());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code, or 0 for failures below the HTTP layer
    status: u16,
    /// Error code (e.g., "InvalidRequest", "NotFound")
    error: String,
    /// Human-readable error message
    message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: u16, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Get the error code
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check if this is the backend's rejection of the access token.
    ///
    /// This is the one condition the gateway recovers from; every other
    /// error reaches the caller unchanged.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Check if this error came from the network rather than the backend
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.status,
            0 | 408 | 425 | 429 | 500 | 502 | 503 | 504 | 522 | 524
        )
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "API error {}: {} - {}",
            self.status, self.error, self.message
        )
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Request Types
// =============================================================================

/// HTTP method for API requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
}

impl HttpMethod {
    /// Method name as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A fully-described backend call.
///
/// Callers must not set an `Authorization` header themselves; the gateway
/// owns that header and rejects requests that pre-attach it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Path relative to the service base URL (e.g., "/temples")
    pub path: String,
    /// Query parameters
    pub params: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (for POST/PUT)
    pub body: Option<Vec<u8>>,
    /// Encoding type (e.g., "application/json")
    pub encoding: Option<String>,
}

impl ApiRequest {
    /// Create a request with an explicit method
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            headers: HashMap::new(),
            body: None,
            encoding: None,
        }
    }

    /// Create a new GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Create a new POST request
    pub fn post(path: impl Into<String>) -> Self {
        let mut request = Self::new(HttpMethod::Post, path);
        request.encoding = Some("application/json".to_string());
        request
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the request body (for POST/PUT)
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the request body from JSON
    pub fn json_body<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.body = Some(body);
        self.encoding = Some("application/json".to_string());
        Ok(self)
    }

    /// Set encoding type
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Whether the caller attached an `Authorization` header
    pub fn has_authorization(&self) -> bool {
        self.headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case("authorization"))
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Status-coded response from the backend.
///
/// The body is kept as raw bytes; the gateway returns it verbatim and the
/// calling screen decodes it with [`ApiResponse::json`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a new response
    pub fn new(status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&String> {
        self.headers.get(key)
    }

    /// Check if the response is successful (2xx status)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T>(&self) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::new(0, "ParseError", format!("Failed to parse JSON: {}", e)))
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base service URL (e.g., "https://api.mandira.app")
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on the session refresh call; a refresh that exceeds it
    /// counts as a refresh failure
    pub refresh_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mandira.app".to_string(),
            timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(10),
            user_agent: format!("Mandira/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the refresh timeout
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Error Response Format
// =============================================================================

/// Standard error payload returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error code
    pub error: String,
    /// Error message
    pub message: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_unauthorized() {
        let error = ApiError::new(401, "AuthenticationRequired", "Access token rejected");
        assert_eq!(error.status(), 401);
        assert!(error.is_unauthorized());
        assert!(!error.is_network_error());
    }

    #[test]
    fn test_api_error_network() {
        let error = ApiError::new(503, "ServiceUnavailable", "Service is down");
        assert_eq!(error.status(), 503);
        assert_eq!(error.error(), "ServiceUnavailable");
        assert_eq!(error.message(), "Service is down");
        assert!(error.is_network_error());
        assert!(!error.is_unauthorized());
    }

    #[test]
    fn test_api_error_application() {
        let error = ApiError::new(400, "InvalidRequest", "Bad input");
        assert_eq!(error.status(), 400);
        assert!(!error.is_network_error());
        assert!(!error.is_unauthorized());
    }

    #[test]
    fn test_api_request_get() {
        let req = ApiRequest::get("/temples")
            .param("region", "varanasi")
            .param("limit", "20")
            .header("Accept-Language", "hi");

        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "/temples");
        assert_eq!(req.params.get("region"), Some(&"varanasi".to_string()));
        assert_eq!(
            req.headers.get("Accept-Language"),
            Some(&"hi".to_string())
        );
        assert!(!req.has_authorization());
    }

    #[test]
    fn test_api_request_post() {
        let req = ApiRequest::post("/consultancy/bookings");

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.encoding, Some("application/json".to_string()));
    }

    #[test]
    fn test_api_request_json_body() {
        #[derive(Serialize)]
        struct Booking {
            slot: String,
        }

        let booking = Booking {
            slot: "2025-03-01T09:00".to_string(),
        };

        let req = ApiRequest::post("/consultancy/bookings")
            .json_body(&booking)
            .unwrap();

        assert!(req.body.is_some());
        let body_str = String::from_utf8(req.body.unwrap()).unwrap();
        assert!(body_str.contains("2025-03-01T09:00"));
    }

    #[test]
    fn test_api_request_detects_preattached_authorization() {
        let req = ApiRequest::get("/news").header("authorization", "Bearer stray");
        assert!(req.has_authorization());
    }

    #[test]
    fn test_api_response() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let response = ApiResponse::new(200, headers, b"{\"count\":3}".to_vec());

        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(
            response.header("content-type"),
            Some(&"application/json".to_string())
        );

        #[derive(Deserialize)]
        struct Count {
            count: u32,
        }
        let decoded: Count = response.json().unwrap();
        assert_eq!(decoded.count, 3);
    }

    #[test]
    fn test_api_response_json_parse_error() {
        let response = ApiResponse::new(200, HashMap::new(), b"not json".to_vec());
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.status(), 0);
        assert_eq!(err.error(), "ParseError");
    }

    #[test]
    fn test_client_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "https://api.mandira.app");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("Mandira/"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = ApiClientConfig::new("https://staging.mandira.app")
            .with_timeout(Duration::from_secs(60))
            .with_refresh_timeout(Duration::from_secs(5))
            .with_user_agent("MandiraBeta/1.0")
            .with_header("X-Client-Platform", "android");

        assert_eq!(config.base_url, "https://staging.mandira.app");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.refresh_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "MandiraBeta/1.0");
        assert_eq!(
            config.default_headers.get("X-Client-Platform"),
            Some(&"android".to_string())
        );
    }

    #[test]
    fn test_http_method_as_str() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::Put.as_str(), "PUT");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }

    #[test]
    fn test_api_error_display() {
        let error = ApiError::new(404, "NotFound", "No such recipe");
        let display = format!("{}", error);
        assert!(display.contains("404"));
        assert!(display.contains("NotFound"));
        assert!(display.contains("No such recipe"));
    }
}
