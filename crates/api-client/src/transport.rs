//! Transport boundary between the gateway and the network
//!
//! The gateway never talks HTTP directly; it sends [`ApiRequest`] values
//! through a [`Transport`] and inspects the status-coded result. The
//! production implementation wraps `reqwest`; tests substitute mocks.

use crate::request::{ApiClientConfig, ApiError, ApiErrorResponse, ApiRequest, ApiResponse, HttpMethod};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse};
use std::collections::HashMap;

/// Sends a fully-described request and returns a status-coded response.
///
/// Non-2xx statuses surface as `Err(ApiError)` with the status preserved,
/// which is how the gateway recognizes the unauthorized outcome. The
/// transport owns every piece of connection state the request layer never
/// sees, including the long-lived refresh cookie.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request against the backend
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// HTTP transport backed by `reqwest`.
///
/// Carries a cookie store so the refresh cookie issued at login rides
/// along on the refresh call without the gateway ever handling it.
///
/// # Examples
/// ```
/// use api_client::{ApiClientConfig, HttpTransport};
///
/// let config = ApiClientConfig::new("https://api.mandira.app");
/// let transport = HttpTransport::new(config).unwrap();
/// assert_eq!(transport.base_url(), "https://api.mandira.app");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client
    client: ReqwestClient,
    /// Configuration
    config: ApiClientConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| {
                ApiError::new(0, "ClientError", format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// Get the transport configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Get the base service URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn execute_request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.config.base_url, request.path);

        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &request.params {
            req = req.query(&[(key, value)]);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = &request.body {
            if let Some(encoding) = &request.encoding {
                req = req.header("Content-Type", encoding);
            }
            req = req.body(body.clone());
        }

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::new(0, "NetworkError", format!("Request failed: {}", e)))?;

        self.parse_response(response).await
    }

    async fn parse_response(&self, response: ReqwestResponse) -> Result<ApiResponse, ApiError> {
        let status = response.status().as_u16();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(key.to_string(), value_str.to_string());
            }
        }

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();

            // Prefer the backend's structured error payload when present
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
                return Err(ApiError::new(
                    status,
                    error_response.error,
                    error_response.message,
                ));
            }
            return Err(ApiError::new(
                status,
                "Unknown",
                format!("HTTP {}: {}", status, error_body),
            ));
        }

        let body = response.bytes().await.map_err(|e| {
            ApiError::new(0, "NetworkError", format!("Failed to read response: {}", e))
        })?;

        Ok(ApiResponse::new(status, headers, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute_request(request).await
    }
}
