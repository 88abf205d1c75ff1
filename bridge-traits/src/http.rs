//! HTTP Client Abstraction
//!
//! Async HTTP operations used to fetch catalog documents and audio blobs.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

/// Async HTTP client trait
///
/// This trait abstracts HTTP operations to allow platform-specific implementations.
/// Implementations should retry transient failures (429, 5xx) in
/// `execute_with_retry` and keep connections pooled.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch_stem(client: &dyn HttpClient) -> Result<Bytes> {
///     client.get_bytes("https://cdn.example.com/stems/drums.mp3", None).await
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    /// - Maximum retries exceeded
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request with custom retry policy
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }

    /// Fetch a resource body with a plain GET, failing on non-2xx status.
    async fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Bytes> {
        let mut request = HttpRequest::new(HttpMethod::Get, url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = self.execute_with_retry(request, RetryPolicy::default()).await?;
        if !response.is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "GET {} returned HTTP {}",
                url, response.status
            )));
        }
        Ok(response.body)
    }

    /// Check network connectivity
    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com")
            .header("User-Agent", "test")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("test"),
        };

        assert!(response.is_success());
        assert!(!response.is_server_error());
    }

    struct FixedStatusClient(u16);

    #[async_trait]
    impl HttpClient for FixedStatusClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            assert_eq!(request.method, HttpMethod::Get);
            Ok(HttpResponse {
                status: self.0,
                headers: HashMap::new(),
                body: Bytes::from_static(b"RIFF"),
            })
        }
    }

    #[tokio::test]
    async fn test_get_bytes_returns_body_on_success() {
        let body = FixedStatusClient(200)
            .get_bytes("https://cdn.example.com/a.wav", None)
            .await
            .unwrap();
        assert_eq!(&body[..], b"RIFF");
    }

    #[tokio::test]
    async fn test_get_bytes_rejects_error_status() {
        let err = FixedStatusClient(404)
            .get_bytes("https://cdn.example.com/missing.wav", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
