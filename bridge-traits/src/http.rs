//! HTTP Client Abstraction
//!
//! Request/response transport used by the license-status check.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// GET request builder. License-status queries are the only traffic the
/// core issues, so no other method or request body is modelled.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Build a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns `true` when the body carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first one)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl RetryPolicy {
    /// Policy that issues the request once and never retries.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
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
/// Implementations own connection pooling and TLS. Transport failures
/// (DNS, connect, TLS, timeout) are reported as `Err`; any HTTP status,
/// including 4xx/5xx, is a successful `HttpResponse`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn license_status(client: &dyn HttpClient) -> Result<u16> {
///     let response = client.execute(HttpRequest::get("https://example.com/license")).await?;
///     Ok(response.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute an HTTP request under `policy`.
    ///
    /// The default issues at most `policy.max_attempts` requests and repeats
    /// only transient failures, back to back. Implementations that can sleep
    /// should override it to apply the backoff delays; every implementation
    /// must keep the attempt bound.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.execute(request.clone()).await {
                Err(e) if e.is_transient() && attempt < max_attempts => attempt += 1,
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/license")
            .header("Accept", "application/json")
            .bearer_token("secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/license");
        assert_eq!(
            request.headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer secret".to_string())
        );
    }

    #[test]
    fn test_http_response_helpers() {
        let response = HttpResponse::new(200, r#"{"status":"ready"}"#);
        assert!(response.is_success());
        assert!(!response.is_empty());

        assert_eq!(&response.body[..], br#"{"status":"ready"}"#);

        let empty = HttpResponse::new(404, Bytes::new());
        assert!(!empty.is_success());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy::single_attempt();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    struct FlakyClient {
        calls: std::sync::atomic::AtomicU32,
        failure: fn() -> BridgeError,
    }

    #[async_trait]
    impl HttpClient for FlakyClient {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err((self.failure)())
        }
    }

    fn flaky(failure: fn() -> BridgeError) -> FlakyClient {
        FlakyClient {
            calls: std::sync::atomic::AtomicU32::new(0),
            failure,
        }
    }

    #[tokio::test]
    async fn test_default_retry_respects_attempt_bound() {
        let client = flaky(|| BridgeError::Transport("connection reset".into()));
        let request = HttpRequest::get("https://example.com/license");

        let result = client
            .execute_with_retry(request.clone(), RetryPolicy::single_attempt())
            .await;
        assert!(matches!(result, Err(BridgeError::Transport(_))));
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        client
            .execute_with_retry(request, RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_default_retry_stops_on_permanent_failure() {
        let client = flaky(|| BridgeError::NotAvailable("offline mode".into()));

        client
            .execute_with_retry(HttpRequest::get("https://example.com/license"), RetryPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(client.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
