//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("audiobook-toolkit/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client.
///
/// Retries transport failures and 5xx/429 responses according to the
/// [`RetryPolicy`]. Any other status is returned to the caller as-is.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Client with a 30 second request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Client with a custom request timeout.
    ///
    /// Falls back to reqwest's default client if the tuned builder is
    /// rejected by the TLS backend.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Self::try_with_timeout(timeout) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Falling back to default HTTP client");
                Self {
                    client: Client::new(),
                }
            }
        }
    }

    /// Client with a custom request timeout, reporting builder failures.
    pub fn try_with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a preconfigured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut req = self.client.get(&request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    fn is_retryable_status(status: u16) -> bool {
        status >= 500 || status == 429
    }

    fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
        if policy.use_exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            policy.base_delay.saturating_mul(factor).min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }

    fn map_send_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout
        } else {
            BridgeError::Transport(e.to_string())
        }
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(Self::map_send_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    /// One attempt. `Err` carries the failure and whether it may be retried.
    /// On the final attempt a retryable status is returned as a response.
    async fn attempt(
        &self,
        request: &HttpRequest,
        last: bool,
    ) -> std::result::Result<HttpResponse, (BridgeError, bool)> {
        match self.build_request(request.clone()).send().await {
            Ok(response) if !last && Self::is_retryable_status(response.status().as_u16()) => {
                let status = response.status().as_u16();
                Err((
                    BridgeError::OperationFailed(format!("HTTP {} error", status)),
                    true,
                ))
            }
            Ok(response) => Self::into_response(response).await.map_err(|e| (e, false)),
            Err(e) => Err((Self::map_send_error(e), true)),
        }
    }

    async fn send_with_policy(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!(attempt, max_attempts, url = %request.url, "Executing HTTP request");

            let (error, retryable) = match self.attempt(&request, attempt >= max_attempts).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if !retryable || attempt >= max_attempts {
                warn!(error = %error, attempt, "HTTP request failed");
                return Err(error);
            }

            let delay = Self::backoff_delay(&policy, attempt);
            warn!(error = %error, attempt, delay_ms = delay.as_millis() as u64, "Retrying HTTP request");
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_policy(request, RetryPolicy::default()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.send_with_policy(request, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        assert!(ReqwestHttpClient::try_with_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(ReqwestHttpClient::is_retryable_status(503));
        assert!(ReqwestHttpClient::is_retryable_status(429));
        assert!(!ReqwestHttpClient::is_retryable_status(404));
        assert!(!ReqwestHttpClient::is_retryable_status(200));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            use_exponential_backoff: true,
        };

        assert_eq!(
            ReqwestHttpClient::backoff_delay(&policy, 1),
            Duration::from_millis(100)
        );
        assert_eq!(
            ReqwestHttpClient::backoff_delay(&policy, 2),
            Duration::from_millis(200)
        );
        assert_eq!(
            ReqwestHttpClient::backoff_delay(&policy, 5),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = ReqwestHttpClient::new();
        let request = HttpRequest::get("http://127.0.0.1:9/license")
            .timeout(Duration::from_millis(500));

        let result = client
            .execute_with_retry(request, RetryPolicy::single_attempt())
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::Transport(_) | BridgeError::Timeout)
        ));
    }
}
