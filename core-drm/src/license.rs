//! Asynchronous license-status gate.
//!
//! One GET against the license-check URL decides whether playback is
//! allowed. The check fails open: only an explicit, unaccepted `status` in a
//! JSON body resolves to [`DrmStatus::Failed`].

use std::sync::Arc;

use bridge_traits::{HttpClient, HttpRequest, RetryPolicy};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::token::LicenseTokenSigner;
use crate::types::DrmStatus;

struct SigningCredentials {
    signer: Arc<LicenseTokenSigner>,
    profile_id: String,
}

pub struct LicenseStatusChecker {
    http_client: Arc<dyn HttpClient>,
    accepted_statuses: Vec<String>,
    signing: Option<SigningCredentials>,
}

impl LicenseStatusChecker {
    pub fn new<I, S>(http_client: Arc<dyn HttpClient>, accepted_statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            http_client,
            accepted_statuses: accepted_statuses.into_iter().map(Into::into).collect(),
            signing: None,
        }
    }

    /// Attach a bearer token signed for each license URL.
    pub fn with_signing(
        mut self,
        signer: Arc<LicenseTokenSigner>,
        profile_id: impl Into<String>,
    ) -> Self {
        self.signing = Some(SigningCredentials {
            signer,
            profile_id: profile_id.into(),
        });
        self
    }

    /// Resolve the license status behind `url`.
    ///
    /// No URL means nothing to check and resolves `Succeeded` without a
    /// request. Transport errors also resolve `Succeeded`.
    #[instrument(skip_all, fields(url = url.map(Url::as_str)))]
    pub async fn check(&self, url: Option<&Url>) -> DrmStatus {
        let Some(url) = url else {
            debug!("License check not needed");
            return DrmStatus::Succeeded;
        };

        let mut request = HttpRequest::get(url.as_str()).header("Accept", "application/json");

        if let Some(credentials) = &self.signing {
            match credentials
                .signer
                .sign(&credentials.profile_id, url.as_str())
                .await
            {
                Ok(token) => request = request.bearer_token(token.into_string()),
                Err(e) => {
                    error!(error = %e, "Could not sign license check request");
                    return DrmStatus::Failed;
                }
            }
        }

        let response = match self
            .http_client
            .execute_with_retry(request, RetryPolicy::single_attempt())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "License check skipped due to transport error");
                return DrmStatus::Succeeded;
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "License check returned non-success status");
        }

        let status = self.evaluate_body(&response.body);
        info!(resolution = %status, "License check resolved");
        status
    }

    /// Decide the resolution from a license-status document.
    pub fn evaluate_body(&self, body: &[u8]) -> DrmStatus {
        let Ok(Value::Object(document)) = serde_json::from_slice::<Value>(body) else {
            debug!("License status body is not a JSON object, falling through");
            return DrmStatus::Succeeded;
        };

        match document.get("status").and_then(Value::as_str) {
            Some(status) if !self.is_accepted(status) => {
                let document = serde_json::to_string(&document).unwrap_or_default();
                debug!(
                    license_status = status,
                    %document,
                    "License check failed"
                );
                DrmStatus::Failed
            }
            _ => DrmStatus::Succeeded,
        }
    }

    fn is_accepted(&self, status: &str) -> bool {
        self.accepted_statuses.iter().any(|accepted| accepted == status)
    }
}
