//! Profile secret lookup for license-token signing.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bridge_traits::SecureStore;
use core_runtime::config::SecretPolicy;
use tracing::error;

use crate::error::{DrmError, Result};

const PROFILE_SECRET_PREFIX: &str = "drm_profile_";

/// Secure store key holding the signing secret of `profile_id`.
pub fn profile_secret_key(profile_id: &str) -> String {
    format!("{}{}", PROFILE_SECRET_PREFIX, profile_id)
}

/// Resolves the HMAC key for a profile.
///
/// The stored value is UTF-8 text holding the standard base64 encoding of
/// the key. How a missing or malformed secret is handled depends on the
/// [`SecretPolicy`].
pub struct SecretResolver {
    store: Arc<dyn SecureStore>,
    policy: SecretPolicy,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecureStore>, policy: SecretPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SecretPolicy {
        self.policy
    }

    /// HMAC key bytes for `profile_id`.
    ///
    /// Under [`SecretPolicy::EmptyKeyFallback`] every failure is logged once
    /// and yields an empty key. Under [`SecretPolicy::Strict`] it is returned
    /// as [`DrmError::SecretUnavailable`].
    pub async fn resolve(&self, profile_id: &str) -> Result<Vec<u8>> {
        match self.lookup(profile_id).await {
            Ok(key) => Ok(key),
            Err(reason) => match self.policy {
                SecretPolicy::EmptyKeyFallback => {
                    error!(profile_id, %reason, "Signing secret unavailable, using an empty key");
                    Ok(Vec::new())
                }
                SecretPolicy::Strict => Err(DrmError::SecretUnavailable {
                    profile_id: profile_id.to_string(),
                    reason,
                }),
            },
        }
    }

    async fn lookup(&self, profile_id: &str) -> std::result::Result<Vec<u8>, String> {
        let key = profile_secret_key(profile_id);

        let stored = match self.store.get_secret(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err("secret not found".to_string()),
            Err(e) => return Err(format!("secure store lookup failed: {}", e)),
        };

        let text =
            String::from_utf8(stored).map_err(|_| "secret is not valid UTF-8".to_string())?;

        STANDARD
            .decode(text.trim())
            .map_err(|e| format!("secret is not valid base64: {}", e))
    }
}
