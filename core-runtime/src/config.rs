//! # Core Configuration Module
//!
//! Builder-based configuration for the audiobook core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds the host bridges the DRM pipeline needs plus the DRM
//! settings themselves. [`CoreConfigBuilder::build`] validates everything up
//! front so misconfiguration surfaces at startup rather than during the first
//! license check.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - profile secrets for license-token signing
//! - `HttpClient` - license-status requests
//!
//! With the `desktop-shims` feature, `KeyringSecureStore` and
//! `ReqwestHttpClient` are injected when not provided.
//!
//! ## Optional Dependencies
//!
//! - `Clock` - rights window evaluation (default: `SystemClock`)
//! - `EventBus` - mirrors DRM and playback notifications
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, DrmSettings, SecretPolicy};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .drm(DrmSettings::default().with_profile_id("default"))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::{CoreConfig, DrmSettings};
//!
//! // An empty issuer can never produce a verifiable token.
//! let config = CoreConfig::builder()
//!     .drm(DrmSettings::default().with_issuer(""))
//!     .build()
//!     .expect("Should fail - invalid DRM settings");
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{Clock, HttpClient, SecureStore, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Issuer claim placed in license-check tokens unless overridden.
pub const DEFAULT_TOKEN_ISSUER: &str = "https://librarysimplified.org/products/SimplyE";

/// License `status` values that allow playback unless overridden.
pub const DEFAULT_ACCEPTED_LICENSE_STATUSES: &[&str] = &["ready", "active"];

/// Behaviour when a profile's signing secret cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretPolicy {
    /// Log the failure and sign with an empty key.
    #[default]
    EmptyKeyFallback,
    /// Refuse to sign.
    Strict,
}

/// DRM pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrmSettings {
    /// `iss` claim of license-check tokens
    pub issuer: String,
    /// License `status` values treated as active
    pub accepted_license_statuses: Vec<String>,
    pub secret_policy: SecretPolicy,
    /// Profile whose secret signs license-check requests. Requests go out
    /// unsigned when unset.
    pub profile_id: Option<String>,
}

impl Default for DrmSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_TOKEN_ISSUER.to_string(),
            accepted_license_statuses: DEFAULT_ACCEPTED_LICENSE_STATUSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            secret_policy: SecretPolicy::default(),
            profile_id: None,
        }
    }
}

impl DrmSettings {
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    pub fn with_accepted_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_license_statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_secret_policy(mut self, policy: SecretPolicy) -> Self {
        self.secret_policy = policy;
        self
    }

    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.issuer.trim().is_empty() {
            return Err(Error::Config("DRM token issuer cannot be empty".to_string()));
        }

        if self.accepted_license_statuses.is_empty() {
            return Err(Error::Config(
                "At least one accepted license status is required".to_string(),
            ));
        }

        if self
            .accepted_license_statuses
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(Error::Config(
                "Accepted license statuses cannot contain empty values".to_string(),
            ));
        }

        if matches!(&self.profile_id, Some(id) if id.trim().is_empty()) {
            return Err(Error::Config(
                "DRM profile id cannot be empty when set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration. Construct with [`CoreConfig::builder`].
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub secure_store: Arc<dyn SecureStore>,
    pub clock: Arc<dyn Clock>,
    pub event_bus: Option<EventBus>,
    pub drm: DrmSettings,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("clock", &self.clock.now())
            .field("event_bus", &self.event_bus)
            .field("drm", &self.drm)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.drm.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for DRM profile secrets. \
                 Desktop: enable the 'desktop-shims' feature to use KeyringSecureStore. \
                 Mobile: inject Keychain/Keystore-backed storage."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    let store: Arc<dyn SecureStore> = Arc::new(bridge_desktop::KeyringSecureStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for license status checks. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform URL session."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::try_with_timeout(
        std::time::Duration::from_secs(30),
    )
    .map_err(Error::BridgeSetup)?;

    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    clock: Option<Arc<dyn Clock>>,
    event_bus: Option<EventBus>,
    drm: Option<DrmSettings>,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Clock used for rights window checks.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Bus on which DRM and playback notifications are mirrored.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn drm(mut self, settings: DrmSettings) -> Self {
        self.drm = Some(settings);
        self
    }

    /// Validate and assemble the configuration.
    ///
    /// DRM settings are checked before any default bridge is created.
    pub fn build(self) -> Result<CoreConfig> {
        let drm = self.drm.unwrap_or_default();
        drm.validate()?;

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            http_client,
            secure_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_bus: self.event_bus,
            drm,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, FixedClock, HttpRequest, HttpResponse};
    use chrono::{TimeZone, Utc};

    struct NullSecureStore;

    #[async_trait]
    impl SecureStore for NullSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, BridgeError> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Ok(HttpResponse::new(204, Vec::new()))
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(NullHttpClient))
            .secure_store(Arc::new(NullSecureStore))
    }

    #[test]
    fn test_build_with_injected_bridges() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.drm, DrmSettings::default());
        assert!(config.event_bus.is_none());
        assert!(config.clock.unix_timestamp() > 0);
    }

    #[test]
    fn test_drm_settings_defaults() {
        let settings = DrmSettings::default();
        assert_eq!(settings.issuer, DEFAULT_TOKEN_ISSUER);
        assert_eq!(settings.accepted_license_statuses, vec!["ready", "active"]);
        assert_eq!(settings.secret_policy, SecretPolicy::EmptyKeyFallback);
        assert!(settings.profile_id.is_none());
    }

    #[test]
    fn test_builder_keeps_custom_clock_and_bus() {
        let instant = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let config = complete_builder()
            .clock(Arc::new(FixedClock(instant)))
            .event_bus(EventBus::new(8))
            .build()
            .unwrap();

        assert_eq!(config.clock.now(), instant);
        assert!(config.event_bus.is_some());
    }

    #[test]
    fn test_rejects_empty_issuer() {
        let result = complete_builder()
            .drm(DrmSettings::default().with_issuer("  "))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_empty_accepted_statuses() {
        let result = complete_builder()
            .drm(DrmSettings::default().with_accepted_statuses(Vec::<String>::new()))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_blank_profile_id() {
        let result = complete_builder()
            .drm(DrmSettings::default().with_profile_id(""))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_drm_settings() {
        let config = complete_builder()
            .drm(
                DrmSettings::default()
                    .with_issuer("https://reader.example.org")
                    .with_accepted_statuses(["ready"])
                    .with_secret_policy(SecretPolicy::Strict)
                    .with_profile_id("default"),
            )
            .build()
            .unwrap();

        assert_eq!(config.drm.issuer, "https://reader.example.org");
        assert_eq!(config.drm.accepted_license_statuses, vec!["ready"]);
        assert_eq!(config.drm.secret_policy, SecretPolicy::Strict);
        assert_eq!(config.drm.profile_id.as_deref(), Some("default"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_secure_store() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(NullHttpClient))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "SecureStore")
            }
            other => panic!("expected missing SecureStore, got {:?}", other),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder()
            .secure_store(Arc::new(NullSecureStore))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected missing HttpClient, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = CoreConfig::builder().build().unwrap();
        assert!(config.drm.validate().is_ok());
    }

    #[test]
    fn test_secret_policy_serde() {
        let json = serde_json::to_string(&SecretPolicy::EmptyKeyFallback).unwrap();
        assert_eq!(json, "\"empty_key_fallback\"");
        let policy: SecretPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(policy, SecretPolicy::Strict);
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = complete_builder().build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.drm, config.drm);
        assert!(format!("{:?}", cloned).contains("CoreConfig"));
    }
}
