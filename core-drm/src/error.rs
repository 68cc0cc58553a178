use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrmError {
    // ========================================================================
    // Rights window
    // ========================================================================
    #[error("DRM rights are not active until {start}")]
    RightsNotYetActive { start: DateTime<Utc> },

    #[error("DRM rights expired at {end}")]
    RightsExpired { end: DateTime<Utc> },

    // ========================================================================
    // License token signing
    // ========================================================================
    #[error("Signing secret unavailable for profile {profile_id}: {reason}")]
    SecretUnavailable { profile_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========================================================================
    // Input and setup
    // ========================================================================
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("DRM configuration error: {0}")]
    Config(String),
}

impl DrmError {
    /// Returns `true` for errors raised by the manifest's rights window.
    ///
    /// These are final for the current time: retrying with the same manifest
    /// cannot succeed until the window opens (or never, once expired).
    pub fn is_rights_violation(&self) -> bool {
        matches!(
            self,
            DrmError::RightsNotYetActive { .. } | DrmError::RightsExpired { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DrmError>;
