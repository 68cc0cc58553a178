//! DRM status and the data produced by rights validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// DRM state of an audiobook.
///
/// Starts at `NotChecked` (or `Processing` once a license-check URL has been
/// discovered) and moves to exactly one of the terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrmStatus {
    NotChecked,
    Processing,
    Succeeded,
    Failed,
}

impl DrmStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DrmStatus::Succeeded | DrmStatus::Failed)
    }

    /// Only a successful check authorizes playback.
    pub fn permits_playback(self) -> bool {
        self == DrmStatus::Succeeded
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrmStatus::NotChecked => "not_checked",
            DrmStatus::Processing => "processing",
            DrmStatus::Succeeded => "succeeded",
            DrmStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DrmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the synchronous rights gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrmData {
    /// Endpoint to query for the license status, if the manifest has one.
    pub license_check_url: Option<Url>,
    /// `Some(Processing)` exactly when `license_check_url` is set.
    pub status: Option<DrmStatus>,
}

impl DrmData {
    pub fn with_license_check(url: Url) -> Self {
        Self {
            license_check_url: Some(url),
            status: Some(DrmStatus::Processing),
        }
    }

    /// Status the book's DRM cell starts from.
    pub fn initial_status(&self) -> DrmStatus {
        self.status.unwrap_or(DrmStatus::NotChecked)
    }
}
