//! Synchronous rights gate.
//!
//! Checks the manifest's Feedbooks rights window against the injected clock
//! and selects the license-status link. No I/O happens here.

use std::sync::Arc;

use bridge_traits::Clock;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{DrmError, Result};
use crate::manifest::{Manifest, ManifestLink, RightsWindow};
use crate::types::DrmData;

/// Parse a rights window date.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) and a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_rights_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub struct RightsValidator {
    clock: Arc<dyn Clock>,
}

impl RightsValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Run the rights gate over a manifest.
    ///
    /// A manifest without metadata passes with empty [`DrmData`]. Otherwise
    /// the rights window must contain the current time, and the first
    /// license link (if any) is recorded for the asynchronous check.
    pub fn validate(&self, manifest: &Manifest) -> Result<DrmData> {
        let Some(metadata) = manifest.metadata.as_ref() else {
            debug!("No metadata in manifest, skipping rights check");
            return Ok(DrmData::default());
        };

        if let Some(rights) = metadata.rights.as_ref() {
            self.check_window(rights)?;
        }

        let data = match select_license_link(&manifest.links).and_then(license_url) {
            Some(url) => {
                debug!(license_url = %url, "License status check required");
                DrmData::with_license_check(url)
            }
            None => DrmData::default(),
        };

        Ok(data)
    }

    fn check_window(&self, rights: &RightsWindow) -> Result<()> {
        let now = self.clock.now();

        if let Some(start) = rights.start.as_deref().and_then(|raw| window_date("start", raw)) {
            if now < start {
                error!(%start, %now, "DRM rights start date is in the future");
                return Err(DrmError::RightsNotYetActive { start });
            }
        }

        if let Some(end) = rights.end.as_deref().and_then(|raw| window_date("end", raw)) {
            if now > end {
                error!(%end, %now, "DRM rights end date has passed");
                return Err(DrmError::RightsExpired { end });
            }
        }

        Ok(())
    }
}

fn window_date(bound: &'static str, raw: &str) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return None;
    }

    let parsed = parse_rights_date(raw);
    if parsed.is_none() {
        warn!(bound, value = raw, "Ignoring unparseable rights date");
    }
    parsed
}

/// First `rel == "license"` link. Every later one is logged and ignored.
fn select_license_link(links: &[ManifestLink]) -> Option<&ManifestLink> {
    let mut selected: Option<&ManifestLink> = None;

    for link in links.iter().filter(|link| link.is_license()) {
        if selected.is_some() {
            warn!(
                href = link.href.as_deref().unwrap_or(""),
                media_type = link.media_type.as_deref().unwrap_or(""),
                "More than one license status link found, ignoring"
            );
            continue;
        }
        selected = Some(link);
    }

    selected
}

fn license_url(link: &ManifestLink) -> Option<Url> {
    let href = link.href.as_deref()?;
    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(href, error = %e, "License status link is not a valid URL");
            None
        }
    }
}
