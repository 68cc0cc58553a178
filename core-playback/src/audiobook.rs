//! The audiobook entity: identifier, spine, and DRM status.

use std::sync::Arc;

use core_drm::{DrmData, DrmProcessor, DrmStatus, DrmStatusCell, Manifest};
use core_runtime::events::DrmEvent;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result;
use crate::spine::{Cursor, Spine, SpineElement};

pub struct Audiobook {
    id: String,
    spine: Spine,
    drm_status: Arc<DrmStatusCell>,
    drm_data: DrmData,
}

impl Audiobook {
    /// Audiobook without DRM. Playback is authorized immediately.
    pub fn open_access(id: impl Into<String>, elements: Vec<SpineElement>) -> Self {
        let id = id.into();
        Self {
            drm_status: Arc::new(DrmStatusCell::new(id.clone(), DrmStatus::Succeeded)),
            id,
            spine: elements.into(),
            drm_data: DrmData::default(),
        }
    }

    /// Audiobook gated by the manifest's DRM.
    ///
    /// Runs the synchronous rights gate. A rights violation is published on
    /// the processor's event bus and returned. Call
    /// [`Audiobook::start_drm_check`] afterwards to run the license gate.
    pub fn with_drm(
        id: impl Into<String>,
        elements: Vec<SpineElement>,
        manifest: &Manifest,
        processor: &DrmProcessor,
    ) -> Result<Self> {
        let id = id.into();

        let drm_data = match processor.process_manifest(manifest) {
            Ok(data) => data,
            Err(e) => {
                warn!(audiobook_id = %id, error = %e, "Audiobook rejected by DRM rights");
                if e.is_rights_violation() {
                    processor.notify(DrmEvent::RightsRejected {
                        audiobook_id: id.clone(),
                        reason: e.to_string(),
                    });
                }
                return Err(e.into());
            }
        };

        info!(
            audiobook_id = %id,
            license_check = drm_data.license_check_url.is_some(),
            chapters = elements.len(),
            "Audiobook created"
        );

        Ok(Self {
            drm_status: Arc::new(DrmStatusCell::new(id.clone(), drm_data.initial_status())),
            id,
            spine: elements.into(),
            drm_data,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spine(&self) -> &Spine {
        &self.spine
    }

    /// Cursor at the first chapter, `None` for an empty spine.
    pub fn cursor(&self) -> Option<Cursor> {
        Cursor::first(Arc::clone(&self.spine))
    }

    pub fn drm_status(&self) -> &Arc<DrmStatusCell> {
        &self.drm_status
    }

    pub fn drm_data(&self) -> &DrmData {
        &self.drm_data
    }

    /// Run the license gate in the background.
    ///
    /// The task holds the status cell weakly: dropping the audiobook
    /// abandons the result. Returns `None` if a check already ran or the
    /// status is already final.
    pub fn start_drm_check(&self, processor: &Arc<DrmProcessor>) -> Option<JoinHandle<()>> {
        processor.spawn_async_drm(Arc::downgrade(&self.drm_status), self.drm_data.clone())
    }
}

impl std::fmt::Debug for Audiobook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Audiobook")
            .field("id", &self.id)
            .field("chapters", &self.spine.len())
            .field("drm_status", &self.drm_status.get())
            .finish()
    }
}
