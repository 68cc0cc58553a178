//! DRM pipeline: synchronous rights gate followed by the asynchronous
//! license-status gate.
//!
//! ```ignore
//! let processor = Arc::new(DrmProcessor::from_config(&config));
//! let data = processor.process_manifest(&manifest)?;
//! let cell = Arc::new(DrmStatusCell::new(book_id, data.initial_status()));
//! processor.spawn_async_drm(Arc::downgrade(&cell), data);
//! let status = cell.resolved().await;
//! ```

use std::sync::{Arc, Weak};

use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, DrmEvent, EventBus};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::license::LicenseStatusChecker;
use crate::manifest::Manifest;
use crate::rights::RightsValidator;
use crate::secret::SecretResolver;
use crate::status::DrmStatusCell;
use crate::token::LicenseTokenSigner;
use crate::types::{DrmData, DrmStatus};

pub struct DrmProcessor {
    validator: RightsValidator,
    checker: LicenseStatusChecker,
    event_bus: Option<EventBus>,
}

impl DrmProcessor {
    pub fn new(validator: RightsValidator, checker: LicenseStatusChecker) -> Self {
        Self {
            validator,
            checker,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Assemble the pipeline from the core configuration.
    ///
    /// License requests are signed only when a DRM profile is configured.
    pub fn from_config(config: &CoreConfig) -> Self {
        let validator = RightsValidator::new(Arc::clone(&config.clock));

        let mut checker = LicenseStatusChecker::new(
            Arc::clone(&config.http_client),
            config.drm.accepted_license_statuses.iter().cloned(),
        );

        if let Some(profile_id) = &config.drm.profile_id {
            let secrets =
                SecretResolver::new(Arc::clone(&config.secure_store), config.drm.secret_policy);
            let signer = LicenseTokenSigner::new(config.drm.issuer.clone(), secrets);
            checker = checker.with_signing(Arc::new(signer), profile_id.clone());
        }

        let processor = Self::new(validator, checker);
        match &config.event_bus {
            Some(bus) => processor.with_event_bus(bus.clone()),
            None => processor,
        }
    }

    /// Synchronous rights gate.
    pub fn process_manifest(&self, manifest: &Manifest) -> Result<DrmData> {
        self.validator.validate(manifest)
    }

    /// Publish a DRM event when a bus is configured.
    pub fn notify(&self, event: DrmEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Drm(event));
        }
    }

    /// Run the license check and resolve `cell`.
    ///
    /// If another check already owns the cell, waits for that one instead of
    /// issuing a second request.
    #[instrument(skip_all, fields(audiobook_id = %cell.audiobook_id()))]
    pub async fn perform_async_drm(&self, cell: &DrmStatusCell, data: &DrmData) -> DrmStatus {
        if !cell.try_begin_check() {
            debug!("License check already running or resolved");
            return cell.resolved().await;
        }

        let status = self.run_check(cell.audiobook_id(), data).await;
        self.apply(cell, status);
        cell.get()
    }

    /// Run the license check on a Tokio task.
    ///
    /// The task only holds `cell` weakly. If the book is dropped before the
    /// response arrives, the result is discarded. Returns `None` when a check
    /// is already running or the status is already resolved.
    pub fn spawn_async_drm(
        self: &Arc<Self>,
        cell: Weak<DrmStatusCell>,
        data: DrmData,
    ) -> Option<JoinHandle<()>> {
        let audiobook_id = {
            let strong = cell.upgrade()?;
            if !strong.try_begin_check() {
                debug!(audiobook_id = %strong.audiobook_id(), "License check already running or resolved");
                return None;
            }
            strong.audiobook_id().to_string()
        };

        let processor = Arc::clone(self);
        Some(tokio::spawn(async move {
            let status = processor.run_check(&audiobook_id, &data).await;
            match cell.upgrade() {
                Some(cell) => processor.apply(&cell, status),
                None => debug!(%audiobook_id, %status, "Audiobook released before license check finished"),
            }
        }))
    }

    async fn run_check(&self, audiobook_id: &str, data: &DrmData) -> DrmStatus {
        if let Some(url) = &data.license_check_url {
            self.notify(DrmEvent::LicenseCheckStarted {
                audiobook_id: audiobook_id.to_string(),
                url: url.to_string(),
            });
        }
        self.checker.check(data.license_check_url.as_ref()).await
    }

    fn apply(&self, cell: &DrmStatusCell, status: DrmStatus) {
        if cell.resolve(status) {
            self.notify(DrmEvent::StatusResolved {
                audiobook_id: cell.audiobook_id().to_string(),
                status: status.as_str().to_string(),
            });
        } else {
            warn!(
                audiobook_id = %cell.audiobook_id(),
                %status,
                "DRM status was resolved elsewhere during the license check"
            );
        }
    }
}
