//! Single-assignment DRM status holder.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::types::DrmStatus;

/// DRM status of one audiobook.
///
/// Any number of readers may poll [`DrmStatusCell::get`], subscribe to
/// changes, or await [`DrmStatusCell::resolved`]. The status moves to a
/// terminal value at most once; later writes are rejected.
#[derive(Debug)]
pub struct DrmStatusCell {
    audiobook_id: String,
    tx: watch::Sender<DrmStatus>,
    checking: AtomicBool,
}

impl DrmStatusCell {
    pub fn new(audiobook_id: impl Into<String>, initial: DrmStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            audiobook_id: audiobook_id.into(),
            tx,
            checking: AtomicBool::new(false),
        }
    }

    pub fn audiobook_id(&self) -> &str {
        &self.audiobook_id
    }

    pub fn get(&self) -> DrmStatus {
        *self.tx.borrow()
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_terminal()
    }

    pub fn subscribe(&self) -> watch::Receiver<DrmStatus> {
        self.tx.subscribe()
    }

    /// Move `NotChecked` to `Processing`. Returns `false` for any other
    /// starting status.
    pub fn mark_processing(&self) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == DrmStatus::NotChecked {
                *current = DrmStatus::Processing;
                true
            } else {
                false
            }
        })
    }

    /// Store a terminal status.
    ///
    /// Returns `true` only for the call that performed the transition.
    /// Non-terminal values and writes after resolution are ignored.
    pub fn resolve(&self, status: DrmStatus) -> bool {
        if !status.is_terminal() {
            warn!(audiobook_id = %self.audiobook_id, %status, "Ignoring non-terminal DRM resolution");
            return false;
        }

        let applied = self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                false
            } else {
                *current = status;
                true
            }
        });

        if applied {
            debug!(audiobook_id = %self.audiobook_id, %status, "DRM status resolved");
        } else {
            debug!(
                audiobook_id = %self.audiobook_id,
                %status,
                current = %self.get(),
                "DRM status already resolved, ignoring"
            );
        }
        applied
    }

    /// Claim the right to run the license check.
    ///
    /// Succeeds once per cell, and never once the status is terminal.
    pub fn try_begin_check(&self) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.checking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Wait until the status is terminal and return it.
    pub async fn resolved(&self) -> DrmStatus {
        let mut rx = self.tx.subscribe();
        let resolved = rx.wait_for(|status| status.is_terminal()).await.map(|status| *status);
        resolved.unwrap_or_else(|_| self.get())
    }
}
