//! # Playback Error Types

use bridge_traits::BridgeError;
use core_drm::DrmError;
use thiserror::Error;

/// Errors raised by the audiobook player.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Readiness
    // ========================================================================
    /// `play` was requested before the engine was ready, before DRM
    /// succeeded, or after unload.
    #[error("Attempted to play before the player was ready: {0}")]
    PlayBeforeReady(String),

    /// The engine refused the initial queue.
    #[error("Media engine failed to get ready for playback: {0}")]
    EngineReadyFailure(String),

    /// The engine accepted a command but reports an error state.
    #[error("Media engine error: {0}")]
    EngineFailure(String),

    // ========================================================================
    // Navigation
    // ========================================================================
    /// The location is not part of the queued window of this player.
    #[error("Chapter {chapter} part {part} is not queued for playback")]
    ChapterNotQueued { chapter: u32, part: u32 },

    // ========================================================================
    // Collaborators
    // ========================================================================
    #[error("DRM error: {0}")]
    Drm(#[from] DrmError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if retrying later may succeed without other changes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::PlayBeforeReady(_) | PlaybackError::Bridge(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
