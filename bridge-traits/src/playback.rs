//! Media engine and download bridge traits.
//!
//! The audio engine is opaque to the core: it accepts an ordered queue of
//! local media files, plays them back to back, and reports status and rate
//! transitions as typed [`MediaEngineEvent`]s over a channel handed to it at
//! load time. Engines run their own decode/render threads, so events must be
//! treated as concurrent with calls made by the core.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::Result;

/// Status and rate transitions reported by a [`MediaEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEngineEvent {
    /// The engine is ready to play its queue.
    Ready,
    /// The engine failed to become ready.
    Failed { message: String },
    /// Playback rate changed. A rate of `0.0` means stopped or paused.
    RateChanged { old: f32, new: f32 },
    /// The current queue item played to its end.
    ItemFinished,
    /// The current queue item failed while playing.
    ItemFailed { message: String },
}

/// Sending half of the engine event channel.
pub type MediaEventSender = mpsc::UnboundedSender<MediaEngineEvent>;

/// Queue-based audio engine supplied by the host.
///
/// Queue indices are relative to the list passed to [`MediaEngine::load`],
/// extended by any later [`MediaEngine::append`] calls.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Replace the playback queue and register the event channel.
    async fn load(&self, items: Vec<PathBuf>, events: MediaEventSender) -> Result<()>;

    /// Append items to the end of the current queue.
    async fn append(&self, items: Vec<PathBuf>) -> Result<()>;

    /// Start or resume playback of the current item.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    async fn pause(&self) -> Result<()>;

    /// Seek within the current item.
    async fn seek(&self, offset: Duration) -> Result<()>;

    /// Make the item at `index` current, positioned at its start.
    async fn select_item(&self, index: usize) -> Result<()>;

    /// Set the playback rate applied while playing (1.0 = normal).
    async fn set_rate(&self, rate: f32) -> Result<()>;

    /// Release all engine resources. No events are sent afterwards.
    ///
    /// The controller never issues a command after `unload` and never
    /// overlaps `unload` with an in-flight `play` or `append`.
    async fn unload(&self) -> Result<()>;

    /// Playback offset inside the current item.
    fn current_offset(&self) -> Duration;

    /// Last error reported by the engine, if any.
    fn last_error(&self) -> Option<String>;
}

/// Download state of a single spine element's media file.
pub trait DownloadTask: Send + Sync {
    /// Local path of the downloaded file, `None` until the download finished.
    fn local_path(&self) -> Option<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Downloaded(PathBuf);

    impl DownloadTask for Downloaded {
        fn local_path(&self) -> Option<PathBuf> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn download_task_resolves_path() {
        let task = Downloaded(PathBuf::from("/tmp/chapter-1.mp3"));
        assert_eq!(task.local_path(), Some(PathBuf::from("/tmp/chapter-1.mp3")));
    }

    #[tokio::test]
    async fn events_travel_over_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(MediaEngineEvent::RateChanged { old: 0.0, new: 1.0 })
            .unwrap();
        tx.send(MediaEngineEvent::Ready).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(MediaEngineEvent::RateChanged { old: 0.0, new: 1.0 })
        );
        assert_eq!(rx.recv().await, Some(MediaEngineEvent::Ready));
    }
}
