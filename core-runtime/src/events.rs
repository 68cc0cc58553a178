//! # Event Bus System
//!
//! Broadcast channel carrying typed DRM and playback notifications to any
//! number of host-side listeners, built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wrapping [`DrmEvent`] and [`PlaybackEvent`]
//! - **EventBus**: cloneable publisher handle
//! - **EventStream**: receiver wrapper with an optional predicate
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ DrmProcessor ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌──────────────┐     emit      │ (broadcast│                  └────────────┘
//! │  Controller  ├──────────────>│  channel) │
//! └──────────────┘               └───────────┘
//! ```
//!
//! Observers registered on a controller remain the primary notification
//! path. The bus mirrors those notifications for hosts that prefer a single
//! stream (analytics, UI state stores).
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Unloaded {
//!     audiobook_id: "urn:isbn:9780000000001".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Player unloaded");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender is gone; the subscriber should exit.
//!
//! Emitting without subscribers returns `Err`; publishers in this workspace
//! ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// DRM pipeline events
    Drm(DrmEvent),
    /// Player notifications
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Drm(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Severity used for filtering and log routing.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Drm(DrmEvent::RightsRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Drm(DrmEvent::StatusResolved { status, .. }) if status == "failed" => {
                EventSeverity::Error
            }
            CoreEvent::Playback(PlaybackEvent::ChapterFailed { .. }) => EventSeverity::Error,
            CoreEvent::Drm(DrmEvent::StatusResolved { .. }) => EventSeverity::Info,
            CoreEvent::Playback(PlaybackEvent::Unloaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// Audiobook the event refers to.
    pub fn audiobook_id(&self) -> &str {
        match self {
            CoreEvent::Drm(e) => e.audiobook_id(),
            CoreEvent::Playback(e) => e.audiobook_id(),
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// DRM Events
// ============================================================================

/// Events emitted while a book's DRM is validated and checked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DrmEvent {
    /// The manifest's rights window does not allow playback now.
    RightsRejected {
        audiobook_id: String,
        /// Display form of the rights error.
        reason: String,
    },
    /// A license-status request is about to be issued.
    LicenseCheckStarted { audiobook_id: String, url: String },
    /// The book's DRM status reached a terminal value.
    StatusResolved {
        audiobook_id: String,
        /// `"succeeded"` or `"failed"`.
        status: String,
    },
}

impl DrmEvent {
    fn description(&self) -> &str {
        match self {
            DrmEvent::RightsRejected { .. } => "Rights window rejected playback",
            DrmEvent::LicenseCheckStarted { .. } => "License check started",
            DrmEvent::StatusResolved { .. } => "DRM status resolved",
        }
    }

    fn audiobook_id(&self) -> &str {
        match self {
            DrmEvent::RightsRejected { audiobook_id, .. }
            | DrmEvent::LicenseCheckStarted { audiobook_id, .. }
            | DrmEvent::StatusResolved { audiobook_id, .. } => audiobook_id,
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Player notifications, one per observer callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback began (rate went from zero to non-zero).
    ChapterStarted {
        audiobook_id: String,
        chapter: u32,
        part: u32,
        /// Playhead offset inside the chapter, in milliseconds.
        offset_ms: u64,
    },
    /// Playback stopped (rate went to zero).
    ChapterStopped {
        audiobook_id: String,
        chapter: u32,
        part: u32,
        offset_ms: u64,
    },
    /// A chapter played to its end.
    ChapterCompleted {
        audiobook_id: String,
        chapter: u32,
        part: u32,
    },
    /// A chapter failed while playing.
    ChapterFailed {
        audiobook_id: String,
        chapter: u32,
        part: u32,
        message: Option<String>,
    },
    /// The player released its engine. Nothing follows for this book.
    Unloaded { audiobook_id: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::ChapterStarted { .. } => "Playback started",
            PlaybackEvent::ChapterStopped { .. } => "Playback stopped",
            PlaybackEvent::ChapterCompleted { .. } => "Chapter completed",
            PlaybackEvent::ChapterFailed { .. } => "Chapter playback failed",
            PlaybackEvent::Unloaded { .. } => "Player unloaded",
        }
    }

    fn audiobook_id(&self) -> &str {
        match self {
            PlaybackEvent::ChapterStarted { audiobook_id, .. }
            | PlaybackEvent::ChapterStopped { audiobook_id, .. }
            | PlaybackEvent::ChapterCompleted { audiobook_id, .. }
            | PlaybackEvent::ChapterFailed { audiobook_id, .. }
            | PlaybackEvent::Unloaded { audiobook_id } => audiobook_id,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Cloneable publisher over a broadcast channel.
///
/// Subscribers that fall more than `capacity` events behind receive
/// `RecvError::Lagged` and skip ahead; they never block publishers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers.
    ///
    /// Returns the number of receivers, or an error when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events rejected by a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let drm_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Drm(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`EventStream::recv`]; `None` when drained.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
