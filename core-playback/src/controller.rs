//! # Playback Controller
//!
//! Plays the downloaded chapters of one audiobook back to back on a host
//! [`MediaEngine`].
//!
//! ## State machine
//!
//! ```text
//!            Ready event          rate 0 -> n
//! Loading ──────────────> Ready ──────────────> Playing
//!    ^                                          │    ^
//!    └── Failed event                rate n -> 0│    │rate 0 -> n
//!                                               v    │
//!                                               Paused
//!
//! unload(): any state ──> Unloaded (terminal)
//! ```
//!
//! ## Queued window
//!
//! At load time the controller walks the spine from the starting cursor and
//! queues every chapter up to the first one that is not downloaded yet.
//! [`PlaybackController::refresh_queue`] later appends chapters that finished
//! downloading after that point.
//!
//! ## Engine events
//!
//! The engine reports status on an unbounded channel. A pump task holding
//! only a weak handle to the controller applies them, so dropping the
//! controller stops the pump, and events arriving after
//! [`PlaybackController::unload`] are ignored.

use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use bridge_traits::{MediaEngine, MediaEngineEvent};
use core_drm::DrmStatusCell;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::strip_path;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::audiobook::Audiobook;
use crate::error::{PlaybackError, Result};
use crate::location::{ChapterLocation, PlaybackRate};
use crate::observer::{ObserverRegistry, PlayerObserver};
use crate::spine::Cursor;

/// Player lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Loading,
    Ready,
    Playing,
    Paused,
    Unloaded,
}

struct Session {
    cursor: Cursor,
    /// Spine index of engine queue item 0.
    window_start: usize,
    queued: usize,
    ready_for_playback: bool,
    is_loaded: bool,
    rate: PlaybackRate,
    phase: PlayerState,
    engine: Option<Arc<dyn MediaEngine>>,
}

impl Session {
    fn window_end(&self) -> usize {
        self.window_start + self.queued
    }

    fn is_queued(&self, cursor: &Cursor) -> bool {
        (self.window_start..self.window_end()).contains(&cursor.index())
    }
}

pub struct PlaybackController {
    audiobook_id: String,
    drm_status: Arc<DrmStatusCell>,
    session: Mutex<Session>,
    observers: ObserverRegistry,
    event_bus: Option<EventBus>,
    /// Held across engine calls that must not interleave with `unload`.
    engine_commands: tokio::sync::Mutex<()>,
}

impl PlaybackController {
    /// Queue the downloaded run of chapters starting at `start` and hand it
    /// to `engine`.
    ///
    /// Must be called inside a Tokio runtime; the engine event pump is
    /// spawned on it.
    #[instrument(skip_all, fields(audiobook_id = %audiobook.id(), start = start.index()))]
    pub async fn load(
        audiobook: &Audiobook,
        start: Cursor,
        engine: Arc<dyn MediaEngine>,
        event_bus: Option<EventBus>,
    ) -> Result<Arc<Self>> {
        let items = downloaded_run(Some(start.clone()));
        if items.is_empty() {
            warn!("Starting chapter is not downloaded, nothing to queue");
        } else {
            debug!(
                items = ?items
                    .iter()
                    .map(|path| strip_path(&path.to_string_lossy()).to_string())
                    .collect::<Vec<_>>(),
                "Queueing downloaded chapters"
            );
        }

        let queued = items.len();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        engine.load(items, events_tx).await.map_err(|e| {
            error!(error = %e, "Media engine rejected the playback queue");
            PlaybackError::EngineReadyFailure(e.to_string())
        })?;

        let controller = Arc::new(Self {
            audiobook_id: audiobook.id().to_string(),
            drm_status: Arc::clone(audiobook.drm_status()),
            session: Mutex::new(Session {
                window_start: start.index(),
                cursor: start,
                queued,
                ready_for_playback: false,
                is_loaded: true,
                rate: PlaybackRate::default(),
                phase: PlayerState::Loading,
                engine: Some(engine),
            }),
            observers: ObserverRegistry::new(),
            event_bus,
            engine_commands: tokio::sync::Mutex::new(()),
        });

        tokio::spawn(pump_engine_events(Arc::downgrade(&controller), events_rx));
        info!(queued, "Player loaded");
        Ok(controller)
    }

    pub fn audiobook_id(&self) -> &str {
        &self.audiobook_id
    }

    pub fn state(&self) -> PlayerState {
        self.session.lock().phase
    }

    pub fn is_loaded(&self) -> bool {
        self.session.lock().is_loaded
    }

    /// The engine reported it is ready to play.
    pub fn is_ready(&self) -> bool {
        self.session.lock().ready_for_playback
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    /// Number of chapters handed to the engine so far.
    pub fn queued_chapters(&self) -> usize {
        self.session.lock().queued
    }

    pub fn register_observer<O: PlayerObserver + 'static>(&self, observer: &Arc<O>) {
        self.observers.register(observer);
    }

    pub fn remove_observer<O: PlayerObserver + 'static>(&self, observer: &Arc<O>) {
        self.observers.remove(observer);
    }

    /// Cursor chapter with the engine's offset inside the current item.
    pub fn current_chapter_location(&self) -> Option<ChapterLocation> {
        let (cursor, engine) = self.engine_and_cursor()?;
        Some(
            cursor
                .current()
                .location(&self.audiobook_id, engine.current_offset()),
        )
    }

    /// `location` is in the chapter currently playing.
    pub fn chapter_is_playing(&self, location: &ChapterLocation) -> bool {
        self.is_playing()
            && self
                .current_chapter_location()
                .is_some_and(|current| current.is_same_chapter(location))
    }

    pub fn playback_rate(&self) -> PlaybackRate {
        self.session.lock().rate
    }

    /// Start playback.
    ///
    /// Requires a loaded player, an engine that reported ready, and a
    /// succeeded DRM check. Otherwise nothing is sent to the engine. A
    /// concurrent `unload` waits until the engine has answered.
    #[instrument(skip(self), fields(audiobook_id = %self.audiobook_id))]
    pub async fn play(&self) -> Result<()> {
        let _commands = self.engine_commands.lock().await;
        let engine = {
            let session = self.session.lock();
            let drm_status = self.drm_status.get();
            let gate = match &session.engine {
                None => Err("player unloaded"),
                Some(_) if !session.ready_for_playback => Err("media engine not ready"),
                Some(_) if !drm_status.permits_playback() => Err("DRM has not authorized playback"),
                Some(engine) => Ok(Arc::clone(engine)),
            };

            match gate {
                Ok(engine) => engine,
                Err(reason) => {
                    error!(reason, %drm_status, "User attempted to play before the player was ready");
                    return Err(PlaybackError::PlayBeforeReady(reason.to_string()));
                }
            }
        };

        engine.play().await?;
        if let Some(message) = engine.last_error() {
            error!(error = %message, "Media engine reported an error after play");
            return Err(PlaybackError::EngineFailure(message));
        }
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        let Some(engine) = self.engine() else {
            debug!("Pause ignored, player unloaded");
            return Ok(());
        };
        engine.pause().await?;
        Ok(())
    }

    /// Seek inside the current chapter. The offset is clamped to the
    /// chapter duration.
    pub async fn seek_to(&self, offset_in_chapter: Duration) -> Result<()> {
        let Some((cursor, engine)) = self.engine_and_cursor() else {
            return Ok(());
        };
        let offset = offset_in_chapter.min(cursor.current().duration);
        engine.seek(offset).await?;
        debug!(offset_ms = offset.as_millis() as u64, "Seeked within chapter");
        Ok(())
    }

    /// Make `location`'s chapter current and seek to its playhead.
    ///
    /// Only chapters in the queued window can be reached.
    #[instrument(skip_all, fields(audiobook_id = %self.audiobook_id, chapter = location.number, part = location.part))]
    pub async fn move_playhead_to_location(&self, location: &ChapterLocation) -> Result<()> {
        let not_queued = || PlaybackError::ChapterNotQueued {
            chapter: location.number,
            part: location.part,
        };

        let target = {
            let session = self.session.lock();
            let Some(engine) = session.engine.clone() else {
                return Ok(());
            };
            if location.audiobook_id != self.audiobook_id {
                warn!(other = %location.audiobook_id, "Location belongs to another audiobook");
                return Err(not_queued());
            }

            let spine = session.cursor.spine();
            (session.window_start..session.window_end())
                .find(|&i| {
                    spine[i].chapter_number == location.number
                        && spine[i].part_number == location.part
                })
                .and_then(|i| Cursor::at(Arc::clone(spine), i))
                .map(|cursor| {
                    let queue_index = cursor.index() - session.window_start;
                    let switch = cursor.index() != session.cursor.index();
                    (engine, cursor, queue_index, switch)
                })
        };

        let Some((engine, cursor, queue_index, switch)) = target else {
            warn!("Requested chapter is not queued");
            return Err(not_queued());
        };

        if switch {
            engine.select_item(queue_index).await?;
        }
        engine
            .seek(location.playhead_offset.min(cursor.current().duration))
            .await?;

        let mut session = self.session.lock();
        if session.is_loaded {
            session.cursor = cursor;
        }
        Ok(())
    }

    pub async fn play_at_location(&self, location: &ChapterLocation) -> Result<()> {
        self.move_playhead_to_location(location).await?;
        self.play().await
    }

    /// Move the playhead by `seconds` (negative skips back).
    ///
    /// Overflowing the chapter lands in the neighbouring queued chapter;
    /// without one the playhead is clamped. Returns the new location, or
    /// `None` once unloaded.
    pub async fn skip_playhead(&self, seconds: f64) -> Result<Option<ChapterLocation>> {
        let Some(current) = self.current_chapter_location() else {
            return Ok(None);
        };
        let (prev, next) = {
            let session = self.session.lock();
            (
                session.cursor.prev().filter(|c| session.is_queued(c)),
                session.cursor.next().filter(|c| session.is_queued(c)),
            )
        };

        let target = current.playhead_offset.as_secs_f64() + seconds;
        let chapter_secs = current.duration.as_secs_f64();

        let destination = if target < 0.0 {
            match prev {
                Some(prev) => {
                    let element = prev.current();
                    element
                        .location(&self.audiobook_id, Duration::ZERO)
                        .with_playhead(secs(element.duration.as_secs_f64() + target))
                }
                None => current.with_playhead(Duration::ZERO),
            }
        } else if target > chapter_secs {
            match next {
                Some(next) => next
                    .current()
                    .location(&self.audiobook_id, Duration::ZERO)
                    .with_playhead(secs(target - chapter_secs)),
                None => current.with_playhead(current.duration),
            }
        } else {
            current.with_playhead(secs(target))
        };

        self.move_playhead_to_location(&destination).await?;
        Ok(Some(destination))
    }

    pub async fn set_playback_rate(&self, rate: PlaybackRate) -> Result<()> {
        let Some(engine) = self.engine() else {
            return Ok(());
        };
        engine.set_rate(rate.value()).await?;
        self.session.lock().rate = rate;
        info!(audiobook_id = %self.audiobook_id, %rate, "Playback rate changed");
        Ok(())
    }

    /// Append chapters downloaded since the queue was built.
    ///
    /// Extends the queued window with the downloaded run that follows it and
    /// returns the number of chapters added.
    pub async fn refresh_queue(&self) -> Result<usize> {
        let _commands = self.engine_commands.lock().await;

        let (engine, from) = {
            let session = self.session.lock();
            let Some(engine) = session.engine.clone() else {
                return Ok(0);
            };
            (
                engine,
                Cursor::at(Arc::clone(session.cursor.spine()), session.window_end()),
            )
        };

        let items = downloaded_run(from);
        if items.is_empty() {
            return Ok(0);
        }

        let added = items.len();
        engine.append(items).await?;

        let mut session = self.session.lock();
        if session.is_loaded {
            session.queued += added;
        }
        info!(audiobook_id = %self.audiobook_id, added, "Appended newly downloaded chapters");
        Ok(added)
    }

    /// Release the engine and stop all notifications.
    ///
    /// Observers receive one `did_unload`. Every later call is a no-op.
    #[instrument(skip(self), fields(audiobook_id = %self.audiobook_id))]
    pub async fn unload(&self) {
        let _commands = self.engine_commands.lock().await;
        let engine = {
            let mut session = self.session.lock();
            if !session.is_loaded {
                debug!("Player already unloaded");
                return;
            }
            session.is_loaded = false;
            session.ready_for_playback = false;
            session.phase = PlayerState::Unloaded;
            session.engine.take()
        };

        if let Some(engine) = engine {
            if let Err(e) = engine.unload().await {
                warn!(error = %e, "Media engine did not unload cleanly");
            }
        }

        for observer in self.observers.snapshot() {
            observer.did_unload();
        }
        self.observers.clear();
        self.emit(PlaybackEvent::Unloaded {
            audiobook_id: self.audiobook_id.clone(),
        });
        info!("Player unloaded");
    }

    fn engine(&self) -> Option<Arc<dyn MediaEngine>> {
        self.session.lock().engine.clone()
    }

    fn engine_and_cursor(&self) -> Option<(Cursor, Arc<dyn MediaEngine>)> {
        let session = self.session.lock();
        let engine = session.engine.clone()?;
        Some((session.cursor.clone(), engine))
    }

    fn set_phase(&self, phase: PlayerState) {
        let mut session = self.session.lock();
        if session.is_loaded {
            session.phase = phase;
        }
    }

    /// Apply one engine event. Returns `false` once the player is unloaded.
    fn handle_engine_event(&self, event: MediaEngineEvent) -> bool {
        if !self.is_loaded() {
            debug!(audiobook_id = %self.audiobook_id, ?event, "Ignoring engine event after unload");
            return false;
        }

        match event {
            MediaEngineEvent::Ready => {
                let mut session = self.session.lock();
                session.ready_for_playback = true;
                if session.phase == PlayerState::Loading {
                    session.phase = PlayerState::Ready;
                }
                debug!(audiobook_id = %self.audiobook_id, "Media engine ready to play");
            }
            MediaEngineEvent::Failed { message } => {
                let mut session = self.session.lock();
                session.ready_for_playback = false;
                session.phase = PlayerState::Loading;
                error!(
                    audiobook_id = %self.audiobook_id,
                    error = %message,
                    "Media engine failed to get ready for playback"
                );
            }
            MediaEngineEvent::RateChanged { old, new } => self.on_rate_changed(old, new),
            MediaEngineEvent::ItemFinished => self.on_item_finished(),
            MediaEngineEvent::ItemFailed { message } => {
                if let Some(location) = self.current_chapter_location() {
                    error!(
                        audiobook_id = %self.audiobook_id,
                        chapter = location.number,
                        part = location.part,
                        error = %message,
                        "Chapter failed during playback"
                    );
                    self.notify(
                        PlaybackEvent::ChapterFailed {
                            audiobook_id: self.audiobook_id.clone(),
                            chapter: location.number,
                            part: location.part,
                            message: Some(message.clone()),
                        },
                        |observer| observer.did_fail_playback(&location, Some(&message)),
                    );
                }
            }
        }
        true
    }

    fn on_rate_changed(&self, old: f32, new: f32) {
        let started = old == 0.0 && new != 0.0;
        let stopped = old != 0.0 && new == 0.0;

        if started {
            let Some(engine) = self.engine() else { return };
            if let Some(message) = engine.last_error() {
                warn!(error = %message, "Playback rate rose while the engine reports an error");
                return;
            }
            self.set_phase(PlayerState::Playing);
            if let Some(location) = self.current_chapter_location() {
                self.notify(
                    PlaybackEvent::ChapterStarted {
                        audiobook_id: self.audiobook_id.clone(),
                        chapter: location.number,
                        part: location.part,
                        offset_ms: millis(location.playhead_offset),
                    },
                    |observer| observer.did_begin_playback(&location),
                );
            }
        } else if stopped {
            self.set_phase(PlayerState::Paused);
            if let Some(location) = self.current_chapter_location() {
                self.notify(
                    PlaybackEvent::ChapterStopped {
                        audiobook_id: self.audiobook_id.clone(),
                        chapter: location.number,
                        part: location.part,
                        offset_ms: millis(location.playhead_offset),
                    },
                    |observer| observer.did_stop_playback(&location),
                );
            }
        } else {
            debug!(old, new, "Engine rate adjusted");
        }
    }

    fn on_item_finished(&self) {
        let finished = {
            let mut session = self.session.lock();
            if !session.is_loaded {
                return;
            }
            let finished = session.cursor.current().clone();
            let next = session.cursor.next().filter(|c| session.is_queued(c));
            match next {
                Some(next) => session.cursor = next,
                None => {
                    debug!(audiobook_id = %self.audiobook_id, "Reached the end of the queued chapters");
                    session.phase = PlayerState::Paused;
                }
            }
            finished
        };

        let location = finished.location(&self.audiobook_id, finished.duration);
        self.notify(
            PlaybackEvent::ChapterCompleted {
                audiobook_id: self.audiobook_id.clone(),
                chapter: location.number,
                part: location.part,
            },
            |observer| observer.did_complete(&location),
        );
    }

    /// Deliver to a snapshot of the observers, then mirror on the bus.
    ///
    /// Stops as soon as the player is unloaded.
    fn notify(&self, event: PlaybackEvent, deliver: impl Fn(&dyn PlayerObserver)) {
        for observer in self.observers.snapshot() {
            if !self.is_loaded() {
                return;
            }
            deliver(observer.as_ref());
        }
        if self.is_loaded() {
            self.emit(event);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

async fn pump_engine_events(
    controller: Weak<PlaybackController>,
    mut events: mpsc::UnboundedReceiver<MediaEngineEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(controller) = controller.upgrade() else {
            break;
        };
        if !controller.handle_engine_event(event) {
            break;
        }
    }
    debug!("Media engine event pump stopped");
}

/// Local paths of the contiguous downloaded run starting at `from`.
fn downloaded_run(from: Option<Cursor>) -> Vec<PathBuf> {
    std::iter::successors(from, Cursor::next)
        .map_while(|cursor| cursor.current().local_path())
        .collect()
}

fn secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::ZERO)
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spine::SpineElement;
    use bridge_traits::DownloadTask;

    struct Task(Option<&'static str>);

    impl DownloadTask for Task {
        fn local_path(&self) -> Option<PathBuf> {
            self.0.map(PathBuf::from)
        }
    }

    fn cursor(paths: &[Option<&'static str>], index: usize) -> Option<Cursor> {
        let spine: Vec<SpineElement> = paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                SpineElement::new(i as u32 + 1, 0, Duration::from_secs(60), Arc::new(Task(*path)))
            })
            .collect();
        Cursor::at(spine.into(), index)
    }

    #[test]
    fn queue_stops_at_first_missing_download() {
        let paths = [Some("/a/1.mp3"), Some("/a/2.mp3"), None, Some("/a/4.mp3")];
        assert_eq!(
            downloaded_run(cursor(&paths, 0)),
            vec![PathBuf::from("/a/1.mp3"), PathBuf::from("/a/2.mp3")]
        );
        assert!(downloaded_run(cursor(&paths, 2)).is_empty());
        assert_eq!(downloaded_run(cursor(&paths, 3)).len(), 1);
        assert!(downloaded_run(None).is_empty());
    }

    #[test]
    fn seconds_are_clamped_at_zero() {
        assert_eq!(secs(-3.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(1.5), Duration::from_millis(1500));
    }
}
