//! Shared fixtures for the playback integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{DownloadTask, MediaEngine, MediaEngineEvent, MediaEventSender};
use core_playback::{Audiobook, ChapterLocation, PlayerObserver, SpineElement};
use mockall::mock;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

mock! {
    pub MediaEngine {}

    #[async_trait]
    impl MediaEngine for MediaEngine {
        async fn load(&self, items: Vec<PathBuf>, events: MediaEventSender) -> BridgeResult<()>;
        async fn append(&self, items: Vec<PathBuf>) -> BridgeResult<()>;
        async fn play(&self) -> BridgeResult<()>;
        async fn pause(&self) -> BridgeResult<()>;
        async fn seek(&self, offset: Duration) -> BridgeResult<()>;
        async fn select_item(&self, index: usize) -> BridgeResult<()>;
        async fn set_rate(&self, rate: f32) -> BridgeResult<()>;
        async fn unload(&self) -> BridgeResult<()>;
        fn current_offset(&self) -> Duration;
        fn last_error(&self) -> Option<String>;
    }
}

pub const CHAPTER_LENGTH: Duration = Duration::from_secs(60);
pub const ENGINE_OFFSET: Duration = Duration::from_secs(5);

/// Download whose completion the test controls.
#[derive(Default)]
pub struct Download(Mutex<Option<PathBuf>>);

impl Download {
    pub fn finish(&self, path: impl Into<PathBuf>) {
        *self.0.lock().unwrap() = Some(path.into());
    }
}

impl DownloadTask for Download {
    fn local_path(&self) -> Option<PathBuf> {
        self.0.lock().unwrap().clone()
    }
}

/// Spine elements of one-minute chapters, numbered from 1. `downloaded[i]`
/// decides whether chapter `i + 1` already has a local file.
pub fn chapters(downloaded: &[bool]) -> (Vec<SpineElement>, Vec<Arc<Download>>) {
    let downloads: Vec<Arc<Download>> = downloaded
        .iter()
        .enumerate()
        .map(|(i, done)| {
            let download = Arc::new(Download::default());
            if *done {
                download.finish(format!("/data/books/chapter-{}.mp3", i + 1));
            }
            download
        })
        .collect();

    let elements = downloads
        .iter()
        .enumerate()
        .map(|(i, download)| {
            let task: Arc<dyn DownloadTask> = Arc::clone(download) as Arc<dyn DownloadTask>;
            SpineElement::new(i as u32 + 1, 0, CHAPTER_LENGTH, task)
                .with_title(format!("Chapter {}", i + 1))
        })
        .collect();

    (elements, downloads)
}

pub fn open_access_book(downloaded: &[bool]) -> (Audiobook, Vec<Arc<Download>>) {
    let (elements, downloads) = chapters(downloaded);
    (Audiobook::open_access("urn:isbn:9780000000001", elements), downloads)
}

/// Where the controller's engine event sender ends up after `load`.
#[derive(Clone, Default)]
pub struct EngineEvents(pub Arc<Mutex<Option<MediaEventSender>>>);

impl EngineEvents {
    pub fn send(&self, event: MediaEngineEvent) {
        if let Some(sender) = self.0.lock().unwrap().as_ref() {
            let _ = sender.send(event);
        }
    }

    /// Send and let the pump task apply the events.
    pub async fn deliver(&self, events: impl IntoIterator<Item = MediaEngineEvent>) {
        for event in events {
            self.send(event);
        }
        settle().await;
    }
}

pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Engine accepting any queue, reporting a fixed offset and no error.
pub fn engine(events: &EngineEvents) -> MockMediaEngine {
    engine_with_error(events, None)
}

pub fn engine_with_error(events: &EngineEvents, last_error: Option<&str>) -> MockMediaEngine {
    let mut engine = MockMediaEngine::new();
    let slot = Arc::clone(&events.0);
    engine.expect_load().times(1).returning(move |_, sender| {
        *slot.lock().unwrap() = Some(sender);
        Ok(())
    });
    engine.expect_current_offset().return_const(ENGINE_OFFSET);
    engine
        .expect_last_error()
        .return_const(last_error.map(str::to_string));
    engine
}

/// Observer recording every callback as a short string.
#[derive(Default)]
pub struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }
}

impl PlayerObserver for Recorder {
    fn did_begin_playback(&self, location: &ChapterLocation) {
        self.push(format!("begin:{}", location.number));
    }

    fn did_stop_playback(&self, location: &ChapterLocation) {
        self.push(format!("stop:{}", location.number));
    }

    fn did_fail_playback(&self, location: &ChapterLocation, error: Option<&str>) {
        self.push(format!("fail:{}:{}", location.number, error.unwrap_or("")));
    }

    fn did_complete(&self, location: &ChapterLocation) {
        self.push(format!("complete:{}", location.number));
    }

    fn did_unload(&self) {
        self.push("unload".to_string());
    }
}

/// One captured event: its level, message and `error` field.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub error: Option<String>,
}

/// Captures every event.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

impl CapturedLogs {
    pub fn count_level(&self, level: Level) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level)
            .count()
    }

    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level && event.message.contains(needle))
            .count()
    }

    /// Events at `level` whose message contains `needle`.
    pub fn find(&self, level: Level, needle: &str) -> Vec<CapturedEvent> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.level == level && event.message.contains(needle))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    error: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "error" => self.error = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            error: visitor.error,
        });
    }
}
