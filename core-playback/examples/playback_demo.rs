//! # Playback Controller Walkthrough
//!
//! Loads an open-access audiobook on a simulated engine, plays it, skips
//! across a chapter boundary, picks up a late download, and unloads.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::time::LogLevel;
use bridge_traits::{DownloadTask, MediaEngine, MediaEngineEvent, MediaEventSender};
use core_playback::{
    Audiobook, ChapterLocation, PlaybackController, PlaybackRate, PlayerObserver, SpineElement,
};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;

// ============================================================================
// Simulated host collaborators
// ============================================================================

#[derive(Default)]
struct EngineState {
    events: Option<MediaEventSender>,
    queue: Vec<PathBuf>,
    current: usize,
    offset: Duration,
    rate: f32,
    playing: bool,
}

/// Engine that reports transitions immediately instead of rendering audio.
#[derive(Default)]
struct SimulatedEngine {
    state: Mutex<EngineState>,
}

impl SimulatedEngine {
    fn emit(&self, event: MediaEngineEvent) {
        if let Some(events) = &self.state.lock().events {
            let _ = events.send(event);
        }
    }

    fn set_playing(&self, playing: bool) {
        let (old, new) = {
            let mut state = self.state.lock();
            let old = if state.playing { state.rate } else { 0.0 };
            state.playing = playing;
            (old, if playing { state.rate } else { 0.0 })
        };
        if old != new {
            self.emit(MediaEngineEvent::RateChanged { old, new });
        }
    }
}

#[async_trait]
impl MediaEngine for SimulatedEngine {
    async fn load(&self, items: Vec<PathBuf>, events: MediaEventSender) -> BridgeResult<()> {
        {
            let mut state = self.state.lock();
            state.queue = items;
            state.rate = 1.0;
            state.events = Some(events);
        }
        self.emit(MediaEngineEvent::Ready);
        Ok(())
    }

    async fn append(&self, items: Vec<PathBuf>) -> BridgeResult<()> {
        self.state.lock().queue.extend(items);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.set_playing(true);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.set_playing(false);
        Ok(())
    }

    async fn seek(&self, offset: Duration) -> BridgeResult<()> {
        self.state.lock().offset = offset;
        Ok(())
    }

    async fn select_item(&self, index: usize) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.current = index.min(state.queue.len().saturating_sub(1));
        state.offset = Duration::ZERO;
        Ok(())
    }

    async fn set_rate(&self, rate: f32) -> BridgeResult<()> {
        self.state.lock().rate = rate;
        Ok(())
    }

    async fn unload(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.events = None;
        state.queue.clear();
        Ok(())
    }

    fn current_offset(&self) -> Duration {
        self.state.lock().offset
    }

    fn last_error(&self) -> Option<String> {
        None
    }
}

struct Download(Mutex<Option<PathBuf>>);

impl DownloadTask for Download {
    fn local_path(&self) -> Option<PathBuf> {
        self.0.lock().clone()
    }
}

struct ConsoleObserver;

impl PlayerObserver for ConsoleObserver {
    fn did_begin_playback(&self, location: &ChapterLocation) {
        println!("   ▶ chapter {} at {:?}", location.number, location.playhead_offset);
    }

    fn did_stop_playback(&self, location: &ChapterLocation) {
        println!("   ⏸ chapter {} at {:?}", location.number, location.playhead_offset);
    }

    fn did_complete(&self, location: &ChapterLocation) {
        println!("   ✓ chapter {} complete", location.number);
    }

    fn did_unload(&self) {
        println!("   ⏏ player unloaded");
    }
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )?;

    println!("=== Playback Controller Walkthrough ===\n");

    let downloads: Vec<Arc<Download>> = (1..=3)
        .map(|n| {
            let path = (n < 3).then(|| PathBuf::from(format!("/tmp/audiobook/chapter-{n}.mp3")));
            Arc::new(Download(Mutex::new(path)))
        })
        .collect();

    let elements = downloads
        .iter()
        .enumerate()
        .map(|(i, download)| {
            let task: Arc<dyn DownloadTask> = Arc::clone(download) as Arc<dyn DownloadTask>;
            SpineElement::new(i as u32 + 1, 0, Duration::from_secs(300), task)
                .with_title(format!("Chapter {}", i + 1))
        })
        .collect();

    let book = Audiobook::open_access("urn:isbn:9780000000001", elements);
    let start = book
        .cursor()
        .ok_or_else(|| anyhow::anyhow!("audiobook has no chapters"))?;

    println!("1. Loading {} chapters ({} downloaded)", book.spine().len(), 2);
    let player = PlaybackController::load(&book, start, Arc::new(SimulatedEngine::default()), None)
        .await?;
    let observer = Arc::new(ConsoleObserver);
    player.register_observer(&observer);
    settle().await;
    println!("   state: {:?}, queued: {}", player.state(), player.queued_chapters());

    println!("\n2. Playing");
    player.play().await?;
    settle().await;

    println!("\n3. Skipping 5 minutes forward");
    if let Some(location) = player.skip_playhead(300.0).await? {
        println!("   now at chapter {} / {:?}", location.number, location.playhead_offset);
    }

    println!("\n4. Chapter 3 finished downloading");
    *downloads[2].0.lock() = Some(PathBuf::from("/tmp/audiobook/chapter-3.mp3"));
    let added = player.refresh_queue().await?;
    println!("   appended {added}, queued: {}", player.queued_chapters());

    println!("\n5. Speeding up");
    player.set_playback_rate(PlaybackRate::OneAndAHalfTime).await?;
    println!("   rate: {}", player.playback_rate());

    println!("\n6. Pausing and unloading");
    player.pause().await?;
    settle().await;
    player.unload().await;

    println!("\n=== Done ===");
    Ok(())
}
