//! Workspace facade crate.
//!
//! Re-exports the core crates so host applications can depend on a single
//! package. The `desktop-shims` feature (default) wires desktop bridge
//! implementations into `core-runtime` configuration.

pub use bridge_traits as bridge;
pub use core_drm as drm;
pub use core_playback as playback;
pub use core_runtime as runtime;

pub use core_drm::{DrmError, DrmProcessor, DrmStatus, DrmStatusCell, Manifest};
pub use core_playback::{
    Audiobook, ChapterLocation, Cursor, PlaybackController, PlaybackError, PlaybackRate,
    PlayerObserver, PlayerState, SpineElement,
};
pub use core_runtime::config::{CoreConfig, DrmSettings};
