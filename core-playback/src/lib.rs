//! # Playback Module
//!
//! Sequential playback of a multi-file audiobook, gated behind DRM.
//!
//! ## Overview
//!
//! - [`spine`]: chapter elements and the [`Cursor`] that walks them
//! - [`location`]: chapter-relative positions and playback rates
//! - [`observer`]: player notifications delivered to weakly held observers
//! - [`audiobook`]: identifier, spine, and DRM status of one book
//! - [`controller`]: the [`PlaybackController`] state machine driving a host
//!   [`MediaEngine`](bridge_traits::MediaEngine)
//!
//! ## Usage
//!
//! ```ignore
//! let book = Audiobook::with_drm(id, elements, &manifest, &processor)?;
//! book.start_drm_check(&processor);
//!
//! let player = PlaybackController::load(&book, book.cursor().unwrap(), engine, None).await?;
//! player.register_observer(&observer);
//! book.drm_status().resolved().await;
//! player.play().await?;
//! ```

pub mod audiobook;
pub mod controller;
pub mod error;
pub mod location;
pub mod observer;
pub mod spine;

pub use audiobook::Audiobook;
pub use controller::{PlaybackController, PlayerState};
pub use error::{PlaybackError, Result};
pub use location::{ChapterLocation, PlaybackRate};
pub use observer::{ObserverRegistry, PlayerObserver};
pub use spine::{Cursor, Spine, SpineElement};
