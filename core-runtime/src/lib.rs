//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the DRM and playback crates:
//! - Logging and tracing setup
//! - Configuration builder with fail-fast validation
//! - Event bus for DRM and playback notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
