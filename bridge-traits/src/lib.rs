//! # Host Bridge Traits
//!
//! Capability contracts the audiobook core requires from its host platform.
//!
//! ## Overview
//!
//! The core never talks to an audio engine, a keychain, or the network
//! directly. Each of those collaborators is described here as a trait, and the
//! host (or `bridge-desktop` on desktop targets) supplies the implementation.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single request/response HTTP transport
//!
//! ### Security
//! - [`SecureStore`](storage::SecureStore) - Secret persistence (Keychain/Keystore)
//!
//! ### Media
//! - [`MediaEngine`](playback::MediaEngine) - Queue-based audio engine emitting
//!   [`MediaEngineEvent`](playback::MediaEngineEvent)s
//! - [`DownloadTask`](playback::DownloadTask) - Per-chapter local media resolution
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; media engine events are delivered on the
//! engine's own context and the core treats them as concurrent with its own
//! method calls.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{DownloadTask, MediaEngine, MediaEngineEvent, MediaEventSender};
pub use storage::SecureStore;
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
