//! Runtime setup errors.
//!
//! Everything here is raised while wiring the core together (configuration,
//! bridge defaults, subscriber installation), never during playback.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was neither injected nor available by default.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A default bridge could not be constructed.
    #[error("Bridge setup failed: {0}")]
    BridgeSetup(#[from] bridge_traits::BridgeError),

    /// The global tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
