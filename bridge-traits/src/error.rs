//! Error type shared by every host bridge.

use thiserror::Error;

/// Failure reported by a host capability.
///
/// Implementations map platform errors onto the closest variant and keep the
/// platform message; the core only branches on [`BridgeError::is_transient`].
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host does not provide this capability.
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// No HTTP response was received.
    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    /// Keychain/Keystore failure other than a missing entry.
    #[error("Secure store error: {0}")]
    SecureStore(String),

    #[error("Media engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether repeating the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Transport(_) | BridgeError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_transient() {
        assert!(BridgeError::Timeout.is_transient());
        assert!(BridgeError::Transport("connection reset".into()).is_transient());
        assert!(!BridgeError::SecureStore("locked".into()).is_transient());
        assert!(!BridgeError::Engine("no device".into()).is_transient());
    }

    #[test]
    fn io_errors_convert() {
        let err: BridgeError = std::io::Error::new(std::io::ErrorKind::NotFound, "chapter-1.mp3").into();
        assert!(err.to_string().contains("chapter-1.mp3"));
    }
}
