//! Error types for sstc-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Not connected")]
    NotConnected,

    #[error("Pairing rejected by TV: {0}")]
    PairingRejected(String),

    #[error("TLS configuration error: {0}")]
    Tls(String),

    // Input validation
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unrecognized app: {0}")]
    UnknownApp(String),

    #[error("Invalid command parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("No data directory found")]
    NoDataDir,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<tokio_tungstenite::tungstenite::Error> for CoreError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        CoreError::Transport(err.to_string())
    }
}

impl From<rustls::Error> for CoreError {
    fn from(err: rustls::Error) -> Self {
        CoreError::Tls(err.to_string())
    }
}

impl CoreError {
    /// True for failures caused by operator input, before anything touched the network
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidKey(_) | CoreError::UnknownApp(_) | CoreError::InvalidParams(_)
        )
    }
}
