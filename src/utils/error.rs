use thiserror::Error;

/// A specialized Result type for ETP session operations.
pub type EtpResult<T> = Result<T, EtpError>;

/// Represents errors that can occur during ETP session operations.
#[derive(Debug, Error)]
pub enum EtpError {
    /// Invalid message format or content
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// IO error during read/write operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Message body encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Endpoint URI could not be parsed
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] url::ParseError),

    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Not connected to the remote endpoint
    #[error("Not connected")]
    NotConnected,

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
}
