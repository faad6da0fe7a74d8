// File: src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (connection refused, reset, TLS...).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Application { status: u16, message: String },

    /// Rejected locally before anything was sent.
    #[error("{0}")]
    Validation(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl From<http::Error> for ApiError {
    fn from(e: http::Error) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

impl From<hyper_util::client::legacy::Error> for ApiError {
    fn from(e: hyper_util::client::legacy::Error) -> Self {
        ApiError::Transport(format!("{:?}", e))
    }
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error("websocket: {0}")]
    Socket(String),

    #[error("malformed packet: {0}")]
    Protocol(String),

    #[error("bad payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for PushError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        PushError::Socket(e.to_string())
    }
}
