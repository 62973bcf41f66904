//! Errors which terminate an ingestor.

use thiserror::Error;

/// Every variant is fatal to the ingestor that hit it and to nothing else.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to connect: {0}")]
    Connect(#[source] tungstenite::Error),
    #[error("transport error: {0}")]
    Transport(#[source] tungstenite::Error),
    #[error("malformed depth update: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unexpected event field: {0}")]
    UnexpectedEvent(String),
    #[error("unexpected symbol field: expected {expected}, got {got}")]
    UnexpectedSymbol { expected: String, got: String },
    #[error("unexpected websocket connection close")]
    ConnectionClosed,
}
