//! Transport error types

use thiserror::Error;

/// Errors a transport reports instead of a reply body
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP status {status}")]
    Status { status: u16, body: Vec<u8> },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Reply body that came with the failure, if there was one
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            TransportError::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}
