//! Keyboard interface error types

use dk5q_transport::TransportError;
use thiserror::Error;

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Session or transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Brightness outside `[0, 63]`
    #[error("Brightness must be between 0 and 63, got {0}")]
    BrightnessOutOfRange(u8),

    /// No layout file for the requested name
    #[error("Layout not found: {0}")]
    LayoutNotFound(String),

    /// Layout JSON could not be parsed
    #[error("Invalid layout JSON: {0}")]
    Layout(#[from] serde_json::Error),

    /// Layout record that cannot become a key
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Layout file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
