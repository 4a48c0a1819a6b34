//! Transport error types

use thiserror::Error;

/// Failure reported by the underlying HID backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HidIoError {
    #[error("HID error: {0}")]
    Hid(String),

    #[error("HID permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device disconnected")]
    Disconnected,
}

impl From<hidapi::HidError> for HidIoError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            HidIoError::PermissionDenied(msg)
        } else {
            HidIoError::Hid(msg)
        }
    }
}

/// Errors that can occur during session operations
///
/// I/O failures carry the stage they happened in so callers can tell a
/// rejected write from a failed read-back. None of these are retried inside a
/// feature-report transaction.
#[derive(Error, Debug)]
pub enum TransportError {
    // Connection
    #[error("No device found for {vid:04X}:{pid:04X}")]
    NoDeviceFound { vid: u16, pid: u16 },

    #[error("No compatible device interface matched")]
    NoCompatibleDeviceMatch,

    #[error("Failed to open device {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: HidIoError,
    },

    #[error("Device not connected")]
    NotConnected,

    // Transaction stages
    #[error("Feature report write failed: {0}")]
    WriteFailed(#[source] HidIoError),

    #[error("Feature report read-back failed: {0}")]
    ReadFailed(#[source] HidIoError),

    #[error("Maximum retries exceeded after {attempts} attempts")]
    RetriesExceeded {
        attempts: usize,
        last_error: Option<HidIoError>,
    },

    #[error("Acknowledgement mismatch: expected 0x14, got 0x{actual:02X}")]
    AckMismatch { actual: u8 },

    #[error("Sequence mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    SequenceMismatch { expected: u8, actual: u8 },

    #[error("Response too short: expected {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },

    // Generic
    #[error("Backend error: {0}")]
    Backend(#[from] HidIoError),
}
