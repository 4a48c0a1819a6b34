//! Transport and session layer for Das Keyboard 5Q communication
//!
//! The keyboard is driven through HID feature reports. This crate provides:
//!
//! - the HID capability traits ([`HidBackend`], [`HidHandle`]) and their
//!   `hidapi` implementation
//! - [`DeviceSession`], which owns the open handle and the transaction
//!   sequence counter behind a single lock
//! - an in-memory [`mock`] backend for tests
//!
//! ```text
//! [HidApiBackend / MockBackend]   ← implements HidBackend (raw I/O)
//!              |
//!       [DeviceSession]           ← sequence stamping, ack checks, retries
//!              |
//!   [dk5q_keyboard::DasKeyboard]
//! ```

pub mod error;
pub mod mock;
pub mod protocol;
pub mod types;

mod hid_api;
mod session;

pub use error::{HidIoError, TransportError};
pub use hid_api::HidApiBackend;
pub use session::DeviceSession;
pub use types::{DeviceDescriptor, RetryPolicy, SelectionMode, SessionConfig};

/// Enumeration and open capability of a HID stack
pub trait HidBackend: Send + Sync {
    /// List every HID interface with the given vendor and product id, in the
    /// order the platform reports them
    fn enumerate(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Vec<DeviceDescriptor>, HidIoError>;

    /// Open one enumerated interface
    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn HidHandle>, HidIoError>;
}

/// I/O on one open HID interface
///
/// Implementations do not need internal locking: [`DeviceSession`] serializes
/// every call behind its own lock.
pub trait HidHandle: Send {
    /// Request a feature report; `buf[0]` holds the report id on entry
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, HidIoError>;

    /// Send a feature report; returns the number of bytes accepted
    fn send_feature_report(&self, buf: &[u8]) -> Result<usize, HidIoError>;

    /// Read an input report
    fn read(&self, buf: &mut [u8]) -> Result<usize, HidIoError>;

    /// Write an output report
    fn write(&self, buf: &[u8]) -> Result<usize, HidIoError>;

    /// Release the interface
    fn close(self: Box<Self>) -> Result<(), HidIoError>;
}
