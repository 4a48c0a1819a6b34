//! Device session: connection ownership and the feature-report transaction
//!
//! A transaction is two feature-report exchanges under one lock:
//!
//! 1. send the command with the current sequence stamped at byte 2
//! 2. request the report back with the command slot cleared; the device
//!    answers with `0x14` at byte 1 and the same sequence at byte 2
//!
//! The sequence only advances when both checks pass. Nothing in a transaction
//! is retried; the bounded retry applies to the raw [`DeviceSession::read`] and
//! [`DeviceSession::write`] path only.

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{HidIoError, TransportError};
use crate::protocol::{self, offset, ACK_MARKER, MIN_ACK_LEN, REPORT_SIZE};
use crate::types::{DeviceDescriptor, SessionConfig};
use crate::{HidBackend, HidHandle};

/// State guarded by the session lock
struct SessionState {
    handle: Option<Box<dyn HidHandle>>,
    device: Option<DeviceDescriptor>,
    sequence: u8,
}

impl SessionState {
    fn handle(&self) -> Result<&dyn HidHandle, TransportError> {
        self.handle.as_deref().ok_or(TransportError::NotConnected)
    }

    /// Close and forget the current handle, if any
    fn release(&mut self) -> Result<(), HidIoError> {
        self.device = None;
        match self.handle.take() {
            Some(handle) => handle.close(),
            None => Ok(()),
        }
    }

    /// Drop the handle after an I/O failure; close errors are only logged
    fn release_after_failure(&mut self, error: &TransportError) {
        warn!("Releasing device handle after transport failure: {}", error);
        if let Err(e) = self.release() {
            warn!("Closing device after failure also failed: {}", e);
        }
    }
}

/// Exclusive owner of one open keyboard connection
///
/// Every operation takes the session lock for its whole duration, so a second
/// caller blocks until the in-flight transaction (including raw-path retry
/// sleeps) has finished.
pub struct DeviceSession {
    backend: Arc<dyn HidBackend>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl DeviceSession {
    /// Create a disconnected session
    pub fn new(backend: Arc<dyn HidBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            state: Mutex::new(SessionState {
                handle: None,
                device: None,
                sequence: 0,
            }),
        }
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether a handle is currently open
    pub fn is_connected(&self) -> bool {
        self.state.lock().handle.is_some()
    }

    /// Descriptor of the open interface
    pub fn connected_device(&self) -> Option<DeviceDescriptor> {
        self.state.lock().device.clone()
    }

    /// Sequence number the next transaction will carry
    pub fn sequence(&self) -> u8 {
        self.state.lock().sequence
    }

    /// Overwrite the sequence counter (resynchronization after a mismatch)
    pub fn set_sequence(&self, sequence: u8) {
        self.state.lock().sequence = sequence;
    }

    /// List every interface matching the configured vendor and product id
    pub fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        Ok(self
            .backend
            .enumerate(self.config.vendor_id, self.config.product_id)?)
    }

    /// Open the first enumerated interface that satisfies the selection mode
    ///
    /// Candidates are tried in the order the backend reports them; entries
    /// without a path are skipped. An already open handle is closed first.
    pub fn connect(&self) -> Result<DeviceDescriptor, TransportError> {
        let vid = self.config.vendor_id;
        let pid = self.config.product_id;
        let devices = self.backend.enumerate(vid, pid)?;
        if devices.is_empty() {
            return Err(TransportError::NoDeviceFound { vid, pid });
        }

        let mut state = self.state.lock();
        if state.handle.is_some() {
            debug!("Closing previous handle before reconnect");
            if let Err(e) = state.release() {
                warn!("Failed to close previous handle: {}", e);
            }
        }

        let mut last_open_error = None;
        for candidate in devices {
            debug!(
                "Found device: mfg={:?} product={:?} serial={:?} path={} interface={} usage={} usage_page=0x{:04X}",
                candidate.manufacturer,
                candidate.product,
                candidate.serial,
                candidate.path,
                candidate.interface,
                candidate.usage,
                candidate.usage_page
            );
            if candidate.path.is_empty() || !self.config.selection.matches(&candidate) {
                continue;
            }

            debug!("Found matching device, trying to open {}", candidate.path);
            match self.backend.open(&candidate) {
                Ok(handle) => {
                    info!(
                        "Opened {:04X}:{:04X} at {} ({:?})",
                        vid, pid, candidate.path, self.config.selection
                    );
                    state.handle = Some(handle);
                    state.device = Some(candidate.clone());
                    return Ok(candidate);
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", candidate.path, e);
                    last_open_error = Some(TransportError::OpenFailed {
                        path: candidate.path,
                        source: e,
                    });
                }
            }
        }

        Err(last_open_error.unwrap_or(TransportError::NoCompatibleDeviceMatch))
    }

    /// Run one feature-report transaction
    ///
    /// `payload` is a command as built by the packet codec, with byte 0 as the
    /// report-id slot. Returns the raw response report on success.
    pub fn feature_report(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        let sequence = state.sequence;
        let handle = state.handle()?;

        match transact(handle, payload, sequence) {
            Ok(response) => {
                state.sequence = protocol::next_sequence(sequence);
                Ok(response)
            }
            Err(e) => {
                if matches!(
                    e,
                    TransportError::WriteFailed(_) | TransportError::ReadFailed(_)
                ) {
                    state.release_after_failure(&e);
                }
                Err(e)
            }
        }
    }

    /// Read one full input report, retrying on failure or short reads
    pub fn read(&self) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        let handle = state.handle()?;
        let strip = self.config.strip_leading_read_byte;
        let policy = self.config.retry;
        let mut last_error = None;

        for attempt in 0..policy.attempts() {
            if attempt > 0 {
                thread::sleep(policy.delay);
            }

            let mut buf = vec![0u8; REPORT_SIZE + usize::from(strip)];
            match handle.read(&mut buf) {
                Ok(n) => {
                    let (data, n) = if strip && n > 0 {
                        (&buf[1..], n - 1)
                    } else {
                        (&buf[..], n)
                    };
                    if n == REPORT_SIZE {
                        debug!("Read report: {:02X?}", &data[..9]);
                        return Ok(data[..n].to_vec());
                    }
                    debug!(
                        "Short read on attempt {}: {} of {} bytes",
                        attempt, n, REPORT_SIZE
                    );
                }
                Err(e) => {
                    debug!("Read attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        let error = TransportError::RetriesExceeded {
            attempts: policy.attempts(),
            last_error,
        };
        state.release_after_failure(&error);
        Err(error)
    }

    /// Write an output report, retrying until every byte is accepted
    pub fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        let handle = state.handle()?;
        let policy = self.config.retry;
        let mut last_error = None;

        for attempt in 0..policy.attempts() {
            if attempt > 0 {
                thread::sleep(policy.delay);
            }

            match handle.write(data) {
                Ok(n) if n == data.len() => {
                    debug!("Wrote {} bytes", n);
                    return Ok(());
                }
                Ok(n) => {
                    debug!(
                        "Short write on attempt {}: {} of {} bytes",
                        attempt,
                        n,
                        data.len()
                    );
                }
                Err(e) => {
                    debug!("Write attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        let error = TransportError::RetriesExceeded {
            attempts: policy.attempts(),
            last_error,
        };
        state.release_after_failure(&error);
        Err(error)
    }

    /// Close the handle; later operations fail with `NotConnected`
    pub fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.handle.is_some() {
            info!("Disconnecting keyboard");
        }
        state.release()?;
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Err(e) = self.state.get_mut().release() {
            debug!("Closing device on drop failed: {}", e);
        }
    }
}

/// Write the command, read it back and validate the acknowledgement
fn transact(
    handle: &dyn HidHandle,
    payload: &[u8],
    sequence: u8,
) -> Result<Vec<u8>, TransportError> {
    let report = protocol::build_feature_report(payload, sequence);
    let shown = payload.len().clamp(MIN_ACK_LEN, REPORT_SIZE);
    debug!(
        "Sending feature report seq=0x{:02X}: {:02X?}",
        sequence,
        &report[..shown]
    );

    handle
        .send_feature_report(&report)
        .map_err(TransportError::WriteFailed)?;

    let mut response = protocol::build_read_back(&report);
    let read = handle
        .get_feature_report(&mut response)
        .map_err(TransportError::ReadFailed)?;
    if read < MIN_ACK_LEN {
        return Err(TransportError::ShortResponse {
            expected: MIN_ACK_LEN,
            actual: read,
        });
    }
    response.truncate(read);
    debug!(
        "Got response seq=0x{:02X}: {:02X?}",
        sequence,
        &response[..read.min(16)]
    );

    validate_ack(&response, sequence)?;
    Ok(response)
}

/// Check the ack marker and sequence echo of a read-back report
pub(crate) fn validate_ack(response: &[u8], sequence: u8) -> Result<(), TransportError> {
    if response.len() < MIN_ACK_LEN {
        return Err(TransportError::ShortResponse {
            expected: MIN_ACK_LEN,
            actual: response.len(),
        });
    }
    let marker = response[offset::COMMAND];
    if marker != ACK_MARKER {
        return Err(TransportError::AckMismatch { actual: marker });
    }
    let echoed = response[offset::SEQUENCE];
    if echoed != sequence {
        return Err(TransportError::SequenceMismatch {
            expected: sequence,
            actual: echoed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_accepted() {
        assert!(validate_ack(&[0x00, 0x14, 0x09, 0x00], 0x09).is_ok());
    }

    #[test]
    fn test_wrong_marker_is_ack_mismatch() {
        for marker in [0x00u8, 0x13, 0x15, 0xFF] {
            let err = validate_ack(&[0x00, marker, 0x09], 0x09).unwrap_err();
            assert!(matches!(err, TransportError::AckMismatch { actual } if actual == marker));
        }
    }

    #[test]
    fn test_wrong_sequence_is_sequence_mismatch() {
        let err = validate_ack(&[0x00, 0x14, 0x0A], 0x09).unwrap_err();
        assert!(matches!(
            err,
            TransportError::SequenceMismatch {
                expected: 0x09,
                actual: 0x0A
            }
        ));
    }

    #[test]
    fn test_marker_checked_before_sequence() {
        let err = validate_ack(&[0x00, 0x01, 0x0A], 0x09).unwrap_err();
        assert!(matches!(err, TransportError::AckMismatch { actual: 0x01 }));
    }

    #[test]
    fn test_short_response() {
        let err = validate_ack(&[0x00, 0x14], 0x00).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortResponse {
                expected: 3,
                actual: 2
            }
        ));
    }
}
