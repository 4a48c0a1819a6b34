//! In-memory HID backend for unit and integration tests
//!
//! Always compiled, hidden from public docs. A [`MockBackend`] is cheap to
//! clone; clones share state, so a test can hand one clone to a
//! [`DeviceSession`](crate::DeviceSession) and inspect traffic through another.

#![doc(hidden)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HidIoError;
use crate::protocol::{device, offset, ACK_MARKER};
use crate::types::DeviceDescriptor;
use crate::{HidBackend, HidHandle};

/// Scripted answer to one feature-report read-back
#[derive(Debug, Clone)]
pub enum FeatureResponse {
    /// Echo the request with the ack marker in the command slot
    Ack,
    /// Like `Ack`, with `data` copied in from byte 3 onwards
    AckWithData(Vec<u8>),
    /// Return exactly these bytes
    Raw(Vec<u8>),
    /// Fail the read-back
    Fail(HidIoError),
}

#[derive(Default)]
struct MockState {
    feature_responses: VecDeque<FeatureResponse>,
    send_failures: VecDeque<HidIoError>,
    reads: VecDeque<Result<Vec<u8>, HidIoError>>,
    writes: VecDeque<Result<usize, HidIoError>>,
    enumerate_error: Option<HidIoError>,
    open_failures: Vec<String>,
    sent_reports: Vec<Vec<u8>>,
    read_back_requests: Vec<Vec<u8>>,
    written: Vec<Vec<u8>>,
    opened: Vec<String>,
    close_count: usize,
}

/// Scriptable HID backend
#[derive(Clone)]
pub struct MockBackend {
    devices: Arc<Vec<DeviceDescriptor>>,
    state: Arc<Mutex<MockState>>,
}

/// Build a Das Keyboard 5Q descriptor for tests
pub fn descriptor(path: &str, interface: i32, usage: u16) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id: device::VENDOR_ID,
        product_id: device::PRODUCT_ID,
        manufacturer: Some("Metadot - Das Keyboard".into()),
        product: Some("Das Keyboard 5Q".into()),
        serial: None,
        path: path.into(),
        interface,
        usage,
        usage_page: 0xFF00,
    }
}

impl MockBackend {
    /// Backend that enumerates `devices` in the given order
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices: Arc::new(devices),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Backend with one keyboard exposing the lighting interface
    pub fn single_keyboard() -> Self {
        Self::new(vec![descriptor(
            "mock://dk5q/if2",
            device::INTERFACE,
            device::USAGE,
        )])
    }

    /// Queue an answer for the next feature-report read-back
    pub fn push_feature_response(&self, response: FeatureResponse) {
        self.state.lock().feature_responses.push_back(response);
    }

    /// Fail the next feature-report send
    pub fn fail_next_send(&self, error: HidIoError) {
        self.state.lock().send_failures.push_back(error);
    }

    /// Queue the result of the next raw read
    pub fn push_read(&self, result: Result<Vec<u8>, HidIoError>) {
        self.state.lock().reads.push_back(result);
    }

    /// Queue the result of the next raw write
    pub fn push_write(&self, result: Result<usize, HidIoError>) {
        self.state.lock().writes.push_back(result);
    }

    /// Make enumeration fail
    pub fn fail_enumerate(&self, error: HidIoError) {
        self.state.lock().enumerate_error = Some(error);
    }

    /// Make opening `path` fail
    pub fn fail_open(&self, path: &str) {
        self.state.lock().open_failures.push(path.to_string());
    }

    /// Every feature report sent so far
    pub fn sent_reports(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent_reports.clone()
    }

    /// Every read-back request buffer, as passed to the backend
    pub fn read_back_requests(&self) -> Vec<Vec<u8>> {
        self.state.lock().read_back_requests.clone()
    }

    /// Every raw write attempt
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    /// Paths opened so far
    pub fn opened(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    /// Number of handles closed
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }
}

impl HidBackend for MockBackend {
    fn enumerate(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Vec<DeviceDescriptor>, HidIoError> {
        if let Some(e) = self.state.lock().enumerate_error.clone() {
            return Err(e);
        }
        Ok(self
            .devices
            .iter()
            .filter(|d| d.vendor_id == vendor_id && d.product_id == product_id)
            .cloned()
            .collect())
    }

    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn HidHandle>, HidIoError> {
        let mut state = self.state.lock();
        if state.open_failures.contains(&descriptor.path) {
            return Err(HidIoError::Hid(format!("cannot open {}", descriptor.path)));
        }
        state.opened.push(descriptor.path.clone());
        Ok(Box::new(MockHandle {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl HidHandle for MockHandle {
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, HidIoError> {
        let mut state = self.state.lock();
        state.read_back_requests.push(buf.to_vec());
        let response = state
            .feature_responses
            .pop_front()
            .unwrap_or(FeatureResponse::Ack);

        match response {
            FeatureResponse::Ack => {
                buf[offset::COMMAND] = ACK_MARKER;
                Ok(buf.len())
            }
            FeatureResponse::AckWithData(data) => {
                buf[offset::COMMAND] = ACK_MARKER;
                let start = offset::SEQUENCE + 1;
                let len = data.len().min(buf.len() - start);
                buf[start..start + len].copy_from_slice(&data[..len]);
                Ok(buf.len())
            }
            FeatureResponse::Raw(bytes) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            FeatureResponse::Fail(e) => Err(e),
        }
    }

    fn send_feature_report(&self, buf: &[u8]) -> Result<usize, HidIoError> {
        let mut state = self.state.lock();
        if let Some(e) = state.send_failures.pop_front() {
            return Err(e);
        }
        state.sent_reports.push(buf.to_vec());
        Ok(buf.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, HidIoError> {
        match self.state.lock().reads.pop_front() {
            Some(Ok(bytes)) => {
                let len = bytes.len().min(buf.len());
                buf[..len].copy_from_slice(&bytes[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write(&self, buf: &[u8]) -> Result<usize, HidIoError> {
        let mut state = self.state.lock();
        state.written.push(buf.to_vec());
        state.writes.pop_front().unwrap_or(Ok(buf.len()))
    }

    fn close(self: Box<Self>) -> Result<(), HidIoError> {
        self.state.lock().close_count += 1;
        Ok(())
    }
}
