//! `hidapi` implementation of the HID capability traits

use std::ffi::CString;

use hidapi::{HidApi, HidDevice};
use parking_lot::Mutex;
use tracing::debug;

use crate::error::HidIoError;
use crate::types::DeviceDescriptor;
use crate::{HidBackend, HidHandle};

/// HID backend backed by the system hidapi library
pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    /// Initialize hidapi
    pub fn new() -> Result<Self, HidIoError> {
        let api = HidApi::new()?;
        Ok(Self {
            api: Mutex::new(api),
        })
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(
        &self,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Vec<DeviceDescriptor>, HidIoError> {
        let mut api = self.api.lock();
        api.refresh_devices()?;

        let devices: Vec<DeviceDescriptor> = api
            .device_list()
            .filter(|d| d.vendor_id() == vendor_id && d.product_id() == product_id)
            .map(|d| DeviceDescriptor {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                manufacturer: d.manufacturer_string().map(|s| s.to_string()),
                product: d.product_string().map(|s| s.to_string()),
                serial: d.serial_number().map(|s| s.to_string()),
                path: d.path().to_string_lossy().to_string(),
                interface: d.interface_number(),
                usage: d.usage(),
                usage_page: d.usage_page(),
            })
            .collect();

        debug!(
            "hidapi listed {} interfaces for {:04X}:{:04X}",
            devices.len(),
            vendor_id,
            product_id
        );
        Ok(devices)
    }

    fn open(&self, descriptor: &DeviceDescriptor) -> Result<Box<dyn HidHandle>, HidIoError> {
        let path = CString::new(descriptor.path.as_str())
            .map_err(|e| HidIoError::Hid(format!("invalid device path: {e}")))?;
        let device = self.api.lock().open_path(&path)?;
        Ok(Box::new(HidApiHandle { device }))
    }
}

/// Open hidapi device
struct HidApiHandle {
    device: HidDevice,
}

impl HidHandle for HidApiHandle {
    fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize, HidIoError> {
        Ok(self.device.get_feature_report(buf)?)
    }

    fn send_feature_report(&self, buf: &[u8]) -> Result<usize, HidIoError> {
        self.device.send_feature_report(buf)?;
        Ok(buf.len())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, HidIoError> {
        Ok(self.device.read(buf)?)
    }

    fn write(&self, buf: &[u8]) -> Result<usize, HidIoError> {
        Ok(self.device.write(buf)?)
    }

    fn close(self: Box<Self>) -> Result<(), HidIoError> {
        // HidDevice closes on drop
        Ok(())
    }
}
