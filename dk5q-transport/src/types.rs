//! Common types for the transport layer

use std::time::Duration;

use crate::protocol::{device, timing};

/// One HID interface as reported by enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Manufacturer string if available
    pub manufacturer: Option<String>,
    /// Product string if available
    pub product: Option<String>,
    /// Serial number if available
    pub serial: Option<String>,
    /// Platform device path (empty when the OS did not report one)
    pub path: String,
    /// USB interface number
    pub interface: i32,
    /// HID usage
    pub usage: u16,
    /// HID usage page
    pub usage_page: u16,
}

/// How a candidate interface is picked during connect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Match on the HID usage value (macOS exposes one entry per usage)
    ByUsage(u16),
    /// Match on the USB interface number
    ByInterface(i32),
}

impl SelectionMode {
    /// Whether `descriptor` satisfies this selection criterion
    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        match *self {
            SelectionMode::ByUsage(usage) => descriptor.usage == usage,
            SelectionMode::ByInterface(interface) => descriptor.interface == interface,
        }
    }
}

/// Bounded retry for the raw Read/Write path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: usize,
    /// Sleep between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Total number of attempts, including the first
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: timing::RAW_RETRIES,
            delay: Duration::from_millis(timing::RETRY_DELAY_MS),
        }
    }
}

/// Session configuration, resolved once at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub selection: SelectionMode,
    /// Drop the extra leading byte some platforms prepend to raw reads
    pub strip_leading_read_byte: bool,
    pub retry: RetryPolicy,
}

impl SessionConfig {
    /// Create a config with default retry policy and no read-byte stripping
    pub fn new(vendor_id: u16, product_id: u16, selection: SelectionMode) -> Self {
        Self {
            vendor_id,
            product_id,
            selection,
            strip_leading_read_byte: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Pick selection mode and read quirk for the platform this was built for
    ///
    /// macOS lists the keyboard once per usage and prefixes raw reads with the
    /// report id; other platforms select by interface number.
    pub fn for_current_platform(vendor_id: u16, product_id: u16, interface: i32, usage: u16) -> Self {
        if cfg!(target_os = "macos") {
            Self::new(vendor_id, product_id, SelectionMode::ByUsage(usage))
                .with_strip_leading_read_byte(true)
        } else {
            Self::new(vendor_id, product_id, SelectionMode::ByInterface(interface))
        }
    }

    /// Platform config for the Das Keyboard 5Q
    pub fn das_keyboard_5q() -> Self {
        Self::for_current_platform(
            device::VENDOR_ID,
            device::PRODUCT_ID,
            device::INTERFACE,
            device::USAGE,
        )
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_strip_leading_read_byte(mut self, strip: bool) -> Self {
        self.strip_leading_read_byte = strip;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
