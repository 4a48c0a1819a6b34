//! Protocol constants and report framing for the Das Keyboard 5Q

/// Feature report size (report id + 64 payload bytes)
pub const REPORT_SIZE: usize = 65;

/// Report id used for every transaction
pub const REPORT_ID: u8 = 0x00;

/// Byte offsets within a feature report
pub mod offset {
    /// Opcode on the way out, ack marker on the way back
    pub const COMMAND: usize = 1;
    /// Transaction sequence number, echoed by the device
    pub const SEQUENCE: usize = 2;
}

/// Value the device writes at `offset::COMMAND` when it accepts a transaction
pub const ACK_MARKER: u8 = 0x14;

/// Shortest response that carries both the ack marker and the sequence echo
pub const MIN_ACK_LEN: usize = offset::SEQUENCE + 1;

/// Timing and retry constants
pub mod timing {
    /// Additional attempts for raw Read/Write (6 attempts total)
    pub const RAW_RETRIES: usize = 5;
    /// Delay between raw Read/Write attempts (ms)
    pub const RETRY_DELAY_MS: u64 = 100;
}

/// Device identification constants
pub mod device {
    /// Metadot / Das Keyboard vendor ID
    pub const VENDOR_ID: u16 = 0x24F0;
    /// Das Keyboard 5Q
    pub const PRODUCT_ID: u16 = 0x2020;
    /// Interface carrying the lighting feature reports
    pub const INTERFACE: i32 = 2;
    /// HID usage of the lighting interface as listed on macOS
    pub const USAGE: u16 = 165;
}

/// Frame a command payload as a feature report
///
/// Byte 0 of `payload` is the report-id slot and is replaced by [`REPORT_ID`];
/// the rest is copied verbatim and the report is zero-padded to
/// [`REPORT_SIZE`]. Payloads longer than a report are truncated.
pub fn build_feature_report(payload: &[u8], sequence: u8) -> Vec<u8> {
    let mut buf = vec![0u8; REPORT_SIZE];
    buf[0] = REPORT_ID;
    if payload.len() > 1 {
        let len = std::cmp::min(payload.len(), REPORT_SIZE);
        buf[1..len].copy_from_slice(&payload[1..len]);
    }
    buf[offset::SEQUENCE] = sequence;
    buf
}

/// Turn an outbound report into the read-back request for the same sequence
pub fn build_read_back(report: &[u8]) -> Vec<u8> {
    let mut buf = report.to_vec();
    buf[offset::COMMAND] = 0;
    buf
}

/// Advance a sequence number, wrapping 0xFF to 0x00
pub fn next_sequence(sequence: u8) -> u8 {
    sequence.wrapping_add(1)
}
