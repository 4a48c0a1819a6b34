//! Firmware identity

use std::fmt;

use dk5q_transport::TransportError;

/// Response byte offsets of the firmware query
mod offset {
    pub const PACKET_COUNT: usize = 3;
    pub const MAJOR: usize = 4;
    pub const MINOR: usize = 5;
    pub const PATCH: usize = 6;
    pub const RC: usize = 7;
}

/// Shortest response that carries every firmware field
pub const FIRMWARE_RESPONSE_LEN: usize = offset::RC + 1;

/// Firmware version information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub major_version: u8,
    pub minor_version: u8,
    pub patch_version: u8,
    pub rc_version: u8,
    pub packet_count: u8,
}

impl FirmwareInfo {
    /// Parse the acknowledged response of a firmware query
    pub fn from_response(response: &[u8]) -> Result<Self, TransportError> {
        if response.len() < FIRMWARE_RESPONSE_LEN {
            return Err(TransportError::ShortResponse {
                expected: FIRMWARE_RESPONSE_LEN,
                actual: response.len(),
            });
        }
        Ok(Self {
            major_version: response[offset::MAJOR],
            minor_version: response[offset::MINOR],
            patch_version: response[offset::PATCH],
            rc_version: response[offset::RC],
            packet_count: response[offset::PACKET_COUNT],
        })
    }
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{} - ({})",
            self.major_version,
            self.minor_version,
            self.patch_version,
            self.rc_version,
            self.packet_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let response = [0x00, 0x14, 0x07, 0x02, 0x01, 0x04, 0x09, 0x03, 0xAA];
        let info = FirmwareInfo::from_response(&response).unwrap();
        assert_eq!(
            info,
            FirmwareInfo {
                major_version: 1,
                minor_version: 4,
                patch_version: 9,
                rc_version: 3,
                packet_count: 2,
            }
        );
    }

    #[test]
    fn test_short_response() {
        let err = FirmwareInfo::from_response(&[0x00, 0x14, 0x00, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            TransportError::ShortResponse {
                expected: 8,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_display() {
        let info = FirmwareInfo {
            major_version: 21,
            minor_version: 0,
            patch_version: 7,
            rc_version: 1,
            packet_count: 3,
        };
        assert_eq!(info.to_string(), "21.0.7.1 - (3)");
    }
}
