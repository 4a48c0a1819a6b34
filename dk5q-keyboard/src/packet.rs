//! Packet codec
//!
//! Every command is serialized into a fresh, fixed-length buffer whose byte 0
//! is the report-id slot and byte 2 the sequence slot (both filled in by the
//! session). Several header and payload bytes were copied from captured
//! traffic and have no known meaning; they are reproduced verbatim.

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::error::KeyboardError;

/// Command opcodes (byte 1)
pub mod opcode {
    pub const QUERY_FIRMWARE: u8 = 0x11;
    pub const INITIALIZE: u8 = 0x13;
    pub const SET_KEY_STATE: u8 = 0x28;
    pub const SET_BRIGHTNESS: u8 = 0x2B;
    pub const EFFECT_BUFFER: u8 = 0x2D;
}

/// Effect buffer actions (byte 3 of an `EFFECT_BUFFER` command)
pub mod buffer_action {
    /// Pause the effect buffer while programs are uploaded
    pub const FREEZE: u8 = 0x07;
    /// Commit every pending per-key program
    pub const TRIGGER: u8 = 0x0F;
}

/// Opaque token sent with the initialize and firmware commands
pub const PROTOCOL_TOKEN: [u8; 32] = *b"MCIQFIFEDLH9F4AECX916PBD5P3A3078";

/// Highest accepted brightness level
pub const MAX_BRIGHTNESS: u8 = 63;

/// Physical key code used when a state is built with key 0
pub const DEFAULT_KEY: u8 = 151;

/// Length of a serialized key state command
pub const STATE_PACKET_LEN: usize = 33;

/// Third header byte of the firmware query, as captured
const QUERY_FIRMWARE_ARG: u8 = 0x06;

/// Constant byte between channel and key in a key state command
const KEY_STATE_MARKER: u8 = 0x01;

/// Number of `0xFFFF` words after an effect buffer header
const EFFECT_BUFFER_WORDS: usize = 14;

/// A command that serializes to a fixed byte layout
pub trait Command {
    /// Name used in logs
    const NAME: &'static str;

    /// Serialize, starting with the report-id slot
    fn encode(&self) -> Vec<u8>;
}

/// Session handshake
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialize;

impl Command for Initialize {
    const NAME: &'static str = "INITIALIZE";

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0x00, opcode::INITIALIZE, 0x00];
        buf.extend_from_slice(&PROTOCOL_TOKEN);
        buf
    }
}

/// Firmware identity query
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryFirmware;

impl Command for QueryFirmware {
    const NAME: &'static str = "QUERY_FIRMWARE";

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0x00, opcode::QUERY_FIRMWARE, QUERY_FIRMWARE_ARG];
        buf.extend_from_slice(&PROTOCOL_TOKEN);
        buf
    }
}

/// Effect buffer command layout: 4 header bytes and fourteen `0xFFFF` words
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct EffectBufferPacket {
    report_slot: u8,
    opcode: u8,
    sequence_slot: u8,
    action: u8,
    mask: [U16; EFFECT_BUFFER_WORDS],
}

impl EffectBufferPacket {
    fn new(action: u8) -> Self {
        Self {
            report_slot: 0,
            opcode: opcode::EFFECT_BUFFER,
            sequence_slot: 0,
            action,
            mask: [U16::new(0xFFFF); EFFECT_BUFFER_WORDS],
        }
    }
}

/// Pause the effect buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct Freeze;

impl Command for Freeze {
    const NAME: &'static str = "FREEZE";

    fn encode(&self) -> Vec<u8> {
        EffectBufferPacket::new(buffer_action::FREEZE)
            .as_bytes()
            .to_vec()
    }
}

/// Commit pending per-key programs
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigger;

impl Command for Trigger {
    const NAME: &'static str = "TRIGGER";

    fn encode(&self) -> Vec<u8> {
        EffectBufferPacket::new(buffer_action::TRIGGER)
            .as_bytes()
            .to_vec()
    }
}

/// Global brightness, validated on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetBrightness {
    level: u8,
}

impl SetBrightness {
    pub fn new(level: u8) -> Result<Self, KeyboardError> {
        if level > MAX_BRIGHTNESS {
            return Err(KeyboardError::BrightnessOutOfRange(level));
        }
        Ok(Self { level })
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl Command for SetBrightness {
    const NAME: &'static str = "SET_BRIGHTNESS";

    fn encode(&self) -> Vec<u8> {
        vec![0x00, opcode::SET_BRIGHTNESS, 0x00, self.level]
    }
}

/// Animation program for one colour channel of one key
///
/// Levels are channel intensities, rates and delays are firmware ticks. The
/// program ramps up towards `up_maximum`, holds at `up_hold`, ramps down
/// towards `down_minimum` and holds at `down_hold`, in the direction given by
/// `effect_flag`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Physical key code; 0 selects [`DEFAULT_KEY`]
    pub key: u8,
    /// Firmware colour channel (0-2)
    pub color_channel_id: u8,
    /// 0 runs this custom program, anything else a device preset
    pub effect_id: u8,
    /// Direction and trigger bits, see [`crate::effect::flags`]
    pub effect_flag: u16,
    pub up_maximum: u16,
    pub up_increment: u16,
    pub up_increment_delay: u16,
    pub up_hold: u16,
    pub up_hold_delay: u16,
    pub down_minimum: u16,
    pub down_decrement: u16,
    pub down_decrement_delay: u16,
    pub down_hold: u16,
    pub down_hold_delay: u16,
    pub start_delay: u16,
}

impl Default for StateInfo {
    fn default() -> Self {
        Self {
            key: 0,
            color_channel_id: 0,
            effect_id: 0,
            effect_flag: crate::effect::flags::DEFAULT,
            up_maximum: 0,
            up_increment: 0,
            up_increment_delay: 0,
            up_hold: 0,
            up_hold_delay: 0,
            down_minimum: 0,
            down_decrement: 0,
            down_decrement_delay: 0,
            down_hold: 0,
            down_hold_delay: 0,
            start_delay: 0,
        }
    }
}

impl StateInfo {
    /// Key code as sent on the wire
    pub fn wire_key(&self) -> u8 {
        if self.key == 0 {
            DEFAULT_KEY
        } else {
            self.key
        }
    }
}

/// Key state command layout (33 bytes)
#[derive(Debug, Clone, Copy, IntoBytes, FromBytes, KnownLayout, Immutable)]
#[repr(C)]
struct KeyStatePacket {
    report_slot: u8,
    opcode: u8,
    sequence_slot: u8,
    channel: u8,
    marker: u8,
    key: u8,
    effect_id: u8,
    up_maximum: U16,
    up_increment: U16,
    up_increment_delay: U16,
    up_hold: U16,
    up_hold_delay: U16,
    down_minimum: U16,
    down_decrement: U16,
    down_decrement_delay: U16,
    down_hold: U16,
    down_hold_delay: U16,
    start_delay: U16,
    _reserved: U16,
    effect_flag: U16,
}

impl From<&StateInfo> for KeyStatePacket {
    fn from(state: &StateInfo) -> Self {
        Self {
            report_slot: 0,
            opcode: opcode::SET_KEY_STATE,
            sequence_slot: 0,
            channel: state.color_channel_id,
            marker: KEY_STATE_MARKER,
            key: state.wire_key(),
            effect_id: state.effect_id,
            up_maximum: U16::new(state.up_maximum),
            up_increment: U16::new(state.up_increment),
            up_increment_delay: U16::new(state.up_increment_delay),
            up_hold: U16::new(state.up_hold),
            up_hold_delay: U16::new(state.up_hold_delay),
            down_minimum: U16::new(state.down_minimum),
            down_decrement: U16::new(state.down_decrement),
            down_decrement_delay: U16::new(state.down_decrement_delay),
            down_hold: U16::new(state.down_hold),
            down_hold_delay: U16::new(state.down_hold_delay),
            start_delay: U16::new(state.start_delay),
            _reserved: U16::new(0),
            effect_flag: U16::new(state.effect_flag),
        }
    }
}

impl Command for StateInfo {
    const NAME: &'static str = "SET_KEY_STATE";

    fn encode(&self) -> Vec<u8> {
        KeyStatePacket::from(self).as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([buf[offset], buf[offset + 1]])
    }

    #[test]
    fn test_initialize_packet() {
        let buf = Initialize.encode();
        assert_eq!(buf.len(), 35);
        assert_eq!(&buf[..3], &[0x00, 0x13, 0x00]);
        assert_eq!(&buf[3..], b"MCIQFIFEDLH9F4AECX916PBD5P3A3078");
    }

    #[test]
    fn test_firmware_packet() {
        let buf = QueryFirmware.encode();
        assert_eq!(buf.len(), 35);
        assert_eq!(&buf[..6], &[0x00, 0x11, 0x06, 0x4D, 0x43, 0x49]);
        assert_eq!(&buf[3..], &PROTOCOL_TOKEN);
    }

    #[test]
    fn test_freeze_and_trigger_packets() {
        let freeze = Freeze.encode();
        let trigger = Trigger.encode();
        assert_eq!(freeze.len(), 32);
        assert_eq!(trigger.len(), 32);
        assert_eq!(&freeze[..4], &[0x00, 0x2D, 0x00, 0x07]);
        assert_eq!(&trigger[..4], &[0x00, 0x2D, 0x00, 0x0F]);
        assert!(freeze[4..].iter().all(|&b| b == 0xFF));
        assert_eq!(freeze[4..], trigger[4..]);
    }

    #[test]
    fn test_brightness_bounds() {
        let max = SetBrightness::new(63).unwrap();
        assert_eq!(max.encode(), vec![0x00, 0x2B, 0x00, 0x3F]);
        assert_eq!(SetBrightness::new(0).unwrap().encode(), vec![0x00, 0x2B, 0x00, 0x00]);
        assert!(matches!(
            SetBrightness::new(64),
            Err(KeyboardError::BrightnessOutOfRange(64))
        ));
        assert!(SetBrightness::new(255).is_err());
    }

    #[test]
    fn test_state_packet_header_and_default_flag() {
        let state = StateInfo {
            key: 5,
            color_channel_id: 2,
            ..Default::default()
        };
        let buf = state.encode();
        assert_eq!(buf.len(), STATE_PACKET_LEN);
        assert_eq!(&buf[..7], &[0x00, 0x28, 0x00, 0x02, 0x01, 0x05, 0x00]);
        assert!(buf[7..31].iter().all(|&b| b == 0));
        assert_eq!(u16_at(&buf, 31), 1);
    }

    #[test]
    fn test_state_packet_field_offsets() {
        let state = StateInfo {
            key: 42,
            color_channel_id: 1,
            effect_id: 3,
            effect_flag: 0x5019,
            up_maximum: 0x0101,
            up_increment: 0x0202,
            up_increment_delay: 0x0303,
            up_hold: 0x0404,
            up_hold_delay: 0x0505,
            down_minimum: 0x0606,
            down_decrement: 0x0707,
            down_decrement_delay: 0x0808,
            down_hold: 0x0909,
            down_hold_delay: 0x0A0A,
            start_delay: 0x0B0B,
        };
        let buf = state.encode();
        assert_eq!(buf[6], 3);
        for (i, offset) in (7..=27).step_by(2).enumerate() {
            let expected = (i as u16 + 1) * 0x0101;
            assert_eq!(u16_at(&buf, offset), expected, "field {i} at offset {offset}");
        }
        assert_eq!(u16_at(&buf, 29), 0);
        assert_eq!(u16_at(&buf, 31), 0x5019);
    }

    #[test]
    fn test_state_packet_is_little_endian() {
        let state = StateInfo {
            up_maximum: 0x1234,
            ..Default::default()
        };
        let buf = state.encode();
        assert_eq!(&buf[7..9], &[0x34, 0x12]);
    }

    #[test]
    fn test_key_zero_uses_default_key() {
        let buf = StateInfo::default().encode();
        assert_eq!(buf[5], DEFAULT_KEY);
        for key in [1u8, 150, 151, 152, 255] {
            let state = StateInfo {
                key,
                ..Default::default()
            };
            assert_eq!(state.encode()[5], key);
        }
    }

    #[test]
    fn test_packets_are_built_fresh() {
        let mut state = StateInfo::default();
        let first = state.encode();
        state.up_hold = 200;
        let second = state.encode();
        assert_ne!(first, second);
        assert_eq!(first, StateInfo::default().encode());
    }
}
