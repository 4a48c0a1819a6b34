//! LED zone map
//!
//! The firmware wires the three colour channels of each LED in one of three
//! orders depending on which physical zone of the board the LED sits in. The
//! zones are fixed, non-contiguous LED id ranges.

use std::fmt;
use std::ops::RangeInclusive;

/// LED ids wired blue, red, green
const ZONE_2: &[RangeInclusive<i32>] = &[
    14..=17,
    34..=40,
    58..=63,
    81..=90,
    106..=111,
    130..=135,
    155..=160,
];

/// LED ids wired green, blue, red
const ZONE_3: &[RangeInclusive<i32>] = &[
    18..=23,
    41..=47,
    64..=71,
    91..=95,
    115..=119,
    137..=143,
    161..=167,
    191..=191,
    193..=215,
];

/// Physical lighting zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    One,
    Two,
    Three,
}

impl Zone {
    /// Zone number as used in firmware notes (1-3)
    pub fn number(self) -> u8 {
        match self {
            Zone::One => 1,
            Zone::Two => 2,
            Zone::Three => 3,
        }
    }

    /// Channel order for LEDs in this zone
    pub fn channel_order(self) -> ChannelOrder {
        match self {
            Zone::One => ChannelOrder {
                red: 0,
                green: 1,
                blue: 2,
            },
            Zone::Two => ChannelOrder {
                red: 1,
                green: 2,
                blue: 0,
            },
            Zone::Three => ChannelOrder {
                red: 2,
                green: 0,
                blue: 1,
            },
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone {}", self.number())
    }
}

/// Firmware colour channel id used for each logical colour component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelOrder {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl ChannelOrder {
    /// `[red, green, blue]`
    pub fn as_array(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

/// Classify an LED id. Total: ids outside every range are zone 1.
pub fn classify(led_id: i32) -> (Zone, ChannelOrder) {
    let in_any = |ranges: &[RangeInclusive<i32>]| ranges.iter().any(|r| r.contains(&led_id));
    let zone = if in_any(ZONE_2) {
        Zone::Two
    } else if in_any(ZONE_3) {
        Zone::Three
    } else {
        Zone::One
    };
    (zone, zone.channel_order())
}

/// One addressable LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Led {
    pub id: i32,
    pub zone: Zone,
    pub channels: ChannelOrder,
}

impl Led {
    pub fn new(id: i32) -> Self {
        let (zone, channels) = classify(id);
        Self { id, zone, channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [u8; 3] = [0, 1, 2];

    #[test]
    fn test_zone_two_ranges() {
        for id in [14, 15, 17, 34, 40, 58, 63, 81, 90, 106, 111, 130, 135, 155, 160] {
            let (zone, order) = classify(id);
            assert_eq!(zone, Zone::Two, "id {id}");
            assert_eq!(order.as_array(), [1, 2, 0], "id {id}");
        }
    }

    #[test]
    fn test_zone_three_ranges() {
        for id in [18, 23, 41, 47, 64, 71, 91, 95, 115, 119, 137, 143, 161, 167, 191, 193, 200, 215] {
            let (zone, order) = classify(id);
            assert_eq!(zone, Zone::Three, "id {id}");
            assert_eq!(order.as_array(), [2, 0, 1], "id {id}");
        }
    }

    #[test]
    fn test_boundaries_fall_back_to_zone_one() {
        for id in [13, 24, 33, 48, 57, 72, 80, 96, 105, 112, 114, 120, 129, 136, 144, 154, 168, 190, 192, 216] {
            let (zone, order) = classify(id);
            assert_eq!(zone, Zone::One, "id {id}");
            assert_eq!(order.as_array(), IDENTITY, "id {id}");
        }
    }

    #[test]
    fn test_classify_is_total() {
        for id in [i32::MIN, -1, 0, 1, 1000, i32::MAX] {
            assert_eq!(classify(id).0, Zone::One);
        }
    }

    #[test]
    fn test_zones_do_not_overlap() {
        for id in 0..=255 {
            let two = ZONE_2.iter().any(|r| r.contains(&id));
            let three = ZONE_3.iter().any(|r| r.contains(&id));
            assert!(!(two && three), "id {id} in both zones");
        }
    }

    #[test]
    fn test_led_carries_channels() {
        let led = Led::new(36);
        assert_eq!(led.zone.number(), 2);
        assert_eq!(led.channels.red, 1);
        assert_eq!(led.channels.green, 2);
        assert_eq!(led.channels.blue, 0);
        assert_eq!(led.zone.to_string(), "zone 2");
    }
}
