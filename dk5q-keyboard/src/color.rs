//! RGB colour values

use std::fmt;
use std::str::FromStr;

/// RGB color value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    /// Create a new RGB color
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components in `[red, green, blue]` order
    pub fn components(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Black (all LEDs off)
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// White (all LEDs full)
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Red
    pub const RED: Self = Self::new(255, 0, 0);
    /// Green
    pub const GREEN: Self = Self::new(0, 255, 0);
    /// Blue
    pub const BLUE: Self = Self::new(0, 0, 255);
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = String;

    /// Parse `#RRGGBB` or `RRGGBB`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid color \"{s}\", expected #RRGGBB"));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| format!("invalid color \"{s}\", expected #RRGGBB"))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}
