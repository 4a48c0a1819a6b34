// CLI definitions using clap

use clap::{Parser, Subcommand};
use dk5q_keyboard::RgbColor;
use dk5q_transport::protocol::device;
use dk5q_transport::{SelectionMode, SessionConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dk5q")]
#[command(author, version, about = "Das Keyboard 5Q lighting driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose logging (per-packet hex dumps)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// USB vendor id
    #[arg(long, global = true, default_value = "0x24F0", value_parser = parse_u16)]
    pub vid: u16,

    /// USB product id
    #[arg(long, global = true, default_value = "0x2020", value_parser = parse_u16)]
    pub pid: u16,

    /// HID interface number of the lighting interface
    #[arg(long, global = true, default_value_t = device::INTERFACE)]
    pub interface: i32,

    /// HID usage of the lighting interface
    #[arg(long, global = true, default_value_t = device::USAGE)]
    pub usage: u16,

    /// Select the interface by usage instead of interface number
    #[arg(long, global = true)]
    pub by_usage: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Session configuration for the selected device
    pub fn session_config(&self) -> SessionConfig {
        let config =
            SessionConfig::for_current_platform(self.vid, self.pid, self.interface, self.usage);
        if self.by_usage {
            config.with_selection(SelectionMode::ByUsage(self.usage))
        } else {
            config
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List HID interfaces of the keyboard
    #[command(visible_alias = "ls")]
    List,

    /// Print firmware version
    #[command(visible_aliases = ["version", "v"])]
    Info,

    /// Set global brightness
    #[command(visible_alias = "b")]
    Brightness {
        /// Level (0-63)
        #[arg(value_parser = clap::value_parser!(u8).range(0..64))]
        level: u8,
    },

    /// Set the color of one key
    #[command(visible_alias = "c")]
    Color {
        /// Layout JSON file
        #[arg(short, long, value_name = "FILE")]
        layout: PathBuf,

        /// Key name (description without spaces or punctuation, e.g. LeftShift)
        key: String,

        /// Color as #RRGGBB
        color: RgbColor,

        /// Fade in from this color instead of switching immediately
        #[arg(long, value_name = "COLOR")]
        from: Option<RgbColor>,

        /// Fade step rate (firmware ticks)
        #[arg(long, default_value_t = 1)]
        rate: u16,
    },

    /// List the keys of a layout
    #[command(visible_alias = "k")]
    Keys {
        /// Layout JSON file
        #[arg(short, long, value_name = "FILE")]
        layout: PathBuf,
    },
}

/// Parse a decimal or `0x`-prefixed hexadecimal u16
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid id \"{s}\": {e}"))
}
