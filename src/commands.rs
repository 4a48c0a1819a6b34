//! Command handlers

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use dk5q_keyboard::{find_keyboard, EffectState, KeyMap, Keyboard, RgbColor};
use dk5q_transport::{DeviceSession, HidApiBackend, SessionConfig};

fn open(config: SessionConfig) -> Result<Box<dyn Keyboard>> {
    let keyboard = find_keyboard(config).context("Failed to open keyboard")?;
    keyboard
        .initialize()
        .context("Keyboard did not accept the handshake")?;
    Ok(keyboard)
}

pub fn list(config: SessionConfig) -> Result<()> {
    let backend = HidApiBackend::new().context("Failed to initialize HID")?;
    let session = DeviceSession::new(Arc::new(backend), config);
    let devices = session.list_devices()?;
    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    let selection = session.config().selection;
    println!("Found {} interface(s):", devices.len());
    for device in devices {
        let marker = if selection.matches(&device) { "*" } else { " " };
        println!(
            "{marker} {:04X}:{:04X} if={} usage=0x{:04X}:0x{:04X} {} {}",
            device.vendor_id,
            device.product_id,
            device.interface,
            device.usage_page,
            device.usage,
            device.product.as_deref().unwrap_or("?"),
            device.path
        );
    }
    Ok(())
}

pub fn info(config: SessionConfig) -> Result<()> {
    let keyboard = open(config)?;
    let firmware = keyboard.firmware_info()?;
    println!("Firmware: {firmware}");
    keyboard.disconnect()?;
    Ok(())
}

pub fn brightness(config: SessionConfig, level: u8) -> Result<()> {
    let keyboard = open(config)?;
    keyboard.set_brightness(level)?;
    println!("Brightness set to {level}");
    keyboard.disconnect()?;
    Ok(())
}

pub fn color(
    config: SessionConfig,
    layout: &Path,
    key: &str,
    color: RgbColor,
    from: Option<RgbColor>,
    rate: u16,
) -> Result<()> {
    let layout = KeyMap::from_path(layout)
        .with_context(|| format!("Failed to load layout {}", layout.display()))?;
    let Some(model) = layout.get(key) else {
        bail!("Unknown key \"{key}\", run `dk5q keys` for the available names");
    };

    let mut effect = EffectState::for_key(model);
    effect
        .set_to_hardware_profile()
        .set_to_color(color)
        .set_up_maximum(color)
        .increment_only();
    match from {
        Some(start) => {
            effect
                .set_from_color(start)
                .set_down_minimum(start)
                .set_up_increment(rate)
                .enable_transition();
        }
        None => {
            effect.disable_transition();
        }
    }

    let keyboard = open(config)?;
    keyboard.freeze_effects()?;
    keyboard.set_key_effect(&effect)?;
    keyboard.apply()?;
    println!(
        "{} (LED {}, {}) set to {color}",
        model.description(),
        model.led_id(),
        model.zone()
    );
    keyboard.disconnect()?;
    Ok(())
}

pub fn keys(layout: &Path) -> Result<()> {
    let layout = KeyMap::from_path(layout)
        .with_context(|| format!("Failed to load layout {}", layout.display()))?;
    println!("{:<20} {:>4}  {:<7} {:<10}", "NAME", "LED", "ZONE", "CHANNELS");
    for key in layout.keys() {
        let name = dk5q_keyboard::layout::key_name(key.description());
        println!(
            "{:<20} {:>4}  {:<7} {:?}",
            if name.is_empty() { "-" } else { name.as_str() },
            key.led_id(),
            key.zone().to_string(),
            key.rgb_channels()
        );
    }
    Ok(())
}
