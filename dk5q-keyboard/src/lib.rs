//! Lighting interface for the Das Keyboard 5Q
//!
//! Builds the vendor commands (handshake, firmware query, brightness, per-key
//! effect programs) and sends them through a [`DeviceSession`].
//!
//! A key colour change is three state packets, one per colour component,
//! followed by [`Keyboard::apply`]:
//!
//! ```no_run
//! use dk5q_keyboard::{find_keyboard, EffectState, KeyMap, Keyboard, RgbColor};
//! use dk5q_transport::SessionConfig;
//!
//! # fn main() -> Result<(), dk5q_keyboard::KeyboardError> {
//! let layout = KeyMap::load_named("keyboard_layouts", "en-us")?;
//! let keyboard = find_keyboard(SessionConfig::das_keyboard_5q())?;
//! keyboard.initialize()?;
//!
//! if let Some(key) = layout.get("Esc") {
//!     let mut effect = EffectState::for_key(key);
//!     effect.set_to_color(RgbColor::RED).set_up_maximum(RgbColor::RED);
//!     keyboard.set_key_effect(&effect)?;
//!     keyboard.apply()?;
//! }
//! keyboard.disconnect()?;
//! # Ok(())
//! # }
//! ```

pub mod color;
pub mod effect;
pub mod error;
pub mod firmware;
pub mod layout;
pub mod packet;
pub mod zone;

pub use color::RgbColor;
pub use effect::{flags, EffectState};
pub use error::KeyboardError;
pub use firmware::FirmwareInfo;
pub use layout::{KeyCoordinates, KeyMap, KeyModel};
pub use packet::{Command, StateInfo};
pub use zone::{classify, ChannelOrder, Led, Zone};

/// Effect flag of a freshly built [`StateInfo`]
pub const EFFECT_FLAG_DEFAULT: u16 = flags::DEFAULT;

use std::sync::Arc;

use dk5q_transport::{
    DeviceDescriptor, DeviceSession, HidApiBackend, HidBackend, SessionConfig, TransportError,
};
use tracing::{debug, info};

use packet::{Freeze, Initialize, QueryFirmware, SetBrightness, Trigger};

/// Operations on a connected keyboard
pub trait Keyboard: Send + Sync {
    /// Open the configured device
    fn connect(&self) -> Result<(), KeyboardError>;

    /// Session handshake; run once after connecting
    fn initialize(&self) -> Result<(), KeyboardError>;

    /// Pause the device effect buffer
    fn freeze_effects(&self) -> Result<(), KeyboardError>;

    /// Commit every pending per-key program
    fn apply(&self) -> Result<(), KeyboardError>;

    /// Global brightness, 0 to 63
    fn set_brightness(&self, level: u8) -> Result<(), KeyboardError>;

    /// Query firmware identity
    fn firmware_info(&self) -> Result<FirmwareInfo, KeyboardError>;

    /// Upload the three state packets of one key, stopping at the first failure
    fn set_key_effect(&self, effect: &EffectState) -> Result<(), KeyboardError>;

    /// Send a raw command and return the acknowledged response
    fn feature_report(&self, report: &[u8]) -> Result<Vec<u8>, KeyboardError>;

    /// Read one input report
    fn read(&self) -> Result<Vec<u8>, KeyboardError>;

    /// Write one output report
    fn write(&self, data: &[u8]) -> Result<(), KeyboardError>;

    /// Release the device
    fn disconnect(&self) -> Result<(), KeyboardError>;
}

/// Keyboard controller for the 5Q
pub struct DasKeyboard {
    session: DeviceSession,
}

impl DasKeyboard {
    /// Create a disconnected controller
    pub fn new(backend: Arc<dyn HidBackend>, config: SessionConfig) -> Self {
        Self {
            session: DeviceSession::new(backend, config),
        }
    }

    /// Underlying session
    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Descriptor of the open interface
    pub fn connected_device(&self) -> Option<DeviceDescriptor> {
        self.session.connected_device()
    }

    fn send<C: Command>(&self, command: &C) -> Result<Vec<u8>, KeyboardError> {
        let payload = command.encode();
        debug!("Sending {} ({} bytes)", C::NAME, payload.len());
        Ok(self.session.feature_report(&payload)?)
    }
}

impl Keyboard for DasKeyboard {
    fn connect(&self) -> Result<(), KeyboardError> {
        let device = self.session.connect()?;
        info!(
            "Connected to {} ({})",
            device.product.as_deref().unwrap_or("Das Keyboard"),
            device.path
        );
        Ok(())
    }

    fn initialize(&self) -> Result<(), KeyboardError> {
        info!("Initializing keyboard");
        self.send(&Initialize)?;
        Ok(())
    }

    fn freeze_effects(&self) -> Result<(), KeyboardError> {
        debug!("Freezing keyboard effects");
        self.send(&Freeze)?;
        Ok(())
    }

    fn apply(&self) -> Result<(), KeyboardError> {
        debug!("Applying pending key effects");
        self.send(&Trigger)?;
        Ok(())
    }

    fn set_brightness(&self, level: u8) -> Result<(), KeyboardError> {
        let command = SetBrightness::new(level)?;
        info!("Setting brightness to {}", command.level());
        self.send(&command)?;
        Ok(())
    }

    fn firmware_info(&self) -> Result<FirmwareInfo, KeyboardError> {
        let response = self.send(&QueryFirmware)?;
        debug!("Firmware response: {:02X?}", response);
        let info = FirmwareInfo::from_response(&response)?;
        info!("Firmware version {}", info);
        Ok(info)
    }

    fn set_key_effect(&self, effect: &EffectState) -> Result<(), KeyboardError> {
        debug!("Setting effect for LED {} ({})", effect.led().id, effect.led().zone);
        for packet in effect.build_state_packets() {
            self.session.feature_report(&packet)?;
        }
        Ok(())
    }

    fn feature_report(&self, report: &[u8]) -> Result<Vec<u8>, KeyboardError> {
        Ok(self.session.feature_report(report)?)
    }

    fn read(&self) -> Result<Vec<u8>, KeyboardError> {
        Ok(self.session.read()?)
    }

    fn write(&self, data: &[u8]) -> Result<(), KeyboardError> {
        Ok(self.session.write(data)?)
    }

    fn disconnect(&self) -> Result<(), KeyboardError> {
        self.session.disconnect()?;
        info!("Disconnected");
        Ok(())
    }
}

/// Open the keyboard described by `config` through hidapi
pub fn find_keyboard(config: SessionConfig) -> Result<Box<dyn Keyboard>, KeyboardError> {
    let backend = HidApiBackend::new().map_err(TransportError::from)?;
    let keyboard = DasKeyboard::new(Arc::new(backend), config);
    keyboard.connect()?;
    Ok(Box::new(keyboard))
}
