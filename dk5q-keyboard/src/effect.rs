//! Per-key effect state
//!
//! An [`EffectState`] holds one [`StateInfo`] program per colour component.
//! Each program is addressed to the firmware channel that actually drives that
//! component for the key's LED, so the same logical colour lands on the right
//! diodes in every zone.

use crate::color::RgbColor;
use crate::layout::KeyModel;
use crate::packet::{Command, StateInfo};
use crate::zone::Led;

/// Effect flag values and combinators
///
/// Direction combinators replace the whole flag value; trigger and transition
/// combinators set or clear a single bit. All are idempotent.
pub mod flags {
    /// Flag of a freshly built state (increment only)
    pub const DEFAULT: u16 = INCREMENT_ONLY;

    pub const INCREMENT_ONLY: u16 = 1;
    pub const DECREMENT_ONLY: u16 = 2;
    pub const INCREMENT_DECREMENT: u16 = 25;
    pub const DECREMENT_INCREMENT: u16 = 26;

    /// Wait for the trigger command before running
    pub const TRIGGER_ON_APPLY: u16 = 0x4000;
    /// Jump to levels instead of fading
    pub const DISABLE_TRANSITION: u16 = 0x1000;

    pub fn increment_only(_value: u16) -> u16 {
        INCREMENT_ONLY
    }

    pub fn decrement_only(_value: u16) -> u16 {
        DECREMENT_ONLY
    }

    pub fn increment_decrement(_value: u16) -> u16 {
        INCREMENT_DECREMENT
    }

    pub fn decrement_increment(_value: u16) -> u16 {
        DECREMENT_INCREMENT
    }

    pub fn trigger_on_apply(value: u16) -> u16 {
        value | TRIGGER_ON_APPLY
    }

    pub fn trigger_now(value: u16) -> u16 {
        value & !TRIGGER_ON_APPLY
    }

    pub fn enable_transition(value: u16) -> u16 {
        value & !DISABLE_TRANSITION
    }

    pub fn disable_transition(value: u16) -> u16 {
        value | DISABLE_TRANSITION
    }
}

/// Index of each component in [`EffectState`]'s program array
const RED: usize = 0;
const GREEN: usize = 1;
const BLUE: usize = 2;

/// Lighting program for one key, one [`StateInfo`] per colour component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectState {
    led: Led,
    states: [StateInfo; 3],
}

impl EffectState {
    /// Fresh state for `led`, addressed to physical key code `key`
    pub fn new(led: Led, key: u8) -> Self {
        let channel = |color_channel_id| StateInfo {
            key,
            color_channel_id,
            ..Default::default()
        };
        let order = led.channels;
        Self {
            led,
            states: [channel(order.red), channel(order.green), channel(order.blue)],
        }
    }

    /// Fresh state for a layout key, keyed by its LED id
    ///
    /// LED ids that do not fit a key code fall back to the default key.
    pub fn for_key(model: &KeyModel) -> Self {
        let key = u8::try_from(model.led_id()).unwrap_or(0);
        Self::new(model.led(), key)
    }

    pub fn led(&self) -> Led {
        self.led
    }

    pub fn red(&self) -> &StateInfo {
        &self.states[RED]
    }

    pub fn green(&self) -> &StateInfo {
        &self.states[GREEN]
    }

    pub fn blue(&self) -> &StateInfo {
        &self.states[BLUE]
    }

    /// Programs in red, green, blue order
    pub fn states(&self) -> &[StateInfo; 3] {
        &self.states
    }

    fn each(&mut self, mut f: impl FnMut(&mut StateInfo)) -> &mut Self {
        self.states.iter_mut().for_each(&mut f);
        self
    }

    fn per_component(
        &mut self,
        color: RgbColor,
        mut f: impl FnMut(&mut StateInfo, u16),
    ) -> &mut Self {
        for (state, level) in self.states.iter_mut().zip(color.components()) {
            f(state, u16::from(level));
        }
        self
    }

    // === Levels ===

    /// Starting colour (the level held at the bottom of the ramp)
    pub fn set_from_color(&mut self, color: RgbColor) -> &mut Self {
        self.per_component(color, |s, v| s.down_hold = v)
    }

    /// Target colour (the level held at the top of the ramp)
    pub fn set_to_color(&mut self, color: RgbColor) -> &mut Self {
        self.per_component(color, |s, v| s.up_hold = v)
    }

    /// Per-component ceiling of the upward ramp
    pub fn set_up_maximum(&mut self, color: RgbColor) -> &mut Self {
        self.per_component(color, |s, v| s.up_maximum = v)
    }

    /// Per-component floor of the downward ramp
    pub fn set_down_minimum(&mut self, color: RgbColor) -> &mut Self {
        self.per_component(color, |s, v| s.down_minimum = v)
    }

    // === Timing ===

    pub fn set_up_increment(&mut self, rate: u16) -> &mut Self {
        self.each(|s| s.up_increment = rate)
    }

    pub fn set_up_increment_delay(&mut self, delay: u16) -> &mut Self {
        self.each(|s| s.up_increment_delay = delay)
    }

    pub fn set_up_hold_delay(&mut self, delay: u16) -> &mut Self {
        self.each(|s| s.up_hold_delay = delay)
    }

    pub fn set_down_decrement(&mut self, rate: u16) -> &mut Self {
        self.each(|s| s.down_decrement = rate)
    }

    pub fn set_down_decrement_delay(&mut self, delay: u16) -> &mut Self {
        self.each(|s| s.down_decrement_delay = delay)
    }

    pub fn set_down_hold_delay(&mut self, delay: u16) -> &mut Self {
        self.each(|s| s.down_hold_delay = delay)
    }

    pub fn set_start_delay(&mut self, delay: u16) -> &mut Self {
        self.each(|s| s.start_delay = delay)
    }

    // === Flags ===

    fn map_flag(&mut self, combinator: fn(u16) -> u16) -> &mut Self {
        self.each(|s| s.effect_flag = combinator(s.effect_flag))
    }

    pub fn increment_only(&mut self) -> &mut Self {
        self.map_flag(flags::increment_only)
    }

    pub fn decrement_only(&mut self) -> &mut Self {
        self.map_flag(flags::decrement_only)
    }

    pub fn increment_decrement(&mut self) -> &mut Self {
        self.map_flag(flags::increment_decrement)
    }

    pub fn decrement_increment(&mut self) -> &mut Self {
        self.map_flag(flags::decrement_increment)
    }

    pub fn trigger_on_apply(&mut self) -> &mut Self {
        self.map_flag(flags::trigger_on_apply)
    }

    pub fn trigger_now(&mut self) -> &mut Self {
        self.map_flag(flags::trigger_now)
    }

    pub fn enable_transition(&mut self) -> &mut Self {
        self.map_flag(flags::enable_transition)
    }

    pub fn disable_transition(&mut self) -> &mut Self {
        self.map_flag(flags::disable_transition)
    }

    // === Effect selection ===

    /// Run the uploaded custom program instead of a device preset
    pub fn set_to_hardware_profile(&mut self) -> &mut Self {
        self.each(|s| s.effect_id = 0)
    }

    /// Select a device-resident preset
    pub fn set_effect_id(&mut self, effect_id: u8) -> &mut Self {
        self.each(|s| s.effect_id = effect_id)
    }

    /// Serialize the three programs in red, green, blue order
    pub fn build_state_packets(&self) -> [Vec<u8>; 3] {
        [
            self.states[RED].encode(),
            self.states[GREEN].encode(),
            self.states[BLUE].encode(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::DEFAULT_KEY;

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([buf[offset], buf[offset + 1]])
    }

    #[test]
    fn test_direction_flags() {
        assert_eq!(flags::increment_only(0xFFFF), 1);
        assert_eq!(flags::decrement_only(0), 2);
        assert_eq!(flags::increment_decrement(0x4000), 25);
        assert_eq!(flags::decrement_increment(1), 26);
    }

    #[test]
    fn test_bit_flags() {
        assert_eq!(flags::trigger_on_apply(1), 0x4001);
        assert_eq!(flags::trigger_now(0x4001), 1);
        assert_eq!(flags::disable_transition(25), 0x1019);
        assert_eq!(flags::enable_transition(0x1019), 25);
    }

    #[test]
    fn test_flag_combinators_are_idempotent() {
        let combinators: [fn(u16) -> u16; 8] = [
            flags::increment_only,
            flags::decrement_only,
            flags::increment_decrement,
            flags::decrement_increment,
            flags::trigger_on_apply,
            flags::trigger_now,
            flags::enable_transition,
            flags::disable_transition,
        ];
        for start in [0u16, 1, 2, 25, 26, 0x4001, 0x1019, 0x5019, 0xFFFF] {
            for f in combinators {
                assert_eq!(f(f(start)), f(start));
            }
        }
    }

    #[test]
    fn test_flags_compose() {
        let flag = flags::disable_transition(flags::trigger_on_apply(flags::increment_decrement(
            flags::DEFAULT,
        )));
        assert_eq!(flag, 0x5019);
        assert_eq!(flags::trigger_now(flags::enable_transition(flag)), 25);
    }

    #[test]
    fn test_channels_follow_zone_order() {
        // Zone 3: red on channel 2, green on 0, blue on 1
        let state = EffectState::new(Led::new(20), 7);
        assert_eq!(state.red().color_channel_id, 2);
        assert_eq!(state.green().color_channel_id, 0);
        assert_eq!(state.blue().color_channel_id, 1);
        assert!(state.states().iter().all(|s| s.key == 7));
        assert!(state.states().iter().all(|s| s.effect_flag == flags::DEFAULT));
    }

    #[test]
    fn test_color_setters_are_per_component() {
        let mut state = EffectState::new(Led::new(1), 1);
        state
            .set_from_color(RgbColor::new(1, 2, 3))
            .set_to_color(RgbColor::new(10, 20, 30))
            .set_up_maximum(RgbColor::new(100, 110, 120))
            .set_down_minimum(RgbColor::new(5, 6, 7));

        assert_eq!(state.red().down_hold, 1);
        assert_eq!(state.green().down_hold, 2);
        assert_eq!(state.blue().down_hold, 3);
        assert_eq!(state.red().up_hold, 10);
        assert_eq!(state.blue().up_hold, 30);
        assert_eq!(state.green().up_maximum, 110);
        assert_eq!(state.blue().down_minimum, 7);
    }

    #[test]
    fn test_timing_setters_are_uniform() {
        let mut state = EffectState::new(Led::new(100), 9);
        state
            .set_up_increment(3)
            .set_up_increment_delay(4)
            .set_up_hold_delay(5)
            .set_down_decrement(6)
            .set_down_decrement_delay(7)
            .set_down_hold_delay(8)
            .set_start_delay(9);

        for s in state.states() {
            assert_eq!(
                (
                    s.up_increment,
                    s.up_increment_delay,
                    s.up_hold_delay,
                    s.down_decrement,
                    s.down_decrement_delay,
                    s.down_hold_delay,
                    s.start_delay
                ),
                (3, 4, 5, 6, 7, 8, 9)
            );
        }
    }

    #[test]
    fn test_flag_setters_apply_to_all_channels() {
        let mut state = EffectState::new(Led::new(40), 1);
        state.increment_decrement().trigger_on_apply().disable_transition();
        assert!(state.states().iter().all(|s| s.effect_flag == 0x5019));
        state.trigger_now().enable_transition().decrement_only();
        assert!(state.states().iter().all(|s| s.effect_flag == 2));
    }

    #[test]
    fn test_hardware_profile_resets_effect_id() {
        let mut state = EffectState::new(Led::new(1), 1);
        state.set_effect_id(4);
        assert!(state.states().iter().all(|s| s.effect_id == 4));
        state.set_to_hardware_profile();
        assert!(state.states().iter().all(|s| s.effect_id == 0));
    }

    #[test]
    fn test_build_packets_red_green_blue_order() {
        // Zone 2: red on channel 1, green on 2, blue on 0
        let mut state = EffectState::new(Led::new(15), 0);
        state.set_to_color(RgbColor::new(0xAA, 0xBB, 0xCC));
        let [red, green, blue] = state.build_state_packets();

        assert_eq!(red[3], 1);
        assert_eq!(green[3], 2);
        assert_eq!(blue[3], 0);
        for packet in [&red, &green, &blue] {
            assert_eq!(packet[1], 0x28);
            assert_eq!(packet[5], DEFAULT_KEY);
        }
        // up_hold is the fourth field
        assert_eq!(u16_at(&red, 13), 0xAA);
        assert_eq!(u16_at(&green, 13), 0xBB);
        assert_eq!(u16_at(&blue, 13), 0xCC);
    }

    #[test]
    fn test_build_packets_is_repeatable() {
        let mut state = EffectState::new(Led::new(64), 3);
        state.set_from_color(RgbColor::RED).increment_decrement();
        let before = state.clone();
        let first = state.build_state_packets();
        let second = state.build_state_packets();
        assert_eq!(first, second);
        assert_eq!(state, before);
    }
}
