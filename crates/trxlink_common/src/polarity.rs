//! Control pin polarity.

use serde::{Deserialize, Serialize};

/// Relationship between a logical control field and the level of its pin.
///
/// The transceiver's control pins are not documented consistently, so every
/// pin carries an explicit polarity instead of a hard-coded inversion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// The pin is high when the field is set.
    #[default]
    ActiveHigh,
    /// The pin is low when the field is set.
    ActiveLow,
}

impl Polarity {
    /// Returns the pin level that represents `asserted`.
    pub fn level(self, asserted: bool) -> bool {
        match self {
            Polarity::ActiveHigh => asserted,
            Polarity::ActiveLow => !asserted,
        }
    }

    /// Returns whether a pin at `level` is asserted.
    pub fn is_asserted(self, level: bool) -> bool {
        self.level(level)
    }
}

/// Polarity of each transceiver control pin.
///
/// The same type describes both how the bridge drives the pins and how the
/// transceiver interprets them; a mismatch between the two is what the
/// calibration scenarios detect.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PinPolarity {
    /// `control.reset` to `rst_n`.
    #[serde(default = "active_low")]
    pub reset: Polarity,
    /// `control.power_down` to `pwrdwn_n`.
    #[serde(default = "active_low")]
    pub power_down: Polarity,
    /// `control.tx_enable` to `txen`.
    #[serde(default)]
    pub tx_enable: Polarity,
    /// `control.rx_enable` to `rxen`.
    #[serde(default)]
    pub rx_enable: Polarity,
}

impl Default for PinPolarity {
    fn default() -> Self {
        Self {
            reset: Polarity::ActiveLow,
            power_down: Polarity::ActiveLow,
            tx_enable: Polarity::ActiveHigh,
            rx_enable: Polarity::ActiveHigh,
        }
    }
}

fn active_low() -> Polarity {
    Polarity::ActiveLow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_high_passes_through() {
        assert!(Polarity::ActiveHigh.level(true));
        assert!(!Polarity::ActiveHigh.level(false));
    }

    #[test]
    fn active_low_inverts() {
        assert!(!Polarity::ActiveLow.level(true));
        assert!(Polarity::ActiveLow.is_asserted(false));
    }

    #[test]
    fn deserializes_snake_case() {
        let p: Polarity = serde_json::from_str("\"active_low\"").unwrap();
        assert_eq!(p, Polarity::ActiveLow);
    }

    #[test]
    fn pin_defaults_invert_reset_and_power_down() {
        let pins = PinPolarity::default();
        assert_eq!(pins.reset, Polarity::ActiveLow);
        assert_eq!(pins.power_down, Polarity::ActiveLow);
        assert_eq!(pins.tx_enable, Polarity::ActiveHigh);
    }

    #[test]
    fn partial_pin_polarity_fills_defaults() {
        let pins: PinPolarity = serde_json::from_str(r#"{"tx_enable": "active_low"}"#).unwrap();
        assert_eq!(pins.tx_enable, Polarity::ActiveLow);
        assert_eq!(pins.reset, Polarity::ActiveLow);
        assert_eq!(pins.rx_enable, Polarity::ActiveHigh);
    }
}
