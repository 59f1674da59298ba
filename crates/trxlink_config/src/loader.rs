//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::resolve::resolve_link;
use crate::types::LinkConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "trxlink.toml";

/// Loads and validates `trxlink.toml` from a directory.
pub fn load_config(project_dir: &Path) -> Result<LinkConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<LinkConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<LinkConfig, ConfigError> {
    let config: LinkConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks structural limits, then resolves clocks and taps so that a bad
/// configuration fails at load time rather than mid-simulation.
fn validate_config(config: &LinkConfig) -> Result<(), ConfigError> {
    let bridge = &config.bridge;
    if bridge.sync_stages < 2 {
        return Err(ConfigError::ValidationError(format!(
            "bridge.sync_stages must be at least 2, got {}",
            bridge.sync_stages
        )));
    }
    if bridge.fifo_depth < 2 || !bridge.fifo_depth.is_power_of_two() {
        return Err(ConfigError::ValidationError(format!(
            "bridge.fifo_depth must be a power of two >= 2, got {}",
            bridge.fifo_depth
        )));
    }
    if bridge.activity_window == 0 {
        return Err(ConfigError::MissingField(
            "bridge.activity_window (must be non-zero)".to_string(),
        ));
    }
    if config.scan.dwell.trim().is_empty() {
        return Err(ConfigError::MissingField("scan.dwell".to_string()));
    }
    resolve_link(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransceiverMode, TransportKind};
    use trxlink_common::Polarity;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.transport.kind, TransportKind::Pcie);
        assert_eq!(config.bridge.activity_window, 1_000_000);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[clocks]
sys = "125MHz"
link = "30.72MHz"
link_phase = 1.5

[transport]
kind = "pcie"

[bridge]
tx_delay = 16
rx_delay = 16
sync_stages = 3
fifo_depth = 8
activity_window = 1000
loopback_mask = "0x0fff0fff"

[polarity]
reset = "active_low"
power_down = "active_high"
tx_enable = "active_high"
rx_enable = "active_low"

[transceiver]
mode = "ramp"
tx_eye = [4, 12]
rx_eye = [10, 20]
latency = 3
phase_inverted = true
seed = 42

[transceiver.polarity]
power_down = "active_high"

[scan]
dwell = "10us"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.clocks.link, "30.72MHz");
        assert_eq!(config.bridge.tx_delay, 16);
        assert_eq!(config.bridge.sync_stages, 3);
        assert_eq!(config.bridge.loopback_mask, 0x0fff_0fff);
        assert_eq!(config.polarity.power_down, Polarity::ActiveHigh);
        assert_eq!(config.polarity.rx_enable, Polarity::ActiveLow);
        assert_eq!(config.transceiver.mode, TransceiverMode::Ramp);
        assert_eq!(config.transceiver.tx_eye, [4, 12]);
        assert!(config.transceiver.phase_inverted);
        assert_eq!(config.transceiver.polarity.power_down, Polarity::ActiveHigh);
        assert_eq!(config.transceiver.polarity.reset, Polarity::ActiveLow);
        assert_eq!(config.scan.dwell, "10us");
    }

    #[test]
    fn integer_mask_is_accepted() {
        let config = load_config_from_str("[bridge]\nloopback_mask = 0x00ff00ff\n").unwrap();
        assert_eq!(config.bridge.loopback_mask, 0x00ff_00ff);
    }

    #[test]
    fn single_stage_synchronizer_is_rejected() {
        let err = load_config_from_str("[bridge]\nsync_stages = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn non_power_of_two_fifo_is_rejected() {
        let err = load_config_from_str("[bridge]\nfifo_depth = 6\n").unwrap_err();
        assert!(err.to_string().contains("fifo_depth"));
    }

    #[test]
    fn zero_activity_window_is_rejected() {
        let err = load_config_from_str("[bridge]\nactivity_window = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let err = load_config_from_str("[bridge]\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn validation_resolves_clocks() {
        let err = load_config_from_str("[clocks]\nlink = \"fast\"\n").unwrap_err();
        assert!(err.to_string().contains("clocks.link"));
    }

    #[test]
    fn load_from_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[bridge]\ntx_delay = 7\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.bridge.tx_delay, 7);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&LinkConfig::default()).unwrap();
        let parsed = load_config_from_str(&text).unwrap();
        assert_eq!(parsed, LinkConfig::default());
    }
}
