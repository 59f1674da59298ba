//! Shared helpers for CLI commands.
//!
//! Contains the configuration lookup, the mapping from a resolved
//! configuration onto simulation parameters, and duration parsing.

use std::path::{Path, PathBuf};

use trxlink_config::{LinkConfig, ResolvedLink, TransceiverMode, CONFIG_FILE_NAME};
use trxlink_sim::time::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};
use trxlink_sim::{BridgeParams, PhyMode, PhyParams, SimConfig};

use crate::GlobalArgs;

/// A loaded configuration together with its resolved form.
pub struct LoadedConfig {
    /// The configuration as written.
    pub config: LinkConfig,
    /// Clocks and taps resolved into typed values.
    pub link: ResolvedLink,
}

/// Walks up from `start` looking for the nearest directory containing `trxlink.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Loads the configuration selected by the global args.
///
/// An explicit `--config` must exist (a directory is searched for
/// `trxlink.toml`). Without it the current directory and its parents are
/// searched, and the built-in defaults apply when nothing is found.
pub fn load(global: &GlobalArgs) -> Result<LoadedConfig, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                trxlink_config::load_config(&p)?
            } else {
                trxlink_config::load_config_file(&p)?
            }
        }
        None => match find_config_file(&std::env::current_dir()?) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                trxlink_config::load_config_file(&path)?
            }
            None => {
                tracing::info!("no {CONFIG_FILE_NAME} found, using defaults");
                LinkConfig::default()
            }
        },
    };
    let link = trxlink_config::resolve_link(&config)?;
    Ok(LoadedConfig { config, link })
}

/// Builds simulation parameters from a resolved configuration.
pub fn sim_config(link: &ResolvedLink) -> SimConfig {
    let xcvr = &link.transceiver;
    SimConfig {
        sys_clock: link.sys_clock,
        link_clock: link.link_clock,
        link_phase_fs: link.link_phase_fs,
        bridge: BridgeParams {
            sync_stages: link.sync_stages,
            fifo_depth: link.fifo_depth,
            activity_window: link.activity_window,
            loopback_mask: link.loopback_mask,
            tx_delay: link.tx_delay,
            rx_delay: link.rx_delay,
            polarity: link.polarity,
        },
        phy: PhyParams {
            mode: match xcvr.mode {
                TransceiverMode::Loopback => PhyMode::Loopback,
                TransceiverMode::Ramp => PhyMode::Ramp,
            },
            tx_eye: xcvr.tx_eye.clone(),
            rx_eye: xcvr.rx_eye.clone(),
            latency: xcvr.latency,
            phase_inverted: xcvr.phase_inverted,
            seed: xcvr.seed,
            polarity: xcvr.polarity,
        },
    }
}

/// Parses a human-readable duration string into femtoseconds.
///
/// Supports units: `fs`, `ps`, `ns`, `us`, `ms`, `s`.
/// Examples: `"100ns"`, `"1us"`, `"10ms"`, `"500ps"`, `"0fs"`.
pub fn parse_duration(s: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".into());
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());

    if digit_end == 0 {
        return Err(format!("invalid duration: no numeric value in '{s}'").into());
    }

    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| format!("invalid number in duration '{s}'"))?;

    let unit = s[digit_end..].trim();

    let multiplier = match unit {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        "" => {
            return Err(
                format!("missing unit in duration '{s}' (use fs, ps, ns, us, ms, or s)").into(),
            )
        }
        _ => {
            return Err(
                format!("unknown duration unit '{unit}' (use fs, ps, ns, us, ms, or s)").into(),
            )
        }
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{s}' is too long").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use trxlink_common::DelayTap;

    fn global_with(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config: config.map(|p| p.display().to_string()),
        }
    }

    #[test]
    fn find_config_in_parent() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "").unwrap();
        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, tmp.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn load_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.toml");
        fs::write(&path, "[bridge]\ntx_delay = 12\nrx_delay = 20\n").unwrap();
        let loaded = load(&global_with(Some(&path))).unwrap();
        assert_eq!(loaded.config.bridge.tx_delay, 12);
        assert_eq!(loaded.link.rx_delay, DelayTap::new(20).unwrap());
    }

    #[test]
    fn load_explicit_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[scan]\ndwell = \"10us\"\n").unwrap();
        let loaded = load(&global_with(Some(tmp.path()))).unwrap();
        assert_eq!(loaded.config.scan.dwell, "10us");
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(load(&global_with(Some(&path))).is_err());
    }

    #[test]
    fn load_rejects_wrong_pcie_clock() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[clocks]\nsys = \"100MHz\"\n").unwrap();
        let err = load(&global_with(Some(&path))).err().unwrap();
        assert!(err.to_string().contains("125MHz"));
    }

    #[test]
    fn sim_config_carries_every_setting() {
        let config = trxlink_config::load_config_from_str(
            r#"
[clocks]
link = "30.72MHz"
link_phase = 1.5

[bridge]
tx_delay = 3
rx_delay = 4
fifo_depth = 8
activity_window = 1000
loopback_mask = "0xffffffff"

[transceiver]
mode = "ramp"
tx_eye = [2, 10]
rx_eye = [5, 30]
latency = 3
phase_inverted = true
seed = 9
"#,
        )
        .unwrap();
        let link = trxlink_config::resolve_link(&config).unwrap();
        let sim = sim_config(&link);
        assert!(sim.link_clock.approx_eq(trxlink_common::Frequency::from_mhz(30.72), 1.0));
        assert_eq!(sim.link_phase_fs, 1_500_000);
        assert_eq!(sim.bridge.tx_delay.value(), 3);
        assert_eq!(sim.bridge.rx_delay.value(), 4);
        assert_eq!(sim.bridge.fifo_depth, 8);
        assert_eq!(sim.bridge.activity_window, 1000);
        assert_eq!(sim.bridge.loopback_mask, u32::MAX);
        assert_eq!(sim.phy.mode, PhyMode::Ramp);
        assert_eq!(sim.phy.tx_eye.start().value(), 2);
        assert_eq!(sim.phy.rx_eye.end().value(), 30);
        assert_eq!(sim.phy.latency, 3);
        assert!(sim.phy.phase_inverted);
        assert_eq!(sim.phy.seed, 9);
    }

    // -- parse_duration tests --

    #[test]
    fn parse_duration_nanoseconds() {
        assert_eq!(parse_duration("100ns").unwrap(), 100 * FS_PER_NS);
    }

    #[test]
    fn parse_duration_microseconds() {
        assert_eq!(parse_duration("50us").unwrap(), 50 * FS_PER_US);
    }

    #[test]
    fn parse_duration_milliseconds() {
        assert_eq!(parse_duration("10ms").unwrap(), 10 * FS_PER_MS);
    }

    #[test]
    fn parse_duration_femtoseconds() {
        assert_eq!(parse_duration("42fs").unwrap(), 42);
    }

    #[test]
    fn parse_duration_seconds() {
        assert_eq!(parse_duration("1s").unwrap(), FS_PER_S);
    }

    #[test]
    fn parse_duration_invalid_unit() {
        let err = parse_duration("100xyz").unwrap_err();
        assert!(err.to_string().contains("unknown duration unit"));
    }

    #[test]
    fn parse_duration_missing_unit() {
        let err = parse_duration("100").unwrap_err();
        assert!(err.to_string().contains("missing unit"));
    }

    #[test]
    fn parse_duration_no_number() {
        let err = parse_duration("ns").unwrap_err();
        assert!(err.to_string().contains("no numeric value"));
    }

    #[test]
    fn parse_duration_overflow() {
        let err = parse_duration("100000s").unwrap_err();
        assert!(err.to_string().contains("too long"));
    }
}
