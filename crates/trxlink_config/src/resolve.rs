//! Resolution of string and integer settings into typed values.

use crate::error::ConfigError;
use crate::types::{LinkConfig, TransceiverMode, TransportKind};
use std::ops::RangeInclusive;
use trxlink_common::{DelayTap, Frequency, PinPolarity};

/// System clock required by the PCIe transport.
pub const PCIE_SYS_CLOCK_HZ: f64 = 125e6;

/// A configuration with clocks parsed and taps range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    /// Control domain clock.
    pub sys_clock: Frequency,
    /// Link domain clock.
    pub link_clock: Frequency,
    /// First link clock edge offset in femtoseconds.
    pub link_phase_fs: u64,
    /// Initial TX clock tap.
    pub tx_delay: DelayTap,
    /// Initial RX data tap.
    pub rx_delay: DelayTap,
    /// Synchronizer chain length.
    pub sync_stages: usize,
    /// Clock-crossing FIFO depth.
    pub fifo_depth: usize,
    /// Clock-activity window in system cycles.
    pub activity_window: u64,
    /// Loopback mask.
    pub loopback_mask: u32,
    /// Bridge-side pin polarity.
    pub polarity: PinPolarity,
    /// Simulated transceiver settings.
    pub transceiver: ResolvedTransceiver,
}

/// Typed transceiver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTransceiver {
    /// RX port source.
    pub mode: TransceiverMode,
    /// Clean TX clock taps.
    pub tx_eye: RangeInclusive<DelayTap>,
    /// Clean RX data taps.
    pub rx_eye: RangeInclusive<DelayTap>,
    /// Loopback latency in link cycles.
    pub latency: usize,
    /// Half-cycle frame shift.
    pub phase_inverted: bool,
    /// Corruption seed.
    pub seed: u64,
    /// Chip-side pin polarity.
    pub polarity: PinPolarity,
}

/// Parses clocks, checks taps and eye windows, and enforces the transport's
/// fixed clock requirement.
pub fn resolve_link(config: &LinkConfig) -> Result<ResolvedLink, ConfigError> {
    let sys_clock = parse_clock("clocks.sys", &config.clocks.sys)?;
    let link_clock = parse_clock("clocks.link", &config.clocks.link)?;

    if config.transport.kind == TransportKind::Pcie
        && !sys_clock.approx_eq(Frequency::new(PCIE_SYS_CLOCK_HZ), 0.5)
    {
        return Err(ConfigError::ValidationError(format!(
            "PCIe transport requires a 125MHz system clock, got {sys_clock}"
        )));
    }

    if !config.clocks.link_phase.is_finite() || config.clocks.link_phase < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "clocks.link_phase must be a non-negative number of ns, got {}",
            config.clocks.link_phase
        )));
    }
    let link_phase_fs = (config.clocks.link_phase * 1e6).round() as u64;

    let bridge = &config.bridge;
    let tx_delay = parse_tap("bridge.tx_delay", bridge.tx_delay)?;
    let rx_delay = parse_tap("bridge.rx_delay", bridge.rx_delay)?;

    let xcvr = &config.transceiver;
    Ok(ResolvedLink {
        sys_clock,
        link_clock,
        link_phase_fs,
        tx_delay,
        rx_delay,
        sync_stages: bridge.sync_stages,
        fifo_depth: bridge.fifo_depth,
        activity_window: bridge.activity_window,
        loopback_mask: bridge.loopback_mask,
        polarity: config.polarity,
        transceiver: ResolvedTransceiver {
            mode: xcvr.mode,
            tx_eye: parse_eye("transceiver.tx_eye", xcvr.tx_eye)?,
            rx_eye: parse_eye("transceiver.rx_eye", xcvr.rx_eye)?,
            latency: xcvr.latency,
            phase_inverted: xcvr.phase_inverted,
            seed: xcvr.seed,
            polarity: xcvr.polarity,
        },
    })
}

fn parse_clock(field: &str, value: &str) -> Result<Frequency, ConfigError> {
    let freq: Frequency = value
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("{field}: {e}")))?;
    if freq.period_fs().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "{field}: clock frequency must be positive, got '{value}'"
        )));
    }
    Ok(freq)
}

fn parse_tap(field: &str, value: u32) -> Result<DelayTap, ConfigError> {
    DelayTap::new(value).map_err(|e| ConfigError::ValidationError(format!("{field}: {e}")))
}

fn parse_eye(field: &str, bounds: [u32; 2]) -> Result<RangeInclusive<DelayTap>, ConfigError> {
    let lo = parse_tap(field, bounds[0])?;
    let hi = parse_tap(field, bounds[1])?;
    if lo > hi {
        return Err(ConfigError::ValidationError(format!(
            "{field}: window [{lo}, {hi}] is empty"
        )));
    }
    Ok(lo..=hi)
}
