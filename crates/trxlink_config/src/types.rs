//! Configuration types deserialized from `trxlink.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
pub use trxlink_common::PinPolarity;

/// The top-level configuration parsed from `trxlink.toml`.
///
/// Every section is optional; a missing section takes the values of the
/// reference board (125 MHz system clock over PCIe, 61.44 MHz link clock).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    /// Clock definitions for the control and link domains.
    #[serde(default)]
    pub clocks: ClockConfig,
    /// The transport feeding the bridge.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Bridge gateware parameters.
    #[serde(default)]
    pub bridge: BridgeSection,
    /// Polarity of the transceiver control pins as driven by the bridge.
    #[serde(default)]
    pub polarity: PinPolarity,
    /// The simulated transceiver on the other end of the link.
    #[serde(default)]
    pub transceiver: TransceiverSection,
    /// Defaults for the delay scan tool.
    #[serde(default)]
    pub scan: ScanSection,
}

/// Clock frequencies, written as strings such as `"125MHz"`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Control/transport domain clock.
    #[serde(default = "default_sys_clock")]
    pub sys: String,
    /// Link domain clock recovered from the transceiver.
    #[serde(default = "default_link_clock")]
    pub link: String,
    /// Offset of the first link clock edge, in nanoseconds.
    #[serde(default)]
    pub link_phase: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sys: default_sys_clock(),
            link: default_link_clock(),
            link_phase: 0.0,
        }
    }
}

fn default_sys_clock() -> String {
    "125MHz".to_string()
}

fn default_link_clock() -> String {
    "61.44MHz".to_string()
}

/// The transport attached to the wide-word side of the bridge.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Transport kind.
    #[serde(default)]
    pub kind: TransportKind,
}

/// Supported transports.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// PCIe DMA; its core clock fixes the system clock at 125 MHz.
    #[default]
    Pcie,
    /// No fixed transport clock requirement.
    None,
}

/// Bridge gateware parameters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Initial TX clock delay tap loaded at reset.
    #[serde(default)]
    pub tx_delay: u32,
    /// Initial RX data delay tap loaded at reset.
    #[serde(default)]
    pub rx_delay: u32,
    /// Flip-flops in each single-bit synchronizer chain.
    #[serde(default = "default_sync_stages")]
    pub sync_stages: usize,
    /// Depth of each clock-crossing sample FIFO.
    #[serde(default = "default_fifo_depth")]
    pub fifo_depth: usize,
    /// Length of the clock-activity window in system clock cycles.
    #[serde(default = "default_activity_window")]
    pub activity_window: u64,
    /// Mask applied to looped-back TX data, as an integer or hex string.
    #[serde(
        default = "default_loopback_mask",
        deserialize_with = "deserialize_mask"
    )]
    pub loopback_mask: u32,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            tx_delay: 0,
            rx_delay: 0,
            sync_stages: default_sync_stages(),
            fifo_depth: default_fifo_depth(),
            activity_window: default_activity_window(),
            loopback_mask: default_loopback_mask(),
        }
    }
}

fn default_sync_stages() -> usize {
    2
}

fn default_fifo_depth() -> usize {
    4
}

fn default_activity_window() -> u64 {
    1_000_000
}

fn default_loopback_mask() -> u32 {
    trxlink_common::NATIVE_SAMPLE_MASK
}

/// Deserializes a mask given either as an integer or as a `"0x..."` string.
///
/// TOML has hex integer literals, but a string form keeps the mask readable
/// when the file is generated by other tools.
fn deserialize_mask<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct MaskVisitor;

    impl<'de> Visitor<'de> for MaskVisitor {
        type Value = u32;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a 32-bit mask as an integer or hex string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("mask {v} does not fit in 32 bits")))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("mask {v} does not fit in 32 bits")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let digits = v.trim().trim_start_matches("0x").replace('_', "");
            u32::from_str_radix(&digits, 16)
                .map_err(|_| E::custom(format!("invalid hex mask '{v}'")))
        }
    }

    deserializer.deserialize_any(MaskVisitor)
}

/// What the simulated transceiver sends back on its RX port.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransceiverMode {
    /// Digital loopback of the received TX port.
    #[default]
    Loopback,
    /// A free-running ramp, independent of TX.
    Ramp,
}

/// The simulated transceiver.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TransceiverSection {
    /// RX port source.
    #[serde(default)]
    pub mode: TransceiverMode,
    /// Inclusive TX clock tap window in which the chip latches TX data cleanly.
    #[serde(default = "default_tx_eye")]
    pub tx_eye: [u32; 2],
    /// Inclusive RX tap window in which the bridge samples RX data cleanly.
    #[serde(default = "default_rx_eye")]
    pub rx_eye: [u32; 2],
    /// Link cycles between TX pins and RX pins in loopback.
    #[serde(default = "default_latency")]
    pub latency: usize,
    /// Whether the RX frame arrives half a cycle late.
    #[serde(default)]
    pub phase_inverted: bool,
    /// Seed for out-of-eye corruption.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// The chip's own interpretation of its control pins.
    #[serde(default)]
    pub polarity: PinPolarity,
}

impl Default for TransceiverSection {
    fn default() -> Self {
        Self {
            mode: TransceiverMode::default(),
            tx_eye: default_tx_eye(),
            rx_eye: default_rx_eye(),
            latency: default_latency(),
            phase_inverted: false,
            seed: default_seed(),
            polarity: PinPolarity::default(),
        }
    }
}

fn default_tx_eye() -> [u32; 2] {
    [6, 22]
}

fn default_rx_eye() -> [u32; 2] {
    [9, 25]
}

fn default_latency() -> usize {
    2
}

fn default_seed() -> u64 {
    1
}

/// Defaults for the delay scan tool.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScanSection {
    /// Time spent at each tap between the two error counter reads.
    #[serde(default = "default_dwell")]
    pub dwell: String,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            dwell: default_dwell(),
        }
    }
}

fn default_dwell() -> String {
    "50us".to_string()
}
