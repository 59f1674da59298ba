//! Behavioral model of the trxlink transceiver bridge.
//!
//! The bridge sits between a transport carrying 64-bit sample words and a
//! double-data-rate transceiver link carrying one 32-bit link word per link
//! clock cycle. This crate models both clock domains cycle by cycle, together
//! with a transceiver on the far end of the link, so that calibration and
//! self-test procedures can be exercised without hardware.
//!
//! # Architecture
//!
//! The bridge is a set of clocked components, each owned by one domain.
//! Nothing is shared between domains except through the primitives in
//! [`cdc`]. [`SimKernel`] interleaves the two domains' ticks on a femtosecond
//! time line with independent clock periods.
//!
//! # Usage
//!
//! ```ignore
//! use trxlink_sim::{csr, QueueTransport, RegisterBus, SimConfig, SimKernel};
//!
//! let mut kernel = SimKernel::new(&SimConfig::default(), QueueTransport::new())?;
//! kernel.write(csr::TX_PATTERN_CONTROL, 1)?;
//! kernel.write(csr::RX_PATTERN_CONTROL, 1)?;
//! kernel.run_sys_cycles(10_000)?;
//! println!("errors: {}", kernel.read(csr::RX_PATTERN_ERRORS)?);
//! ```
//!
//! # Modules
//!
//! - `cdc`: synchronizers, pulse and bus crossings, dual-clock FIFO
//! - `convert`: sample word to link word width conversion
//! - `delay`: TX clock and RX data delay lines
//! - `align`: frame alignment and lane swap
//! - `pattern`: BIST pattern generator and checker
//! - `mux`: data-path selection and loopback
//! - `activity`: link clock activity monitor
//! - `csr`: register map and typed fields
//! - `bridge`: the two-domain bridge
//! - `phy`: transceiver model
//! - `kernel`: clock scheduler
//! - `waveform`: VCD output

#![warn(missing_docs)]

pub mod activity;
pub mod align;
pub mod bridge;
pub mod cdc;
pub mod convert;
pub mod csr;
pub mod delay;
pub mod error;
pub mod kernel;
pub mod mux;
pub mod pattern;
pub mod phy;
pub mod time;
pub mod transport;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use bridge::{Bridge, BridgeParams};
pub use csr::RegisterBus;
pub use error::SimError;
pub use kernel::{Domain, SimConfig, SimKernel, SimResult};
pub use pattern::PatternMode;
pub use phy::{PhyMode, PhyParams, Transceiver, TransceiverPins};
pub use time::SimTime;
pub use transport::{QueueTransport, Transport};
pub use waveform::{VcdRecorder, WaveformRecorder};

/// Creates a VCD recorder writing to a new file at `path`.
pub fn vcd_file_recorder(path: &Path) -> Result<Box<dyn WaveformRecorder>, SimError> {
    let file = File::create(path)?;
    Ok(Box::new(VcdRecorder::new(BufWriter::new(file))))
}
