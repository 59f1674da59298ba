//! Simulation error types for the transceiver bridge model.
//!
//! The data path never fails; these errors cover construction, register bus
//! access, and waveform output.

use std::io;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A construction parameter violates a hardware contract.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the violated contract.
        reason: String,
    },

    /// A register access targeted an address with no register.
    #[error("unmapped register address {addr:#06x}")]
    UnmappedRegister {
        /// The byte address that was accessed.
        addr: u32,
    },

    /// A waveform signal was recorded without being registered first.
    #[error("unregistered waveform signal {0}")]
    UnknownSignal(u32),

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}
