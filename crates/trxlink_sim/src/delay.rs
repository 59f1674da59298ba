//! Programmable delay lines for the TX output clock and the RX data inputs.
//!
//! A delay element holds one tap index and applies it to its signal path. The
//! RX line is shared by every data bit and the frame bit. Loads are atomic:
//! software never observes a half-applied tap. An element powers up at tap 0
//! and the bridge loads its configured initial taps at reset.

use trxlink_common::DelayTap;

/// One delay element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayLine {
    tap: DelayTap,
}

impl DelayLine {
    /// Loads `tap`, replacing the previous value.
    pub fn load(&mut self, tap: DelayTap) {
        self.tap = tap;
    }

    /// The tap currently applied.
    pub fn tap(&self) -> DelayTap {
        self.tap
    }
}

/// The TX clock and RX data delay lines, loaded together from the `delay` register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DelayController {
    tx_clock: DelayLine,
    rx_data: DelayLine,
}

impl DelayController {
    /// Creates a controller with both lines loaded with their initial taps.
    pub fn new(tx: DelayTap, rx: DelayTap) -> Self {
        let mut ctrl = Self::default();
        ctrl.load_both(tx, rx);
        ctrl
    }

    /// Loads both lines in one step.
    pub fn load_both(&mut self, tx: DelayTap, rx: DelayTap) {
        self.tx_clock.load(tx);
        self.rx_data.load(rx);
        tracing::info!(tx = tx.value(), rx = rx.value(), "delay taps loaded");
    }

    /// The TX output clock line.
    pub fn tx_clock(&self) -> &DelayLine {
        &self.tx_clock
    }

    /// The shared RX data line.
    pub fn rx_data(&self) -> &DelayLine {
        &self.rx_data
    }
}
