//! Two-clock simulation kernel.
//!
//! [`SimKernel`] owns the bridge, the transceiver model and the transport,
//! and schedules rising edges of the control clock and the link clock on one
//! femtosecond time line. Each edge runs exactly one domain's tick. The link
//! clock comes from the transceiver, so link edges are skipped while the chip
//! is held in reset or powered down, or while the link clock is halted
//! explicitly.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use trxlink_common::Frequency;

use crate::bridge::{Bridge, BridgeParams};
use crate::csr::RegisterBus;
use crate::error::SimError;
use crate::phy::{PhyParams, Transceiver};
use crate::time::SimTime;
use crate::transport::Transport;
use crate::waveform::WaveformRecorder;

/// A clock domain of the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    /// Control/transport domain.
    Sys,
    /// Transceiver link domain.
    Link,
}

/// A scheduled rising clock edge. Edges at the same time run in scheduling order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ClockEdge {
    time: SimTime,
    seq: u64,
    domain: Domain,
}

/// Everything needed to build a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// Control domain clock.
    pub sys_clock: Frequency,
    /// Link domain clock.
    pub link_clock: Frequency,
    /// Time of the first link edge, in femtoseconds.
    pub link_phase_fs: u64,
    /// Bridge parameters.
    pub bridge: BridgeParams,
    /// Transceiver model parameters.
    pub phy: PhyParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sys_clock: Frequency::from_mhz(125.0),
            link_clock: Frequency::from_mhz(61.44),
            link_phase_fs: 0,
            bridge: BridgeParams::default(),
            phy: PhyParams::default(),
        }
    }
}

/// Summary of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimResult {
    /// Simulation time at the end of the run.
    pub final_time: SimTime,
    /// Control cycles executed since construction.
    pub sys_cycles: u64,
    /// Link cycles executed since construction.
    pub link_cycles: u64,
    /// RX words dropped on a full FIFO.
    pub rx_overflows: u64,
}

// Waveform signal ids.
const SIG_TX_DATA: u32 = 0;
const SIG_TX_FRAME: u32 = 1;
const SIG_RX_DATA: u32 = 2;
const SIG_RX_FRAME: u32 = 3;
const SIG_ALIGNED: u32 = 4;
const SIG_ERRORS: u32 = 5;
const SIG_CLK_ACTIVE: u32 = 6;
const SIG_LINK_RUNNING: u32 = 7;

const SIGNALS: [(u32, &str, u32); 8] = [
    (SIG_TX_DATA, "tx_data", 32),
    (SIG_TX_FRAME, "tx_frame", 2),
    (SIG_RX_DATA, "rx_data", 32),
    (SIG_RX_FRAME, "rx_frame", 2),
    (SIG_ALIGNED, "rx_frame_aligned", 1),
    (SIG_ERRORS, "rx_pattern_errors", 32),
    (SIG_CLK_ACTIVE, "rx_clk_active", 1),
    (SIG_LINK_RUNNING, "link_clock_running", 1),
];

/// The simulation kernel.
pub struct SimKernel<T> {
    now: SimTime,
    queue: BinaryHeap<Reverse<ClockEdge>>,
    seq: u64,
    sys_period: u64,
    link_period: u64,
    bridge: Bridge,
    phy: Transceiver,
    transport: T,
    sys_cycles: u64,
    link_cycles: u64,
    link_halted: bool,
    link_running: bool,
    recorder: Option<Box<dyn WaveformRecorder>>,
    recorded: [Option<u64>; SIGNALS.len()],
}

impl<T: Transport> SimKernel<T> {
    /// Builds the bridge and the transceiver and schedules the first edges.
    pub fn new(config: &SimConfig, transport: T) -> Result<Self, SimError> {
        let sys_period = period("sys", config.sys_clock)?;
        let link_period = period("link", config.link_clock)?;
        let bridge = Bridge::new(config.bridge.clone())?;
        let mut kernel = Self {
            now: SimTime::zero(),
            queue: BinaryHeap::new(),
            seq: 0,
            sys_period,
            link_period,
            bridge,
            phy: Transceiver::new(config.phy.clone()),
            transport,
            sys_cycles: 0,
            link_cycles: 0,
            link_halted: false,
            link_running: true,
            recorder: None,
            recorded: [None; SIGNALS.len()],
        };
        kernel.schedule(SimTime::zero(), Domain::Sys);
        kernel.schedule(SimTime::from_fs(config.link_phase_fs), Domain::Link);
        Ok(kernel)
    }

    fn schedule(&mut self, time: SimTime, domain: Domain) {
        self.queue.push(Reverse(ClockEdge {
            time,
            seq: self.seq,
            domain,
        }));
        self.seq += 1;
    }

    /// Attaches a waveform recorder and declares the bridge signals.
    pub fn set_recorder(&mut self, mut recorder: Box<dyn WaveformRecorder>) -> Result<(), SimError> {
        recorder.begin_scope("bridge")?;
        for (id, name, width) in SIGNALS {
            recorder.register_signal(id, name, width)?;
        }
        recorder.end_scope()?;
        self.recorder = Some(recorder);
        self.recorded = [None; SIGNALS.len()];
        Ok(())
    }

    /// Runs the earliest pending clock edge and returns its domain.
    pub fn step(&mut self) -> Result<Option<Domain>, SimError> {
        let Some(Reverse(edge)) = self.queue.pop() else {
            return Ok(None);
        };
        self.now = edge.time;
        match edge.domain {
            Domain::Sys => {
                self.bridge.tick_sys(&mut self.transport);
                self.sys_cycles += 1;
                self.schedule(edge.time.after(self.sys_period), Domain::Sys);
            }
            Domain::Link => {
                self.tick_link();
                self.schedule(edge.time.after(self.link_period), Domain::Link);
            }
        }
        self.record()?;
        Ok(Some(edge.domain))
    }

    fn tick_link(&mut self) {
        let pins = self.bridge.pins();
        let running = !self.link_halted && self.phy.clock_running(pins);
        if running != self.link_running {
            tracing::debug!(running, at = %self.now, "link clock");
            self.link_running = running;
        }
        if !running {
            return;
        }
        let (tx_tap, rx_tap) = self.bridge.delay_taps();
        let rx = self.phy.tick(pins, self.bridge.tx_pads(), tx_tap, rx_tap);
        self.bridge.tick_link(rx);
        self.link_cycles += 1;
    }

    fn record(&mut self) -> Result<(), SimError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let tx = self.bridge.tx_pads();
        let rx = self.bridge.rx_boundary();
        let values = [
            u64::from(tx.word.packed()),
            u64::from(tx.frame_bits()),
            u64::from(rx.word.packed()),
            u64::from(rx.frame_bits()),
            u64::from(self.bridge.link_aligned()),
            u64::from(self.bridge.link_errors()),
            u64::from(self.bridge.status().rx_clk_active),
            u64::from(self.link_running),
        ];
        for (slot, (value, (id, _, _))) in values.iter().zip(SIGNALS).enumerate() {
            if self.recorded[slot] != Some(*value) {
                recorder.record_change(self.now.fs, id, *value)?;
                self.recorded[slot] = Some(*value);
            }
        }
        Ok(())
    }

    /// Runs every edge up to and including `now + duration_fs`.
    pub fn run(&mut self, duration_fs: u64) -> Result<SimResult, SimError> {
        let end = self.now.after(duration_fs);
        while let Some(Reverse(edge)) = self.queue.peek() {
            if edge.time > end {
                break;
            }
            self.step()?;
        }
        self.now = end;
        Ok(self.result())
    }

    /// Runs until `cycles` more control cycles have executed.
    pub fn run_sys_cycles(&mut self, cycles: u64) -> Result<SimResult, SimError> {
        let target = self.sys_cycles + cycles;
        while self.sys_cycles < target {
            if self.step()?.is_none() {
                break;
            }
        }
        Ok(self.result())
    }

    /// Flushes the waveform recorder, if any, and returns the run summary.
    pub fn finish(&mut self) -> Result<SimResult, SimError> {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.finalize()?;
        }
        Ok(self.result())
    }

    fn result(&self) -> SimResult {
        SimResult {
            final_time: self.now,
            sys_cycles: self.sys_cycles,
            link_cycles: self.link_cycles,
            rx_overflows: self.bridge.rx_overflows(),
        }
    }

    /// Stops or restarts the link clock regardless of the control pins.
    pub fn set_link_clock_halted(&mut self, halted: bool) {
        self.link_halted = halted;
    }

    /// Whether the last link edge found the link clock running.
    pub fn link_clock_running(&self) -> bool {
        self.link_running
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Control cycles executed.
    pub fn sys_cycles(&self) -> u64 {
        self.sys_cycles
    }

    /// Link cycles executed.
    pub fn link_cycles(&self) -> u64 {
        self.link_cycles
    }

    /// The bridge.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> RegisterBus for SimKernel<T> {
    fn read(&self, addr: u32) -> Result<u32, SimError> {
        self.bridge.read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), SimError> {
        self.bridge.write(addr, value)
    }
}

fn period(name: &str, freq: Frequency) -> Result<u64, SimError> {
    freq.period_fs()
        .filter(|p| *p > 0)
        .ok_or_else(|| SimError::InvalidConfig {
            reason: format!("{name} clock must be positive, got {freq}"),
        })
}
