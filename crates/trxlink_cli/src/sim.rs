//! `trxlink sim`: run the bridge against the simulated transceiver.
//!
//! Builds a simulation from the configuration, programs the control
//! registers from the flags, runs for the requested time and reports the
//! status register, pattern errors, the measured link clock and what came
//! back through the transport. Optionally records link-side waveforms.

use std::path::Path;

use trxlink_common::{DelayTap, SampleWord};
use trxlink_sim::csr::{
    ControlReg, PatternControl, StatusReg, CONTROL, CYCLES, CYCLES_LATCH, RX_PATTERN_CONTROL,
    RX_PATTERN_ERRORS, STATUS, TX_PATTERN_CONTROL,
};
use trxlink_sim::time::FS_PER_US;
use trxlink_sim::{QueueTransport, RegisterBus, SimConfig, SimKernel};

use crate::pipeline::{self, parse_duration};
use crate::{GlobalArgs, SimArgs};

/// Time allowed for words already in flight to drain before errors count.
const SETTLE_FS: u64 = 10 * FS_PER_US;

/// Outcome of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    /// Status register at the end of the run.
    pub status: StatusReg,
    /// Pattern errors counted after the settle time.
    pub errors: Option<u32>,
    /// Link clock estimated from the cycle counter, in MHz.
    pub link_mhz: f64,
    /// Transport words sent.
    pub words_sent: u64,
    /// Sent words that came back unchanged, in order.
    pub words_matched: usize,
    /// RX words dropped on a full FIFO.
    pub rx_overflows: u64,
}

impl SimReport {
    /// Whether the run saw no pattern errors and got every word back.
    pub fn passed(&self) -> bool {
        self.errors.unwrap_or(0) == 0 && self.words_matched as u64 == self.words_sent
    }
}

/// Runs the `trxlink sim` command.
///
/// Returns exit code 0 when the run passed, 1 otherwise.
pub fn run(args: &SimArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let loaded = pipeline::load(global)?;
    let mut config = pipeline::sim_config(&loaded.link);
    if let Some(tap) = args.tx_delay {
        config.bridge.tx_delay = DelayTap::new(tap)?;
    }
    if let Some(tap) = args.rx_delay {
        config.bridge.rx_delay = DelayTap::new(tap)?;
    }
    let duration_fs = parse_duration(&args.time)?;

    if !global.quiet {
        eprintln!(
            "   Simulating {} of link at {} (control clock {})",
            args.time, config.link_clock, config.sys_clock
        );
    }

    let report = simulate(&config, args, duration_fs, args.vcd.as_deref().map(Path::new))?;

    if !global.quiet {
        print_report(&report);
    }
    Ok(if report.passed() { 0 } else { 1 })
}

/// Word an idle link reassembles into on the RX side.
const IDLE_WORD: SampleWord = SampleWord(0);

/// Words pushed through the transport: 12-bit ramps in every slice.
///
/// Slice 0 is always odd, so no ramp word equals [`IDLE_WORD`].
fn ramp_words(count: u64) -> Vec<SampleWord> {
    (0..count)
        .map(|i| SampleWord::from_slices([1, 2, 3, 4].map(|k| ((i * 4 + k) & 0x0fff) as u16)))
        .collect()
}

/// Runs one simulation and collects the report.
pub fn simulate(
    config: &SimConfig,
    args: &SimArgs,
    duration_fs: u64,
    vcd: Option<&Path>,
) -> Result<SimReport, Box<dyn std::error::Error>> {
    let words = ramp_words(args.words);
    let mut transport = QueueTransport::new();
    transport.send(words.iter().copied());

    let mut kernel = SimKernel::new(config, transport)?;
    if let Some(path) = vcd {
        kernel.set_recorder(trxlink_sim::vcd_file_recorder(path)?)?;
    }

    let control = ControlReg {
        loopback: args.loopback,
        ..ControlReg::default()
    };
    kernel.write(CONTROL, control.bits())?;
    if let Some(pattern) = args.pattern {
        let bits = PatternControl {
            enable: true,
            mode: pattern.into(),
        }
        .bits();
        kernel.write(TX_PATTERN_CONTROL, bits)?;
        kernel.write(RX_PATTERN_CONTROL, bits)?;
    }

    let settle = SETTLE_FS.min(duration_fs);
    kernel.run(settle)?;
    kernel.write(CYCLES_LATCH, 0)?;
    let cycles_before = kernel.read(CYCLES)?;
    let errors_before = kernel.read(RX_PATTERN_ERRORS)?;
    let start = kernel.now();

    kernel.run(duration_fs - settle)?;
    kernel.write(CYCLES_LATCH, 0)?;
    let cycles = kernel.read(CYCLES)?.wrapping_sub(cycles_before);
    let errors = kernel.read(RX_PATTERN_ERRORS)?.wrapping_sub(errors_before);
    let elapsed_s = kernel.now().as_secs_f64() - start.as_secs_f64();
    let result = kernel.finish()?;

    let link_mhz = if elapsed_s > 0.0 {
        f64::from(cycles) / elapsed_s / 1e6
    } else {
        0.0
    };
    let words_matched = kernel
        .transport()
        .received()
        .iter()
        .filter(|w| **w != IDLE_WORD)
        .zip(&words)
        .take_while(|(got, want)| got == want)
        .count();

    Ok(SimReport {
        status: StatusReg::from_bits(kernel.read(STATUS)?),
        errors: args.pattern.map(|_| errors),
        link_mhz,
        words_sent: kernel.transport().sent(),
        words_matched,
        rx_overflows: result.rx_overflows,
    })
}

fn print_report(report: &SimReport) {
    let flag = |b: bool| if b { "yes" } else { "no" };
    println!("clock active   {}", flag(report.status.rx_clk_active));
    println!("frame aligned  {}", flag(report.status.rx_frame_aligned));
    println!("link clock     {:.3} MHz", report.link_mhz);
    match report.errors {
        Some(errors) => println!("pattern errors {errors}"),
        None => println!("pattern errors (checker off)"),
    }
    if report.words_sent > 0 {
        println!(
            "words          {}/{} returned intact",
            report.words_matched, report.words_sent
        );
    }
    if report.rx_overflows > 0 {
        println!("rx overflows   {}", report.rx_overflows);
    }
}
