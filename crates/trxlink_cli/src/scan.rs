//! `trxlink scan`: delay-line calibration sweep.
//!
//! Enables the pattern generator and checker, then steps one delay line
//! through every tap while holding the other. At each tap the error counter
//! is read twice, a dwell time apart, and the wrapping difference is the
//! tap's score. The widest run of zero-error taps is the eye; its center is
//! the recommended setting.

use serde::Serialize;
use trxlink_common::DelayTap;
use trxlink_sim::csr::{
    DelayReg, PatternControl, DELAY, RX_PATTERN_CONTROL, RX_PATTERN_ERRORS, TX_PATTERN_CONTROL,
};
use trxlink_sim::{PatternMode, QueueTransport, RegisterBus, SimConfig, SimKernel};

use crate::pipeline::{self, parse_duration};
use crate::{GlobalArgs, ReportFormat, ScanArgs, ScanDirection};

/// Control cycles allowed after a tap change before the first read.
const SETTLE_CYCLES: u64 = 200;

/// Errors observed at one tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TapResult {
    /// Tap under test.
    pub tap: u8,
    /// Error counter increase over the dwell time.
    pub errors: u32,
}

/// A contiguous run of zero-error taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EyeWindow {
    /// First clean tap.
    pub start: u8,
    /// Last clean tap.
    pub end: u8,
    /// Recommended tap.
    pub center: u8,
}

impl EyeWindow {
    /// Number of taps in the window.
    pub fn width(&self) -> u8 {
        self.end - self.start + 1
    }
}

/// The result of a full sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// `"tx"` or `"rx"`.
    pub direction: &'static str,
    /// Pattern used.
    pub pattern: &'static str,
    /// Tap held on the other delay line.
    pub other_tap: u8,
    /// Per-tap results, tap 0 first.
    pub taps: Vec<TapResult>,
    /// Widest zero-error window, if any tap was clean.
    pub window: Option<EyeWindow>,
}

/// Runs the `trxlink scan` command.
///
/// Returns exit code 0 when a zero-error window was found, 1 otherwise.
pub fn run(args: &ScanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let loaded = pipeline::load(global)?;
    let config = pipeline::sim_config(&loaded.link);
    let dwell = args.dwell.as_deref().unwrap_or(&loaded.config.scan.dwell);
    let dwell_fs = parse_duration(dwell)?;
    let other = match (args.other, args.direction) {
        (Some(tap), _) => DelayTap::new(tap)?,
        (None, ScanDirection::Tx) => config.bridge.rx_delay,
        (None, ScanDirection::Rx) => config.bridge.tx_delay,
    };

    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Scanning {} taps (other tap {other}, dwell {dwell})",
            direction_name(args.direction)
        );
    }

    let report = scan(&config, args.direction, args.pattern.into(), other, dwell_fs)?;

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                print_text(&report);
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(if report.window.is_some() { 0 } else { 1 })
}

/// Sweeps one delay line over all taps against a fresh simulation.
pub fn scan(
    config: &SimConfig,
    direction: ScanDirection,
    mode: PatternMode,
    other: DelayTap,
    dwell_fs: u64,
) -> Result<ScanReport, Box<dyn std::error::Error>> {
    let mut kernel = SimKernel::new(config, QueueTransport::new())?;
    let pattern = PatternControl { enable: true, mode }.bits();
    kernel.write(TX_PATTERN_CONTROL, pattern)?;
    kernel.write(RX_PATTERN_CONTROL, pattern)?;

    let mut taps = Vec::with_capacity(DelayTap::COUNT);
    for tap in DelayTap::all() {
        let delay = match direction {
            ScanDirection::Tx => DelayReg { tx: tap, rx: other },
            ScanDirection::Rx => DelayReg { tx: other, rx: tap },
        };
        kernel.write(DELAY, delay.bits())?;
        kernel.run_sys_cycles(SETTLE_CYCLES)?;

        let before = kernel.read(RX_PATTERN_ERRORS)?;
        kernel.run(dwell_fs)?;
        let errors = kernel.read(RX_PATTERN_ERRORS)?.wrapping_sub(before);
        tracing::debug!(tap = tap.value(), errors, "scanned tap");
        taps.push(TapResult {
            tap: tap.value(),
            errors,
        });
    }

    let window = widest_window(&taps);
    Ok(ScanReport {
        direction: direction_name(direction),
        pattern: match mode {
            PatternMode::Count => "count",
            PatternMode::Prbs => "prbs",
        },
        other_tap: other.value(),
        taps,
        window,
    })
}

/// Finds the widest run of zero-error taps. Ties go to the lowest start.
pub fn widest_window(taps: &[TapResult]) -> Option<EyeWindow> {
    let mut best: Option<EyeWindow> = None;
    let mut run_start: Option<u8> = None;
    for (i, result) in taps.iter().enumerate() {
        if result.errors == 0 {
            let start = *run_start.get_or_insert(result.tap);
            let end = result.tap;
            let last = taps.get(i + 1).map_or(true, |next| next.errors != 0);
            if last {
                let candidate = EyeWindow {
                    start,
                    end,
                    center: start + (end - start) / 2,
                };
                if best.map_or(true, |b| candidate.width() > b.width()) {
                    best = Some(candidate);
                }
            }
        } else {
            run_start = None;
        }
    }
    best
}

fn direction_name(direction: ScanDirection) -> &'static str {
    match direction {
        ScanDirection::Tx => "tx",
        ScanDirection::Rx => "rx",
    }
}

fn print_text(report: &ScanReport) {
    for result in &report.taps {
        let mark = if result.errors == 0 { "ok" } else { "" };
        println!("tap {:>2}  errors {:>10}  {mark}", result.tap, result.errors);
    }
    match report.window {
        Some(w) => println!(
            "{} window {}..={} ({} taps), center {}",
            report.direction,
            w.start,
            w.end,
            w.width(),
            w.center
        ),
        None => println!("{} window not found", report.direction),
    }
}
