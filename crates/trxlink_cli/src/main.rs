//! Command-line front end for the transceiver link bridge simulator.
//!
//! Provides `trxlink init` to write a default `trxlink.toml`, `trxlink sim` to
//! run the bridge against the simulated transceiver, and `trxlink scan` to
//! sweep a delay line and locate its zero-error window.

#![warn(missing_docs)]

mod init;
mod pipeline;
mod scan;
mod sim;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trxlink_sim::PatternMode;

/// Transceiver link bridge simulator and calibration tool.
#[derive(Parser, Debug)]
#[command(name = "trxlink", version, about = "Transceiver link bridge tools")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `trxlink.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default `trxlink.toml`.
    Init {
        /// Directory to write into. Defaults to the current directory.
        dir: Option<String>,
    },
    /// Run the bridge against the simulated transceiver.
    Sim(SimArgs),
    /// Sweep a delay line and report per-tap pattern errors.
    Scan(ScanArgs),
}

/// Arguments for the `trxlink sim` subcommand.
#[derive(Parser, Debug)]
pub struct SimArgs {
    /// Simulated time (e.g., "100us", "1ms").
    #[arg(long, default_value = "1ms")]
    pub time: String,

    /// Enable internal loopback.
    #[arg(long)]
    pub loopback: bool,

    /// Enable the pattern generator and checker with this pattern.
    #[arg(long, value_enum)]
    pub pattern: Option<PatternArg>,

    /// Number of ramp words to push through the transport.
    #[arg(long, default_value_t = 0)]
    pub words: u64,

    /// TX clock tap override.
    #[arg(long)]
    pub tx_delay: Option<u32>,

    /// RX data tap override.
    #[arg(long)]
    pub rx_delay: Option<u32>,

    /// Write link-side waveforms to this VCD file.
    #[arg(long)]
    pub vcd: Option<String>,
}

/// Arguments for the `trxlink scan` subcommand.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Which delay line to sweep.
    #[arg(value_enum)]
    pub direction: ScanDirection,

    /// Test pattern used while sweeping.
    #[arg(short, long, value_enum, default_value_t = PatternArg::Prbs)]
    pub pattern: PatternArg,

    /// Tap held on the other delay line (default: its configured initial tap).
    #[arg(long)]
    pub other: Option<u32>,

    /// Time spent at each tap (default: `[scan] dwell` from the config).
    #[arg(long)]
    pub dwell: Option<String>,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Delay line selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScanDirection {
    /// TX output clock delay.
    Tx,
    /// RX data delay.
    Rx,
}

/// Test pattern selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PatternArg {
    /// Incrementing counter.
    Count,
    /// PRBS15.
    Prbs,
}

impl From<PatternArg> for PatternMode {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Count => PatternMode::Count,
            PatternArg::Prbs => PatternMode::Prbs,
        }
    }
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Init { dir } => init::run(dir, &global),
        Command::Sim(ref args) => sim::run(args, &global),
        Command::Scan(ref args) => scan::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence over the flags.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(global)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn default_log_level(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    }
}
