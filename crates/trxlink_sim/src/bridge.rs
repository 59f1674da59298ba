//! The transceiver bridge: control domain, link domain, and the crossings between them.
//!
//! [`Bridge::tick_sys`] advances the control domain by one cycle and
//! [`Bridge::tick_link`] advances the link domain by one cycle. The two may be
//! called in any interleaving. All state touched by both goes through the
//! crossing primitives; the control domain owns the registers and the
//! delay elements, the link domain owns the data path and the counters.
//!
//! TX data path (link domain):
//!
//! ```text
//! transport -> tx fifo -> TxConverter --+
//!                        PatternGenerator -> mux -> tx pads
//! ```
//!
//! RX data path (link domain):
//!
//! ```text
//! rx pads -> loopback mux -> FrameAligner -> PatternChecker
//!                                        `-> RxConverter -> rx fifo -> transport
//! ```

use crate::activity::{ActivityDivider, ClockActivityMonitor};
use crate::align::FrameAligner;
use crate::cdc::{AsyncFifo, BusSynchronizer, MultiReg, PulseSynchronizer, MIN_SYNC_STAGES};
use crate::convert::{RxConverter, TxConverter};
use crate::csr::{
    self, Access, ControlReg, DelayReg, PatternControl, RegisterBus, StatusReg, CONTROL,
    CYCLES, CYCLES_LATCH, DELAY, RX_PATTERN_CONTROL, RX_PATTERN_ERRORS, STATUS,
    TX_PATTERN_CONTROL,
};
use crate::delay::DelayController;
use crate::error::SimError;
use crate::mux::{DataPathSelector, RxRoute};
use crate::pattern::{PatternChecker, PatternGenerator};
use crate::phy::TransceiverPins;
use crate::transport::Transport;
use trxlink_common::{DelayTap, LinkSample, PinPolarity, SampleWord, FRAME_FIRST, NATIVE_SAMPLE_MASK};

/// Construction parameters of the bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BridgeParams {
    /// Registers per synchronizer chain.
    pub sync_stages: usize,
    /// Entries per sample FIFO.
    pub fifo_depth: usize,
    /// Clock-activity window in control cycles.
    pub activity_window: u64,
    /// Mask applied to looped-back TX data.
    pub loopback_mask: u32,
    /// TX clock tap loaded at reset.
    pub tx_delay: DelayTap,
    /// RX data tap loaded at reset.
    pub rx_delay: DelayTap,
    /// How control fields drive the transceiver pins.
    pub polarity: PinPolarity,
}

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            sync_stages: MIN_SYNC_STAGES,
            fifo_depth: 4,
            activity_window: 1_000_000,
            loopback_mask: NATIVE_SAMPLE_MASK,
            tx_delay: DelayTap::default(),
            rx_delay: DelayTap::default(),
            polarity: PinPolarity::default(),
        }
    }
}

impl BridgeParams {
    /// Checks the structural contracts of the crossing primitives.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.sync_stages < MIN_SYNC_STAGES {
            return Err(SimError::InvalidConfig {
                reason: format!(
                    "sync_stages must be at least {MIN_SYNC_STAGES}, got {}",
                    self.sync_stages
                ),
            });
        }
        if self.fifo_depth < 2 || !self.fifo_depth.is_power_of_two() {
            return Err(SimError::InvalidConfig {
                reason: format!(
                    "fifo_depth must be a power of two >= 2, got {}",
                    self.fifo_depth
                ),
            });
        }
        if self.activity_window == 0 {
            return Err(SimError::InvalidConfig {
                reason: "activity_window must be non-zero".into(),
            });
        }
        Ok(())
    }
}

/// Control-domain state.
#[derive(Debug, Clone)]
struct SysDomain {
    control: ControlReg,
    delay_reg: DelayReg,
    tx_pattern: PatternControl,
    rx_pattern: PatternControl,
    delays: DelayController,
    polarity: PinPolarity,
    activity: ClockActivityMonitor,
    aligned: bool,
    errors: u32,
    cycles_seen: u32,
    cycles_latched: u32,
}

/// Link-domain state.
#[derive(Debug, Clone)]
struct LinkDomain {
    frame: bool,
    tx_conv: TxConverter,
    rx_conv: RxConverter,
    generator: PatternGenerator,
    checker: PatternChecker,
    aligner: FrameAligner,
    selector: DataPathSelector,
    divider: ActivityDivider,
    cycles: u32,
    tx_pads: LinkSample,
    rx_boundary: LinkSample,
    rx_overflows: u64,
}

/// Every value that crosses between the two domains.
#[derive(Debug, Clone)]
struct Crossings {
    tx_fifo: AsyncFifo<SampleWord>,
    rx_fifo: AsyncFifo<SampleWord>,
    loopback: MultiReg<bool>,
    tx_pattern: MultiReg<PatternControl>,
    rx_pattern: MultiReg<PatternControl>,
    aligned: MultiReg<bool>,
    activity: PulseSynchronizer,
    errors: BusSynchronizer<u32>,
    cycles: BusSynchronizer<u32>,
}

impl Crossings {
    fn new(params: &BridgeParams) -> Self {
        let stages = params.sync_stages;
        Self {
            tx_fifo: AsyncFifo::new(params.fifo_depth, stages),
            rx_fifo: AsyncFifo::new(params.fifo_depth, stages),
            loopback: MultiReg::new(stages, false),
            tx_pattern: MultiReg::new(stages, PatternControl::default()),
            rx_pattern: MultiReg::new(stages, PatternControl::default()),
            aligned: MultiReg::new(stages, false),
            activity: PulseSynchronizer::new(stages),
            errors: BusSynchronizer::new(stages, 0),
            cycles: BusSynchronizer::new(stages, 0),
        }
    }
}

/// The bridge between the transport and the transceiver link.
#[derive(Debug, Clone)]
pub struct Bridge {
    sys: SysDomain,
    link: LinkDomain,
    xing: Crossings,
}

impl Bridge {
    /// Builds a bridge in its reset state: patterns and loopback off, both
    /// transceiver directions enabled, delay lines at their initial taps.
    pub fn new(params: BridgeParams) -> Result<Self, SimError> {
        params.validate()?;
        let delay_reg = DelayReg {
            tx: params.tx_delay,
            rx: params.rx_delay,
        };
        Ok(Self {
            sys: SysDomain {
                control: ControlReg::default(),
                delay_reg,
                tx_pattern: PatternControl::default(),
                rx_pattern: PatternControl::default(),
                delays: DelayController::new(params.tx_delay, params.rx_delay),
                polarity: params.polarity,
                activity: ClockActivityMonitor::new(params.activity_window),
                aligned: false,
                errors: 0,
                cycles_seen: 0,
                cycles_latched: 0,
            },
            link: LinkDomain {
                frame: FRAME_FIRST,
                tx_conv: TxConverter::new(),
                rx_conv: RxConverter::new(),
                generator: PatternGenerator::new(),
                checker: PatternChecker::new(),
                aligner: FrameAligner::new(),
                selector: DataPathSelector::new(params.loopback_mask),
                divider: ActivityDivider::new(),
                cycles: 0,
                tx_pads: LinkSample::default(),
                rx_boundary: LinkSample::default(),
                rx_overflows: 0,
            },
            xing: Crossings::new(&params),
        })
    }

    /// Advances the control domain by one cycle, exchanging words with `transport`.
    pub fn tick_sys(&mut self, transport: &mut dyn Transport) {
        if self.xing.tx_fifo.write_tick(transport.tx_peek()) {
            transport.tx_accept();
        }
        if let Some(word) = self.xing.rx_fifo.read_tick(transport.rx_ready()) {
            transport.rx_accept(word);
        }

        self.xing.loopback.drive(self.sys.control.loopback);
        self.xing.tx_pattern.drive(self.sys.tx_pattern);
        self.xing.rx_pattern.drive(self.sys.rx_pattern);

        self.sys.aligned = self.xing.aligned.tick();
        let pulse = self.xing.activity.tick();
        self.sys.activity.tick(pulse);
        self.sys.errors = self.xing.errors.dest_tick();
        self.sys.cycles_seen = self.xing.cycles.dest_tick();
    }

    /// Advances the link domain by one cycle with the sample on the RX pins.
    pub fn tick_link(&mut self, received: LinkSample) {
        let link = &mut self.link;
        let xing = &mut self.xing;
        let first_slot = link.frame == FRAME_FIRST;
        let loopback = xing.loopback.tick();
        let tx_ctl = xing.tx_pattern.tick();
        let rx_ctl = xing.rx_pattern.tick();

        // TX. The converter is not clocked while the generator owns the link,
        // so a half-sent word resumes afterwards.
        let generated = link.generator.tick(tx_ctl.enable, tx_ctl.mode, first_slot);
        let take = DataPathSelector::tx_converter_ready(
            generated.is_some(),
            link.tx_conv.ready(first_slot),
        );
        let input = if take { xing.tx_fifo.peek() } else { None };
        let converted = match generated {
            Some(_) => None,
            None => link.tx_conv.tick(first_slot, input),
        };
        xing.tx_fifo.read_tick(input.is_some());
        let tx = LinkSample::framed(DataPathSelector::tx_word(generated, converted), link.frame);

        // RX
        let boundary = link.selector.rx_sample(loopback, tx, received);
        link.rx_boundary = boundary;
        let aligned = link.aligner.tick(boundary);
        xing.aligned.drive(link.aligner.aligned());
        let checker_ready = link.checker.ready(rx_ctl.enable);
        let (to_checker, to_converter) =
            match aligned.map(|s| DataPathSelector::route_rx(checker_ready, s)) {
                Some(RxRoute::Checker(s)) => (Some(s), None),
                Some(RxRoute::Converter(s)) => (None, Some(s)),
                None => (None, None),
            };
        link.checker.tick(rx_ctl.enable, rx_ctl.mode, to_checker);
        let word = link.rx_conv.tick(to_converter);
        if word.is_some() && !xing.rx_fifo.writable() {
            link.rx_overflows += 1;
            tracing::warn!(
                overflows = link.rx_overflows,
                "rx fifo full, sample word dropped"
            );
        }
        xing.rx_fifo.write_tick(word);

        // Status towards the control domain.
        xing.errors.source_tick(link.checker.errors());
        link.cycles = link.cycles.wrapping_add(1);
        xing.cycles.source_tick(link.cycles);
        if link.divider.tick() {
            xing.activity.pulse();
        }

        link.tx_pads = tx;
        link.frame = !link.frame;
    }

    /// The sample driven on the TX pins, registered at the last link edge.
    pub fn tx_pads(&self) -> LinkSample {
        self.link.tx_pads
    }

    /// The sample presented at the RX boundary in the last link cycle.
    pub fn rx_boundary(&self) -> LinkSample {
        self.link.rx_boundary
    }

    /// Transceiver control pin levels.
    pub fn pins(&self) -> TransceiverPins {
        let c = &self.sys.control;
        let p = &self.sys.polarity;
        TransceiverPins {
            rst_n: p.reset.level(c.reset),
            pwrdwn_n: p.power_down.level(c.power_down),
            txen: p.tx_enable.level(c.tx_enable),
            rxen: p.rx_enable.level(c.rx_enable),
        }
    }

    /// Taps currently applied by the TX clock and RX data delay lines.
    pub fn delay_taps(&self) -> (DelayTap, DelayTap) {
        (
            self.sys.delays.tx_clock().tap(),
            self.sys.delays.rx_data().tap(),
        )
    }

    /// The status register as seen by the control domain.
    pub fn status(&self) -> StatusReg {
        StatusReg {
            rx_clk_active: self.sys.activity.active(),
            rx_frame_active: false,
            rx_frame_aligned: self.sys.aligned,
        }
    }

    /// Link-domain alignment decision, for waveforms.
    pub fn link_aligned(&self) -> bool {
        self.link.aligner.aligned()
    }

    /// Link-domain error count, for waveforms.
    pub fn link_errors(&self) -> u32 {
        self.link.checker.errors()
    }

    /// RX sample words dropped because the RX FIFO was full.
    pub fn rx_overflows(&self) -> u64 {
        self.link.rx_overflows
    }
}

impl RegisterBus for Bridge {
    fn read(&self, addr: u32) -> Result<u32, SimError> {
        let reg = csr::lookup(addr)?;
        let value = match addr {
            _ if reg.access == Access::Strobe => 0,
            CONTROL => self.sys.control.bits(),
            STATUS => self.status().bits(),
            DELAY => self.sys.delay_reg.bits(),
            TX_PATTERN_CONTROL => self.sys.tx_pattern.bits(),
            RX_PATTERN_CONTROL => self.sys.rx_pattern.bits(),
            RX_PATTERN_ERRORS => self.sys.errors,
            CYCLES => self.sys.cycles_latched,
            _ => return Err(SimError::UnmappedRegister { addr }),
        };
        tracing::trace!(reg = reg.name, value = format_args!("{value:#010x}"), "csr read");
        Ok(value)
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), SimError> {
        let reg = csr::lookup(addr)?;
        tracing::trace!(reg = reg.name, value = format_args!("{value:#010x}"), "csr write");
        if reg.access == Access::ReadOnly {
            return Ok(());
        }
        match addr {
            CONTROL => self.sys.control = ControlReg::from_bits(value),
            DELAY => {
                let taps = DelayReg::from_bits(value);
                self.sys.delay_reg = taps;
                self.sys.delays.load_both(taps.tx, taps.rx);
            }
            TX_PATTERN_CONTROL => self.sys.tx_pattern = PatternControl::from_bits(value),
            RX_PATTERN_CONTROL => self.sys.rx_pattern = PatternControl::from_bits(value),
            CYCLES_LATCH => self.sys.cycles_latched = self.sys.cycles_seen,
            _ => return Err(SimError::UnmappedRegister { addr }),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::QueueTransport;
    use trxlink_common::Polarity;

    fn bridge() -> Bridge {
        Bridge::new(BridgeParams::default()).unwrap()
    }

    /// Ticks both domains alternately, feeding the TX pads straight back.
    fn run_wired(b: &mut Bridge, t: &mut QueueTransport, cycles: usize) {
        for _ in 0..cycles {
            b.tick_sys(t);
            let pads = b.tx_pads();
            b.tick_link(pads);
        }
    }

    #[test]
    fn validate_rejects_broken_contracts() {
        let cases = [
            BridgeParams {
                sync_stages: 1,
                ..BridgeParams::default()
            },
            BridgeParams {
                fifo_depth: 3,
                ..BridgeParams::default()
            },
            BridgeParams {
                activity_window: 0,
                ..BridgeParams::default()
            },
        ];
        for params in cases {
            assert!(matches!(
                Bridge::new(params),
                Err(SimError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn reset_register_values() {
        let b = Bridge::new(BridgeParams {
            tx_delay: DelayTap::new(16).unwrap(),
            rx_delay: DelayTap::new(9).unwrap(),
            ..BridgeParams::default()
        })
        .unwrap();
        assert_eq!(b.read(CONTROL).unwrap(), 0x300);
        assert_eq!(b.read(DELAY).unwrap(), 0x0910);
        assert_eq!(b.read(TX_PATTERN_CONTROL).unwrap(), 0);
        assert_eq!(b.read(RX_PATTERN_ERRORS).unwrap(), 0);
        assert_eq!(b.read(STATUS).unwrap(), 0);
    }

    #[test]
    fn unmapped_access_errors() {
        let mut b = bridge();
        assert!(matches!(
            b.read(0x40),
            Err(SimError::UnmappedRegister { addr: 0x40 })
        ));
        assert!(b.write(0x41, 1).is_err());
    }

    #[test]
    fn read_only_writes_are_ignored() {
        let mut b = bridge();
        b.write(RX_PATTERN_ERRORS, 55).unwrap();
        b.write(STATUS, 0xff).unwrap();
        assert_eq!(b.read(RX_PATTERN_ERRORS).unwrap(), 0);
        assert_eq!(b.read(STATUS).unwrap(), 0);
    }

    #[test]
    fn delay_write_loads_both_lines() {
        let mut b = bridge();
        b.write(DELAY, 0x1f05).unwrap();
        let (tx, rx) = b.delay_taps();
        assert_eq!((tx.value(), rx.value()), (5, 31));
        b.write(DELAY, 0x2a3f).unwrap();
        let (tx, rx) = b.delay_taps();
        assert_eq!((tx.value(), rx.value()), (31, 10));
    }

    #[test]
    fn pins_follow_polarity() {
        let mut b = bridge();
        assert_eq!(
            b.pins(),
            TransceiverPins {
                rst_n: true,
                pwrdwn_n: true,
                txen: true,
                rxen: true
            }
        );
        b.write(CONTROL, 0x1).unwrap();
        assert!(!b.pins().rst_n);

        let b = Bridge::new(BridgeParams {
            polarity: PinPolarity {
                power_down: Polarity::ActiveHigh,
                ..PinPolarity::default()
            },
            ..BridgeParams::default()
        })
        .unwrap();
        assert!(!b.pins().pwrdwn_n);
    }

    #[test]
    fn tx_frame_toggles_every_link_cycle() {
        let mut b = bridge();
        let mut frames = Vec::new();
        for _ in 0..4 {
            b.tick_link(LinkSample::default());
            frames.push(b.tx_pads().frame);
        }
        assert_eq!(frames, [[true, true], [false, false], [true, true], [false, false]]);
    }

    #[test]
    fn loopback_with_patterns_counts_no_errors() {
        let mut b = bridge();
        let mut t = QueueTransport::new();
        b.write(CONTROL, 0x1_0300).unwrap();
        b.write(TX_PATTERN_CONTROL, 1).unwrap();
        b.write(RX_PATTERN_CONTROL, 1).unwrap();
        run_wired(&mut b, &mut t, 2_000);
        assert_eq!(b.read(RX_PATTERN_ERRORS).unwrap(), 0);
        assert!(b.status().rx_frame_aligned);
    }

    #[test]
    fn cycles_latch_snapshots_link_counter() {
        let mut b = bridge();
        let mut t = QueueTransport::new();
        run_wired(&mut b, &mut t, 100);
        assert_eq!(b.read(CYCLES).unwrap(), 0);
        b.write(CYCLES_LATCH, 1).unwrap();
        let latched = b.read(CYCLES).unwrap();
        assert!(latched > 80 && latched <= 100, "latched {latched}");
        run_wired(&mut b, &mut t, 100);
        assert_eq!(b.read(CYCLES).unwrap(), latched);
        assert_eq!(b.read(CYCLES_LATCH).unwrap(), 0);
    }
}
