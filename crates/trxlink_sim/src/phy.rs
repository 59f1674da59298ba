//! Behavioral model of the transceiver chip on the far side of the link.
//!
//! The model is what makes calibration meaningful in simulation: TX data is
//! latched cleanly only when the bridge's TX clock tap lies inside the chip's
//! TX eye, and the bridge samples RX data cleanly only when its RX tap lies
//! inside the RX eye. Outside an eye every cycle is corrupted with a random,
//! nonzero error pattern.
//!
//! The chip only carries 12 bits per field. Its link clock stops while it is
//! held in reset or powered down, as judged by its own pin polarity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use trxlink_common::{DelayTap, LinkSample, LinkWord, PinPolarity, NATIVE_SAMPLE_MASK};

/// Levels of the transceiver control pins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransceiverPins {
    /// Reset pin.
    pub rst_n: bool,
    /// Power-down pin.
    pub pwrdwn_n: bool,
    /// TX enable pin.
    pub txen: bool,
    /// RX enable pin.
    pub rxen: bool,
}

/// What the chip drives on its RX port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhyMode {
    /// Digital loopback of its TX port.
    #[default]
    Loopback,
    /// A free-running 12-bit ramp with a toggling frame.
    Ramp,
}

/// Construction parameters of the transceiver model.
#[derive(Clone, Debug, PartialEq)]
pub struct PhyParams {
    /// RX port source.
    pub mode: PhyMode,
    /// TX clock taps at which TX data latches cleanly.
    pub tx_eye: RangeInclusive<DelayTap>,
    /// RX taps at which RX data samples cleanly.
    pub rx_eye: RangeInclusive<DelayTap>,
    /// Loopback latency in link cycles.
    pub latency: usize,
    /// Deliver RX data half a cycle late.
    pub phase_inverted: bool,
    /// Corruption seed.
    pub seed: u64,
    /// The chip's interpretation of its control pins.
    pub polarity: PinPolarity,
}

impl Default for PhyParams {
    fn default() -> Self {
        Self {
            mode: PhyMode::Loopback,
            tx_eye: eye(6, 22),
            rx_eye: eye(9, 25),
            latency: 2,
            phase_inverted: false,
            seed: 1,
            polarity: PinPolarity::default(),
        }
    }
}

fn eye(lo: u8, hi: u8) -> RangeInclusive<DelayTap> {
    DelayTap::from_field(u32::from(lo))..=DelayTap::from_field(u32::from(hi))
}

/// The simulated transceiver.
#[derive(Debug, Clone)]
pub struct Transceiver {
    params: PhyParams,
    rng: StdRng,
    pipeline: VecDeque<LinkSample>,
    ramp: u16,
    ramp_frame: bool,
    previous: LinkSample,
}

impl Transceiver {
    /// Creates the model.
    pub fn new(params: PhyParams) -> Self {
        let rng = StdRng::seed_from_u64(params.seed);
        let pipeline = std::iter::repeat(LinkSample::default())
            .take(params.latency)
            .collect();
        Self {
            params,
            rng,
            pipeline,
            ramp: 0,
            ramp_frame: true,
            previous: LinkSample::default(),
        }
    }

    /// The construction parameters.
    pub fn params(&self) -> &PhyParams {
        &self.params
    }

    /// Whether the chip's link clock runs with the given pin levels.
    pub fn clock_running(&self, pins: TransceiverPins) -> bool {
        let pol = &self.params.polarity;
        !pol.reset.is_asserted(pins.rst_n) && !pol.power_down.is_asserted(pins.pwrdwn_n)
    }

    /// Advances one link cycle.
    ///
    /// `tx` is what the bridge drives this cycle; the return value is what the
    /// bridge samples on its RX pins through its RX delay line.
    pub fn tick(
        &mut self,
        pins: TransceiverPins,
        tx: LinkSample,
        tx_tap: DelayTap,
        rx_tap: DelayTap,
    ) -> LinkSample {
        let pol = self.params.polarity;
        let latched = if pol.tx_enable.is_asserted(pins.txen) {
            let mut s = tx;
            s.word = s.word.masked(NATIVE_SAMPLE_MASK);
            if !self.params.tx_eye.contains(&tx_tap) {
                s.word = self.corrupt(s.word);
            }
            s
        } else {
            LinkSample::default()
        };

        let source = match self.params.mode {
            PhyMode::Loopback => {
                self.pipeline.push_back(latched);
                self.pipeline.pop_front().unwrap_or(latched)
            }
            PhyMode::Ramp => {
                let s = LinkSample::framed(LinkWord::new([self.ramp, self.ramp]), self.ramp_frame);
                self.ramp = (self.ramp + 1) & 0x0fff;
                self.ramp_frame = !self.ramp_frame;
                s
            }
        };
        let driven = if pol.rx_enable.is_asserted(pins.rxen) {
            source
        } else {
            LinkSample::default()
        };

        let mut out = if self.params.phase_inverted {
            LinkSample {
                word: LinkWord::new([self.previous.word.phases[1], driven.word.phases[0]]),
                frame: [self.previous.frame[1], driven.frame[0]],
            }
        } else {
            driven
        };
        self.previous = driven;

        if !self.params.rx_eye.contains(&rx_tap) {
            out.word = self.corrupt(out.word);
            out.frame = [self.rng.gen(), self.rng.gen()];
        }
        out
    }

    fn corrupt(&mut self, word: LinkWord) -> LinkWord {
        let flips = (self.rng.gen::<u32>() & NATIVE_SAMPLE_MASK) | 1;
        LinkWord::from_packed(word.packed() ^ flips)
    }
}
