//! Built-in self-test pattern generator and checker.
//!
//! Both run in the link domain. The generator replaces live TX data while
//! enabled; the checker consumes RX data while its registered enable is set
//! and counts mismatches.
//!
//! Two patterns are supported:
//!
//! - **Count**: a 12-bit counter replicated on both phases, incremented every
//!   link cycle.
//! - **PRBS15**: one 15-bit value of the x^15 + x^14 + 1 sequence per sample
//!   word. The first half carries `AI = v & 0xfff` and `AQ = !v & 0xfff`, the
//!   second `BI = (v >> 4) & 0xfff` and `BQ = (!v >> 4) & 0xfff`. The checker
//!   recovers `v` from `AI` and `BI` and predicts the next value from it, so it
//!   locks onto the stream without a shared seed.
//!
//! The error counter wraps at 2^32. It is cleared when the checker sees its
//! enable rise, and the first sample after that only seeds the comparison.

use trxlink_common::{LinkSample, LinkWord};

/// Width mask of one pattern field.
pub const FIELD_MASK: u16 = 0x0fff;

/// Pattern selected by the mode bit of a pattern control register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatternMode {
    /// Incrementing counter.
    #[default]
    Count,
    /// Pseudo-random PRBS15 sequence.
    Prbs,
}

impl PatternMode {
    /// Decodes the register mode bit.
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            PatternMode::Prbs
        } else {
            PatternMode::Count
        }
    }

    /// Encodes the register mode bit.
    pub fn bit(self) -> bool {
        self == PatternMode::Prbs
    }
}

/// A 15-bit Fibonacci LFSR with taps at bits 13 and 14.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prbs15 {
    state: u16,
}

impl Default for Prbs15 {
    fn default() -> Self {
        Self::from_state(Self::SEED)
    }
}

impl Prbs15 {
    /// Power-on state.
    pub const SEED: u16 = 0b100_0000_0000_0001;
    const MASK: u16 = 0x7fff;

    /// Creates a generator at `state`, keeping its low 15 bits.
    pub fn from_state(state: u16) -> Self {
        Self {
            state: state & Self::MASK,
        }
    }

    /// Current register contents.
    pub fn state(&self) -> u16 {
        self.state
    }

    fn next_bit(&mut self) -> u16 {
        let feedback = ((self.state >> 13) ^ (self.state >> 14)) & 1;
        self.state = ((self.state << 1) & Self::MASK) | feedback;
        feedback
    }

    /// Shifts out 15 bits, first bit in the MSB.
    ///
    /// After 15 shifts the register holds exactly the returned value.
    pub fn next_word(&mut self) -> u16 {
        (0..15).fold(0, |v, _| (v << 1) | self.next_bit())
    }
}

/// Splits a PRBS15 value into its `[AI, AQ, BI, BQ]` fields.
pub fn prbs_fields(v: u16) -> [u16; 4] {
    [
        v & FIELD_MASK,
        !v & FIELD_MASK,
        (v >> 4) & FIELD_MASK,
        (!v >> 4) & FIELD_MASK,
    ]
}

/// Recovers the PRBS15 value from the `AI` and `BI` fields.
pub fn prbs_value(ai: u16, bi: u16) -> u16 {
    (ai & FIELD_MASK) | (((bi & FIELD_MASK) >> 8) << 12)
}

/// Pattern source for the TX link.
#[derive(Debug, Clone, Default)]
pub struct PatternGenerator {
    enabled: bool,
    counter: u16,
    prbs: Prbs15,
    prbs_word: u16,
}

impl PatternGenerator {
    /// Creates a disabled generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clocks the generator.
    ///
    /// Returns the link word to drive, or `None` while disabled so that live
    /// data can take the link.
    pub fn tick(&mut self, enable: bool, mode: PatternMode, first_slot: bool) -> Option<LinkWord> {
        if enable != self.enabled {
            tracing::debug!(enable, ?mode, "tx pattern generator");
            self.enabled = enable;
        }
        if !enable {
            return None;
        }
        let word = match mode {
            PatternMode::Count => {
                let c = self.counter;
                self.counter = (c + 1) & FIELD_MASK;
                LinkWord::new([c, c])
            }
            PatternMode::Prbs => {
                if first_slot {
                    self.prbs_word = self.prbs.next_word();
                }
                let [ai, aq, bi, bq] = prbs_fields(self.prbs_word);
                if first_slot {
                    LinkWord::new([ai, aq])
                } else {
                    LinkWord::new([bi, bq])
                }
            }
        };
        Some(word)
    }
}

/// Pattern sink for the RX link with a mismatch counter.
#[derive(Debug, Clone, Default)]
pub struct PatternChecker {
    enabled: bool,
    errors: u32,
    last_count: Option<[u16; 2]>,
    first_half: Option<LinkWord>,
    last_prbs: Option<u16>,
}

impl PatternChecker {
    /// Creates a disabled checker with a zero error count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the checker takes RX data this cycle: its registered enable
    /// is set and `enable` has not dropped.
    pub fn ready(&self, enable: bool) -> bool {
        enable && self.enabled
    }

    /// Mismatches counted since the last enable.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Clocks the checker.
    ///
    /// `sample` is the RX data routed to the checker this cycle; it is only
    /// examined while the registered enable was already set.
    pub fn tick(&mut self, enable: bool, mode: PatternMode, sample: Option<LinkSample>) {
        if enable && !self.enabled {
            tracing::debug!(?mode, "rx pattern checker enabled, errors cleared");
            self.errors = 0;
            self.last_count = None;
            self.first_half = None;
            self.last_prbs = None;
        } else if !enable && self.enabled {
            tracing::debug!(errors = self.errors, "rx pattern checker disabled");
        }
        if enable && self.enabled {
            if let Some(sample) = sample {
                let mismatch = match mode {
                    PatternMode::Count => self.check_count(sample.word),
                    PatternMode::Prbs => self.check_prbs(sample),
                };
                if mismatch {
                    self.errors = self.errors.wrapping_add(1);
                }
            }
        }
        self.enabled = enable;
    }

    fn check_count(&mut self, word: LinkWord) -> bool {
        let fields = word.phases.map(|p| p & FIELD_MASK);
        let mismatch = self
            .last_count
            .is_some_and(|last| (0..2).any(|i| fields[i] != (last[i] + 1) & FIELD_MASK));
        self.last_count = Some(fields);
        mismatch
    }

    fn check_prbs(&mut self, sample: LinkSample) -> bool {
        if sample.is_first() {
            self.first_half = Some(sample.word);
            return false;
        }
        let Some(first) = self.first_half.take() else {
            return false;
        };
        let [ai, aq] = first.phases.map(|p| p & FIELD_MASK);
        let [bi, bq] = sample.word.phases.map(|p| p & FIELD_MASK);
        let v = prbs_value(ai, bi);
        let consistent = prbs_fields(v) == [ai, aq, bi, bq];
        let predicted = self
            .last_prbs
            .map_or(true, |last| Prbs15::from_state(last).next_word() == v);
        self.last_prbs = Some(v);
        !(consistent && predicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trxlink_common::FRAME_FIRST;

    fn run_pair(
        gen: &mut PatternGenerator,
        chk: &mut PatternChecker,
        mode: PatternMode,
        cycles: usize,
        corrupt: impl Fn(usize, LinkWord) -> LinkWord,
    ) {
        for cycle in 0..cycles {
            let first = cycle % 2 == 0;
            let word = gen.tick(true, mode, first).unwrap();
            let frame = if first { FRAME_FIRST } else { !FRAME_FIRST };
            let sample = LinkSample::framed(corrupt(cycle, word), frame);
            let routed = chk.ready(true).then_some(sample);
            chk.tick(true, mode, routed);
        }
    }

    #[test]
    fn prbs_matches_reference_sequence_start() {
        let mut prbs = Prbs15::default();
        let v = prbs.next_word();
        assert_eq!(prbs.state(), v);
        // Seed 0b100000000000001 shifted 15 times with taps 13/14.
        let mut manual = Prbs15::SEED;
        let mut expected = 0u16;
        for _ in 0..15 {
            let fb = ((manual >> 13) ^ (manual >> 14)) & 1;
            manual = ((manual << 1) & 0x7fff) | fb;
            expected = (expected << 1) | fb;
        }
        assert_eq!(v, expected);
    }

    #[test]
    fn prbs_has_maximal_period() {
        let mut prbs = Prbs15::default();
        let start = prbs.state();
        let mut period = 0;
        loop {
            prbs.next_bit();
            period += 1;
            if prbs.state() == start {
                break;
            }
        }
        assert_eq!(period, (1 << 15) - 1);
    }

    #[test]
    fn prbs_value_recovers_word_from_fields() {
        for v in [0x0001u16, 0x7fff, 0x1234, 0x4abc] {
            let [ai, _, bi, _] = prbs_fields(v);
            assert_eq!(prbs_value(ai, bi), v);
        }
    }

    #[test]
    fn mode_bit_roundtrip() {
        assert_eq!(PatternMode::from_bit(false), PatternMode::Count);
        assert_eq!(PatternMode::from_bit(true), PatternMode::Prbs);
        assert!(PatternMode::Prbs.bit());
    }

    #[test]
    fn disabled_generator_emits_nothing() {
        let mut gen = PatternGenerator::new();
        assert_eq!(gen.tick(false, PatternMode::Count, true), None);
    }

    #[test]
    fn count_generator_replicates_and_wraps() {
        let mut gen = PatternGenerator::new();
        let words: Vec<LinkWord> = (0..4098)
            .map(|i| gen.tick(true, PatternMode::Count, i % 2 == 0).unwrap())
            .collect();
        assert_eq!(words[0].phases, [0, 0]);
        assert_eq!(words[5].phases, [5, 5]);
        assert_eq!(words[4096].phases, [0, 0]);
    }

    #[test]
    fn clean_count_stream_has_no_errors() {
        let mut gen = PatternGenerator::new();
        let mut chk = PatternChecker::new();
        run_pair(&mut gen, &mut chk, PatternMode::Count, 10_000, |_, w| w);
        assert_eq!(chk.errors(), 0);
    }

    #[test]
    fn clean_prbs_stream_has_no_errors() {
        let mut gen = PatternGenerator::new();
        let mut chk = PatternChecker::new();
        run_pair(&mut gen, &mut chk, PatternMode::Prbs, 10_000, |_, w| w);
        assert_eq!(chk.errors(), 0);
    }

    #[test]
    fn count_corruption_is_counted_once_per_cycle() {
        let mut gen = PatternGenerator::new();
        let mut chk = PatternChecker::new();
        // Corrupting cycle 100 breaks the comparison on cycles 100 and 101.
        run_pair(&mut gen, &mut chk, PatternMode::Count, 200, |cycle, w| {
            if cycle == 100 {
                LinkWord::new([w.phases[0] ^ 0x0f0, w.phases[1] ^ 0x001])
            } else {
                w
            }
        });
        assert_eq!(chk.errors(), 2);
    }

    #[test]
    fn prbs_corruption_is_counted_per_word() {
        let mut gen = PatternGenerator::new();
        let mut chk = PatternChecker::new();
        run_pair(&mut gen, &mut chk, PatternMode::Prbs, 400, |cycle, w| {
            if cycle == 201 {
                LinkWord::new([w.phases[0], w.phases[1] ^ 0x800])
            } else {
                w
            }
        });
        assert_eq!(chk.errors(), 1);
    }

    #[test]
    fn prbs_checker_locks_on_mid_stream() {
        let mut gen = PatternGenerator::new();
        for i in 0..37 {
            gen.tick(true, PatternMode::Prbs, i % 2 == 0);
        }
        let mut chk = PatternChecker::new();
        run_pair(&mut gen, &mut chk, PatternMode::Prbs, 1_000, |_, w| w);
        assert_eq!(chk.errors(), 0);
    }

    #[test]
    fn errors_clear_on_reenable_not_on_disable() {
        let mut gen = PatternGenerator::new();
        let mut chk = PatternChecker::new();
        run_pair(&mut gen, &mut chk, PatternMode::Count, 50, |_, _| LinkWord::new([7, 7]));
        let errors = chk.errors();
        assert!(errors > 0);

        chk.tick(false, PatternMode::Count, None);
        assert_eq!(chk.errors(), errors);
        assert!(!chk.ready(true));

        chk.tick(true, PatternMode::Count, None);
        assert_eq!(chk.errors(), 0);
    }

    #[test]
    fn dropped_enable_releases_rx_data_at_once() {
        let mut chk = PatternChecker::new();
        chk.tick(true, PatternMode::Count, None);
        assert!(chk.ready(true));
        assert!(!chk.ready(false));
    }

    #[test]
    fn first_sample_after_enable_only_seeds() {
        let mut chk = PatternChecker::new();
        chk.tick(true, PatternMode::Count, None);
        chk.tick(true, PatternMode::Count, Some(LinkSample::framed(LinkWord::new([900, 900]), true)));
        chk.tick(true, PatternMode::Count, Some(LinkSample::framed(LinkWord::new([901, 901]), false)));
        assert_eq!(chk.errors(), 0);
    }

    #[test]
    fn error_counter_wraps() {
        let mut chk = PatternChecker::new();
        chk.tick(true, PatternMode::Count, None);
        chk.errors = u32::MAX;
        let bad = LinkSample::framed(LinkWord::new([1, 1]), true);
        chk.tick(true, PatternMode::Count, Some(bad));
        chk.tick(true, PatternMode::Count, Some(bad));
        assert_eq!(chk.errors(), 0);
    }
}
