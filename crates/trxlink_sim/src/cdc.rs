//! Clock-domain crossing primitives.
//!
//! Every value that moves between the control domain and the link domain goes
//! through one of these types. Each type has a source-side method, called only
//! from the source domain's tick, and a destination-side method, called only
//! from the destination domain's tick. No method needs the other domain to be
//! running: a stopped destination clock stalls transfers but never corrupts
//! them.
//!
//! - [`MultiReg`]: synchronizer chain for quasi-static single bits.
//! - [`PulseSynchronizer`]: toggle-based crossing of single-cycle pulses.
//! - [`BusSynchronizer`]: multi-bit value crossing with a ping/pong handshake.
//! - [`AsyncFifo`]: gray-coded dual-clock FIFO with valid/ready semantics.

/// Minimum number of synchronizing flip-flops in a chain.
pub const MIN_SYNC_STAGES: usize = 2;

/// A chain of synchronizing registers clocked by the destination domain.
///
/// A value driven on the source side becomes visible at the output after
/// exactly `stages` destination ticks. The source must hold it for at least
/// one more destination tick than that for the crossing to be reliable.
#[derive(Debug, Clone)]
pub struct MultiReg<T> {
    source: T,
    stages: Vec<T>,
}

impl<T: Copy> MultiReg<T> {
    /// Creates a chain of `stages` registers (at least [`MIN_SYNC_STAGES`]) holding `reset`.
    pub fn new(stages: usize, reset: T) -> Self {
        Self {
            source: reset,
            stages: vec![reset; stages.max(MIN_SYNC_STAGES)],
        }
    }

    /// Source side: drives the chain input.
    pub fn drive(&mut self, value: T) {
        self.source = value;
    }

    /// Destination side: clocks the chain and returns the new output.
    pub fn tick(&mut self) -> T {
        self.stages.rotate_right(1);
        self.stages[0] = self.source;
        self.output()
    }

    /// Returns the current output of the last stage.
    pub fn output(&self) -> T {
        self.stages[self.stages.len() - 1]
    }

    /// Returns the chain length.
    pub fn stages(&self) -> usize {
        self.stages.len()
    }
}

/// Crosses single-cycle pulses by toggling a level in the source domain and
/// detecting its edges after synchronization.
///
/// Pulses closer together than the destination can resolve merge, so the
/// destination may see fewer pulses than were sent, but never more.
#[derive(Debug, Clone)]
pub struct PulseSynchronizer {
    toggle: bool,
    sync: MultiReg<bool>,
    seen: bool,
}

impl PulseSynchronizer {
    /// Creates a synchronizer with a chain of `stages` registers.
    pub fn new(stages: usize) -> Self {
        Self {
            toggle: false,
            sync: MultiReg::new(stages, false),
            seen: false,
        }
    }

    /// Source side: emits one pulse.
    pub fn pulse(&mut self) {
        self.toggle = !self.toggle;
    }

    /// Destination side: clocks the synchronizer, returning `true` on a detected pulse.
    pub fn tick(&mut self) -> bool {
        self.sync.drive(self.toggle);
        let level = self.sync.tick();
        let detected = level != self.seen;
        self.seen = level;
        detected
    }
}

/// Crosses a multi-bit value with a ping/pong handshake.
///
/// The source captures a value into a holding register and toggles `ping`.
/// The destination copies the holding register once the synchronized `ping`
/// changes, then toggles `pong`. The source loads the next value only after
/// the synchronized `pong` changes, so the holding register is stable whenever
/// the destination copies it. The destination always sees a value the source
/// actually presented, possibly skipping intermediate ones.
#[derive(Debug, Clone)]
pub struct BusSynchronizer<T> {
    // Source domain.
    obuffer: T,
    ping: bool,
    pong_sync: MultiReg<bool>,
    pong_seen: bool,
    started: bool,
    // Destination domain.
    ibuffer: T,
    ping_sync: MultiReg<bool>,
    ping_seen: bool,
    pong: bool,
}

impl<T: Copy> BusSynchronizer<T> {
    /// Creates a synchronizer whose output reads `reset` until the first transfer.
    pub fn new(stages: usize, reset: T) -> Self {
        Self {
            obuffer: reset,
            ping: false,
            pong_sync: MultiReg::new(stages, false),
            pong_seen: false,
            started: false,
            ibuffer: reset,
            ping_sync: MultiReg::new(stages, false),
            ping_seen: false,
            pong: false,
        }
    }

    /// Source side: offers the current value; it is captured when the previous
    /// transfer has been acknowledged.
    pub fn source_tick(&mut self, value: T) {
        self.pong_sync.drive(self.pong);
        let pong = self.pong_sync.tick();
        if !self.started || pong != self.pong_seen {
            self.pong_seen = pong;
            self.obuffer = value;
            self.ping = !self.ping;
            self.started = true;
        }
    }

    /// Destination side: clocks the synchronizer and returns the latest transferred value.
    pub fn dest_tick(&mut self) -> T {
        self.ping_sync.drive(self.ping);
        let ping = self.ping_sync.tick();
        if ping != self.ping_seen {
            self.ping_seen = ping;
            self.ibuffer = self.obuffer;
            self.pong = !self.pong;
        }
        self.ibuffer
    }

    /// Returns the latest value seen by the destination.
    pub fn value(&self) -> T {
        self.ibuffer
    }
}

/// Converts a binary count to gray code.
pub fn to_gray(bin: usize) -> usize {
    bin ^ (bin >> 1)
}

/// Converts a gray code back to a binary count.
pub fn from_gray(gray: usize) -> usize {
    let mut bin = gray;
    let mut shift = gray >> 1;
    while shift != 0 {
        bin ^= shift;
        shift >>= 1;
    }
    bin
}

/// A dual-clock FIFO with gray-coded pointers.
///
/// Pointers count modulo twice the depth so that full and empty are
/// distinguishable. Each side compares its own pointer against a synchronized
/// copy of the other side's, which lags by the synchronizer latency; the FIFO
/// therefore reports full or empty conservatively and never overwrites an
/// unread entry or returns an entry twice. Entries leave in the order they
/// entered.
#[derive(Debug, Clone)]
pub struct AsyncFifo<T> {
    storage: Vec<T>,
    depth: usize,
    // Write domain.
    wr_ptr: usize,
    rd_gray_sync: MultiReg<usize>,
    // Read domain.
    rd_ptr: usize,
    wr_gray_sync: MultiReg<usize>,
}

impl<T: Copy + Default> AsyncFifo<T> {
    /// Creates a FIFO of `depth` entries (rounded up to a power of two, at
    /// least 2) with `stages`-register pointer synchronizers.
    pub fn new(depth: usize, stages: usize) -> Self {
        let depth = depth.max(2).next_power_of_two();
        Self {
            storage: vec![T::default(); depth],
            depth,
            wr_ptr: 0,
            rd_gray_sync: MultiReg::new(stages, 0),
            rd_ptr: 0,
            wr_gray_sync: MultiReg::new(stages, 0),
        }
    }

    /// Returns the number of entries.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn ptr_mask(&self) -> usize {
        2 * self.depth - 1
    }

    /// Write side: whether a word offered this cycle would be accepted.
    pub fn writable(&self) -> bool {
        let rd = from_gray(self.rd_gray_sync.output());
        (self.wr_ptr.wrapping_sub(rd) & self.ptr_mask()) < self.depth
    }

    /// Write side: clocks the write domain, storing `input` if there is room.
    ///
    /// Returns whether the word was accepted (valid and ready both high).
    pub fn write_tick(&mut self, input: Option<T>) -> bool {
        let accepted = match input {
            Some(value) if self.writable() => {
                self.storage[self.wr_ptr % self.depth] = value;
                self.wr_ptr = (self.wr_ptr + 1) & self.ptr_mask();
                true
            }
            _ => false,
        };
        self.rd_gray_sync.drive(to_gray(self.rd_ptr));
        self.rd_gray_sync.tick();
        accepted
    }

    /// Read side: whether an entry is available.
    pub fn readable(&self) -> bool {
        from_gray(self.wr_gray_sync.output()) != self.rd_ptr
    }

    /// Read side: the entry that would be returned this cycle, if any.
    pub fn peek(&self) -> Option<T> {
        self.readable()
            .then(|| self.storage[self.rd_ptr % self.depth])
    }

    /// Read side: clocks the read domain, popping an entry when `ready` is high
    /// and one is available.
    pub fn read_tick(&mut self, ready: bool) -> Option<T> {
        let out = if ready { self.peek() } else { None };
        if out.is_some() {
            self.rd_ptr = (self.rd_ptr + 1) & self.ptr_mask();
        }
        self.wr_gray_sync.drive(to_gray(self.wr_ptr));
        self.wr_gray_sync.tick();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // ---- MultiReg ----

    #[test]
    fn multireg_latency_equals_stage_count() {
        for stages in 2..5 {
            let mut m = MultiReg::new(stages, false);
            m.drive(true);
            for _ in 0..stages - 1 {
                assert!(!m.tick());
            }
            assert!(m.tick());
        }
    }

    #[test]
    fn multireg_enforces_minimum_stages() {
        assert_eq!(MultiReg::new(0, 0u8).stages(), MIN_SYNC_STAGES);
        assert_eq!(MultiReg::new(1, 0u8).stages(), MIN_SYNC_STAGES);
        assert_eq!(MultiReg::new(3, 0u8).stages(), 3);
    }

    #[test]
    fn multireg_holds_without_destination_ticks() {
        let mut m = MultiReg::new(2, 5u8);
        m.drive(9);
        assert_eq!(m.output(), 5);
    }

    // ---- PulseSynchronizer ----

    #[test]
    fn single_pulse_is_detected_once() {
        let mut p = PulseSynchronizer::new(2);
        p.pulse();
        let detected: Vec<bool> = (0..6).map(|_| p.tick()).collect();
        assert_eq!(detected.iter().filter(|d| **d).count(), 1);
        assert!(detected[1]);
    }

    #[test]
    fn spaced_pulses_are_all_detected() {
        let mut p = PulseSynchronizer::new(2);
        let mut count = 0;
        for _ in 0..10 {
            p.pulse();
            for _ in 0..3 {
                if p.tick() {
                    count += 1;
                }
            }
        }
        assert_eq!(count, 10);
    }

    #[test]
    fn no_pulses_no_detections() {
        let mut p = PulseSynchronizer::new(3);
        assert!((0..20).all(|_| !p.tick()));
    }

    // ---- BusSynchronizer ----

    #[test]
    fn bus_value_arrives_after_handshake() {
        let mut b = BusSynchronizer::new(2, 0u32);
        b.source_tick(0xdead_beef);
        assert_eq!(b.dest_tick(), 0);
        assert_eq!(b.dest_tick(), 0xdead_beef);
        assert_eq!(b.value(), 0xdead_beef);
    }

    #[test]
    fn bus_only_delivers_presented_values() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut b = BusSynchronizer::new(2, 0u32);
        let mut counter = 0u32;
        let mut last_seen = 0u32;
        for _ in 0..5_000 {
            if rng.gen_bool(0.6) {
                counter += 1;
                b.source_tick(counter);
            } else {
                let v = b.dest_tick();
                assert!(v >= last_seen, "value went backwards: {v} < {last_seen}");
                assert!(v <= counter);
                last_seen = v;
            }
        }
        assert!(last_seen > 0);
    }

    #[test]
    fn bus_source_does_not_block_when_destination_stops() {
        let mut b = BusSynchronizer::new(2, 0u32);
        for v in 0..100 {
            b.source_tick(v);
        }
        assert_eq!(b.dest_tick(), 0);
        assert_eq!(b.dest_tick(), 0);
    }

    // ---- Gray code ----

    #[test]
    fn gray_code_roundtrip_and_single_bit_steps() {
        for v in 0..64usize {
            assert_eq!(from_gray(to_gray(v)), v);
            let diff = to_gray(v) ^ to_gray(v + 1);
            assert_eq!(diff.count_ones(), 1);
        }
    }

    // ---- AsyncFifo ----

    #[test]
    fn fifo_depth_is_power_of_two() {
        assert_eq!(AsyncFifo::<u8>::new(0, 2).depth(), 2);
        assert_eq!(AsyncFifo::<u8>::new(3, 2).depth(), 4);
        assert_eq!(AsyncFifo::<u8>::new(4, 2).depth(), 4);
    }

    #[test]
    fn fifo_word_visible_after_pointer_sync() {
        let mut f = AsyncFifo::<u32>::new(4, 2);
        assert!(f.write_tick(Some(11)));
        assert_eq!(f.read_tick(true), None);
        assert_eq!(f.read_tick(true), None);
        assert_eq!(f.peek(), Some(11));
        assert_eq!(f.read_tick(true), Some(11));
        assert_eq!(f.peek(), None);
    }

    #[test]
    fn fifo_fills_and_refuses_when_reader_stopped() {
        let mut f = AsyncFifo::<u32>::new(4, 2);
        let accepted = (0..10).filter(|v| f.write_tick(Some(*v))).count();
        assert_eq!(accepted, 4);
        assert!(!f.writable());
    }

    #[test]
    fn fifo_idle_ticks_do_not_consume() {
        let mut f = AsyncFifo::<u32>::new(4, 2);
        f.write_tick(Some(1));
        for _ in 0..5 {
            assert_eq!(f.read_tick(false), None);
        }
        assert_eq!(f.read_tick(true), Some(1));
    }

    #[test]
    fn fifo_preserves_order_under_random_clocking() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let write_bias = rng.gen_range(0.2..0.8);
            let mut f = AsyncFifo::<u32>::new(4, 2);
            let mut next_in = 0u32;
            let mut received = Vec::new();
            for _ in 0..40_000 {
                if rng.gen_bool(write_bias) {
                    let offer = (next_in < 2_000 && rng.gen_bool(0.7)).then_some(next_in);
                    if f.write_tick(offer) {
                        next_in += 1;
                    }
                } else if let Some(v) = f.read_tick(rng.gen_bool(0.8)) {
                    received.push(v);
                }
            }
            let expected: Vec<u32> = (0..next_in).collect();
            assert_eq!(received.len(), expected.len(), "seed {seed}");
            assert_eq!(received, expected, "seed {seed}");
        }
    }
}
