//! Width converters between sample words and link words.
//!
//! A sample word crosses the link as two consecutive link words. Link word `k`
//! is the `k`-th 32-bit window of the sample word rotated right by 16 bits,
//! with phase 0 in its low 16 bits:
//!
//! ```text
//! sample 0xAABB_CCDD_EEFF_0011
//!   link word 0 (frame = first): [0xEEFF, 0xCCDD]
//!   link word 1                : [0xAABB, 0x0011]
//! ```
//!
//! Both converters live in the link domain; the clock-domain boundary is the
//! FIFO in front of (TX) or behind (RX) them.

use trxlink_common::{LinkSample, LinkWord, SampleWord};

/// Splits a sample word into the two link words that carry it, first half first.
pub fn split(word: SampleWord) -> [LinkWord; 2] {
    let rotated = word.0.rotate_right(16);
    [
        LinkWord::from_packed(rotated as u32),
        LinkWord::from_packed((rotated >> 32) as u32),
    ]
}

/// Reassembles a sample word from its two link words.
pub fn join(halves: [LinkWord; 2]) -> SampleWord {
    let rotated = u64::from(halves[0].packed()) | (u64::from(halves[1].packed()) << 32);
    SampleWord(rotated.rotate_left(16))
}

/// TX converter: one sample word in, two link words out.
///
/// A new word is only taken on a first-half frame slot so that the receiver
/// can find word boundaries from the frame bit.
#[derive(Debug, Clone, Default)]
pub struct TxConverter {
    pending: Option<LinkWord>,
}

impl TxConverter {
    /// Creates an empty converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the converter accepts a sample word this link cycle.
    pub fn ready(&self, first_slot: bool) -> bool {
        first_slot && self.pending.is_none()
    }

    /// Clocks the converter.
    ///
    /// `input` is consumed only if [`ready`](Self::ready) is true for
    /// `first_slot`. Returns the link word for this cycle, if any. A held
    /// second half only leaves on a second-half slot.
    pub fn tick(&mut self, first_slot: bool, input: Option<SampleWord>) -> Option<LinkWord> {
        if self.pending.is_some() {
            return if first_slot { None } else { self.pending.take() };
        }
        match input {
            Some(word) if first_slot => {
                let [first, second] = split(word);
                self.pending = Some(second);
                Some(first)
            }
            _ => None,
        }
    }
}

/// RX converter: two framed link words in, one sample word out.
#[derive(Debug, Clone, Default)]
pub struct RxConverter {
    first: Option<LinkWord>,
}

impl RxConverter {
    /// Creates an empty converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clocks the converter with the link sample routed to it this cycle.
    ///
    /// A first-half sample starts a word; the following second-half sample
    /// completes it. A missing sample or a second half without a first drops
    /// the partial word.
    pub fn tick(&mut self, sample: Option<LinkSample>) -> Option<SampleWord> {
        let sample = match sample {
            Some(s) => s,
            None => {
                self.first = None;
                return None;
            }
        };
        if sample.is_first() {
            self.first = Some(sample.word);
            return None;
        }
        self.first.take().map(|first| join([first, sample.word]))
    }
}
