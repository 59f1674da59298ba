//! Sample word and link word formats.
//!
//! A [`SampleWord`] is the 64-bit unit exchanged with the transport. It holds
//! four 16-bit slices, slice 0 in bits `[0:16)` up to slice 3 in bits `[48:64)`.
//! A [`LinkWord`] is the 32-bit unit moved per link clock cycle: one 16-bit
//! field per phase of the double-data-rate transfer. A [`LinkSample`] pairs a
//! link word with the frame bit observed on each phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame bit level that marks the first half-word of a sample word.
pub const FRAME_FIRST: bool = true;

/// Bits carried per component by the transceiver's 12-bit data pins, replicated
/// on both 16-bit halves of a packed link word.
pub const NATIVE_SAMPLE_MASK: u32 = 0x0fff_0fff;

/// A 64-bit sample word as exchanged with the transport.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleWord(pub u64);

impl SampleWord {
    /// Builds a word from its four 16-bit slices, slice 0 first.
    pub fn from_slices(slices: [u16; 4]) -> Self {
        let raw = slices
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, s)| acc | (u64::from(*s) << (16 * i)));
        Self(raw)
    }

    /// Returns the 16-bit slice at `index` (0..4).
    pub fn slice(&self, index: usize) -> u16 {
        (self.0 >> (16 * (index % 4))) as u16
    }

    /// Returns all four slices, slice 0 first.
    pub fn slices(&self) -> [u16; 4] {
        [self.slice(0), self.slice(1), self.slice(2), self.slice(3)]
    }
}

impl fmt::Debug for SampleWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleWord({:#018x})", self.0)
    }
}

impl From<u64> for SampleWord {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// A 32-bit link word: one 16-bit field per link phase.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkWord {
    /// Phase 0 (rising edge) and phase 1 (falling edge) fields.
    pub phases: [u16; 2],
}

impl LinkWord {
    /// Creates a link word from its two phase fields.
    pub fn new(phases: [u16; 2]) -> Self {
        Self { phases }
    }

    /// Unpacks a 32-bit value: phase 0 from the low 16 bits, phase 1 from the high.
    pub fn from_packed(raw: u32) -> Self {
        Self {
            phases: [raw as u16, (raw >> 16) as u16],
        }
    }

    /// Packs the word with phase 0 in the low 16 bits.
    pub fn packed(&self) -> u32 {
        u32::from(self.phases[0]) | (u32::from(self.phases[1]) << 16)
    }

    /// Returns the word with `mask` applied to its packed form.
    pub fn masked(&self, mask: u32) -> Self {
        Self::from_packed(self.packed() & mask)
    }

    /// Returns the field carried on `phase` (0 or 1).
    pub fn phase(&self, phase: usize) -> u16 {
        self.phases[phase & 1]
    }
}

impl fmt::Debug for LinkWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LinkWord([{:#06x}, {:#06x}])",
            self.phases[0], self.phases[1]
        )
    }
}

/// A link word together with the frame bit seen on each phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkSample {
    /// The data carried this cycle.
    pub word: LinkWord,
    /// Frame bit on phase 0 and phase 1.
    pub frame: [bool; 2],
}

impl LinkSample {
    /// Creates a sample whose frame bit is `frame` on both phases.
    pub fn framed(word: LinkWord, frame: bool) -> Self {
        Self {
            word,
            frame: [frame, frame],
        }
    }

    /// Returns `true` when phase 0 carries the first-half frame marker.
    pub fn is_first(&self) -> bool {
        self.frame[0] == FRAME_FIRST
    }

    /// Packs the two frame bits, phase 0 in bit 0.
    pub fn frame_bits(&self) -> u8 {
        u8::from(self.frame[0]) | (u8::from(self.frame[1]) << 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_little_endian() {
        let w = SampleWord(0xAABB_CCDD_EEFF_0011);
        assert_eq!(w.slices(), [0x0011, 0xEEFF, 0xCCDD, 0xAABB]);
    }

    #[test]
    fn from_slices_inverts_slices() {
        let w = SampleWord::from_slices([1, 2, 3, 4]);
        assert_eq!(w.0, 0x0004_0003_0002_0001);
    }

    #[test]
    fn link_word_packing() {
        let w = LinkWord::new([0xEEFF, 0xCCDD]);
        assert_eq!(w.packed(), 0xCCDD_EEFF);
        assert_eq!(LinkWord::from_packed(0xCCDD_EEFF), w);
    }

    #[test]
    fn native_mask_keeps_twelve_bits_per_phase() {
        let w = LinkWord::new([0xFFFF, 0xABCD]).masked(NATIVE_SAMPLE_MASK);
        assert_eq!(w.phases, [0x0FFF, 0x0BCD]);
    }

    #[test]
    fn frame_helpers() {
        let s = LinkSample::framed(LinkWord::default(), FRAME_FIRST);
        assert!(s.is_first());
        assert_eq!(s.frame_bits(), 0b11);
        let s = LinkSample {
            word: LinkWord::default(),
            frame: [false, true],
        };
        assert!(!s.is_first());
        assert_eq!(s.frame_bits(), 0b10);
    }

    #[test]
    fn debug_formats_hex() {
        assert_eq!(
            format!("{:?}", SampleWord(0x11)),
            "SampleWord(0x0000000000000011)"
        );
        assert_eq!(
            format!("{:?}", LinkWord::new([1, 2])),
            "LinkWord([0x0001, 0x0002])"
        );
    }
}
