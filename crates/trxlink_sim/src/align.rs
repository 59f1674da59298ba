//! Frame alignment detection and lane swap.
//!
//! The transmitter drives the same frame level on both phases of a link cycle.
//! A receiver sampling on the expected edges sees equal frame bits on phase 0
//! and phase 1; one sampling half a cycle late sees the phase-1 field of the
//! previous cycle paired with the phase-0 field of the current one, and frame
//! bits that differ. The aligner keeps one cycle of history and, when the
//! frame bits differ, rebuilds the word from the previous cycle's phase 1 and
//! the current cycle's phase 0.

use trxlink_common::LinkSample;

/// Tracks frame alignment and undoes half-cycle phase inversion.
#[derive(Debug, Clone, Default)]
pub struct FrameAligner {
    last: Option<LinkSample>,
    aligned: bool,
}

impl FrameAligner {
    /// Creates an aligner with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame observation is one of the two aligned patterns.
    pub fn is_aligned(sample: &LinkSample) -> bool {
        sample.frame[0] == sample.frame[1]
    }

    /// Clocks the aligner with the cycle's received sample.
    ///
    /// Returns the lane-corrected sample, delayed by one cycle. The first cycle
    /// after construction has no history and returns `None`.
    pub fn tick(&mut self, sample: LinkSample) -> Option<LinkSample> {
        let aligned = Self::is_aligned(&sample);
        if aligned != self.aligned {
            tracing::debug!(aligned, frame = sample.frame_bits(), "frame alignment changed");
            self.aligned = aligned;
        }
        let out = self.last.map(|last| {
            if aligned {
                last
            } else {
                let mut swapped = last;
                swapped.word.phases = [last.word.phases[1], sample.word.phases[0]];
                swapped.frame = [last.frame[1], sample.frame[0]];
                swapped
            }
        });
        self.last = Some(sample);
        out
    }

    /// The alignment decision of the last cycle.
    pub fn aligned(&self) -> bool {
        self.aligned
    }
}
