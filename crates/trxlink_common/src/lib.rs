//! Shared foundational types used across the trxlink transceiver bridge.
//!
//! This crate provides clock frequencies, the wide sample word and narrow link
//! word formats, the two-phase framed link sample, checked delay taps, and pin
//! polarity.

#![warn(missing_docs)]

pub mod frequency;
pub mod polarity;
pub mod sample;
pub mod tap;

pub use frequency::{Frequency, ParseFrequencyError};
pub use polarity::{PinPolarity, Polarity};
pub use sample::{LinkSample, LinkWord, SampleWord, FRAME_FIRST, NATIVE_SAMPLE_MASK};
pub use tap::{DelayTap, TapError};
