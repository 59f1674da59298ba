//! Programmable delay tap values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A delay-line tap index in `0..=31`.
///
/// The checked constructor rejects larger values. Register writes go through
/// [`DelayTap::from_field`], which truncates to the 5-bit field like the
/// hardware register does.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DelayTap(u8);

/// Error returned when a tap value is outside `0..=31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("delay tap {0} out of range (0..={max})", max = DelayTap::MAX)]
pub struct TapError(pub u32);

impl DelayTap {
    /// Highest tap index of a delay line.
    pub const MAX: u8 = 31;
    /// Number of taps of a delay line.
    pub const COUNT: usize = 32;
    /// Width of a tap field in a register.
    pub const FIELD_BITS: u32 = 5;

    /// Creates a tap, rejecting values above [`DelayTap::MAX`].
    pub fn new(value: u32) -> Result<Self, TapError> {
        if value > u32::from(Self::MAX) {
            return Err(TapError(value));
        }
        Ok(Self(value as u8))
    }

    /// Creates a tap from a raw register field, keeping the low 5 bits.
    pub fn from_field(raw: u32) -> Self {
        Self((raw & ((1 << Self::FIELD_BITS) - 1)) as u8)
    }

    /// Returns the tap index.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Iterates over every tap, 0 first.
    pub fn all() -> impl Iterator<Item = DelayTap> {
        (0..=Self::MAX).map(DelayTap)
    }
}

impl TryFrom<u8> for DelayTap {
    type Error = TapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(u32::from(value))
    }
}

impl From<DelayTap> for u8 {
    fn from(tap: DelayTap) -> Self {
        tap.0
    }
}

impl fmt::Debug for DelayTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelayTap({})", self.0)
    }
}

impl fmt::Display for DelayTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
