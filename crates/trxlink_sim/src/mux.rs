//! Data-path selection at the link boundary.
//!
//! TX: the pattern generator overrides the converter whenever it has output.
//! RX: loopback substitutes the masked TX link word for the received one,
//! then the pattern checker, when ready, takes the sample ahead of the RX
//! converter.

use trxlink_common::{LinkSample, LinkWord};

/// Where the RX sample goes this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RxRoute {
    /// Consumed by the pattern checker.
    Checker(LinkSample),
    /// Passed to the RX converter towards the transport.
    Converter(LinkSample),
}

/// Per-direction source selection, evaluated every link cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataPathSelector {
    loopback_mask: u32,
}

impl DataPathSelector {
    /// Creates a selector that masks looped-back data with `loopback_mask`.
    pub fn new(loopback_mask: u32) -> Self {
        Self { loopback_mask }
    }

    /// Whether the TX converter may take a word: only when the generator is idle.
    pub fn tx_converter_ready(generator_active: bool, converter_ready: bool) -> bool {
        converter_ready && !generator_active
    }

    /// Picks the TX link word; an idle link carries zeros.
    pub fn tx_word(generated: Option<LinkWord>, converted: Option<LinkWord>) -> LinkWord {
        generated.or(converted).unwrap_or_default()
    }

    /// Picks the sample presented at the RX boundary.
    pub fn rx_sample(&self, loopback: bool, tx: LinkSample, received: LinkSample) -> LinkSample {
        if loopback {
            LinkSample {
                word: tx.word.masked(self.loopback_mask),
                frame: tx.frame,
            }
        } else {
            received
        }
    }

    /// Routes the aligned RX sample to the checker or the converter.
    pub fn route_rx(checker_ready: bool, sample: LinkSample) -> RxRoute {
        if checker_ready {
            RxRoute::Checker(sample)
        } else {
            RxRoute::Converter(sample)
        }
    }
}
