//! The wide-word stream interface to the transport.
//!
//! The bridge calls these methods once per control-domain cycle. Each
//! direction follows valid/ready semantics: a word moves only in a cycle where
//! the producer offers it and the consumer accepts it.

use std::collections::VecDeque;
use trxlink_common::SampleWord;

/// A transport attached to the control-domain side of the bridge.
pub trait Transport {
    /// TX valid/data: the word offered to the bridge this cycle, if any.
    fn tx_peek(&self) -> Option<SampleWord>;

    /// TX handshake: the bridge took the offered word.
    fn tx_accept(&mut self);

    /// RX ready: whether the transport takes a word this cycle.
    fn rx_ready(&self) -> bool;

    /// RX handshake: the transport receives `word`.
    fn rx_accept(&mut self, word: SampleWord);
}

/// An in-memory transport: a queue of words to send and a log of words received.
#[derive(Debug, Clone, Default)]
pub struct QueueTransport {
    tx: VecDeque<SampleWord>,
    rx: Vec<SampleWord>,
    rx_limit: Option<usize>,
    sent: u64,
}

impl QueueTransport {
    /// Creates an empty transport that accepts every RX word.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that stops accepting RX words once `limit` are held.
    pub fn with_rx_limit(limit: usize) -> Self {
        Self {
            rx_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Queues words for transmission.
    pub fn send<I: IntoIterator<Item = SampleWord>>(&mut self, words: I) {
        self.tx.extend(words);
    }

    /// Words still waiting to be taken by the bridge.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }

    /// Words the bridge has taken so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Words received so far.
    pub fn received(&self) -> &[SampleWord] {
        &self.rx
    }

    /// Removes and returns the received words.
    pub fn take_received(&mut self) -> Vec<SampleWord> {
        std::mem::take(&mut self.rx)
    }
}

impl Transport for QueueTransport {
    fn tx_peek(&self) -> Option<SampleWord> {
        self.tx.front().copied()
    }

    fn tx_accept(&mut self) {
        if self.tx.pop_front().is_some() {
            self.sent += 1;
        }
    }

    fn rx_ready(&self) -> bool {
        self.rx_limit.map_or(true, |limit| self.rx.len() < limit)
    }

    fn rx_accept(&mut self, word: SampleWord) {
        self.rx.push(word);
    }
}
