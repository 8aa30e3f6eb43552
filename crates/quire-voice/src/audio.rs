//! Synthesized audio buffers and the ledger that bounds them.
//!
//! A [`SynthesizedAudio`] is created only when the scheduler accepts a
//! synthesis result, and it is released by dropping it. Every live instance
//! is counted by the [`AudioLedger`] it was issued from, which makes the
//! two-buffer bound observable from tests and from the status snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Counter of live [`SynthesizedAudio`] buffers.
///
/// Cloning shares the counter.
#[derive(Debug, Clone, Default)]
pub struct AudioLedger {
    inner: Arc<LedgerCounts>,
}

#[derive(Debug, Default)]
struct LedgerCounts {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl AudioLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `bytes` as the synthesized audio of `sentence_index`.
    #[must_use]
    pub fn issue(&self, sentence_index: usize, bytes: Bytes) -> SynthesizedAudio {
        let live = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(live, Ordering::SeqCst);
        SynthesizedAudio {
            sentence_index,
            bytes,
            created_at: Utc::now(),
            ledger: Arc::clone(&self.inner),
        }
    }

    /// Number of buffers currently alive.
    #[must_use]
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Highest number of buffers ever alive at once.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

/// Encoded audio for one sentence unit, owned by exactly one pipeline slot.
///
/// Not `Clone`: moving it between the "next" and "current" slots is the only
/// way to hand it over. The audio payload is a reference-counted [`Bytes`],
/// so giving the sink a view of it does not copy the audio.
#[derive(Debug)]
pub struct SynthesizedAudio {
    sentence_index: usize,
    bytes: Bytes,
    created_at: DateTime<Utc>,
    ledger: Arc<LedgerCounts>,
}

impl SynthesizedAudio {
    /// Index of the sentence unit this audio speaks.
    #[must_use]
    pub const fn sentence_index(&self) -> usize {
        self.sentence_index
    }

    /// Encoded audio payload.
    #[must_use]
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Drop for SynthesizedAudio {
    fn drop(&mut self) {
        self.ledger.live.fetch_sub(1, Ordering::SeqCst);
    }
}
