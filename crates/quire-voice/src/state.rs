//! Playback state machine: phases, the observable status, and events.
//!
//! ```text
//!   Idle → GeneratingInitial → Playing ⇄ Paused
//!                                 │
//!                                 └──→ Stopped   (natural end of text)
//!
//!   any non-Idle ──(unrecoverable synthesis failure)──→ Error
//!   any          ──stop()──→ Idle
//! ```
//!
//! Only the scheduler moves the machine; the host renders the phase and calls
//! the operations on [`Narrator`](crate::scheduler::Narrator).

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Phase of the narration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackPhase {
    /// No session.
    #[default]
    Idle,

    /// Synthesizing the first unit of a session.
    GeneratingInitial,

    /// A unit is playing, or the next one is being synthesized in the
    /// foreground (see [`PlaybackStatus::buffering`]).
    Playing,

    /// The current unit is suspended; background prefetch keeps running.
    Paused,

    /// The last unit finished; all audio released.
    Stopped,

    /// The session failed. Terminal until the next `start()` or `seek()`.
    Error,
}

impl PlaybackPhase {
    /// Whether `pause()` has an effect in this phase.
    #[must_use]
    pub const fn can_pause(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Whether `resume()` has an effect in this phase.
    #[must_use]
    pub const fn can_resume(self) -> bool {
        matches!(self, Self::Paused)
    }
}

/// Snapshot of the scheduler, published on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackStatus {
    pub phase: PlaybackPhase,

    /// Unit being played (or synthesized for playback); `None` when idle or
    /// finished.
    pub current_index: Option<usize>,

    /// A background prefetch request is outstanding.
    pub prefetch_in_flight: bool,

    /// The next unit is being synthesized in the foreground because the
    /// prefetch was not ready at handoff time.
    pub buffering: bool,

    /// Number of units in the current session's text.
    pub unit_count: usize,

    /// Synthesized audio buffers currently held (never more than two).
    pub retained_units: usize,

    /// Failure reason when `phase` is [`PlaybackPhase::Error`].
    pub last_error: Option<String>,
}

/// Events emitted by the scheduler to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    /// Phase changed.
    PhaseChanged(PlaybackPhase),

    /// A unit began playing; `range` is what the host should highlight.
    UnitStarted { index: usize, range: Range<usize> },

    /// A unit finished playing naturally.
    UnitFinished { index: usize },

    /// Background synthesis of a unit completed and is buffered.
    PrefetchReady { index: usize },

    /// Background synthesis of a unit failed; the next handoff will
    /// synthesize it in the foreground.
    PrefetchFailed { index: usize, reason: String },

    /// The prefetch was not ready at handoff; synthesizing inline.
    EmergencySynthesis { index: usize },

    /// The last unit finished.
    Finished,

    /// The session failed.
    Error(String),
}
