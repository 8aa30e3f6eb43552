//! Narration error types.

use std::time::Duration;

/// Failure of a single synthesis request.
///
/// `Cancelled` is a normal outcome (a newer request or `stop()` superseded
/// the call) and is never surfaced to the host as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// The request could not reach the synthesis service.
    #[error("Synthesis service unreachable: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("Synthesis service returned {status}: {message}")]
    Service { status: u16, message: String },

    /// The request did not complete within the configured bound.
    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered but the payload is unusable (e.g. empty audio).
    #[error("Invalid synthesis response: {0}")]
    InvalidResponse(String),

    /// The request was cancelled before it completed.
    #[error("Synthesis cancelled")]
    Cancelled,
}

impl SynthesisError {
    /// Whether this outcome is a cancellation rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors returned by the narration engine to the host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrationError {
    /// The text contains no speakable sentence.
    #[error("Nothing to read: the text contains no sentences")]
    EmptyInput,

    /// A sentence index beyond the unit count was requested.
    #[error("Sentence {index} is out of range (text has {count} sentences)")]
    SeekOutOfRange { index: usize, count: usize },

    /// Synthesis failed on a path that aborts the session.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The audio sink refused to play a clip.
    #[error("Audio playback failed: {0}")]
    Playback(String),

    /// The scheduler task is no longer running.
    #[error("Narrator is shut down")]
    Closed,
}
