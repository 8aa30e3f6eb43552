//! `AudioSink`: the output side of the narration pipeline.
//!
//! The [`Narrator`](crate::scheduler::Narrator) hands each sentence clip to
//! an `AudioSink` and learns about natural completion through the callback
//! passed with the clip. The trait decouples the scheduler from any concrete
//! audio backend:
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`LocalAudioSink`](crate::audio_thread::LocalAudioSink) | Desktop / CLI, rodio playback on a dedicated audio thread (feature `local-audio`) |
//! | test sinks | Integration tests: record calls, finish clips on demand |
//!
//! The trait is **object-safe** (`Arc<dyn AudioSink>`). All methods take
//! `&self`; implementations use channels or atomics internally.

use bytes::Bytes;

use crate::error::NarrationError;

/// Callback fired when a clip finishes playing naturally.
pub type PlaybackDoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// One sentence's encoded audio, as handed to a sink.
///
/// `audio` shares the buffer owned by the scheduler's current slot.
#[derive(Debug, Clone)]
pub struct PlaybackClip {
    /// Sentence unit the clip speaks.
    pub sentence_index: usize,

    /// Encoded audio (MP3 or WAV).
    pub audio: Bytes,
}

/// Abstraction over an audio output device.
///
/// # Contract
///
/// - [`play`](AudioSink::play) replaces whatever was playing.
/// - `on_finished` fires at most once, only when the clip drains naturally.
///   It must not fire after [`stop`](AudioSink::stop) or after the clip was
///   replaced by a later `play`.
/// - [`pause`](AudioSink::pause) keeps the playback position; a later
///   [`resume`](AudioSink::resume) continues the same clip.
pub trait AudioSink: Send + Sync {
    /// Start playing `clip` from the beginning.
    fn play(&self, clip: PlaybackClip, on_finished: PlaybackDoneCallback)
    -> Result<(), NarrationError>;

    /// Suspend the current clip, keeping its position.
    fn pause(&self);

    /// Continue a paused clip.
    fn resume(&self);

    /// Stop and discard the current clip.
    fn stop(&self);
}
