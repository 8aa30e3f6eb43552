#![doc = include_str!(concat!(env!("OUT_DIR"), "/README_GENERATED.md"))]
#![deny(unused_crate_dependencies)]

pub mod audio;
pub mod audio_io;
#[cfg(feature = "local-audio")]
pub mod audio_thread;
pub mod config;
pub mod error;
pub mod highlight;
#[cfg(feature = "local-audio")]
pub mod playback;
pub mod scheduler;
pub mod segment;
pub mod speech_text;
pub mod state;
pub mod synth;

// Re-export key types for convenience
pub use audio::{AudioLedger, SynthesizedAudio};
pub use audio_io::{AudioSink, PlaybackClip, PlaybackDoneCallback};
#[cfg(feature = "local-audio")]
pub use audio_thread::LocalAudioSink;
pub use config::{NarrationSettings, NarratorConfig, SettingsError, validate_settings};
pub use error::{NarrationError, SynthesisError};
pub use highlight::{
    HighlightSpan, SeekMark, highlight_spans, index_for_offset, range_for_index,
    render_highlighted,
};
pub use scheduler::Narrator;
pub use segment::{SentenceUnit, segment};
pub use speech_text::{collapse_whitespace, prepare_for_speech};
pub use state::{NarrationEvent, PlaybackPhase, PlaybackStatus};
pub use synth::{
    HttpSynthesizer, HttpSynthesizerConfig, SpeechSynthesizer, SynthesisRequest,
    synthesize_bounded,
};
