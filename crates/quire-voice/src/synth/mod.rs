//! Speech synthesis client: engine-agnostic interface to the voice service.
//!
//! The [`Narrator`](crate::scheduler::Narrator) talks to the remote voice
//! synthesis service only through the [`SpeechSynthesizer`] trait, held as
//! `Arc<dyn SpeechSynthesizer>`, so tests and hosts can swap the transport
//! without touching the scheduler.
//!
//! ## Implementations
//!
//! | Module     | Transport                                   |
//! |------------|---------------------------------------------|
//! | [`http`]   | REST text-to-speech endpoint via `reqwest`  |

pub mod http;

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::SynthesisError;

pub use http::{HttpSynthesizer, HttpSynthesizerConfig};

/// One request to the voice synthesis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisRequest {
    /// Text to speak (one sentence unit, already prepared for speech).
    pub text: String,

    /// Service-specific voice identifier.
    pub voice_id: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
        }
    }
}

/// Backend-agnostic text-to-speech client.
///
/// Implementations must be `Send + Sync`: the scheduler shares one instance
/// between the foreground and background synthesis tasks.
///
/// # Cancellation
///
/// `cancel` fires when the request has been superseded. Implementations
/// should stop work and return [`SynthesisError::Cancelled`] as soon as they
/// notice. The scheduler does not rely on it: it races every call against
/// the token and discards results tied to a stale ticket.
///
/// Implementations must not retry; retry policy belongs to the host.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `request.text` with `request.voice_id`, returning encoded
    /// audio bytes (e.g. MP3 or WAV).
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> Result<Bytes, SynthesisError>;
}

/// Run one synthesis call with a hard upper bound and cancellation.
///
/// Returns [`SynthesisError::Cancelled`] as soon as `cancel` fires, even if
/// the synthesizer ignores the token, and [`SynthesisError::Timeout`] when
/// `limit` elapses first.
pub async fn synthesize_bounded(
    synthesizer: &dyn SpeechSynthesizer,
    request: &SynthesisRequest,
    cancel: &CancellationToken,
    limit: Duration,
) -> Result<Bytes, SynthesisError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SynthesisError::Cancelled),
        outcome = tokio::time::timeout(limit, synthesizer.synthesize(request, cancel)) => {
            outcome.unwrap_or(Err(SynthesisError::Timeout(limit)))
        }
    }
}
