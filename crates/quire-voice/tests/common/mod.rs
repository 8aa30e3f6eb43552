//! Mock synthesizer and sink shared by the scheduler integration tests.
//!
//! Nothing here touches audio hardware or the network. The synthesizer
//! echoes the request text back as "audio", so a test can tell which unit a
//! clip belongs to from its bytes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use quire_voice::{
    AudioSink, NarrationError, NarrationEvent, PlaybackClip, PlaybackDoneCallback, PlaybackStatus,
    SpeechSynthesizer, SynthesisError, SynthesisRequest,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Generous upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

// ── Mock synthesizer ───────────────────────────────────────────────

/// What the mock does for one call.
#[derive(Debug, Clone)]
pub enum Step {
    /// Echo the text back after a delay.
    Delay(Duration),
    /// Never answer; returns `Cancelled` once the token fires.
    Hang,
    /// Fail with the given error.
    Fail(SynthesisError),
}

/// Synthesizer scripted per request text.
///
/// Each text has a queue of [`Step`]s consumed one per call; once the queue
/// is empty the text is echoed back immediately.
#[derive(Default)]
pub struct ScriptedSynth {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSynth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, text: &str, steps: impl IntoIterator<Item = Step>) {
        self.script
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .extend(steps);
    }

    /// Texts requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls().iter().filter(|t| *t == text).count()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynth {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> Result<Bytes, SynthesisError> {
        self.calls.lock().unwrap().push(request.text.clone());
        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.text)
            .and_then(VecDeque::pop_front);

        let echo = Bytes::from(request.text.clone());
        match step {
            None => Ok(echo),
            Some(Step::Delay(delay)) => tokio::select! {
                () = cancel.cancelled() => Err(SynthesisError::Cancelled),
                () = tokio::time::sleep(delay) => Ok(echo),
            },
            Some(Step::Hang) => {
                cancel.cancelled().await;
                Err(SynthesisError::Cancelled)
            }
            Some(Step::Fail(error)) => Err(error),
        }
    }
}

// ── Mock sink ──────────────────────────────────────────────────────

#[derive(Default)]
struct SinkState {
    played: Vec<PlaybackClip>,
    pending: Option<PlaybackDoneCallback>,
    generation: u64,
    paused: bool,
    pauses: usize,
    resumes: usize,
    stops: usize,
}

/// Sink that records every call.
///
/// In manual mode a clip only finishes when the test calls
/// [`finish_current`](MockSink::finish_current). In auto mode every clip
/// finishes by itself after a fixed duration unless it is paused, stopped
/// or replaced first.
pub struct MockSink {
    auto_finish: Option<Duration>,
    state: Arc<Mutex<SinkState>>,
}

impl MockSink {
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            auto_finish: None,
            state: Arc::default(),
        })
    }

    pub fn auto(clip_length: Duration) -> Arc<Self> {
        Arc::new(Self {
            auto_finish: Some(clip_length),
            state: Arc::default(),
        })
    }

    /// Finish the current clip as if it drained. Returns false if nothing
    /// was playing.
    pub fn finish_current(&self) -> bool {
        let callback = self.state.lock().unwrap().pending.take();
        callback.map(|done| done()).is_some()
    }

    /// Sentence index of every clip handed to the sink.
    pub fn played_indices(&self) -> Vec<usize> {
        self.state
            .lock()
            .unwrap()
            .played
            .iter()
            .map(|c| c.sentence_index)
            .collect()
    }

    /// Audio bytes of every clip handed to the sink, as text.
    pub fn played_audio(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .played
            .iter()
            .map(|c| String::from_utf8_lossy(&c.audio).into_owned())
            .collect()
    }

    pub fn pauses(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn resumes(&self) -> usize {
        self.state.lock().unwrap().resumes
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

impl AudioSink for MockSink {
    fn play(
        &self,
        clip: PlaybackClip,
        on_finished: PlaybackDoneCallback,
    ) -> Result<(), NarrationError> {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;
            state.played.push(clip);
            state.pending = Some(on_finished);
            state.paused = false;
            state.generation
        };

        if let Some(length) = self.auto_finish {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                tokio::time::sleep(length).await;
                let callback = {
                    let mut state = state.lock().unwrap();
                    if state.generation == generation && !state.paused {
                        state.pending.take()
                    } else {
                        None
                    }
                };
                if let Some(done) = callback {
                    done();
                }
            });
        }
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        state.paused = true;
        state.pauses += 1;
    }

    fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        state.paused = false;
        state.resumes += 1;
    }

    fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
        state.pending = None;
        state.stops += 1;
    }
}

/// Sink whose `play` always fails.
pub struct BrokenSink;

impl AudioSink for BrokenSink {
    fn play(&self, _clip: PlaybackClip, _on_finished: PlaybackDoneCallback) -> Result<(), NarrationError> {
        Err(NarrationError::Playback("device unplugged".to_string()))
    }

    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
}

// ── Helpers ────────────────────────────────────────────────────────

/// Wait until the published status satisfies `predicate`.
pub async fn wait_for_status(
    rx: &mut watch::Receiver<PlaybackStatus>,
    predicate: impl FnMut(&PlaybackStatus) -> bool,
) -> PlaybackStatus {
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for status")
        .expect("narrator dropped")
        .clone()
}

/// Receive events until one satisfies `stop_at` (inclusive).
pub async fn events_until(
    rx: &mut mpsc::UnboundedReceiver<NarrationEvent>,
    mut stop_at: impl FnMut(&NarrationEvent) -> bool,
) -> Vec<NarrationEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        let done = stop_at(&event);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Drain all pending events from the event receiver and return them.
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<NarrationEvent>) -> Vec<NarrationEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

/// Indices of `UnitStarted` events, in order.
pub fn started_from(events: &[NarrationEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| {
            if let NarrationEvent::UnitStarted { index, .. } = e {
                Some(*index)
            } else {
                None
            }
        })
        .collect()
}
