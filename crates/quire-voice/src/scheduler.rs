//! Double-buffer prefetch scheduler, the narration engine's core.
//!
//! A single tokio task (the actor) owns every piece of pipeline state: the
//! session text and units, the "current" and "next" audio slots, the live
//! synthesis ticket and the phase. The [`Narrator`] handle, the synthesis
//! tasks and the sink completion callbacks all talk to it through one
//! unbounded channel, so no state is shared and no lock is held.
//!
//! ```text
//!   start(i) ──► synth(i) [Initial] ──► play(i) ──► synth(i+1) [Prefetch]
//!                                          │
//!                           unit i drains  ▼
//!       next == i+1 ?  yes ──► promote, play(i+1), synth(i+2)
//!                      no  ──► cancel prefetch, synth(i+1) [Emergency]
//!       i+1 == len   ──► Stopped
//! ```
//!
//! Exactly one synthesis ticket is live at a time. Issuing a new one cancels
//! the previous one, and a result whose ticket id is no longer live is
//! dropped on arrival. Sink completions carry a separate playback ticket so a
//! clip that was stopped or replaced cannot advance the session.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioLedger, SynthesizedAudio};
use crate::audio_io::{AudioSink, PlaybackClip};
use crate::config::NarratorConfig;
use crate::error::{NarrationError, SynthesisError};
use crate::highlight::SeekMark;
use crate::segment::{SentenceUnit, segment};
use crate::speech_text::prepare_for_speech;
use crate::state::{NarrationEvent, PlaybackPhase, PlaybackStatus};
use crate::synth::{SpeechSynthesizer, SynthesisRequest, synthesize_bounded};

// ── Tickets ────────────────────────────────────────────────────────

/// Why a synthesis request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    /// First unit of a session.
    Initial,
    /// Background synthesis of the unit after the current one.
    Prefetch,
    /// Foreground synthesis at handoff because the prefetch was not ready.
    Emergency,
}

#[derive(Debug)]
struct Ticket {
    id: u64,
    cancel: CancellationToken,
    index: usize,
    kind: RequestKind,
}

/// Holder of the single live synthesis ticket.
#[derive(Debug, Default)]
struct TokenSlot {
    last_id: u64,
    live: Option<Ticket>,
}

impl TokenSlot {
    /// Cancel the live ticket (if any) and issue a new one.
    fn issue(&mut self, index: usize, kind: RequestKind) -> (u64, CancellationToken) {
        self.cancel();
        self.last_id += 1;
        let cancel = CancellationToken::new();
        self.live = Some(Ticket {
            id: self.last_id,
            cancel: cancel.clone(),
            index,
            kind,
        });
        (self.last_id, cancel)
    }

    /// Cancel and forget the live ticket.
    fn cancel(&mut self) -> Option<Ticket> {
        let ticket = self.live.take()?;
        ticket.cancel.cancel();
        Some(ticket)
    }

    /// Claim the live ticket for a settled request, if `id` is still live.
    fn accept(&mut self, id: u64) -> Option<Ticket> {
        if self.live.as_ref().is_some_and(|t| t.id == id) {
            self.live.take()
        } else {
            None
        }
    }

    fn in_flight(&self) -> Option<RequestKind> {
        self.live.as_ref().map(|t| t.kind)
    }
}

// ── Messages ───────────────────────────────────────────────────────

enum Command {
    Start {
        text: String,
        voice_id: String,
        start_index: Option<usize>,
        reply: oneshot::Sender<Result<Vec<SentenceUnit>, NarrationError>>,
    },
    Pause {
        reply: oneshot::Sender<()>,
    },
    Resume {
        reply: oneshot::Sender<()>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Seek {
        index: usize,
        reply: oneshot::Sender<Result<(), NarrationError>>,
    },
    SetSeekMark {
        mark: SeekMark,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

enum Message {
    Command(Command),

    /// A synthesis task finished (successfully or not).
    Settled {
        ticket: u64,
        index: usize,
        result: Result<Bytes, SynthesisError>,
    },

    /// The sink drained the clip started under `ticket`.
    PlaybackFinished { ticket: u64 },
}

// ── Handle ─────────────────────────────────────────────────────────

/// Handle to a running narration scheduler.
///
/// Dropping the handle shuts the scheduler down and stops the sink.
pub struct Narrator {
    tx: mpsc::UnboundedSender<Message>,
    status: watch::Receiver<PlaybackStatus>,
    ledger: AudioLedger,
    task: Option<JoinHandle<()>>,
}

impl Narrator {
    /// Spawn the scheduler actor on the current tokio runtime.
    ///
    /// Returns the handle and the receiver of [`NarrationEvent`]s.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        config: NarratorConfig,
    ) -> (Self, mpsc::UnboundedReceiver<NarrationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let ledger = AudioLedger::new();

        let scheduler = Scheduler::new(
            synthesizer,
            sink,
            config,
            ledger.clone(),
            tx.clone(),
            event_tx,
            status_tx,
        );
        let task = tokio::spawn(scheduler.run(rx));

        let narrator = Self {
            tx,
            status: status_rx,
            ledger,
            task: Some(task),
        };
        (narrator, event_rx)
    }

    /// Start reading `text` with `voice_id`.
    ///
    /// The start index is `start_index` when given, else the pending
    /// [`SeekMark`], else 0; a mark past the end of `text` is dropped and
    /// reading starts at 0. Any running session is torn down first, also
    /// when `text` is empty or `start_index` is out of range. Returns
    /// once the initial synthesis has been issued; its outcome is reported
    /// through the status and the event stream.
    pub async fn start(
        &self,
        text: impl Into<String>,
        voice_id: impl Into<String>,
        start_index: Option<usize>,
    ) -> Result<Vec<SentenceUnit>, NarrationError> {
        let text = text.into();
        let voice_id = voice_id.into();
        self.request(|reply| Command::Start {
            text,
            voice_id,
            start_index,
            reply,
        })
        .await?
    }

    /// Suspend the current unit. No-op unless playing.
    pub async fn pause(&self) -> Result<(), NarrationError> {
        self.request(|reply| Command::Pause { reply }).await
    }

    /// Continue the paused unit. No-op unless paused.
    pub async fn resume(&self) -> Result<(), NarrationError> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Cancel everything, release audio and return to `Idle`.
    pub async fn stop(&self) -> Result<(), NarrationError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Restart the loaded text at `index`, or remember it as the seek mark
    /// when no text is loaded.
    pub async fn seek(&self, index: usize) -> Result<(), NarrationError> {
        self.request(|reply| Command::Seek { index, reply }).await?
    }

    /// Remember where the next `start()` without an explicit index begins.
    pub async fn set_seek_mark(&self, mark: SeekMark) -> Result<(), NarrationError> {
        self.request(|reply| Command::SetSeekMark { mark, reply })
            .await
    }

    /// Latest status snapshot.
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.clone()
    }

    /// Ledger counting the synthesized buffers this narrator holds.
    #[must_use]
    pub fn ledger(&self) -> AudioLedger {
        self.ledger.clone()
    }

    /// Stop the scheduler and wait for it to exit.
    pub async fn shutdown(mut self) {
        let _ = self.tx.send(Message::Command(Command::Shutdown));
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Narrator task ended abnormally");
            }
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, NarrationError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Message::Command(command(reply)))
            .map_err(|_| NarrationError::Closed)?;
        rx.await.map_err(|_| NarrationError::Closed)
    }
}

impl Drop for Narrator {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.tx.send(Message::Command(Command::Shutdown));
        }
    }
}

// ── Actor ──────────────────────────────────────────────────────────

/// Text loaded by the last successful `start()`.
struct Session {
    text: Arc<str>,
    voice_id: Arc<str>,
    units: Vec<SentenceUnit>,
}

struct Scheduler {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    config: NarratorConfig,
    ledger: AudioLedger,

    /// Own inbox, cloned into synthesis tasks and sink callbacks.
    tx: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedSender<NarrationEvent>,
    status: watch::Sender<PlaybackStatus>,

    phase: PlaybackPhase,
    session: Option<Session>,
    current_index: Option<usize>,

    /// Audio of `current_index`, playing or paused.
    current: Option<SynthesizedAudio>,
    /// Prefetched audio of `current_index + 1`.
    next: Option<SynthesizedAudio>,

    slot: TokenSlot,
    playback_ticket: u64,

    /// `current` has been handed to the sink. False when the audio landed
    /// while paused, in which case `resume()` starts it.
    clip_started: bool,
    buffering: bool,
    seek_mark: Option<SeekMark>,
    last_error: Option<String>,
}

impl Scheduler {
    fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
        config: NarratorConfig,
        ledger: AudioLedger,
        tx: mpsc::UnboundedSender<Message>,
        events: mpsc::UnboundedSender<NarrationEvent>,
        status: watch::Sender<PlaybackStatus>,
    ) -> Self {
        Self {
            synthesizer,
            sink,
            config,
            ledger,
            tx,
            events,
            status,
            phase: PlaybackPhase::Idle,
            session: None,
            current_index: None,
            current: None,
            next: None,
            slot: TokenSlot::default(),
            playback_ticket: 0,
            clip_started: false,
            buffering: false,
            seek_mark: None,
            last_error: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Message>) {
        tracing::debug!("Narrator started");
        while let Some(message) = rx.recv().await {
            match message {
                Message::Command(Command::Shutdown) => break,
                Message::Command(command) => self.handle_command(command),
                Message::Settled {
                    ticket,
                    index,
                    result,
                } => self.on_settled(ticket, index, result),
                Message::PlaybackFinished { ticket } => self.on_playback_finished(ticket),
            }
        }
        self.release();
        tracing::debug!("Narrator shut down");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start {
                text,
                voice_id,
                start_index,
                reply,
            } => {
                let result = self.start_session(Arc::from(text), Arc::from(voice_id), start_index);
                let _ = reply.send(result);
            }
            Command::Pause { reply } => {
                self.pause();
                let _ = reply.send(());
            }
            Command::Resume { reply } => {
                self.resume();
                let _ = reply.send(());
            }
            Command::Stop { reply } => {
                self.stop();
                let _ = reply.send(());
            }
            Command::Seek { index, reply } => {
                let _ = reply.send(self.seek(index));
            }
            Command::SetSeekMark { mark, reply } => {
                tracing::debug!(index = mark.sentence_index, "Seek mark set");
                self.seek_mark = Some(mark);
                let _ = reply.send(());
            }
            Command::Shutdown => {}
        }
    }

    // ── Operations ─────────────────────────────────────────────────

    fn start_session(
        &mut self,
        text: Arc<str>,
        voice_id: Arc<str>,
        start_index: Option<usize>,
    ) -> Result<Vec<SentenceUnit>, NarrationError> {
        let units = segment(&text);
        // A pending mark is used up by any start that could have used it.
        let mark = if start_index.is_none() {
            self.seek_mark.take()
        } else {
            None
        };
        if units.is_empty() {
            self.abandon();
            return Err(NarrationError::EmptyInput);
        }

        let index = match (start_index, mark) {
            (Some(index), _) => index,
            (None, Some(mark)) if mark.sentence_index < units.len() => mark.sentence_index,
            (None, Some(mark)) => {
                tracing::debug!(
                    mark = mark.sentence_index,
                    units = units.len(),
                    "Seek mark past end of new text, starting at 0"
                );
                0
            }
            (None, None) => 0,
        };
        if index >= units.len() {
            self.abandon();
            return Err(NarrationError::SeekOutOfRange {
                index,
                count: units.len(),
            });
        }

        self.release();
        tracing::info!(
            units = units.len(),
            start = index,
            voice = %voice_id,
            "Narration session started"
        );

        self.session = Some(Session {
            text,
            voice_id,
            units: units.clone(),
        });
        self.current_index = Some(index);
        self.set_phase(PlaybackPhase::GeneratingInitial);
        self.issue_synthesis(index, RequestKind::Initial);
        Ok(units)
    }

    fn pause(&mut self) {
        if !self.phase.can_pause() {
            tracing::debug!(phase = ?self.phase, "Pause ignored");
            return;
        }
        if self.clip_started {
            self.sink.pause();
        }
        self.set_phase(PlaybackPhase::Paused);
    }

    fn resume(&mut self) {
        if !self.phase.can_resume() {
            tracing::debug!(phase = ?self.phase, "Resume ignored");
            return;
        }
        self.set_phase(PlaybackPhase::Playing);
        if self.current.is_some() {
            if self.clip_started {
                self.sink.resume();
            } else {
                self.play_current();
            }
        }
    }

    fn stop(&mut self) {
        self.abandon();
        self.seek_mark = None;
        tracing::info!("Narration stopped");
    }

    fn seek(&mut self, index: usize) -> Result<(), NarrationError> {
        let Some(session) = &self.session else {
            tracing::debug!(index, "No text loaded, seek recorded as mark");
            self.seek_mark = Some(SeekMark::new(index));
            return Ok(());
        };
        let count = session.units.len();
        if index >= count {
            return Err(NarrationError::SeekOutOfRange { index, count });
        }
        let text = Arc::clone(&session.text);
        let voice_id = Arc::clone(&session.voice_id);
        self.start_session(text, voice_id, Some(index)).map(drop)
    }

    // ── Completions ────────────────────────────────────────────────

    fn on_settled(&mut self, ticket: u64, index: usize, result: Result<Bytes, SynthesisError>) {
        let Some(live) = self.slot.accept(ticket) else {
            match &result {
                Err(e) if e.is_cancelled() => {
                    tracing::trace!(ticket, index, "Cancelled synthesis settled");
                }
                _ => tracing::debug!(ticket, index, "Discarding stale synthesis result"),
            }
            return;
        };

        match (live.kind, result) {
            (RequestKind::Prefetch, Ok(bytes)) => {
                tracing::debug!(index, bytes = bytes.len(), "Prefetch ready");
                self.next = Some(self.ledger.issue(index, bytes));
                self.emit(NarrationEvent::PrefetchReady { index });
                self.publish();
            }
            (RequestKind::Prefetch, Err(e)) => {
                tracing::warn!(index, error = %e, "Prefetch failed, next handoff synthesizes inline");
                self.emit(NarrationEvent::PrefetchFailed {
                    index,
                    reason: e.to_string(),
                });
                self.publish();
            }
            (RequestKind::Initial | RequestKind::Emergency, Ok(bytes)) => {
                tracing::debug!(index, kind = ?live.kind, bytes = bytes.len(), "Foreground synthesis ready");
                self.buffering = false;
                self.current = Some(self.ledger.issue(index, bytes));
                self.current_index = Some(index);
                self.begin_current();
            }
            (RequestKind::Initial | RequestKind::Emergency, Err(e)) => {
                self.fail(&NarrationError::Synthesis(e));
            }
        }
    }

    fn on_playback_finished(&mut self, ticket: u64) {
        if ticket != self.playback_ticket || !self.clip_started {
            tracing::debug!(ticket, live = self.playback_ticket, "Ignoring stale playback completion");
            return;
        }
        self.clip_started = false;

        let Some(finished) = self.current_index else {
            return;
        };
        self.current = None;
        self.emit(NarrationEvent::UnitFinished { index: finished });

        let unit_count = self.session.as_ref().map_or(0, |s| s.units.len());
        let upcoming = finished + 1;
        if upcoming >= unit_count {
            self.finish();
            return;
        }

        match self.next.take() {
            Some(audio) if audio.sentence_index() == upcoming => {
                tracing::debug!(index = upcoming, "Promoting prefetched unit");
                self.current = Some(audio);
                self.current_index = Some(upcoming);
                self.begin_current();
            }
            mismatched => {
                drop(mismatched);
                if let Some(lagging) = self.slot.cancel() {
                    tracing::debug!(index = lagging.index, "Cancelling lagging prefetch");
                }
                tracing::info!(index = upcoming, "Prefetch not ready, synthesizing inline");
                self.buffering = true;
                self.current_index = Some(upcoming);
                self.emit(NarrationEvent::EmergencySynthesis { index: upcoming });
                self.issue_synthesis(upcoming, RequestKind::Emergency);
            }
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Play the freshly landed `current` audio, or hold it if paused, then
    /// prefetch the unit after it.
    fn begin_current(&mut self) {
        if self.phase == PlaybackPhase::Paused {
            tracing::debug!(index = ?self.current_index, "Audio ready while paused, holding");
            self.publish();
        } else {
            self.set_phase(PlaybackPhase::Playing);
            if !self.play_current() {
                return;
            }
        }

        if let Some(index) = self.current_index {
            self.prefetch_after(index);
        }
    }

    /// Hand `current` to the sink. Returns false if the session failed.
    fn play_current(&mut self) -> bool {
        let Some(audio) = &self.current else {
            return true;
        };
        let index = audio.sentence_index();
        let clip = PlaybackClip {
            sentence_index: index,
            audio: audio.bytes().clone(),
        };

        self.playback_ticket += 1;
        let ticket = self.playback_ticket;
        let tx = self.tx.clone();
        let on_finished = Box::new(move || {
            let _ = tx.send(Message::PlaybackFinished { ticket });
        });

        if let Err(e) = self.sink.play(clip, on_finished) {
            self.fail(&e);
            return false;
        }
        self.clip_started = true;

        let range = self
            .session
            .as_ref()
            .and_then(|s| s.units.get(index))
            .map(SentenceUnit::range)
            .unwrap_or_default();
        tracing::debug!(index, ticket, "Unit playing");
        self.emit(NarrationEvent::UnitStarted { index, range });
        self.publish();
        true
    }

    fn prefetch_after(&mut self, index: usize) {
        if !self.config.prefetch {
            return;
        }
        let unit_count = self.session.as_ref().map_or(0, |s| s.units.len());
        if index + 1 < unit_count {
            self.issue_synthesis(index + 1, RequestKind::Prefetch);
        }
    }

    /// Issue the single live ticket for unit `index` and run its synthesis
    /// on a separate task.
    fn issue_synthesis(&mut self, index: usize, kind: RequestKind) {
        let Some(session) = &self.session else {
            return;
        };
        let Some(unit) = session.units.get(index) else {
            return;
        };

        let source = unit.slice(&session.text);
        let mut text = prepare_for_speech(source, self.config.strip_markup);
        if text.is_empty() {
            text = source.trim().to_string();
        }
        let request = SynthesisRequest::new(text, &*session.voice_id);

        let (ticket, cancel) = self.slot.issue(index, kind);
        tracing::debug!(index, ticket, kind = ?kind, "Synthesis issued");

        let synthesizer = Arc::clone(&self.synthesizer);
        let tx = self.tx.clone();
        let limit = self.config.synthesis_timeout;
        tokio::spawn(async move {
            let result = synthesize_bounded(synthesizer.as_ref(), &request, &cancel, limit).await;
            let _ = tx.send(Message::Settled {
                ticket,
                index,
                result,
            });
        });

        self.publish();
    }

    fn finish(&mut self) {
        tracing::info!("Narration finished");
        self.release();
        self.current_index = None;
        self.set_phase(PlaybackPhase::Stopped);
        self.emit(NarrationEvent::Finished);
    }

    fn fail(&mut self, error: &NarrationError) {
        let reason = error.to_string();
        tracing::error!(index = ?self.current_index, error = %reason, "Narration failed");
        self.release();
        self.last_error = Some(reason.clone());
        self.set_phase(PlaybackPhase::Error);
        self.emit(NarrationEvent::Error(reason));
    }

    /// Release everything and unload the text.
    fn abandon(&mut self) {
        self.release();
        self.session = None;
        self.current_index = None;
        self.set_phase(PlaybackPhase::Idle);
    }

    /// Cancel in-flight work, silence the sink and drop both audio slots.
    fn release(&mut self) {
        if let Some(ticket) = self.slot.cancel() {
            tracing::debug!(index = ticket.index, ticket = ticket.id, "Cancelled in-flight synthesis");
        }
        self.sink.stop();
        self.playback_ticket += 1;
        self.clip_started = false;
        self.current = None;
        self.next = None;
        self.buffering = false;
        self.last_error = None;
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        if phase != self.phase {
            tracing::debug!(old = ?self.phase, new = ?phase, "Narration phase transition");
            self.phase = phase;
            self.emit(NarrationEvent::PhaseChanged(phase));
        }
        self.publish();
    }

    fn publish(&self) {
        let status = PlaybackStatus {
            phase: self.phase,
            current_index: self.current_index,
            prefetch_in_flight: self.slot.in_flight() == Some(RequestKind::Prefetch),
            buffering: self.buffering,
            unit_count: self.session.as_ref().map_or(0, |s| s.units.len()),
            retained_units: self.ledger.live(),
            last_error: self.last_error.clone(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    fn emit(&self, event: NarrationEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("Narration event receiver dropped");
        }
    }
}
