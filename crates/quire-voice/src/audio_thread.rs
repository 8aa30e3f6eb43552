//! Dedicated audio output thread keeping `!Send` rodio state off the runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, [`AudioPlayback`] is confined to a single OS
//! thread and driven through [`AudioCommand`]s. [`LocalAudioSink`] is the
//! `Send + Sync` proxy the scheduler holds as an [`AudioSink`].

use std::sync::mpsc;
use std::thread;

use crate::audio_io::{AudioSink, PlaybackClip, PlaybackDoneCallback};
use crate::error::NarrationError;
use crate::playback::AudioPlayback;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent from the sink proxy to the audio thread.
enum AudioCommand {
    /// Decode and play a clip, replacing the current one.
    Play {
        clip: PlaybackClip,
        on_finished: PlaybackDoneCallback,
        reply: mpsc::Sender<Result<(), NarrationError>>,
    },

    Pause,

    Resume,

    /// Stop and discard the current clip (fire-and-forget).
    Stop,

    /// Shut down the audio thread, releasing the output device.
    Shutdown,
}

// ── Sink proxy (Send + Sync) ───────────────────────────────────────

/// Speaker output running on the `quire-audio` thread.
///
/// `play` blocks until the audio thread has decoded the clip and started
/// it (microseconds of channel I/O plus decoder setup); `pause`, `resume`
/// and `stop` are fire-and-forget.
pub struct LocalAudioSink {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl LocalAudioSink {
    /// Spawn the audio thread on the default output device.
    ///
    /// Device errors are propagated back through a one-shot init channel.
    pub fn spawn() -> Result<Self, NarrationError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), NarrationError>>();

        let thread = thread::Builder::new()
            .name("quire-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))
            .map_err(|e| NarrationError::Playback(format!("failed to spawn audio thread: {e}")))?;

        init_rx.recv().map_err(|_| audio_thread_died())??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// The body of the audio thread. Owns [`AudioPlayback`] for its whole
    /// lifetime.
    fn run(cmd_rx: &mpsc::Receiver<AudioCommand>, init_tx: &mpsc::Sender<Result<(), NarrationError>>) {
        let mut playback = match AudioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };
        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Play {
                    clip,
                    on_finished,
                    reply,
                } => {
                    let _ = reply.send(playback.play(clip, on_finished));
                }
                AudioCommand::Pause => playback.pause(),
                AudioCommand::Resume => playback.resume(),
                AudioCommand::Stop => playback.stop(),
                AudioCommand::Shutdown => break,
            }
        }

        playback.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl AudioSink for LocalAudioSink {
    fn play(
        &self,
        clip: PlaybackClip,
        on_finished: PlaybackDoneCallback,
    ) -> Result<(), NarrationError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Play {
                clip,
                on_finished,
                reply,
            })
            .map_err(|_| audio_thread_died())?;
        rx.recv().map_err(|_| audio_thread_died())?
    }

    fn pause(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Pause);
    }

    fn resume(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Resume);
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }
}

impl Drop for LocalAudioSink {
    fn drop(&mut self) {
        // The thread may already be dead.
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn audio_thread_died() -> NarrationError {
    NarrationError::Playback("audio thread is not running".to_string())
}
