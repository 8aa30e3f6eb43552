//! Speaker playback via `rodio`.
//!
//! Decodes one sentence clip at a time into a fresh sink. Lives on the audio
//! thread (see [`crate::audio_thread`]) because `rodio::OutputStream` is
//! `!Send` on some platforms.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::audio_io::{PlaybackClip, PlaybackDoneCallback};
use crate::error::NarrationError;

/// Audio playback for narration clips.
pub struct AudioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// Sink of the clip currently loaded (playing or paused).
    sink: Option<Arc<Sink>>,

    /// Cleared when the current clip is stopped or replaced, so its watcher
    /// does not report a natural completion.
    active: Arc<AtomicBool>,
}

impl AudioPlayback {
    /// Open the default output device.
    pub fn new() -> Result<Self, NarrationError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| NarrationError::Playback(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sink: None,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Decode and start `clip`, replacing the current one.
    ///
    /// A watcher thread waits for the sink to drain and then invokes
    /// `on_finished`, unless the clip was stopped or replaced first.
    pub fn play(
        &mut self,
        clip: PlaybackClip,
        on_finished: PlaybackDoneCallback,
    ) -> Result<(), NarrationError> {
        self.stop();

        let source = Decoder::new(Cursor::new(clip.audio)).map_err(|e| {
            NarrationError::Playback(format!(
                "cannot decode audio for sentence {}: {e}",
                clip.sentence_index
            ))
        })?;
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| NarrationError::Playback(e.to_string()))?;
        sink.append(source);

        let sink = Arc::new(sink);
        let active = Arc::new(AtomicBool::new(true));
        self.sink = Some(Arc::clone(&sink));
        self.active = Arc::clone(&active);

        let index = clip.sentence_index;
        // `sleep_until_end()` also returns when `stop()` drops the queued
        // sources; `active` tells the two cases apart.
        let watcher = std::thread::Builder::new()
            .name("quire-playback-watch".into())
            .spawn(move || {
                sink.sleep_until_end();
                if active.swap(false, Ordering::SeqCst) {
                    tracing::debug!(index, "Clip finished naturally");
                    on_finished();
                }
            });
        if let Err(e) = watcher {
            self.stop();
            return Err(NarrationError::Playback(format!(
                "failed to spawn playback watcher: {e}"
            )));
        }

        tracing::debug!(index, "Clip playback started");
        Ok(())
    }

    pub fn pause(&self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    /// Stop and drop the current clip without firing its callback.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }
}
