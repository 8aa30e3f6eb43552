//! Read command handler.
//!
//! Wires the HTTP synthesizer and the local speaker sink into a
//! [`Narrator`], prints each sentence as it starts and waits for the session
//! to finish, fail, or be interrupted with Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use quire_voice::{
    HttpSynthesizer, HttpSynthesizerConfig, LocalAudioSink, NarrationError, NarrationEvent,
    NarrationSettings, Narrator, SeekMark, SentenceUnit, collapse_whitespace, render_highlighted,
    segment,
};

use super::read_text;
use crate::commands::ReadArgs;
use crate::error::CliError;
use crate::presentation::{BOLD, DIM, RESET, REVERSE, YELLOW};

/// Where narration begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartAt {
    /// `--from-sentence`
    Index(usize),
    /// `--from-offset`, resolved to the sentence under that byte.
    Mark(SeekMark),
    Beginning,
}

/// Execute the read command.
pub async fn execute(args: &ReadArgs) -> Result<()> {
    let text = read_text(&args.file)?;
    let settings = match &args.config {
        Some(path) => NarrationSettings::load(path)?,
        None => NarrationSettings::default(),
    };
    let voice = resolve_voice(args.voice.as_deref(), &settings)?;

    let units = segment(&text);
    let start_at = resolve_start(args, &units)?;

    let synthesizer = HttpSynthesizer::new(http_config(args, &settings))?;
    let sink = LocalAudioSink::spawn()?;
    let mut config = settings.narrator_config();
    if args.no_prefetch {
        config = config.with_prefetch(false);
    }

    let (narrator, mut events) = Narrator::spawn(Arc::new(synthesizer), Arc::new(sink), config);
    let units = match start_at {
        StartAt::Index(index) => narrator.start(text.as_str(), voice, Some(index)).await?,
        StartAt::Mark(mark) => {
            narrator.set_seek_mark(mark).await?;
            narrator.start(text.as_str(), voice, None).await?
        }
        StartAt::Beginning => narrator.start(text.as_str(), voice, None).await?,
    };
    tracing::info!(file = %args.file.display(), units = units.len(), "Reading");

    let progress = Progress {
        text: &text,
        units: &units,
        highlight: args.highlight,
    };

    let outcome: Result<()> = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                narrator.stop().await?;
                println!("\n{DIM}Stopped.{RESET}");
                break Ok(());
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break Err(CliError::Narration(NarrationError::Closed).into());
                };
                if let Some(line) = progress.line_for(&event) {
                    println!("{line}");
                }
                match event {
                    NarrationEvent::Finished => break Ok(()),
                    NarrationEvent::Error(reason) => {
                        break Err(anyhow::anyhow!("Narration failed: {reason}"));
                    }
                    _ => {}
                }
            }
        }
    };

    narrator.shutdown().await;
    outcome
}

fn resolve_voice(voice: Option<&str>, settings: &NarrationSettings) -> Result<String, CliError> {
    voice
        .map(str::to_string)
        .or_else(|| settings.default_voice_id.clone())
        .filter(|v| !v.trim().is_empty())
        .ok_or(CliError::MissingVoice)
}

fn resolve_start(args: &ReadArgs, units: &[SentenceUnit]) -> Result<StartAt, CliError> {
    match (args.from_sentence, args.from_offset) {
        (Some(index), _) => Ok(StartAt::Index(index)),
        (None, Some(offset)) => SeekMark::from_offset(units, offset)
            .map(StartAt::Mark)
            .ok_or_else(|| {
                CliError::Arguments(format!("offset {offset} is past the end of the text"))
            }),
        (None, None) => Ok(StartAt::Beginning),
    }
}

fn http_config(args: &ReadArgs, settings: &NarrationSettings) -> HttpSynthesizerConfig {
    let mut config = settings
        .http_config()
        .with_optional_api_key(args.api_key.clone());
    if let Some(ref url) = args.base_url {
        config = config.with_base_url(url.clone());
    }
    config
}

/// Turns narration events into terminal lines.
struct Progress<'a> {
    text: &'a str,
    units: &'a [SentenceUnit],
    highlight: bool,
}

impl Progress<'_> {
    fn line_for(&self, event: &NarrationEvent) -> Option<String> {
        match event {
            NarrationEvent::UnitStarted { index, .. } => {
                let header = format!("{BOLD}[{}/{}]{RESET}", index + 1, self.units.len());
                if self.highlight {
                    let body = render_highlighted(self.text, self.units, Some(*index), REVERSE, RESET);
                    Some(format!("{header}\n{body}\n"))
                } else {
                    let sentence = self.units.get(*index).map(|u| u.slice(self.text))?;
                    Some(format!("{header} {}", collapse_whitespace(sentence)))
                }
            }
            NarrationEvent::EmergencySynthesis { index } => {
                Some(format!("{DIM}(buffering sentence {}...){RESET}", index + 1))
            }
            NarrationEvent::PrefetchFailed { index, reason } => Some(format!(
                "{YELLOW}warning:{RESET} prefetch of sentence {} failed: {reason}",
                index + 1
            )),
            NarrationEvent::Finished => Some(format!("{DIM}Finished.{RESET}")),
            _ => None,
        }
    }
}
