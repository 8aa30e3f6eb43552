//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Narrate a text file through the synthesis service and the speakers
    Read(ReadArgs),

    /// Print the sentence units of a text file
    Segment(SegmentArgs),
}

/// Arguments of `quire read`.
#[derive(Args, Debug)]
#[command(
    after_help = "EXAMPLES:\n    quire read chapter.md --voice 21m00Tcm4TlvDq8ikWAM\n    quire read chapter.md --voice narrator --from-sentence 12\n    quire read notes.txt --config settings.json --highlight"
)]
pub struct ReadArgs {
    /// Text file to read
    pub file: PathBuf,

    /// Voice id (defaults to `defaultVoiceId` from the settings file)
    #[arg(long)]
    pub voice: Option<String>,

    /// Start at this sentence index (0-based)
    #[arg(long, conflicts_with = "from_offset")]
    pub from_sentence: Option<usize>,

    /// Start at the sentence containing this byte offset
    #[arg(long)]
    pub from_offset: Option<usize>,

    /// JSON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// API key for the synthesis service
    #[arg(long, env = "QUIRE_TTS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the synthesis service
    #[arg(long, env = "QUIRE_TTS_BASE_URL")]
    pub base_url: Option<String>,

    /// Synthesize each sentence only when it is needed
    #[arg(long)]
    pub no_prefetch: bool,

    /// Reprint the whole text with the active sentence highlighted
    #[arg(long)]
    pub highlight: bool,
}

/// Arguments of `quire segment`.
#[derive(Args, Debug)]
pub struct SegmentArgs {
    /// Text file to segment
    pub file: PathBuf,

    /// Print the units as JSON
    #[arg(long)]
    pub json: bool,
}
