//! CLI-specific error types and exit codes.

use quire_voice::{NarrationError, SettingsError, SynthesisError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument combination the parser cannot reject on its own.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Input file could not be read.
    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },

    /// Settings file missing, malformed or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Neither `--voice` nor a settings default names a voice.
    #[error("No voice selected: pass --voice or set defaultVoiceId in the settings file")]
    MissingVoice,

    /// The synthesis client could not be built.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The narration engine refused or aborted the session.
    #[error(transparent)]
    Narration(#[from] NarrationError),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) | Self::MissingVoice => 2, // EX_USAGE
            Self::Io { .. } => 66,                        // EX_NOINPUT
            Self::Settings(_) => 78,                      // EX_CONFIG
            Self::Synthesis(_) => 69,                     // EX_UNAVAILABLE
            Self::Narration(NarrationError::EmptyInput) => 65, // EX_DATAERR
            Self::Narration(_) => 1,
        }
    }
}

/// Exit code for an error surfaced by a handler.
///
/// Library errors propagated with `?` are classified as if they had been
/// wrapped in [`CliError`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<CliError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<NarrationError>() {
        CliError::Narration(e.clone()).exit_code()
    } else if let Some(e) = err.downcast_ref::<SettingsError>() {
        CliError::Settings(e.clone()).exit_code()
    } else if let Some(e) = err.downcast_ref::<SynthesisError>() {
        CliError::Synthesis(e.clone()).exit_code()
    } else {
        1
    }
}
