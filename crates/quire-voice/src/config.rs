//! Narration configuration and persisted settings.
//!
//! [`NarratorConfig`] is what the scheduler runs with. [`NarrationSettings`]
//! is the user-facing, serde-backed form stored by the host (all fields
//! optional, validated by [`validate_settings`]) and converted into the
//! runtime configs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::synth::HttpSynthesizerConfig;

/// Default upper bound for one synthesis call.
pub const DEFAULT_SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounds accepted for `synthesis_timeout_ms`.
const MIN_TIMEOUT_MS: u64 = 500;
const MAX_TIMEOUT_MS: u64 = 120_000;

/// Runtime configuration of the [`Narrator`](crate::scheduler::Narrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarratorConfig {
    /// Hard bound on every synthesis call, foreground and background.
    pub synthesis_timeout: Duration,

    /// Synthesize the next unit in the background while the current one
    /// plays. Disabling it makes every handoff take the inline path.
    pub prefetch: bool,

    /// Strip light markup from unit text before sending it for synthesis.
    pub strip_markup: bool,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            synthesis_timeout: DEFAULT_SYNTHESIS_TIMEOUT,
            prefetch: true,
            strip_markup: true,
        }
    }
}

impl NarratorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    #[must_use]
    pub const fn with_strip_markup(mut self, strip_markup: bool) -> Self {
        self.strip_markup = strip_markup;
        self
    }
}

/// Persisted narration settings.
///
/// All fields are optional so a settings file may name only what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct NarrationSettings {
    /// Voice used when the host does not pick one.
    pub default_voice_id: Option<String>,

    /// Root URL of the synthesis service.
    pub service_base_url: Option<String>,

    /// Synthesis model identifier forwarded to the service.
    pub model_id: Option<String>,

    /// Upper bound for one synthesis call, in milliseconds.
    pub synthesis_timeout_ms: Option<u64>,

    /// Background prefetch of the next sentence.
    pub prefetch: Option<bool>,

    /// Strip light markup before synthesis.
    pub strip_markup: Option<bool>,
}

impl NarrationSettings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let settings: Self = serde_json::from_str(&raw).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Effective synthesis timeout (with default fallback).
    #[must_use]
    pub fn effective_synthesis_timeout(&self) -> Duration {
        self.synthesis_timeout_ms
            .map_or(DEFAULT_SYNTHESIS_TIMEOUT, Duration::from_millis)
    }

    /// Scheduler configuration derived from these settings.
    #[must_use]
    pub fn narrator_config(&self) -> NarratorConfig {
        let defaults = NarratorConfig::default();
        NarratorConfig {
            synthesis_timeout: self.effective_synthesis_timeout(),
            prefetch: self.prefetch.unwrap_or(defaults.prefetch),
            strip_markup: self.strip_markup.unwrap_or(defaults.strip_markup),
        }
    }

    /// HTTP client configuration derived from these settings.
    ///
    /// The client timeout matches the scheduler bound so the two agree on
    /// when a request has failed.
    #[must_use]
    pub fn http_config(&self) -> HttpSynthesizerConfig {
        let mut config =
            HttpSynthesizerConfig::new().with_timeout(self.effective_synthesis_timeout());
        if let Some(ref url) = self.service_base_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(ref model) = self.model_id {
            config = config.with_model_id(model.clone());
        }
        config
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Synthesis timeout must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms, got {0}")]
    InvalidTimeout(u64),

    #[error("Service base URL is not a valid URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Default voice id cannot be empty")]
    EmptyVoiceId,

    #[error("Cannot read settings file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Cannot parse settings file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Validate user-supplied settings.
pub fn validate_settings(settings: &NarrationSettings) -> Result<(), SettingsError> {
    if let Some(ms) = settings.synthesis_timeout_ms {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) {
            return Err(SettingsError::InvalidTimeout(ms));
        }
    }

    if let Some(ref url) = settings.service_base_url {
        url::Url::parse(url).map_err(|_| SettingsError::InvalidBaseUrl(url.clone()))?;
    }

    if let Some(ref voice) = settings.default_voice_id {
        if voice.trim().is_empty() {
            return Err(SettingsError::EmptyVoiceId);
        }
    }

    Ok(())
}
