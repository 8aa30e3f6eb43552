//! REST client for the remote voice synthesis service.
//!
//! Sends `POST {base_url}/v1/text-to-speech/{voice_id}` with a JSON body and
//! returns the encoded audio from the response body. The request timeout is
//! enforced by `reqwest`; the scheduler applies its own bound on top.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{SpeechSynthesizer, SynthesisRequest};
use crate::error::SynthesisError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "xi-api-key";

/// Longest error body echoed back in [`SynthesisError::Service`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Configuration for [`HttpSynthesizer`].
///
/// # Example
///
/// ```
/// use quire_voice::synth::HttpSynthesizerConfig;
/// use std::time::Duration;
///
/// let config = HttpSynthesizerConfig::new()
///     .with_base_url("https://tts.internal.example")
///     .with_api_key("secret")
///     .with_timeout(Duration::from_secs(8));
/// ```
#[derive(Debug, Clone)]
pub struct HttpSynthesizerConfig {
    /// Service root; the text-to-speech path is appended to it.
    pub(crate) base_url: String,
    /// Optional API key sent as [`API_KEY_HEADER`].
    pub(crate) api_key: Option<String>,
    /// Optional synthesis model identifier forwarded in the body.
    pub(crate) model_id: Option<String>,
    /// Per-request timeout.
    pub(crate) timeout: Duration,
    /// User agent string for HTTP requests.
    pub(crate) user_agent: String,
}

impl Default for HttpSynthesizerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io".to_string(),
            api_key: None,
            model_id: None,
            timeout: Duration::from_secs(10),
            user_agent: concat!("quire-voice/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSynthesizerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service root URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set an optional API key (e.g. straight from the environment).
    #[must_use]
    pub fn with_optional_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set the per-request timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[derive(Serialize)]
struct SpeechBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
}

/// [`SpeechSynthesizer`] backed by the service's REST API.
pub struct HttpSynthesizer {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    model_id: Option<String>,
    timeout: Duration,
}

impl HttpSynthesizer {
    /// Build a client from `config`.
    ///
    /// A malformed base URL or an unusable TLS setup is reported as
    /// [`SynthesisError::Network`].
    pub fn new(config: HttpSynthesizerConfig) -> Result<Self, SynthesisError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SynthesisError::Network(format!("invalid base URL '{}': {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(SynthesisError::Network(format!(
                "base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| SynthesisError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            model_id: config.model_id,
            timeout: config.timeout,
        })
    }

    /// Endpoint for `voice_id`, with the id percent-encoded as one segment.
    pub fn endpoint(&self, voice_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "text-to-speech", voice_id]);
        }
        url
    }

    async fn send(&self, request: &SynthesisRequest) -> Result<Bytes, SynthesisError> {
        let body = SpeechBody {
            text: &request.text,
            model_id: self.model_id.as_deref(),
        };

        let mut builder = self
            .client
            .post(self.endpoint(&request.voice_id))
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body);
        if let Some(ref key) = self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(service_error(status, &text));
        }

        let audio = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        if audio.is_empty() {
            return Err(SynthesisError::InvalidResponse(
                "service returned an empty audio body".to_string(),
            ));
        }

        tracing::debug!(
            voice = %request.voice_id,
            text_len = request.text.len(),
            bytes = audio.len(),
            "Synthesized sentence"
        );
        Ok(audio)
    }

    fn transport_error(&self, error: &reqwest::Error) -> SynthesisError {
        if error.is_timeout() {
            SynthesisError::Timeout(self.timeout)
        } else {
            SynthesisError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSynthesizer {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: &CancellationToken,
    ) -> Result<Bytes, SynthesisError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SynthesisError::Cancelled),
            outcome = self.send(request) => outcome,
        }
    }
}

/// Map a non-success response to [`SynthesisError::Service`].
fn service_error(status: StatusCode, body: &str) -> SynthesisError {
    let body = body.trim();
    let message = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    };
    SynthesisError::Service {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HttpSynthesizerConfig::new();
        assert_eq!(config.base_url, "https://api.elevenlabs.io");
        assert!(config.api_key.is_none());
        assert!(config.user_agent.starts_with("quire-voice/"));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_pattern() {
        let config = HttpSynthesizerConfig::new()
            .with_base_url("http://localhost:9000")
            .with_api_key("secret")
            .with_model_id("multilingual_v2")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent");

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model_id.as_deref(), Some("multilingual_v2"));
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn blank_optional_key_is_ignored() {
        let config = HttpSynthesizerConfig::new().with_optional_api_key(Some("  ".into()));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn endpoint_appends_voice_segment() {
        let synth = HttpSynthesizer::new(
            HttpSynthesizerConfig::new().with_base_url("http://localhost:9000/"),
        )
        .unwrap();
        assert_eq!(
            synth.endpoint("21m00Tcm4").as_str(),
            "http://localhost:9000/v1/text-to-speech/21m00Tcm4"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_encodes_voice() {
        let synth = HttpSynthesizer::new(
            HttpSynthesizerConfig::new().with_base_url("http://localhost:9000/proxy"),
        )
        .unwrap();
        assert_eq!(
            synth.endpoint("a voice/1").as_str(),
            "http://localhost:9000/proxy/v1/text-to-speech/a%20voice%2F1"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpSynthesizer::new(HttpSynthesizerConfig::new().with_base_url("not a url"))
            .err()
            .unwrap();
        assert!(matches!(err, SynthesisError::Network(_)));
    }

    #[test]
    fn service_error_prefers_body_then_reason() {
        assert_eq!(
            service_error(StatusCode::UNAUTHORIZED, "{\"detail\":\"bad key\"}"),
            SynthesisError::Service {
                status: 401,
                message: "{\"detail\":\"bad key\"}".to_string()
            }
        );
        assert_eq!(
            service_error(StatusCode::TOO_MANY_REQUESTS, "  "),
            SynthesisError::Service {
                status: 429,
                message: "Too Many Requests".to_string()
            }
        );
    }

    #[test]
    fn service_error_truncates_long_bodies() {
        let body = "x".repeat(1000);
        let SynthesisError::Service { message, .. } =
            service_error(StatusCode::INTERNAL_SERVER_ERROR, &body)
        else {
            panic!("expected service error");
        };
        assert_eq!(message.len(), MAX_ERROR_BODY_CHARS);
    }
}
