//! Whisper-compatible transcription client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info, warn};

use clipgen_models::TranscriptionResponse;

use crate::error::{SttError, SttResult};

/// Provider upload limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// First retry delay; doubled per attempt.
const RETRY_BASE_DELAY_MS: u64 = 500;
/// Longest wait between retries.
const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Configuration for the transcription client.
#[derive(Debug, Clone)]
pub struct SttConfig {
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    pub language: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// Largest audio file the provider accepts
    pub max_upload_bytes: u64,
}

impl SttConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "whisper-large-v3".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 2,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> SttResult<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SttError::config("GROQ_API_KEY must be set"))?;

        let defaults = Self::new(api_key);

        Ok(Self {
            base_url: std::env::var("STT_BASE_URL").unwrap_or(defaults.base_url.clone()),
            model: std::env::var("STT_MODEL").unwrap_or(defaults.model.clone()),
            language: std::env::var("STT_LANGUAGE").unwrap_or(defaults.language.clone()),
            timeout: Duration::from_secs(
                std::env::var("STT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("STT_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            ..defaults
        })
    }
}

/// Speech-to-text provider.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file with word and segment timestamps.
    async fn transcribe(&self, audio_path: &Path) -> SttResult<TranscriptionResponse>;
}

/// Client for Whisper-compatible `audio/transcriptions` endpoints.
pub struct WhisperClient {
    http: Client,
    config: SttConfig,
}

impl WhisperClient {
    pub fn new(config: SttConfig) -> SttResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(SttError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> SttResult<Self> {
        Self::new(SttConfig::from_env()?)
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_form(&self, audio: Vec<u8>, file_name: &str) -> SttResult<Form> {
        let part = Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/mpeg")?;

        Ok(Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment")
            .text("language", self.config.language.clone()))
    }

    async fn send_once(&self, audio: &[u8], file_name: &str) -> SttResult<TranscriptionResponse> {
        // Multipart bodies are consumed on send, so each attempt rebuilds the form
        let form = self.build_form(audio.to_vec(), file_name)?;

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SttError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> SttResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = SttResult<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Transcription request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Exponential backoff, capped.
fn retry_delay(attempt: u32) -> Duration {
    let ms = RETRY_BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(ms.min(RETRY_MAX_DELAY_MS))
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> SttResult<TranscriptionResponse> {
        let size = tokio::fs::metadata(audio_path).await?.len();
        debug!(
            path = %audio_path.display(),
            size_mb = format!("{:.2}", size as f64 / (1024.0 * 1024.0)),
            "Checking audio size"
        );

        if size > self.config.max_upload_bytes {
            return Err(SttError::FileTooLarge {
                size,
                max: self.config.max_upload_bytes,
            });
        }

        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let audio = &audio;
        let file_name = &file_name;
        let response = self
            .with_retry(move || async move { self.send_once(audio, file_name).await })
            .await?;

        info!(
            model = %self.config.model,
            words = response.words.as_ref().map(Vec::len).unwrap_or(0),
            segments = response.segments.as_ref().map(Vec::len).unwrap_or(0),
            "Transcription received"
        );
        Ok(response)
    }
}
