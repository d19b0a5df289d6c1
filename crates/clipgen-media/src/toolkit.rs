//! The media seam used by the job handlers.

use std::path::Path;

use async_trait::async_trait;

use clipgen_models::EncodingConfig;

use crate::audio::extract_speech_audio;
use crate::clip::{render_vertical_clip, ClipRenderRequest};
use crate::command::FfmpegRunner;
use crate::error::MediaResult;
use crate::filters::SubtitleStyle;
use crate::probe::probe_duration;

/// Media operations needed by the transcription and clip jobs.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Container duration in seconds.
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64>;

    /// Extract a mono, low-bitrate speech track.
    async fn extract_speech_audio(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Render a 9:16 clip of the request window, burning captions if given.
    async fn render_vertical_clip(&self, request: &ClipRenderRequest) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegToolkit {
    runner: FfmpegRunner,
    encoding: EncodingConfig,
    subtitle_style: SubtitleStyle,
}

impl FfmpegToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from environment variables (`FFMPEG_TIMEOUT_SECS`).
    pub fn from_env() -> Self {
        let mut toolkit = Self::new();
        if let Some(secs) = std::env::var("FFMPEG_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            toolkit.runner = toolkit.runner.with_timeout(secs);
        }
        toolkit
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64> {
        probe_duration(input).await
    }

    async fn extract_speech_audio(&self, input: &Path, output: &Path) -> MediaResult<()> {
        extract_speech_audio(&self.runner, input, output).await
    }

    async fn render_vertical_clip(&self, request: &ClipRenderRequest) -> MediaResult<()> {
        render_vertical_clip(&self.runner, request, &self.encoding, &self.subtitle_style).await
    }
}
