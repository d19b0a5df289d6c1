//! Vertical clip rendering.
//!
//! The input is seeked before decoding (`-ss` ahead of `-i`) and read for the
//! window length, so the rendered clip's timeline starts at zero. Captions
//! written with timestamps relative to the window start therefore line up
//! with the burned-in video.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use clipgen_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{build_clip_filter, SubtitleStyle};

/// Everything needed to render one clip window.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRenderRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Window start in source seconds
    pub start: f64,
    /// Window end in source seconds (exclusive)
    pub end: f64,
    /// SRT file with window-relative timestamps
    pub subtitles: Option<PathBuf>,
}

impl ClipRenderRequest {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Build the FFmpeg command for a clip render.
pub fn build_clip_command(
    request: &ClipRenderRequest,
    encoding: &EncodingConfig,
    style: &SubtitleStyle,
) -> MediaResult<FfmpegCommand> {
    if !(request.start >= 0.0 && request.end > request.start) {
        return Err(MediaError::invalid_video(format!(
            "invalid clip window [{}, {})",
            request.start, request.end
        )));
    }

    let filter = build_clip_filter(request.subtitles.as_deref(), style);

    Ok(FfmpegCommand::new(&request.input, &request.output)
        .seek(request.start)
        .duration(request.duration())
        .video_filter(filter)
        .output_args(encoding.to_ffmpeg_args()))
}

/// Render a captioned vertical clip.
pub async fn render_vertical_clip(
    runner: &FfmpegRunner,
    request: &ClipRenderRequest,
    encoding: &EncodingConfig,
    style: &SubtitleStyle,
) -> MediaResult<()> {
    if let Some(srt) = &request.subtitles {
        if !srt.exists() {
            return Err(MediaError::FileNotFound(srt.clone()));
        }
    }

    let cmd = build_clip_command(request, encoding, style)?;
    let total_ms = (request.duration() * 1000.0) as i64;

    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percent(total_ms),
                speed = progress.speed,
                "Clip render progress"
            );
        })
        .await?;

    ensure_output(&request.output)?;
    info!(
        output = %request.output.display(),
        start = request.start,
        end = request.end,
        captions = request.subtitles.is_some(),
        "Rendered vertical clip"
    );
    Ok(())
}

fn ensure_output(path: &Path) -> MediaResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(MediaError::ffmpeg_failed(
            format!("FFmpeg produced no output at {}", path.display()),
            None,
            None,
        )),
    }
}
