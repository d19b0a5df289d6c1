//! Clip generation job.
//!
//! Renders one `[start, end)` window of a source video as a 9:16 clip with
//! burned-in captions and uploads it to the clips bucket.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use clipgen_media::{render_srt, window_cues, ClipRenderRequest};
use clipgen_models::{Clip, ClipStatus, GenerateClipPayload, Job, Stage, TranscriptSegment};
use clipgen_storage::UploadOptions;

use crate::config::CaptionConfig;
use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};

/// Content type of rendered clips.
pub const CLIP_CONTENT_TYPE: &str = "video/mp4";

/// Cache directive attached to uploaded clips.
pub const CLIP_CACHE_CONTROL: &str = "max-age=3600";

/// Result stored on the job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipOutcome {
    pub clip_id: String,
    pub storage_path: String,
}

/// Run a clip job. On any failure the clip is marked `error` before the
/// error is returned.
pub async fn run(
    ctx: &JobContext,
    job: &Job,
    payload: &GenerateClipPayload,
) -> WorkerResult<ClipOutcome> {
    match render(ctx, job, payload).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            if let Err(mark_err) = ctx.clips.mark_error(&payload.clip_id).await {
                warn!(
                    clip_id = %payload.clip_id,
                    "Failed to mark clip as errored: {}", mark_err
                );
            }
            Err(e)
        }
    }
}

async fn render(
    ctx: &JobContext,
    job: &Job,
    payload: &GenerateClipPayload,
) -> WorkerResult<ClipOutcome> {
    let video = ctx
        .videos
        .get(&payload.video_id)
        .await?
        .ok_or_else(|| WorkerError::video_not_found(&payload.video_id))?;
    let transcript = ctx.transcripts.find_by_video(&video.id).await?;

    ctx.clips
        .set_status(&payload.clip_id, ClipStatus::Processing)
        .await?;

    let scratch = ctx.scratch_dir().await?;

    ctx.queue.report_progress(job, Stage::DownloadingVideo, None).await;
    let source = scratch
        .path()
        .join(format!("source{}", video.source_extension()));
    ctx.video_store
        .download_file(&video.storage_path, &source)
        .await?;

    ctx.queue.report_progress(job, Stage::GeneratingClip, None).await;
    let subtitles = match &transcript {
        Some(t) => {
            write_subtitles(
                &t.content,
                payload,
                &ctx.config.captions,
                &scratch.path().join("captions.srt"),
            )
            .await?
        }
        None => None,
    };

    let output = scratch.path().join(format!("{}.mp4", payload.clip_id));
    ctx.media
        .render_vertical_clip(&ClipRenderRequest {
            input: source,
            output: output.clone(),
            start: payload.start,
            end: payload.end,
            subtitles,
        })
        .await?;

    ctx.queue.report_progress(job, Stage::Uploading, None).await;
    let storage_path = Clip::object_key(&video.user_id, &payload.clip_id);
    ctx.clip_store
        .upload_file(
            &output,
            &storage_path,
            &UploadOptions::new(CLIP_CONTENT_TYPE).with_cache_control(CLIP_CACHE_CONTROL),
        )
        .await?;

    ctx.clips.mark_ready(&payload.clip_id, &storage_path).await?;

    info!(
        clip_id = %payload.clip_id,
        video_id = %video.id,
        storage_path = %storage_path,
        "Clip generated"
    );

    Ok(ClipOutcome {
        clip_id: payload.clip_id.clone(),
        storage_path,
    })
}

/// Write the window's captions as SRT. Returns `None` when no cue survives.
async fn write_subtitles(
    segments: &[TranscriptSegment],
    payload: &GenerateClipPayload,
    captions: &CaptionConfig,
    path: &Path,
) -> WorkerResult<Option<PathBuf>> {
    let cues = window_cues(
        segments,
        payload.start,
        payload.end,
        captions.min_cue.as_secs_f64(),
    );
    if cues.is_empty() {
        debug!(clip_id = %payload.clip_id, "No captions in clip window");
        return Ok(None);
    }

    tokio::fs::write(path, render_srt(&cues, captions.cue_style())).await?;
    debug!(clip_id = %payload.clip_id, cues = cues.len(), "Wrote clip captions");
    Ok(Some(path.to_path_buf()))
}
