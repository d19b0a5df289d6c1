//! Transcription job.
//!
//! Downloads the source video, records its duration, extracts a speech track,
//! sends it to the speech-to-text service and stores the caption-ready
//! segments as the video's transcript.

use serde::Serialize;
use tracing::info;

use clipgen_media::segment_transcription;
use clipgen_models::{Job, NewTranscript, Stage, TranscribePayload, VideoStatus};

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};

/// Result stored on the job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscribeOutcome {
    pub transcript_id: String,
    pub segment_count: usize,
    pub duration_seconds: i64,
}

/// Run a transcription job. The scratch directory is removed on every path.
pub async fn run(
    ctx: &JobContext,
    job: &Job,
    payload: &TranscribePayload,
) -> WorkerResult<TranscribeOutcome> {
    let video = ctx
        .videos
        .get(&payload.video_id)
        .await?
        .ok_or_else(|| WorkerError::video_not_found(&payload.video_id))?;

    ctx.videos.set_status(&video.id, VideoStatus::Transcribing).await?;

    let scratch = ctx.scratch_dir().await?;

    ctx.queue.report_progress(job, Stage::DownloadingVideo, None).await;
    let source = scratch
        .path()
        .join(format!("source{}", video.source_extension()));
    let bytes = ctx
        .video_store
        .download_file(&video.storage_path, &source)
        .await?;
    info!(video_id = %video.id, bytes, "Downloaded source video");

    let duration = ctx.media.probe_duration(&source).await?;
    let duration_seconds = duration.round() as i64;
    // Kept even when the limit check below rejects the video
    ctx.videos.set_duration(&video.id, duration_seconds).await?;

    let max = ctx.config.max_video_duration.as_secs();
    if duration > max as f64 {
        return Err(WorkerError::DurationExceeded { duration, max });
    }

    ctx.queue.report_progress(job, Stage::ExtractingAudio, None).await;
    let audio = scratch.path().join("audio.mp3");
    ctx.media.extract_speech_audio(&source, &audio).await?;

    ctx.queue.report_progress(job, Stage::Transcribing, None).await;
    let response = ctx.stt.transcribe(&audio).await?;
    let segments = segment_transcription(&response, ctx.config.captions.words_per_group);
    let segment_count = segments.len();

    let transcript_id = ctx
        .transcripts
        .create(&NewTranscript {
            video_id: video.id.clone(),
            content: segments,
        })
        .await?;

    ctx.videos.set_status(&video.id, VideoStatus::Ready).await?;

    info!(
        video_id = %video.id,
        transcript_id = %transcript_id,
        segment_count,
        duration_seconds,
        "Transcription finished"
    );

    Ok(TranscribeOutcome {
        transcript_id,
        segment_count,
        duration_seconds,
    })
}
