//! End-to-end runs of the executor against in-memory services.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use clipgen_db::Datastore;

use clipgen_models::{
    ClipStatus, GenerateClipPayload, JobStatus, JobTask, Stage, TranscribePayload,
    TranscriptSegment, TranscriptionResponse, VideoStatus,
};

use common::{words, Harness};

fn transcribe(video_id: &str) -> JobTask {
    JobTask::Transcribe(TranscribePayload {
        video_id: video_id.to_string(),
    })
}

fn generate_clip(start: f64, end: f64) -> JobTask {
    JobTask::GenerateClip(GenerateClipPayload {
        video_id: "v1".into(),
        clip_id: "c1".into(),
        start,
        end,
    })
}

// =============================================================================
// Transcription
// =============================================================================

#[tokio::test]
async fn test_transcription_stores_grouped_segments() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    *h.stt.response.lock().unwrap() = TranscriptionResponse {
        words: Some(words(&[
            ("a", 0.0, 1.0),
            ("b", 1.0, 2.0),
            ("c", 2.0, 3.0),
            ("d", 3.0, 4.0),
        ])),
        text: Some("a b c d".into()),
        ..Default::default()
    };
    let job = h.enqueue(transcribe("v1"), 3).await;

    assert!(h.executor.tick().await.unwrap());

    let job = h.job(&job.id).await;
    assert_eq!(job.status, JobStatus::Completed);
    let result = job.result.unwrap();
    assert_eq!(result["segment_count"], 2);
    assert_eq!(result["duration_seconds"], 120);
    assert_eq!(job.processing_progress.unwrap().stage, Stage::Done);

    let video = h.video("v1");
    assert_eq!(video.status, VideoStatus::Ready);
    assert_eq!(video.duration_seconds, Some(120));

    let transcripts = h.transcripts();
    assert_eq!(transcripts.len(), 1);
    assert_eq!(transcripts[0]["id"], result["transcript_id"]);
    assert_eq!(
        transcripts[0]["content"],
        json!([
            { "start": 0.0, "end": 3.0, "text": "a b c" },
            { "start": 3.0, "end": 4.0, "text": "d" },
        ])
    );
    assert_eq!(h.scratch_entries(), 0);
}

#[tokio::test]
async fn test_overlong_video_keeps_duration_and_fails() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    *h.media.duration.lock().unwrap() = 1500.4;
    let job = h.enqueue(transcribe("v1"), 1).await;

    assert!(h.executor.tick().await.unwrap());

    let job = h.job(&job.id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("Video too long"));

    let video = h.video("v1");
    assert_eq!(video.duration_seconds, Some(1500));
    assert_eq!(video.status, VideoStatus::Error);
    assert_eq!(h.stt.calls.load(Ordering::SeqCst), 0);
    assert!(h.transcripts().is_empty());
    assert_eq!(h.scratch_entries(), 0);
}

#[tokio::test]
async fn test_missing_source_retries_then_marks_video_error() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    // Drop the source object by pointing the row at a key that does not exist
    h.db
        .update(
            clipgen_db::tables::VIDEOS,
            &[clipgen_db::Filter::eq("id", "v1")],
            json!({ "storage_path": "u1/missing.mp4" }),
        )
        .await
        .unwrap();
    let job = h.enqueue(transcribe("v1"), 2).await;

    assert!(h.executor.tick().await.unwrap());
    let first = h.job(&job.id).await;
    assert_eq!(first.status, JobStatus::Pending);
    assert_eq!(first.attempts, 1);
    assert!(first.error.as_deref().unwrap().contains("not found"));
    assert_eq!(h.video("v1").status, VideoStatus::Transcribing);

    assert!(h.executor.tick().await.unwrap());
    let second = h.job(&job.id).await;
    assert_eq!(second.status, JobStatus::Failed);
    assert_eq!(second.attempts, 2);
    assert_eq!(h.video("v1").status, VideoStatus::Error);
}

// =============================================================================
// Clip generation
// =============================================================================

#[tokio::test]
async fn test_clip_uses_window_captions_and_becomes_ready() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    h.seed_clip("c1", "v1", 10.0, 20.0).await;
    h.seed_transcript(
        "v1",
        &[
            TranscriptSegment::new(5.0, 8.0, "x"),
            TranscriptSegment::new(9.0, 12.0, "hello world"),
            TranscriptSegment::new(15.0, 17.0, "mid"),
            TranscriptSegment::new(19.95, 21.0, "edge"),
            TranscriptSegment::new(30.0, 35.0, "later"),
        ],
    )
    .await;
    let job = h.enqueue(generate_clip(10.0, 20.0), 3).await;

    assert!(h.executor.tick().await.unwrap());

    let renders = h.media.renders.lock().unwrap().clone();
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].request.start, 10.0);
    assert_eq!(renders[0].request.end, 20.0);
    assert_eq!(
        renders[0].srt.as_deref(),
        Some(
            "1\n00:00:00,000 --> 00:00:02,000\nHELLO WORLD\n\n\
             2\n00:00:05,000 --> 00:00:07,000\nMID\n\n"
        )
    );

    let clip = h.clip("c1");
    assert_eq!(clip.status, ClipStatus::Ready);
    assert_eq!(clip.storage_path.as_deref(), Some("u1/c1.mp4"));

    let uploaded = h.clip_store.get("u1/c1.mp4").unwrap();
    assert_eq!(uploaded.data, b"rendered-mp4");
    assert_eq!(uploaded.options.content_type, "video/mp4");
    assert_eq!(uploaded.options.cache_control.as_deref(), Some("max-age=3600"));

    let job = h.job(&job.id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        job.result,
        Some(json!({ "clip_id": "c1", "storage_path": "u1/c1.mp4" }))
    );
    assert_eq!(h.scratch_entries(), 0);
}

#[tokio::test]
async fn test_clip_without_transcript_renders_without_subtitles() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    h.seed_clip("c1", "v1", 0.0, 5.0).await;
    h.enqueue(generate_clip(0.0, 5.0), 3).await;

    assert!(h.executor.tick().await.unwrap());

    let renders = h.media.renders.lock().unwrap().clone();
    assert!(renders[0].request.subtitles.is_none());
    assert_eq!(h.clip("c1").status, ClipStatus::Ready);
}

#[tokio::test]
async fn test_render_failure_marks_clip_error_and_retries_job() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    h.seed_clip("c1", "v1", 10.0, 20.0).await;
    h.media.fail_render.store(true, Ordering::SeqCst);
    let job = h.enqueue(generate_clip(10.0, 20.0), 3).await;

    assert!(h.executor.tick().await.unwrap());

    let clip = h.clip("c1");
    assert_eq!(clip.status, ClipStatus::Error);
    assert!(clip.storage_path.is_none());
    assert!(h.clip_store.keys().is_empty());

    let job = h.job(&job.id).await;
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.error.unwrap().contains("Invalid data found"));
    assert_eq!(h.scratch_entries(), 0);
}

// =============================================================================
// Dispatch and recovery
// =============================================================================

#[tokio::test]
async fn test_invalid_clip_range_fails_and_marks_clip() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    h.seed_clip("c1", "v1", 9.0, 3.0).await;
    let job_id = h
        .insert_job(json!({
            "type": "generate_clip",
            "payload": { "video_id": "v1", "clip_id": "c1", "start": 9.0, "end": 3.0 },
            "status": "pending",
            "attempts": 0,
            "max_attempts": 1,
        }))
        .await;

    assert!(h.executor.tick().await.unwrap());

    let job = h.job(&job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("must be after start"));
    assert_eq!(h.clip("c1").status, ClipStatus::Error);
    assert!(h.media.renders.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_job_type_fails() {
    let h = Harness::new();
    let job_id = h
        .insert_job(json!({
            "type": "render_gif",
            "payload": {},
            "status": "pending",
            "attempts": 0,
            "max_attempts": 1,
        }))
        .await;

    assert!(h.executor.tick().await.unwrap());

    let job = h.job(&job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("Unknown job type"));
}

#[tokio::test]
async fn test_recovered_exhausted_job_marks_clip_error() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    h.seed_clip("c1", "v1", 10.0, 20.0).await;
    let expired = chrono::Utc::now() - chrono::Duration::seconds(30);
    let job_id = h
        .insert_job(json!({
            "type": "generate_clip",
            "payload": { "video_id": "v1", "clip_id": "c1", "start": 10.0, "end": 20.0 },
            "status": "processing",
            "attempts": 3,
            "max_attempts": 3,
            "timeout_at": expired.to_rfc3339(),
            "lease_id": "dead-worker",
        }))
        .await;

    assert!(!h.executor.tick().await.unwrap());

    let job = h.job(&job_id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Job timed out"));
    assert_eq!(h.clip("c1").status, ClipStatus::Error);
}

#[tokio::test]
async fn test_recovered_job_with_attempts_left_is_reclaimed() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    let expired = chrono::Utc::now() - chrono::Duration::seconds(30);
    let job_id = h
        .insert_job(json!({
            "type": "transcribe",
            "payload": { "video_id": "v1" },
            "status": "processing",
            "attempts": 1,
            "max_attempts": 3,
            "timeout_at": expired.to_rfc3339(),
            "lease_id": "dead-worker",
        }))
        .await;

    // Recovery returns it to pending and the same tick claims it again
    assert!(h.executor.tick().await.unwrap());

    let job = h.job(&job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 2);
    assert_eq!(h.video("v1").status, VideoStatus::Ready);
}

#[tokio::test]
async fn test_run_processes_jobs_until_shutdown() {
    let h = Harness::new();
    h.seed_video("v1", "u1").await;
    let job = h.enqueue(transcribe("v1"), 3).await;

    let stop = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.executor.shutdown();
    };
    let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
        tokio::join!(h.executor.run(), stop)
    })
    .await
    .expect("executor should stop after shutdown");

    result.unwrap();
    assert_eq!(h.job(&job.id).await.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_run_returns_immediately_when_already_shut_down() {
    let h = Harness::new();
    h.executor.shutdown();

    let finished = tokio::time::timeout(Duration::from_secs(1), h.executor.run()).await;
    tokio_test::assert_ok!(tokio_test::assert_ok!(finished));
}
