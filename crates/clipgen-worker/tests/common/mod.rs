//! Fakes and fixtures for driving the executor without external services.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use clipgen_db::{tables, Datastore, MemoryDatastore};
use clipgen_media::{ClipRenderRequest, MediaError, MediaResult, MediaToolkit};
use clipgen_models::{
    Clip, Job, JobTask, TimedWord, TranscriptSegment, TranscriptionResponse, Video,
};
use clipgen_queue::QueueConfig;
use clipgen_storage::MemoryObjectStore;
use clipgen_stt::{SpeechToText, SttResult};
use clipgen_worker::{JobContext, JobExecutor, WorkerConfig};

/// Speech-to-text fake returning a fixed response.
#[derive(Default)]
pub struct FakeStt {
    pub response: Mutex<TranscriptionResponse>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, audio_path: &Path) -> SttResult<TranscriptionResponse> {
        assert!(audio_path.exists(), "audio should be extracted first");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.lock().unwrap().clone())
    }
}

/// A render invocation with the subtitle file contents captured at call time.
#[derive(Debug, Clone)]
pub struct RenderCall {
    pub request: ClipRenderRequest,
    pub srt: Option<String>,
}

/// Media fake: fixed probe duration, optional render failure.
pub struct FakeMedia {
    pub duration: Mutex<f64>,
    pub fail_render: AtomicBool,
    pub renders: Mutex<Vec<RenderCall>>,
}

impl Default for FakeMedia {
    fn default() -> Self {
        Self {
            duration: Mutex::new(120.0),
            fail_render: AtomicBool::new(false),
            renders: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        Ok(*self.duration.lock().unwrap())
    }

    async fn extract_speech_audio(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        tokio::fs::write(output, b"mp3").await?;
        Ok(())
    }

    async fn render_vertical_clip(&self, request: &ClipRenderRequest) -> MediaResult<()> {
        let srt = match &request.subtitles {
            Some(path) => Some(tokio::fs::read_to_string(path).await?),
            None => None,
        };
        self.renders.lock().unwrap().push(RenderCall {
            request: request.clone(),
            srt,
        });

        if self.fail_render.load(Ordering::SeqCst) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ));
        }
        tokio::fs::write(&request.output, b"rendered-mp4").await?;
        Ok(())
    }
}

/// Executor wired to in-memory services.
pub struct Harness {
    pub db: Arc<MemoryDatastore>,
    pub video_store: Arc<MemoryObjectStore>,
    pub clip_store: Arc<MemoryObjectStore>,
    pub stt: Arc<FakeStt>,
    pub media: Arc<FakeMedia>,
    pub work_dir: TempDir,
    pub executor: JobExecutor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut WorkerConfig)) -> Self {
        let db = Arc::new(MemoryDatastore::new());
        let video_store = Arc::new(MemoryObjectStore::new());
        let clip_store = Arc::new(MemoryObjectStore::new());
        let stt = Arc::new(FakeStt::default());
        let media = Arc::new(FakeMedia::default());
        let work_dir = tempfile::tempdir().unwrap();

        let mut config = WorkerConfig {
            poll_interval: Duration::from_millis(20),
            idle_after_job: Duration::from_millis(5),
            work_dir: work_dir.path().join("scratch"),
            ..WorkerConfig::default()
        };
        config.captions.animate = false;
        adjust(&mut config);

        let ctx = JobContext::new(
            config,
            QueueConfig::default(),
            db.clone(),
            video_store.clone(),
            clip_store.clone(),
            stt.clone(),
            media.clone(),
        );

        Self {
            db,
            video_store,
            clip_store,
            stt,
            media,
            work_dir,
            executor: JobExecutor::new(ctx),
        }
    }

    /// Insert a video row and its source object.
    pub async fn seed_video(&self, video_id: &str, user_id: &str) {
        let storage_path = format!("{}/{}.mp4", user_id, video_id);
        self.db
            .insert(
                tables::VIDEOS,
                json!({
                    "id": video_id,
                    "user_id": user_id,
                    "filename": "talk.mp4",
                    "storage_path": storage_path,
                    "duration_seconds": null,
                    "status": "uploaded",
                }),
            )
            .await
            .unwrap();
        self.video_store.put(storage_path, b"source-bytes".to_vec());
    }

    pub async fn seed_clip(&self, clip_id: &str, video_id: &str, start: f64, end: f64) {
        self.db
            .insert(
                tables::CLIPS,
                json!({
                    "id": clip_id,
                    "video_id": video_id,
                    "user_id": "u1",
                    "start_time": start,
                    "end_time": end,
                    "storage_path": null,
                    "title": null,
                    "status": "pending",
                }),
            )
            .await
            .unwrap();
    }

    pub async fn seed_transcript(&self, video_id: &str, segments: &[TranscriptSegment]) {
        self.db
            .insert(
                tables::TRANSCRIPTS,
                json!({ "video_id": video_id, "content": segments }),
            )
            .await
            .unwrap();
    }

    pub async fn enqueue(&self, task: JobTask, max_attempts: u32) -> Job {
        self.executor
            .context()
            .queue
            .enqueue_with_max_attempts(task, max_attempts)
            .await
            .unwrap()
    }

    /// Insert a raw job row, bypassing payload validation.
    pub async fn insert_job(&self, row: Value) -> String {
        let row = self.db.insert(tables::JOBS, row).await.unwrap();
        row["id"].as_str().unwrap().to_string()
    }

    pub async fn job(&self, job_id: &str) -> Job {
        self.executor
            .context()
            .queue
            .get(job_id)
            .await
            .unwrap()
            .unwrap()
    }

    pub fn video(&self, video_id: &str) -> Video {
        serde_json::from_value(self.db.row(tables::VIDEOS, video_id).unwrap()).unwrap()
    }

    pub fn clip(&self, clip_id: &str) -> Clip {
        serde_json::from_value(self.db.row(tables::CLIPS, clip_id).unwrap()).unwrap()
    }

    pub fn transcripts(&self) -> Vec<Value> {
        self.db.rows(tables::TRANSCRIPTS)
    }

    /// Entries left in the scratch root.
    pub fn scratch_entries(&self) -> usize {
        match std::fs::read_dir(self.work_dir.path().join("scratch")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn words(items: &[(&str, f64, f64)]) -> Vec<TimedWord> {
    items
        .iter()
        .map(|(word, start, end)| TimedWord {
            word: word.to_string(),
            start: *start,
            end: *end,
        })
        .collect()
}
