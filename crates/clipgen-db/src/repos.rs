//! Typed repositories for videos, clips and transcripts.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use clipgen_models::{Clip, ClipStatus, NewTranscript, Transcript, Video, VideoStatus};

use crate::datastore::Datastore;
use crate::error::{DbError, DbResult};
use crate::query::{Filter, Query};
use crate::tables;

fn decode_first<T: DeserializeOwned>(rows: Vec<Value>) -> DbResult<Option<T>> {
    rows.into_iter()
        .next()
        .map(serde_json::from_value)
        .transpose()
        .map_err(DbError::from)
}

fn expect_updated(rows: Vec<Value>, what: impl FnOnce() -> String) -> DbResult<()> {
    if rows.is_empty() {
        Err(DbError::not_found(what()))
    } else {
        Ok(())
    }
}

/// Repository for `videos` rows.
#[derive(Clone)]
pub struct VideoRepository {
    db: Arc<dyn Datastore>,
}

impl VideoRepository {
    pub fn new(db: Arc<dyn Datastore>) -> Self {
        Self { db }
    }

    /// Get a video by ID.
    pub async fn get(&self, video_id: &str) -> DbResult<Option<Video>> {
        let rows = self
            .db
            .select(tables::VIDEOS, &Query::new().eq("id", video_id).limit(1))
            .await?;
        decode_first(rows)
    }

    /// Update video status.
    pub async fn set_status(&self, video_id: &str, status: VideoStatus) -> DbResult<()> {
        let rows = self
            .db
            .update(
                tables::VIDEOS,
                &[Filter::eq("id", video_id)],
                json!({ "status": status.as_str() }),
            )
            .await?;
        debug!(video_id = %video_id, status = %status, "Updated video status");
        expect_updated(rows, || format!("videos/{}", video_id))
    }

    /// Persist the probed duration in whole seconds.
    pub async fn set_duration(&self, video_id: &str, duration_seconds: i64) -> DbResult<()> {
        let rows = self
            .db
            .update(
                tables::VIDEOS,
                &[Filter::eq("id", video_id)],
                json!({ "duration_seconds": duration_seconds }),
            )
            .await?;
        expect_updated(rows, || format!("videos/{}", video_id))
    }
}

/// Repository for `clips` rows.
#[derive(Clone)]
pub struct ClipRepository {
    db: Arc<dyn Datastore>,
}

impl ClipRepository {
    pub fn new(db: Arc<dyn Datastore>) -> Self {
        Self { db }
    }

    pub async fn get(&self, clip_id: &str) -> DbResult<Option<Clip>> {
        let rows = self
            .db
            .select(tables::CLIPS, &Query::new().eq("id", clip_id).limit(1))
            .await?;
        decode_first(rows)
    }

    pub async fn set_status(&self, clip_id: &str, status: ClipStatus) -> DbResult<()> {
        let rows = self
            .db
            .update(
                tables::CLIPS,
                &[Filter::eq("id", clip_id)],
                json!({ "status": status.as_str() }),
            )
            .await?;
        expect_updated(rows, || format!("clips/{}", clip_id))
    }

    /// Mark a clip ready together with its storage location in one write.
    pub async fn mark_ready(&self, clip_id: &str, storage_path: &str) -> DbResult<()> {
        let rows = self
            .db
            .update(
                tables::CLIPS,
                &[Filter::eq("id", clip_id)],
                json!({
                    "status": ClipStatus::Ready.as_str(),
                    "storage_path": storage_path,
                }),
            )
            .await?;
        info!(clip_id = %clip_id, storage_path = %storage_path, "Clip ready");
        expect_updated(rows, || format!("clips/{}", clip_id))
    }

    /// Mark a clip failed. A failed clip never keeps a storage location.
    pub async fn mark_error(&self, clip_id: &str) -> DbResult<()> {
        let rows = self
            .db
            .update(
                tables::CLIPS,
                &[Filter::eq("id", clip_id)],
                json!({
                    "status": ClipStatus::Error.as_str(),
                    "storage_path": Value::Null,
                }),
            )
            .await?;
        expect_updated(rows, || format!("clips/{}", clip_id))
    }
}

/// Repository for `transcripts` rows.
#[derive(Clone)]
pub struct TranscriptRepository {
    db: Arc<dyn Datastore>,
}

impl TranscriptRepository {
    pub fn new(db: Arc<dyn Datastore>) -> Self {
        Self { db }
    }

    /// Latest transcript for a video, if any.
    pub async fn find_by_video(&self, video_id: &str) -> DbResult<Option<Transcript>> {
        let rows = self
            .db
            .select(
                tables::TRANSCRIPTS,
                &Query::new()
                    .eq("video_id", video_id)
                    .order_desc("created_at")
                    .limit(1),
            )
            .await?;
        decode_first(rows)
    }

    /// Store a transcript and return its id.
    pub async fn create(&self, transcript: &NewTranscript) -> DbResult<String> {
        let row = self
            .db
            .insert(tables::TRANSCRIPTS, serde_json::to_value(transcript)?)
            .await?;

        let id = row
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DbError::invalid_response("transcript insert returned no id"))?;

        info!(
            transcript_id = %id,
            video_id = %transcript.video_id,
            segments = transcript.content.len(),
            "Stored transcript"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatastore;
    use clipgen_models::TranscriptSegment;

    async fn seeded() -> (Arc<MemoryDatastore>, Arc<dyn Datastore>) {
        let mem = Arc::new(MemoryDatastore::new());
        mem.insert(
            tables::VIDEOS,
            json!({
                "id": "v1",
                "user_id": "u1",
                "filename": "talk.mp4",
                "storage_path": "u1/v1.mp4",
                "duration_seconds": null,
                "status": "uploaded",
            }),
        )
        .await
        .unwrap();
        mem.insert(
            tables::CLIPS,
            json!({
                "id": "c1",
                "video_id": "v1",
                "user_id": "u1",
                "start_time": 10.0,
                "end_time": 20.0,
                "storage_path": null,
                "title": null,
                "status": "pending",
            }),
        )
        .await
        .unwrap();
        let db: Arc<dyn Datastore> = mem.clone();
        (mem, db)
    }

    #[tokio::test]
    async fn test_video_status_and_duration() {
        let (_, db) = seeded().await;
        let repo = VideoRepository::new(db);

        repo.set_status("v1", VideoStatus::Transcribing).await.unwrap();
        repo.set_duration("v1", 125).await.unwrap();

        let video = repo.get("v1").await.unwrap().unwrap();
        assert_eq!(video.status, VideoStatus::Transcribing);
        assert_eq!(video.duration_seconds, Some(125));
    }

    #[tokio::test]
    async fn test_missing_video() {
        let (_, db) = seeded().await;
        let repo = VideoRepository::new(db);
        assert!(repo.get("nope").await.unwrap().is_none());
        assert!(matches!(
            repo.set_status("nope", VideoStatus::Error).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clip_ready_then_error_clears_location() {
        let (_, db) = seeded().await;
        let repo = ClipRepository::new(db);

        repo.mark_ready("c1", "u1/c1.mp4").await.unwrap();
        let clip = repo.get("c1").await.unwrap().unwrap();
        assert_eq!(clip.status, ClipStatus::Ready);
        assert_eq!(clip.storage_path.as_deref(), Some("u1/c1.mp4"));

        repo.mark_error("c1").await.unwrap();
        let clip = repo.get("c1").await.unwrap().unwrap();
        assert_eq!(clip.status, ClipStatus::Error);
        assert!(clip.storage_path.is_none());
    }

    #[tokio::test]
    async fn test_transcript_create_and_find() {
        let (_, db) = seeded().await;
        let repo = TranscriptRepository::new(db);
        assert!(repo.find_by_video("v1").await.unwrap().is_none());

        let id = repo
            .create(&NewTranscript {
                video_id: "v1".into(),
                content: vec![TranscriptSegment::new(0.0, 1.0, "hello there")],
            })
            .await
            .unwrap();

        let found = repo.find_by_video("v1").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.content[0].text, "hello there");
    }
}
