//! Transcripts and speech-to-text response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timed caption group as stored in `transcripts.content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Seconds from the start of the source video
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// A row of the `transcripts` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub video_id: String,
    #[serde(default)]
    pub content: Vec<TranscriptSegment>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for a transcript; the datastore assigns the id.
#[derive(Debug, Clone, Serialize)]
pub struct NewTranscript {
    pub video_id: String,
    pub content: Vec<TranscriptSegment>,
}

/// A single word with timing from the STT provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// A provider segment, optionally carrying its own words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSegment {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<TimedWord>>,
}

/// Verbose transcription response. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub words: Option<Vec<TimedWord>>,
    #[serde(default)]
    pub segments: Option<Vec<ResponseSegment>>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tolerates_missing_fields() {
        let resp: TranscriptionResponse = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert!(resp.words.is_none());
        assert!(resp.segments.is_none());
        assert_eq!(resp.text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_response_with_words_and_segments() {
        let raw = r#"{
            "text": "hello world",
            "language": "english",
            "duration": 1.2,
            "words": [
                {"word": "hello", "start": 0.0, "end": 0.5},
                {"word": "world", "start": 0.5, "end": 1.0}
            ],
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.0, "text": " hello world", "avg_logprob": -0.2}
            ]
        }"#;
        let resp: TranscriptionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.words.as_ref().map(Vec::len), Some(2));
        let segments = resp.segments.unwrap();
        assert_eq!(segments[0].text, " hello world");
        assert!(segments[0].words.is_none());
    }
}
