//! Media processing for the clip worker.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with progress parsing
//! - Duration probing via FFprobe
//! - Speech audio extraction and vertical clip rendering
//! - Caption segmentation from word-timed transcriptions
//! - Windowed SRT synthesis with re-based timestamps
//! - The [`MediaToolkit`] seam used by the job handlers

pub mod audio;
pub mod captions;
pub mod clip;
pub mod command;
pub mod error;
pub mod filters;
pub mod probe;
pub mod progress;
pub mod subtitles;
pub mod toolkit;

pub use captions::{group_words, segment_transcription, DEFAULT_WORDS_PER_GROUP};
pub use clip::ClipRenderRequest;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use filters::SubtitleStyle;
pub use probe::probe_duration;
pub use progress::FfmpegProgress;
pub use subtitles::{format_timestamp, render_srt, window_cues, Cue, CueStyle};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
