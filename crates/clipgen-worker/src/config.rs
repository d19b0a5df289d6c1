//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use clipgen_media::{CueStyle, DEFAULT_WORDS_PER_GROUP};

/// Caption generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionConfig {
    /// Words per caption unit when word timings are available
    pub words_per_group: usize,
    /// Cues shorter than this after windowing are dropped
    pub min_cue: Duration,
    /// Prefix cues with the pop-in animation tags
    pub animate: bool,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            words_per_group: DEFAULT_WORDS_PER_GROUP,
            min_cue: Duration::from_millis(100),
            animate: true,
        }
    }
}

impl CaptionConfig {
    pub fn cue_style(&self) -> CueStyle {
        if self.animate {
            CueStyle::PopIn
        } else {
            CueStyle::Plain
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep when no job was claimed
    pub poll_interval: Duration,
    /// Sleep after finishing a job
    pub idle_after_job: Duration,
    /// Longest source video accepted for transcription
    pub max_video_duration: Duration,
    /// Parent directory for per-job scratch directories
    pub work_dir: PathBuf,
    pub captions: CaptionConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5000),
            idle_after_job: Duration::from_millis(1000),
            max_video_duration: Duration::from_secs(20 * 60),
            work_dir: std::env::temp_dir().join("clipgen"),
            captions: CaptionConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            poll_interval: env_parse("WORKER_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            idle_after_job: env_parse("WORKER_IDLE_AFTER_JOB_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.idle_after_job),
            max_video_duration: env_parse("WORKER_MAX_DURATION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_video_duration),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            captions: CaptionConfig {
                words_per_group: env_parse("CAPTION_WORDS_PER_GROUP")
                    .map(|n: u64| n.max(1) as usize)
                    .unwrap_or(defaults.captions.words_per_group),
                min_cue: env_parse("CAPTION_MIN_CUE_MS")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.captions.min_cue),
                animate: std::env::var("CAPTION_ANIMATE")
                    .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                    .unwrap_or(defaults.captions.animate),
            },
        }
    }
}

fn env_parse(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "WORKER_POLL_INTERVAL_MS",
        "WORKER_IDLE_AFTER_JOB_MS",
        "WORKER_MAX_DURATION_SECS",
        "WORKER_WORK_DIR",
        "CAPTION_WORDS_PER_GROUP",
        "CAPTION_MIN_CUE_MS",
        "CAPTION_ANIMATE",
    ];

    fn clear() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = WorkerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.idle_after_job, Duration::from_secs(1));
        assert_eq!(config.max_video_duration, Duration::from_secs(1200));
        assert!(config.work_dir.ends_with("clipgen"));
        assert_eq!(config.captions, CaptionConfig::default());
        assert_eq!(config.captions.cue_style(), CueStyle::PopIn);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear();
        std::env::set_var("WORKER_POLL_INTERVAL_MS", "250");
        std::env::set_var("WORKER_WORK_DIR", "/var/tmp/jobs");
        std::env::set_var("CAPTION_WORDS_PER_GROUP", "0");
        std::env::set_var("CAPTION_ANIMATE", "false");
        std::env::set_var("WORKER_MAX_DURATION_SECS", "ten");

        let config = WorkerConfig::from_env();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/jobs"));
        assert_eq!(config.captions.words_per_group, 1);
        assert_eq!(config.captions.cue_style(), CueStyle::Plain);
        assert_eq!(config.max_video_duration, Duration::from_secs(1200));
        clear();
    }
}
