//! Windowed SRT synthesis.
//!
//! Captions are stored against the full source timeline. A clip renders only
//! `[start, end)`, so the cues overlapping that window are shifted to start at
//! zero, clamped to the window, and written as SRT.

use std::fmt::Write as _;

use clipgen_models::TranscriptSegment;

/// Cues shorter than this after clamping are dropped.
pub const DEFAULT_MIN_CUE_SECS: f64 = 0.1;

/// libass override prefix: quick fade plus a short scale pop.
const POP_IN_TAGS: &str = r"{\fad(80,80)\t(0,120,\fscx115\fscy115)\t(120,200,\fscx100\fscy100)}";

/// One subtitle cue relative to the clip start.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// How cue text is decorated when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CueStyle {
    Plain,
    /// Prefix each cue with fade and scale tags understood by libass.
    #[default]
    PopIn,
}

/// Select and re-base the segments overlapping `[window_start, window_end)`.
///
/// Text is trimmed and uppercased; cues that end up blank or shorter than
/// `min_duration` are dropped. Input order is preserved.
pub fn window_cues(
    segments: &[TranscriptSegment],
    window_start: f64,
    window_end: f64,
    min_duration: f64,
) -> Vec<Cue> {
    let window_len = window_end - window_start;
    if window_len <= 0.0 {
        return Vec::new();
    }

    segments
        .iter()
        .filter(|seg| seg.end > window_start && seg.start < window_end)
        .filter_map(|seg| {
            let start = (seg.start - window_start).max(0.0);
            let end = (seg.end - window_start).min(window_len);
            if end - start < min_duration {
                return None;
            }

            let text = seg.text.trim().to_uppercase();
            if text.is_empty() {
                return None;
            }

            Some(Cue { start, end, text })
        })
        .collect()
}

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`.
///
/// Rounds to the nearest millisecond once, so carries propagate into seconds,
/// minutes and hours.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

/// Serialize cues as SRT with indices starting at 1.
pub fn render_srt(cues: &[Cue], style: CueStyle) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        let prefix = match style {
            CueStyle::Plain => "",
            CueStyle::PopIn => POP_IN_TAGS,
        };
        // Writing to a String cannot fail
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}{}\n\n",
            i + 1,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            prefix,
            cue.text
        );
    }
    out
}
