//! Caption segmentation.
//!
//! Turns a speech-to-text response into short caption units. Word timings are
//! preferred because they give fast-paced captions a few words at a time;
//! coarser shapes are used only when finer ones are missing:
//!
//! 1. top-level word timings, grouped
//! 2. word timings nested in segments, flattened and grouped
//! 3. segments verbatim (text trimmed)
//! 4. the full text as one unit at `0..0`

use clipgen_models::{TimedWord, TranscriptSegment, TranscriptionResponse};

/// Words per caption unit.
pub const DEFAULT_WORDS_PER_GROUP: usize = 3;

/// Normalize a transcription response into caption units.
pub fn segment_transcription(
    response: &TranscriptionResponse,
    words_per_group: usize,
) -> Vec<TranscriptSegment> {
    if let Some(words) = response.words.as_deref().filter(|w| !w.is_empty()) {
        return group_words(words, words_per_group);
    }

    if let Some(segments) = response.segments.as_deref().filter(|s| !s.is_empty()) {
        let nested: Vec<TimedWord> = segments
            .iter()
            .filter_map(|s| s.words.as_deref())
            .flatten()
            .cloned()
            .collect();

        if !nested.is_empty() {
            return group_words(&nested, words_per_group);
        }

        return segments
            .iter()
            .map(|s| TranscriptSegment::new(s.start, s.end, s.text.trim()))
            .collect();
    }

    match response.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => vec![TranscriptSegment::new(0.0, 0.0, text)],
        _ => Vec::new(),
    }
}

/// Group consecutive words into units of at most `words_per_group`.
///
/// Groups are cut from the raw word list, so a blank word still takes a slot.
/// Each unit spans its first word's start to its last word's end and joins the
/// trimmed non-blank words; a group with no text is dropped. A group size of
/// zero is treated as one.
pub fn group_words(words: &[TimedWord], words_per_group: usize) -> Vec<TranscriptSegment> {
    let size = words_per_group.max(1);

    words
        .chunks(size)
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            let text = group
                .iter()
                .map(|w| w.word.trim())
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSegment::new(first.start, last.end, text))
        })
        .collect()
}
