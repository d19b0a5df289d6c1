//! FFmpeg filter construction for vertical captioned clips.

use std::path::Path;

use clipgen_models::encoding::{VERTICAL_HEIGHT, VERTICAL_WIDTH};

/// Center-crop to 9:16 at full source height, then scale to the output frame.
pub fn vertical_crop_filter() -> String {
    format!("crop=ih*9/16:ih,scale={}:{}", VERTICAL_WIDTH, VERTICAL_HEIGHT)
}

/// Escape a path for use inside a single-quoted filter argument.
pub fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// libass style overrides for burned-in captions.
///
/// Defaults give large bold white text with a thick black outline, no box and
/// no shadow, bottom-centred.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleStyle {
    pub font_name: String,
    pub font_size: u32,
    pub bold: bool,
    /// `&HBBGGRR` colour of the text fill
    pub primary_colour: String,
    pub outline_colour: String,
    /// `&HAABBGGRR`; fully transparent by default
    pub back_colour: String,
    pub outline: u32,
    pub shadow: u32,
    pub margin_v: u32,
    /// Numpad-style alignment; 2 is bottom centre
    pub alignment: u8,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 16,
            bold: true,
            primary_colour: "&HFFFFFF".to_string(),
            outline_colour: "&H000000".to_string(),
            back_colour: "&H00000000".to_string(),
            outline: 4,
            shadow: 0,
            margin_v: 20,
            alignment: 2,
        }
    }
}

impl SubtitleStyle {
    /// Render as a `force_style` value.
    pub fn to_force_style(&self) -> String {
        [
            format!("FontSize={}", self.font_size),
            format!("FontName={}", self.font_name),
            format!("Bold={}", u8::from(self.bold)),
            format!("PrimaryColour={}", self.primary_colour),
            format!("OutlineColour={}", self.outline_colour),
            format!("BackColour={}", self.back_colour),
            format!("Outline={}", self.outline),
            format!("Shadow={}", self.shadow),
            format!("MarginV={}", self.margin_v),
            format!("Alignment={}", self.alignment),
        ]
        .join(",")
    }
}

/// `subtitles` filter burning an SRT file with the given style.
pub fn subtitles_filter(srt_path: &Path, style: &SubtitleStyle) -> String {
    format!(
        "subtitles='{}':force_style='{}'",
        escape_filter_path(srt_path),
        style.to_force_style()
    )
}

/// Full video filter chain for a vertical clip, with optional captions.
pub fn build_clip_filter(srt_path: Option<&Path>, style: &SubtitleStyle) -> String {
    let mut filter = vertical_crop_filter();
    if let Some(path) = srt_path {
        filter.push(',');
        filter.push_str(&subtitles_filter(path, style));
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_crop_filter() {
        assert_eq!(vertical_crop_filter(), "crop=ih*9/16:ih,scale=1080:1920");
    }

    #[test]
    fn test_escape_filter_path() {
        assert_eq!(
            escape_filter_path(Path::new("/tmp/it's/C:/subs.srt")),
            "/tmp/it'\\''s/C\\:/subs.srt"
        );
    }

    #[test]
    fn test_default_force_style() {
        assert_eq!(
            SubtitleStyle::default().to_force_style(),
            "FontSize=16,FontName=Arial,Bold=1,PrimaryColour=&HFFFFFF,OutlineColour=&H000000,\
             BackColour=&H00000000,Outline=4,Shadow=0,MarginV=20,Alignment=2"
        );
    }

    #[test]
    fn test_clip_filter_with_and_without_captions() {
        let style = SubtitleStyle::default();
        assert_eq!(build_clip_filter(None, &style), vertical_crop_filter());

        let filter = build_clip_filter(Some(Path::new("/work/captions.srt")), &style);
        assert!(filter.starts_with("crop=ih*9/16:ih,scale=1080:1920,subtitles='/work/captions.srt'"));
        assert!(filter.contains(":force_style='FontSize=16,"));
    }
}
