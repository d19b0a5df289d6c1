//! Speech audio extraction.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Sample rate for speech recognition input.
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;
/// Low bitrate keeps long recordings under provider upload limits.
pub const SPEECH_BITRATE: &str = "64k";

/// Build the command that turns a video into mono 16 kHz MP3 audio.
pub fn speech_audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("libmp3lame")
        .audio_rate(SPEECH_SAMPLE_RATE)
        .audio_channels(1)
        .audio_bitrate(SPEECH_BITRATE)
}

/// Extract a compact speech track from `input` into `output`.
pub async fn extract_speech_audio(
    runner: &FfmpegRunner,
    input: &Path,
    output: &Path,
) -> MediaResult<()> {
    runner.run(&speech_audio_command(input, output)).await?;
    info!(output = %output.display(), "Extracted speech audio");
    Ok(())
}
