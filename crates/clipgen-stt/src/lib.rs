//! Speech-to-text client.
//!
//! Sends extracted audio to a Whisper-compatible `audio/transcriptions`
//! endpoint (Groq by default) and returns the verbose JSON response with word
//! and segment timestamps. Turning that response into caption groups is the
//! caller's job.

pub mod client;
pub mod error;

pub use client::{SpeechToText, SttConfig, WhisperClient};
pub use error::{SttError, SttResult};
