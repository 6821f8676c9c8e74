//! Speech adapters for voice answers
//!
//! This module provides:
//! - Speech capture: bout-scoped recognition with live transcript assembly
//! - Speech playback: one-shot prompt reading

pub mod capture;
pub mod playback;

// Re-export commonly used types
pub use capture::{
    BoutId, CaptureSignal, RecognitionErrorKind, RecognitionPlatform, RecognitionSink,
    RecognizerConfig, ScriptedBout, ScriptedPlatform, SpeechCapture, SpeechRecognizer,
    TranscriptBuffer, UnsupportedPlatform,
};
pub use playback::{prompt_for_speech, PlaybackConfig, SpeechPlayback, SpeechSynthesizer};
