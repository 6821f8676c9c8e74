//! Speech playback adapter
//!
//! Reads quiz prompts aloud. Playback is a convenience only: failures are
//! logged and otherwise ignored, and nothing here touches session state.

use crate::Result;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Configuration for prompt playback
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// BCP 47 language tag
    pub language: String,

    /// Speech rate (1.0 = normal)
    pub rate: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            language: "fr-FR".to_string(),
            rate: 0.9,
        }
    }
}

impl PlaybackConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the speech rate, clamped to a range platforms accept
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate.clamp(0.1, 10.0);
        self
    }
}

/// Platform speech synthesis capability
pub trait SpeechSynthesizer: Send + Sync {
    /// Drop any queued or playing utterance
    fn cancel_all(&self);

    fn speak(&self, text: &str, language: &str, rate: f32) -> Result<()>;
}

/// One-shot prompt reader
#[derive(Clone)]
pub struct SpeechPlayback {
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    config: PlaybackConfig,
}

impl SpeechPlayback {
    pub fn new(synthesizer: Option<Arc<dyn SpeechSynthesizer>>, config: PlaybackConfig) -> Self {
        Self {
            synthesizer,
            config,
        }
    }

    /// Playback without a synthesizer, every call is a no-op
    pub fn disabled() -> Self {
        Self::new(None, PlaybackConfig::default())
    }

    pub fn is_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Cancel pending playback and speak `text`
    pub fn speak(&self, text: &str) {
        let Some(synthesizer) = &self.synthesizer else {
            debug!("No speech synthesizer, skipping playback");
            return;
        };

        let text = prompt_for_speech(text);
        if text.is_empty() {
            return;
        }

        synthesizer.cancel_all();
        if let Err(e) = synthesizer.speak(&text, &self.config.language, self.config.rate) {
            debug!("Playback failed, ignoring: {}", e);
        }
    }
}

/// Prepare a prompt for reading aloud.
///
/// Gaps such as `___` become a short pause and markup characters are dropped.
pub fn prompt_for_speech(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_gap = false;

    for c in text.chars() {
        match c {
            '_' => {
                if !in_gap {
                    result.push_str(" … ");
                    in_gap = true;
                }
            }
            '*' | '#' | '`' => {}
            _ => {
                in_gap = false;
                result.push(c);
            }
        }
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
