//! Configuration for the quiz engine
//!
//! Provides centralized configuration for all components. Every field has a
//! default, so a TOML file only needs the values it changes.

use crate::celebration::CelebrationConfig;
use crate::quiz::TopicSelection;
use crate::speech::{PlaybackConfig, RecognizerConfig};
use crate::{QuizError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration for the complete engine
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speech recognition configuration
    pub recognizer: RecognizerConfig,

    /// Prompt playback configuration
    pub playback: PlaybackConfig,

    /// Score threshold and confetti parameters
    pub celebration: CelebrationConfig,

    /// Content new sessions are generated from
    pub topic: TopicSelection,

    /// Upper bound for every backend call, in seconds
    pub request_timeout_secs: u64,

    /// Capacity of the command, completion and event channels
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recognizer: RecognizerConfig::default(),
            playback: PlaybackConfig::default(),
            celebration: CelebrationConfig::default(),
            topic: TopicSelection::default(),
            request_timeout_secs: 30,
            channel_capacity: 100,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            QuizError::IOError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| QuizError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| QuizError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Set the topic new sessions are created for
    pub fn with_topic(mut self, topic: TopicSelection) -> Self {
        self.topic = topic;
        self
    }

    /// Use one language for both recognition and playback
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        self.recognizer.language = language.clone();
        self.playback.language = language;
        self
    }

    /// Set the backend request timeout (rounded down to whole seconds)
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_celebration(mut self, celebration: CelebrationConfig) -> Self {
        self.celebration = celebration;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.recognizer.language.trim().is_empty() {
            return Err(QuizError::ConfigError(
                "recognizer language is required".to_string(),
            ));
        }

        if self.playback.language.trim().is_empty() {
            return Err(QuizError::ConfigError(
                "playback language is required".to_string(),
            ));
        }

        if self.playback.rate <= 0.0 {
            return Err(QuizError::ConfigError(format!(
                "playback rate must be positive, got {}",
                self.playback.rate
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(QuizError::ConfigError(
                "request timeout must be at least one second".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.celebration.threshold) {
            return Err(QuizError::ConfigError(format!(
                "celebration threshold must be a percentage, got {}",
                self.celebration.threshold
            )));
        }

        if self.channel_capacity == 0 {
            return Err(QuizError::ConfigError(
                "channel capacity must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
