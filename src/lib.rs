pub mod celebration;
pub mod integration;
pub mod quiz;
pub mod results;
pub mod session;
pub mod speech;
pub mod utils;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("Speech recognition is not supported on this platform")]
    Unsupported,

    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Speech recognition error: {0}")]
    Recognition(String),

    #[error("Answer is empty")]
    EmptyAnswer,

    #[error("Failed to start quiz session: {0}")]
    SessionStartFailed(String),

    #[error("Failed to submit answers: {0}")]
    SubmissionFailed(String),

    #[error("Monthly quiz quota exceeded")]
    QuotaExceeded,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for QuizError {
    fn from(e: std::io::Error) -> Self {
        QuizError::IOError(e.to_string())
    }
}

impl QuizError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // No speech capability means no voice session at all
            QuizError::Unsupported => false,
            // The user can grant access and click the mic again
            QuizError::PermissionDenied => true,
            QuizError::Recognition(_) => true,
            QuizError::EmptyAnswer => true,
            QuizError::SessionStartFailed(_) => true,
            QuizError::SubmissionFailed(_) => true,
            // Quota resets with the next billing period
            QuizError::QuotaExceeded => false,
            QuizError::Network(_) => true,
            QuizError::Timeout(_) => true,
            QuizError::ChannelError(_) => false,
            QuizError::ConfigError(_) => false,
            QuizError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            QuizError::Unsupported => {
                "Speech recognition is not available. Try a browser or device with voice input."
                    .to_string()
            }
            QuizError::PermissionDenied => {
                "Microphone access was denied. Allow it and click the mic again.".to_string()
            }
            QuizError::Recognition(_) => "Speech recognition failed. Please try again.".to_string(),
            QuizError::EmptyAnswer => "Say an answer before validating, or skip.".to_string(),
            QuizError::SessionStartFailed(reason) => {
                format!("Could not start the quiz: {}", reason)
            }
            QuizError::SubmissionFailed(_) => {
                "Submitting your answers failed. Your answers are kept, please retry.".to_string()
            }
            QuizError::QuotaExceeded => {
                "You have used all of your quizzes for this month.".to_string()
            }
            QuizError::Network(_) => "Network error. Please try again.".to_string(),
            QuizError::Timeout(_) => "The server took too long to respond.".to_string(),
            QuizError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            QuizError::ConfigError(_) => "Configuration error. Please check settings.".to_string(),
            QuizError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QuizError>;
