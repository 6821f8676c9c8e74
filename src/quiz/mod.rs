//! Quiz domain data and the remote session client
//!
//! This module provides:
//! - The session, question and result records exchanged with the quiz backend
//! - The fixed-size answer accumulator owned by a running session
//! - The `QuizClient` seam and an offline implementation

pub mod accumulator;
pub mod client;
pub mod types;

// Re-export commonly used types
pub use accumulator::AnswerAccumulator;
pub use client::{AnswerKey, OfflineQuizClient, QuizClient, QuizFuture};
pub use types::{
    AccessInfo, Correction, Question, QuestionType, QuizResult, QuizSession, QuotaLimit,
    TopicSelection,
};
