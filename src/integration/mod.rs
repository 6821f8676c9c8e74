//! Engine integration module
//!
//! This module provides the worker that connects the session machine to its
//! collaborators: speech capture, prompt playback, the quiz backend and the
//! celebration effect.

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::{EngineBuilder, EngineCommand, EngineEvent, EngineHandle, QuizEngine};
