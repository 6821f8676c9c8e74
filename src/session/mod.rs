//! Voice quiz session engine core
//!
//! This module provides:
//! - The per-phase session data (`Phase`, `Practice`)
//! - The access gate consulted before a session may start
//! - The `QuizMachine` reducer that owns every state transition

pub mod access;
pub mod machine;
pub mod state;

pub use access::AccessGate;
pub use machine::{elapsed_seconds, Effect, Event, QuizMachine, SessionView};
pub use state::{Advance, Completed, Phase, Practice, StatusTag};
