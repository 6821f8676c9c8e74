//! Per-phase session data
//!
//! Each phase carries exactly the data it needs, so a phase that shows a
//! question always has a session and a valid index to show.

use crate::quiz::{AnswerAccumulator, Question, QuizResult, QuizSession};
use crate::speech::BoutId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Coarse phase label for the view layer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusTag {
    #[default]
    Idle,
    Loading,
    Practice,
    Recording,
    Submitting,
    Results,
}

impl StatusTag {
    /// Waiting on the backend
    pub fn is_busy(&self) -> bool {
        matches!(self, StatusTag::Loading | StatusTag::Submitting)
    }
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusTag::Idle => write!(f, "Idle"),
            StatusTag::Loading => write!(f, "Loading"),
            StatusTag::Practice => write!(f, "Practice"),
            StatusTag::Recording => write!(f, "Recording"),
            StatusTag::Submitting => write!(f, "Submitting"),
            StatusTag::Results => write!(f, "Results"),
        }
    }
}

/// A session being answered
#[derive(Clone, Debug, PartialEq)]
pub struct Practice {
    pub session: QuizSession,
    /// Always in `0..session.len()`
    pub index: usize,
    pub answers: AnswerAccumulator,
    /// Uncommitted text from the latest bout
    pub transcript: String,
    pub started_at: DateTime<Utc>,
}

/// What a commit did to the question index
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    Next,
    Complete,
}

impl Practice {
    pub fn new(session: QuizSession, started_at: DateTime<Utc>) -> Self {
        Self {
            session,
            index: 0,
            answers: AnswerAccumulator::new(),
            transcript: String::new(),
            started_at,
        }
    }

    pub fn total(&self) -> usize {
        self.session.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.question(self.index)
    }

    pub fn has_answer(&self) -> bool {
        !self.transcript.trim().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.is_complete(self.total())
    }

    /// Commit `text` at the current index and move forward.
    ///
    /// The index stays on the last question once every slot is filled.
    pub fn commit(&mut self, text: String) -> Advance {
        self.answers.commit(self.index, text);
        self.transcript.clear();
        if self.index + 1 < self.total() {
            self.index += 1;
            Advance::Next
        } else {
            Advance::Complete
        }
    }

    /// Submission payload, one entry per question
    pub fn payload(&self) -> Vec<String> {
        self.answers.to_ordered_array(self.total())
    }
}

/// A scored session kept for display
#[derive(Clone, Debug, PartialEq)]
pub struct Completed {
    pub session: QuizSession,
    /// Answers as they were submitted
    pub answers: Vec<String>,
    pub result: QuizResult,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Loading {
        request: Uuid,
        started_at: DateTime<Utc>,
    },
    Practice(Practice),
    Recording {
        practice: Practice,
        bout: BoutId,
    },
    Submitting {
        practice: Practice,
        request: Uuid,
    },
    Results(Completed),
}

impl Phase {
    pub fn tag(&self) -> StatusTag {
        match self {
            Phase::Idle => StatusTag::Idle,
            Phase::Loading { .. } => StatusTag::Loading,
            Phase::Practice(_) => StatusTag::Practice,
            Phase::Recording { .. } => StatusTag::Recording,
            Phase::Submitting { .. } => StatusTag::Submitting,
            Phase::Results(_) => StatusTag::Results,
        }
    }

    /// The running session, in any phase that has one
    pub fn practice(&self) -> Option<&Practice> {
        match self {
            Phase::Practice(practice)
            | Phase::Recording { practice, .. }
            | Phase::Submitting { practice, .. } => Some(practice),
            _ => None,
        }
    }

    pub fn completed(&self) -> Option<&Completed> {
        match self {
            Phase::Results(completed) => Some(completed),
            _ => None,
        }
    }

    pub fn active_bout(&self) -> Option<BoutId> {
        match self {
            Phase::Recording { bout, .. } => Some(*bout),
            _ => None,
        }
    }
}
