//! Quiz session state machine
//!
//! `QuizMachine::handle` is the only way session state changes. It applies one
//! event atomically and returns the side effects the caller must perform
//! (start a bout, call the backend, fire the celebration). It performs no I/O
//! itself, which keeps every transition testable without devices or network.
//!
//! Every asynchronous completion carries the id of the request or bout that
//! produced it. A completion whose id no longer matches the current phase is
//! stale (the session was reset or restarted meanwhile) and is dropped.

use crate::celebration::CelebrationConfig;
use crate::quiz::{AccessInfo, Question, QuizResult, QuizSession};
use crate::results::{self, FeedbackView};
use crate::session::access::AccessGate;
use crate::session::state::{Advance, Completed, Phase, Practice, StatusTag};
use crate::speech::{BoutId, CaptureSignal};
use crate::{QuizError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Inputs to the machine: user actions, device signals and backend completions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Begin a new session
    Start { at: DateTime<Utc> },

    /// `start_session` finished
    SessionReceived {
        request: Uuid,
        result: Result<QuizSession>,
    },

    /// Mic button: start a bout in Practice, stop it in Recording
    ToggleMic,

    /// Signal from the capture device
    Capture(CaptureSignal),

    /// Commit the transcript as the answer
    Validate,

    /// Commit an empty answer
    Skip,

    /// Re-send answers after a failed submission
    RetrySubmit,

    /// `submit_answers` finished
    SubmissionReceived {
        request: Uuid,
        result: Result<QuizResult>,
    },

    /// `check_access` finished
    AccessReceived {
        request: Uuid,
        result: Result<AccessInfo>,
    },

    /// Read the current question aloud
    SpeakPrompt,

    /// Abandon everything and return to Idle
    Reset,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    CheckAccess {
        request: Uuid,
    },
    StartSession {
        request: Uuid,
    },
    StartCapture {
        bout: BoutId,
    },
    StopCapture {
        bout: BoutId,
    },
    Submit {
        request: Uuid,
        session_id: String,
        answers: Vec<String>,
        started_at: DateTime<Utc>,
    },
    Celebrate,
    Speak(String),
}

/// Read-only picture of the machine for the view layer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionView {
    pub status: StatusTag,
    /// Current question index while a session is running
    pub index: Option<usize>,
    pub total: usize,
    pub answered: usize,
    pub question: Option<Question>,
    pub transcript: String,
    pub error: Option<QuizError>,
    pub result: Option<QuizResult>,
    /// Rendered corrections, in Results only
    pub feedback: Option<FeedbackView>,
    pub access: String,
    pub can_start: bool,
    pub can_validate: bool,
    pub can_retry_submit: bool,
}

impl SessionView {
    /// User-facing message for the current error
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(QuizError::user_message)
    }
}

/// Whole seconds between `started_at` and `now`, never negative
pub fn elapsed_seconds(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - started_at).num_seconds().max(0) as u64
}

pub struct QuizMachine {
    phase: Phase,
    access: AccessGate,
    error: Option<QuizError>,
    speech_supported: bool,
    celebration: CelebrationConfig,
}

impl QuizMachine {
    pub fn new(speech_supported: bool) -> Self {
        Self {
            phase: Phase::Idle,
            access: AccessGate::Unknown,
            error: None,
            speech_supported,
            celebration: CelebrationConfig::default(),
        }
    }

    pub fn with_celebration(mut self, celebration: CelebrationConfig) -> Self {
        self.celebration = celebration;
        self
    }

    /// Enter Idle for the first time, requesting the initial quota check
    pub fn boot(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.speech_supported {
            self.error = Some(QuizError::Unsupported);
        }
        self.phase = self.enter_idle(&mut effects);
        effects
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn status(&self) -> StatusTag {
        self.phase.tag()
    }

    pub fn access(&self) -> &AccessGate {
        &self.access
    }

    pub fn error(&self) -> Option<&QuizError> {
        self.error.as_ref()
    }

    pub fn index(&self) -> Option<usize> {
        self.phase.practice().map(|p| p.index)
    }

    pub fn transcript(&self) -> &str {
        self.phase
            .practice()
            .map(|p| p.transcript.as_str())
            .unwrap_or_default()
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.phase.completed().map(|c| &c.result)
    }

    pub fn can_start(&self) -> bool {
        matches!(self.phase, Phase::Idle) && self.speech_supported && self.access.can_start()
    }

    /// Feedback for the scored session, in Results only
    pub fn feedback(&self) -> Option<FeedbackView> {
        self.phase
            .completed()
            .map(|c| results::render(&c.session, &c.answers, &c.result, &self.celebration))
    }

    pub fn view(&self) -> SessionView {
        let practice = self.phase.practice();
        SessionView {
            status: self.status(),
            index: practice.map(|p| p.index),
            total: practice
                .map(|p| p.total())
                .or_else(|| self.phase.completed().map(|c| c.session.len()))
                .unwrap_or(0),
            answered: practice.map(|p| p.answers.len()).unwrap_or(0),
            question: practice.and_then(|p| p.current_question().cloned()),
            transcript: self.transcript().to_string(),
            error: self.error.clone(),
            result: self.result().cloned(),
            feedback: self.feedback(),
            access: self.access.describe(),
            can_start: self.can_start(),
            can_validate: matches!(self.phase, Phase::Practice(_) | Phase::Recording { .. })
                && practice.is_some_and(Practice::has_answer),
            can_retry_submit: matches!(&self.phase, Phase::Practice(p) if p.is_complete()),
        }
    }

    /// Apply one event and return the effects to perform
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        let phase = std::mem::take(&mut self.phase);
        let before = phase.tag();
        self.phase = self.transition(phase, event, &mut effects);
        if before != self.phase.tag() {
            debug!("Session {} -> {}", before, self.phase.tag());
        }
        effects
    }

    fn transition(&mut self, phase: Phase, event: Event, effects: &mut Vec<Effect>) -> Phase {
        match event {
            Event::Reset => self.reset(phase, effects),

            Event::AccessReceived { request, result } => {
                self.apply_access(request, result);
                phase
            }

            Event::SpeakPrompt => {
                if let Some(question) = phase.practice().and_then(Practice::current_question) {
                    effects.push(Effect::Speak(question.text.clone()));
                }
                phase
            }

            Event::Start { at } => match phase {
                Phase::Idle => self.start(at, effects),
                other => {
                    debug!("Start ignored in {}", other.tag());
                    other
                }
            },

            Event::SessionReceived { request, result } => match phase {
                Phase::Loading {
                    request: expected,
                    started_at,
                } if expected == request => self.session_received(result, started_at, effects),
                other => {
                    debug!("Discarding stale session response {}", request);
                    other
                }
            },

            Event::ToggleMic => match phase {
                Phase::Practice(practice) => self.begin_bout(practice, effects),
                Phase::Recording { practice, bout } => {
                    effects.push(Effect::StopCapture { bout });
                    Phase::Practice(practice)
                }
                other => {
                    debug!("Mic toggle ignored in {}", other.tag());
                    other
                }
            },

            Event::Capture(signal) => match phase {
                Phase::Recording { practice, bout } if bout == signal.bout() => {
                    self.capture_signal(practice, bout, signal)
                }
                other => {
                    debug!("Discarding stale capture signal from {}", signal.bout());
                    other
                }
            },

            Event::Validate => match phase {
                Phase::Practice(practice) => self.validate(practice, None, effects),
                Phase::Recording { practice, bout } => self.validate(practice, Some(bout), effects),
                other => other,
            },

            Event::Skip => match phase {
                Phase::Practice(practice) => self.commit(practice, String::new(), effects),
                Phase::Recording { practice, bout } => {
                    effects.push(Effect::StopCapture { bout });
                    self.commit(practice, String::new(), effects)
                }
                other => other,
            },

            Event::RetrySubmit => match phase {
                Phase::Practice(practice) if practice.is_complete() => {
                    self.error = None;
                    self.submit(practice, effects)
                }
                other => {
                    debug!("Retry ignored in {}", other.tag());
                    other
                }
            },

            Event::SubmissionReceived { request, result } => match phase {
                Phase::Submitting {
                    practice,
                    request: expected,
                } if expected == request => self.submission_received(practice, result, effects),
                other => {
                    debug!("Discarding stale submission response {}", request);
                    other
                }
            },
        }
    }

    fn enter_idle(&mut self, effects: &mut Vec<Effect>) -> Phase {
        let request = Uuid::new_v4();
        self.access = AccessGate::Checking(request);
        effects.push(Effect::CheckAccess { request });
        Phase::Idle
    }

    fn reset(&mut self, phase: Phase, effects: &mut Vec<Effect>) -> Phase {
        if let Some(bout) = phase.active_bout() {
            effects.push(Effect::StopCapture { bout });
        }
        info!("Session reset from {}", phase.tag());
        self.error = if self.speech_supported {
            None
        } else {
            Some(QuizError::Unsupported)
        };
        self.enter_idle(effects)
    }

    fn apply_access(&mut self, request: Uuid, result: Result<AccessInfo>) {
        if self.access != AccessGate::Checking(request) {
            debug!("Discarding stale access response {}", request);
            return;
        }
        self.access = match result {
            Ok(info) => AccessGate::Known(info),
            Err(e) => {
                warn!("Quota check failed, allowing start: {}", e);
                AccessGate::Unknown
            }
        };
    }

    fn start(&mut self, at: DateTime<Utc>, effects: &mut Vec<Effect>) -> Phase {
        if !self.speech_supported {
            self.error = Some(QuizError::Unsupported);
            return Phase::Idle;
        }

        match self.access.start_blocker() {
            Ok(true) => {}
            Ok(false) => {
                debug!("Start ignored while the quota check is in flight");
                return Phase::Idle;
            }
            Err(e) => {
                self.error = Some(e);
                return Phase::Idle;
            }
        }

        self.error = None;
        let request = Uuid::new_v4();
        effects.push(Effect::StartSession { request });
        Phase::Loading {
            request,
            started_at: at,
        }
    }

    fn session_received(
        &mut self,
        result: Result<QuizSession>,
        started_at: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Phase {
        match result {
            Ok(session) if !session.is_empty() => {
                info!(
                    "Session {} started with {} questions",
                    session.session_id,
                    session.len()
                );
                Phase::Practice(Practice::new(session, started_at))
            }
            Ok(session) => {
                warn!("Session {} has no questions", session.session_id);
                self.error = Some(QuizError::SessionStartFailed(
                    "the quiz contains no questions".to_string(),
                ));
                self.enter_idle(effects)
            }
            Err(e) => {
                warn!("Session start failed: {}", e);
                self.error = Some(as_start_failure(e));
                self.enter_idle(effects)
            }
        }
    }

    fn begin_bout(&mut self, mut practice: Practice, effects: &mut Vec<Effect>) -> Phase {
        if !self.speech_supported {
            self.error = Some(QuizError::Unsupported);
            return Phase::Practice(practice);
        }

        let bout = BoutId::new();
        practice.transcript.clear();
        self.error = None;
        effects.push(Effect::StartCapture { bout });
        Phase::Recording { practice, bout }
    }

    fn capture_signal(&mut self, mut practice: Practice, bout: BoutId, signal: CaptureSignal) -> Phase {
        match signal {
            CaptureSignal::Transcript { text, .. } => {
                practice.transcript = text;
                Phase::Recording { practice, bout }
            }
            CaptureSignal::Ended { .. } => Phase::Practice(practice),
            CaptureSignal::Failed { error, .. } => {
                warn!("Capture {} failed: {}", bout, error);
                self.error = Some(error);
                Phase::Practice(practice)
            }
        }
    }

    fn validate(
        &mut self,
        practice: Practice,
        bout: Option<BoutId>,
        effects: &mut Vec<Effect>,
    ) -> Phase {
        if !practice.has_answer() {
            self.error = Some(QuizError::EmptyAnswer);
            return match bout {
                Some(bout) => Phase::Recording { practice, bout },
                None => Phase::Practice(practice),
            };
        }

        if let Some(bout) = bout {
            effects.push(Effect::StopCapture { bout });
        }
        let answer = practice.transcript.trim().to_string();
        self.commit(practice, answer, effects)
    }

    fn commit(&mut self, mut practice: Practice, answer: String, effects: &mut Vec<Effect>) -> Phase {
        self.error = None;
        match practice.commit(answer) {
            Advance::Next => Phase::Practice(practice),
            Advance::Complete => self.submit(practice, effects),
        }
    }

    fn submit(&mut self, practice: Practice, effects: &mut Vec<Effect>) -> Phase {
        let request = Uuid::new_v4();
        info!(
            "Submitting {} answers for session {}",
            practice.total(),
            practice.session.session_id
        );
        effects.push(Effect::Submit {
            request,
            session_id: practice.session.session_id.clone(),
            answers: practice.payload(),
            started_at: practice.started_at,
        });
        Phase::Submitting { practice, request }
    }

    fn submission_received(
        &mut self,
        practice: Practice,
        result: Result<QuizResult>,
        effects: &mut Vec<Effect>,
    ) -> Phase {
        match result {
            Ok(result) => {
                info!(
                    "Session {} scored {:.1}%",
                    practice.session.session_id, result.score
                );
                if self.celebration.should_celebrate(result.score) {
                    effects.push(Effect::Celebrate);
                }
                let answers = practice.payload();
                Phase::Results(Completed {
                    session: practice.session,
                    answers,
                    result,
                })
            }
            Err(e) => {
                warn!("Submission failed, answers kept: {}", e);
                self.error = Some(as_submission_failure(e));
                Phase::Practice(practice)
            }
        }
    }
}

fn as_start_failure(error: QuizError) -> QuizError {
    match error {
        QuizError::SessionStartFailed(_) => error,
        other => QuizError::SessionStartFailed(other.to_string()),
    }
}

fn as_submission_failure(error: QuizError) -> QuizError {
    match error {
        QuizError::SubmissionFailed(_) => error,
        other => QuizError::SubmissionFailed(other.to_string()),
    }
}
