//! Session machine scenario tests
//!
//! These tests drive `QuizMachine` through whole sessions the way the engine
//! would, performing no I/O: effects are inspected and completions are fed
//! back by hand.

use chrono::{Duration, Utc};
use parlequiz::quiz::{
    AccessInfo, Correction, Question, QuestionType, QuizResult, QuizSession,
};
use parlequiz::session::{Effect, Event, QuizMachine, StatusTag};
use parlequiz::speech::{BoutId, CaptureSignal};
use parlequiz::QuizError;
use uuid::Uuid;

/// Machine plus the effects it asked for
struct Harness {
    machine: QuizMachine,
    effects: Vec<Effect>,
}

impl Harness {
    /// Booted machine whose access check has not answered yet
    fn booted() -> Self {
        let mut machine = QuizMachine::new(true);
        let effects = machine.boot();
        Self { machine, effects }
    }

    /// Booted machine with a settled access check
    fn with_access(info: AccessInfo) -> Self {
        let mut harness = Self::booted();
        let request = harness.access_request().expect("boot checks access");
        harness.send(Event::AccessReceived {
            request,
            result: Ok(info),
        });
        harness
    }

    /// Machine in Practice on question 0 of an `n` question session
    fn practicing(n: usize) -> Self {
        let mut harness = Self::with_access(AccessInfo::unlimited());
        harness.send(Event::Start {
            at: Utc::now() - Duration::seconds(42),
        });
        let request = harness.session_request().expect("start requests a session");
        harness.send(Event::SessionReceived {
            request,
            result: Ok(session(n)),
        });
        assert_eq!(harness.status(), StatusTag::Practice);
        harness
    }

    fn send(&mut self, event: Event) -> &[Effect] {
        self.effects = self.machine.handle(event);
        &self.effects
    }

    fn status(&self) -> StatusTag {
        self.machine.status()
    }

    fn access_request(&self) -> Option<Uuid> {
        self.effects.iter().find_map(|e| match e {
            Effect::CheckAccess { request } => Some(*request),
            _ => None,
        })
    }

    fn session_request(&self) -> Option<Uuid> {
        self.effects.iter().find_map(|e| match e {
            Effect::StartSession { request } => Some(*request),
            _ => None,
        })
    }

    fn started_bout(&self) -> Option<BoutId> {
        self.effects.iter().find_map(|e| match e {
            Effect::StartCapture { bout } => Some(*bout),
            _ => None,
        })
    }

    fn submission(&self) -> Option<(Uuid, Vec<String>)> {
        self.effects.iter().find_map(|e| match e {
            Effect::Submit {
                request, answers, ..
            } => Some((*request, answers.clone())),
            _ => None,
        })
    }

    /// Record one bout that hears `text` and ends on its own
    fn speak(&mut self, text: &str) -> BoutId {
        self.send(Event::ToggleMic);
        let bout = self.started_bout().expect("mic toggle starts a bout");
        self.send(Event::Capture(CaptureSignal::Transcript {
            bout,
            text: text.to_string(),
        }));
        self.send(Event::Capture(CaptureSignal::Ended { bout }));
        bout
    }

    /// Speak `text` and validate it
    fn answer(&mut self, text: &str) {
        self.speak(text);
        self.send(Event::Validate);
    }
}

fn session(n: usize) -> QuizSession {
    QuizSession {
        session_id: format!("session-{}", n),
        questions: (0..n)
            .map(|i| {
                Question::new(
                    format!("q{}", i + 1),
                    QuestionType::FillBlank,
                    format!("Question {}", i + 1),
                )
            })
            .collect(),
    }
}

fn result_with_score(score: f32, answers: &[String]) -> QuizResult {
    QuizResult {
        score,
        correct_answers: 0,
        partially_correct: 0,
        total_questions: answers.len() as u32,
        corrections: answers
            .iter()
            .map(|answer| Correction {
                is_correct: false,
                is_partially_correct: false,
                user_answer: Some(answer.clone()),
                suggested_answer: "réponse".to_string(),
                tip: None,
            })
            .collect(),
    }
}

#[test]
fn test_three_question_scenario() {
    let mut harness = Harness::practicing(3);

    harness.answer("ans1");
    assert_eq!(harness.machine.index(), Some(1));
    assert_eq!(harness.machine.transcript(), "");

    harness.answer("ans2");
    assert_eq!(harness.machine.index(), Some(2));

    harness.send(Event::Skip);
    assert_eq!(harness.status(), StatusTag::Submitting);

    let (_, answers) = harness.submission().expect("last commit submits");
    assert_eq!(answers, vec!["ans1", "ans2", ""]);
}

#[test]
fn test_payload_always_has_one_entry_per_question() {
    for n in 1..=6 {
        let mut harness = Harness::practicing(n);
        for i in 0..n {
            if i % 2 == 0 {
                harness.answer(&format!("réponse {}", i));
            } else {
                harness.send(Event::Skip);
            }
        }
        let (_, answers) = harness.submission().expect("submitted after n commits");
        assert_eq!(answers.len(), n);
    }
}

#[test]
fn test_submitting_only_after_last_commit() {
    let mut harness = Harness::practicing(4);
    for _ in 0..3 {
        harness.send(Event::Skip);
        assert_eq!(harness.status(), StatusTag::Practice);
        assert!(harness.submission().is_none());
    }
    harness.send(Event::Skip);
    assert_eq!(harness.status(), StatusTag::Submitting);
}

#[test]
fn test_empty_validate_leaves_state_unchanged() {
    let mut harness = Harness::practicing(2);
    harness.speak("   ");

    let effects = harness.send(Event::Validate).to_vec();
    assert!(effects.is_empty());
    assert_eq!(harness.machine.error(), Some(&QuizError::EmptyAnswer));
    assert_eq!(harness.machine.index(), Some(0));
    assert_eq!(harness.status(), StatusTag::Practice);
}

#[test]
fn test_skip_commits_empty_and_clears_transcript() {
    let mut harness = Harness::practicing(2);
    harness.speak("peut-être");
    assert_eq!(harness.machine.transcript(), "peut-être");

    harness.send(Event::Skip);
    assert_eq!(harness.machine.index(), Some(1));
    assert_eq!(harness.machine.transcript(), "");
    assert_eq!(harness.machine.error(), None);
}

#[test]
fn test_no_transcript_bleed_between_questions() {
    let mut harness = Harness::practicing(2);
    harness.answer("premier");

    harness.send(Event::ToggleMic);
    assert_eq!(harness.status(), StatusTag::Recording);
    assert_eq!(harness.machine.transcript(), "");
}

#[test]
fn test_new_bout_after_auto_end_starts_empty() {
    let mut harness = Harness::practicing(2);
    harness.speak("premier essai");
    assert_eq!(harness.status(), StatusTag::Practice);
    assert_eq!(harness.machine.transcript(), "premier essai");

    harness.send(Event::ToggleMic);
    assert_eq!(harness.status(), StatusTag::Recording);
    assert_eq!(harness.machine.index(), Some(0));
    assert_eq!(harness.machine.transcript(), "");
}

#[test]
fn test_new_bout_after_mic_stop_starts_empty() {
    let mut harness = Harness::practicing(2);
    harness.send(Event::ToggleMic);
    let bout = harness.started_bout().unwrap();
    harness.send(Event::Capture(CaptureSignal::Transcript {
        bout,
        text: "à moitié".to_string(),
    }));

    let effects = harness.send(Event::ToggleMic).to_vec();
    assert_eq!(effects, vec![Effect::StopCapture { bout }]);
    assert_eq!(harness.status(), StatusTag::Practice);
    assert_eq!(harness.machine.transcript(), "à moitié");

    harness.send(Event::ToggleMic);
    let next = harness.started_bout().unwrap();
    assert_ne!(next, bout);
    assert_eq!(harness.machine.index(), Some(0));
    assert_eq!(harness.machine.transcript(), "");
}

#[test]
fn test_late_signal_from_previous_bout_is_ignored() {
    let mut harness = Harness::practicing(2);
    let old = harness.speak("premier");
    harness.send(Event::Validate);

    harness.send(Event::ToggleMic);
    harness.send(Event::Capture(CaptureSignal::Transcript {
        bout: old,
        text: "premier".to_string(),
    }));
    harness.send(Event::Capture(CaptureSignal::Ended { bout: old }));

    assert_eq!(harness.status(), StatusTag::Recording);
    assert_eq!(harness.machine.transcript(), "");
}

#[test]
fn test_reset_returns_to_idle_from_every_state() {
    // Loading
    let mut harness = Harness::with_access(AccessInfo::unlimited());
    harness.send(Event::Start { at: Utc::now() });
    assert_eq!(harness.status(), StatusTag::Loading);
    harness.send(Event::Reset);
    assert_eq!(harness.status(), StatusTag::Idle);
    assert!(harness.access_request().is_some());

    // Practice
    let mut harness = Harness::practicing(2);
    harness.send(Event::Reset);
    assert_eq!(harness.status(), StatusTag::Idle);

    // Recording stops the device
    let mut harness = Harness::practicing(2);
    harness.send(Event::ToggleMic);
    let bout = harness.started_bout().unwrap();
    let effects = harness.send(Event::Reset).to_vec();
    assert!(effects.contains(&Effect::StopCapture { bout }));
    assert_eq!(harness.status(), StatusTag::Idle);

    // Submitting
    let mut harness = Harness::practicing(1);
    harness.send(Event::Skip);
    assert_eq!(harness.status(), StatusTag::Submitting);
    harness.send(Event::Reset);
    assert_eq!(harness.status(), StatusTag::Idle);

    // Results
    let mut harness = Harness::practicing(1);
    harness.answer("oui");
    let (request, answers) = harness.submission().unwrap();
    harness.send(Event::SubmissionReceived {
        request,
        result: Ok(result_with_score(50.0, &answers)),
    });
    assert_eq!(harness.status(), StatusTag::Results);
    harness.send(Event::Reset);
    assert_eq!(harness.status(), StatusTag::Idle);
    assert!(harness.machine.result().is_none());
    assert_eq!(harness.machine.index(), None);
}

#[test]
fn test_stale_submission_after_reset_is_discarded() {
    let mut harness = Harness::practicing(1);
    harness.answer("oui");
    let (request, answers) = harness.submission().unwrap();

    harness.send(Event::Reset);
    let effects = harness
        .send(Event::SubmissionReceived {
            request,
            result: Ok(result_with_score(100.0, &answers)),
        })
        .to_vec();

    assert_eq!(harness.status(), StatusTag::Idle);
    assert!(harness.machine.result().is_none());
    assert!(!effects.contains(&Effect::Celebrate));
}

#[test]
fn test_stale_session_after_reset_is_discarded() {
    let mut harness = Harness::with_access(AccessInfo::unlimited());
    harness.send(Event::Start { at: Utc::now() });
    let request = harness.session_request().unwrap();
    harness.send(Event::Reset);

    harness.send(Event::SessionReceived {
        request,
        result: Ok(session(3)),
    });
    assert_eq!(harness.status(), StatusTag::Idle);
}

#[test]
fn test_celebration_threshold() {
    for (score, celebrates) in [(85.0, true), (80.0, true), (79.0, false)] {
        let mut harness = Harness::practicing(1);
        harness.answer("oui");
        let (request, answers) = harness.submission().unwrap();
        let effects = harness
            .send(Event::SubmissionReceived {
                request,
                result: Ok(result_with_score(score, &answers)),
            })
            .to_vec();

        assert_eq!(harness.status(), StatusTag::Results);
        assert_eq!(
            effects.contains(&Effect::Celebrate),
            celebrates,
            "score {}",
            score
        );
    }
}

#[test]
fn test_exhausted_quota_blocks_start() {
    let mut harness = Harness::with_access(AccessInfo::limited(10, 10));
    let effects = harness.send(Event::Start { at: Utc::now() }).to_vec();

    assert!(effects.is_empty());
    assert_eq!(harness.status(), StatusTag::Idle);
    assert_eq!(harness.machine.error(), Some(&QuizError::QuotaExceeded));
    assert!(!harness.machine.can_start());
}

#[test]
fn test_empty_session_returns_to_idle_with_error() {
    let mut harness = Harness::with_access(AccessInfo::unlimited());
    harness.send(Event::Start { at: Utc::now() });
    let request = harness.session_request().unwrap();

    harness.send(Event::SessionReceived {
        request,
        result: Ok(session(0)),
    });

    assert_eq!(harness.status(), StatusTag::Idle);
    assert!(matches!(
        harness.machine.error(),
        Some(QuizError::SessionStartFailed(_))
    ));
    assert!(harness.access_request().is_some());
}

#[test]
fn test_session_timeout_reports_start_failure() {
    let mut harness = Harness::with_access(AccessInfo::unlimited());
    harness.send(Event::Start { at: Utc::now() });
    let request = harness.session_request().unwrap();

    harness.send(Event::SessionReceived {
        request,
        result: Err(QuizError::Timeout(std::time::Duration::from_secs(30))),
    });

    assert_eq!(harness.status(), StatusTag::Idle);
    assert!(matches!(
        harness.machine.error(),
        Some(QuizError::SessionStartFailed(_))
    ));
}

#[test]
fn test_failed_submission_can_be_retried() {
    let mut harness = Harness::practicing(2);
    harness.answer("un");
    harness.answer("deux");
    let (request, _) = harness.submission().unwrap();

    harness.send(Event::SubmissionReceived {
        request,
        result: Err(QuizError::Network("connection reset".to_string())),
    });
    assert_eq!(harness.status(), StatusTag::Practice);
    assert!(matches!(
        harness.machine.error(),
        Some(QuizError::SubmissionFailed(_))
    ));
    assert!(harness.machine.view().can_retry_submit);

    harness.send(Event::RetrySubmit);
    assert_eq!(harness.status(), StatusTag::Submitting);
    let (retry, answers) = harness.submission().unwrap();
    assert_ne!(retry, request);
    assert_eq!(answers, vec!["un", "deux"]);

    // The first request's late answer no longer counts
    harness.send(Event::SubmissionReceived {
        request,
        result: Ok(result_with_score(100.0, &answers)),
    });
    assert_eq!(harness.status(), StatusTag::Submitting);
}

#[test]
fn test_results_view_carries_feedback() {
    let mut harness = Harness::practicing(2);
    harness.answer("mange");
    harness.send(Event::Skip);
    let (request, answers) = harness.submission().unwrap();
    harness.send(Event::SubmissionReceived {
        request,
        result: Ok(result_with_score(90.0, &answers)),
    });

    let view = harness.machine.view();
    assert_eq!(view.status, StatusTag::Results);
    assert_eq!(view.total, 2);
    let feedback = view.feedback.expect("feedback in Results");
    assert!(feedback.celebrate);
    assert_eq!(feedback.items[0].user_answer, "mange");
    assert_eq!(feedback.items[1].user_answer, "");
}
