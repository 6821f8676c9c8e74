//! Quiz session client
//!
//! The engine talks to the scoring backend only through `QuizClient`.
//! Implementations translate transport failures into `QuizError` values
//! before returning, so the session machine never sees raw transport errors.

use crate::quiz::types::{
    AccessInfo, Correction, Question, QuizResult, QuizSession, QuotaLimit, TopicSelection,
};
use crate::{QuizError, Result};
use futures::future::{self, BoxFuture};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Boxed future returned by every client call
pub type QuizFuture<T> = BoxFuture<'static, Result<T>>;

/// Remote quiz backend
pub trait QuizClient: Send + Sync {
    /// Fetch the caller's current quota snapshot
    fn check_access(&self) -> QuizFuture<AccessInfo>;

    /// Create a new session for the given topic
    fn start_session(&self, topic: TopicSelection) -> QuizFuture<QuizSession>;

    /// Submit exactly one answer per question and receive the scored result
    fn submit_answers(
        &self,
        session_id: String,
        answers: Vec<String>,
        elapsed_seconds: u64,
    ) -> QuizFuture<QuizResult>;
}

/// A question together with the answer it is scored against
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub question: Question,
    pub expected: String,
    pub tip: Option<String>,
    /// Content this question belongs to, matched against `TopicSelection::content_ids`
    pub content_id: Option<String>,
}

impl AnswerKey {
    pub fn new(question: Question, expected: impl Into<String>) -> Self {
        Self {
            question,
            expected: expected.into(),
            tip: None,
            content_id: None,
        }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }

    pub fn with_content(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}

#[derive(Debug)]
struct OfflineState {
    used: u32,
    sessions: HashMap<String, Vec<AnswerKey>>,
}

/// In-process backend with a fixed answer key and a quota counter.
///
/// Scoring ignores case, surrounding whitespace and punctuation. An answer
/// that contains, or is contained in, the expected answer earns partial credit.
#[derive(Clone)]
pub struct OfflineQuizClient {
    bank: Arc<Vec<AnswerKey>>,
    limit: QuotaLimit,
    questions_per_session: usize,
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineQuizClient {
    pub fn new(bank: Vec<AnswerKey>) -> Self {
        Self {
            bank: Arc::new(bank),
            limit: QuotaLimit::Unlimited,
            questions_per_session: 10,
            state: Arc::new(Mutex::new(OfflineState {
                used: 0,
                sessions: HashMap::new(),
            })),
        }
    }

    /// Cap the number of sessions that may be started
    pub fn with_monthly_limit(mut self, limit: u32) -> Self {
        self.limit = QuotaLimit::Limited(limit);
        self
    }

    pub fn with_questions_per_session(mut self, count: usize) -> Self {
        self.questions_per_session = count;
        self
    }

    /// Number of sessions started so far
    pub fn used(&self) -> u32 {
        self.state.lock().used
    }

    fn access_info(&self, used: u32) -> AccessInfo {
        match self.limit {
            QuotaLimit::Unlimited => AccessInfo {
                used,
                ..AccessInfo::unlimited()
            },
            QuotaLimit::Limited(limit) => AccessInfo::limited(limit, used),
        }
    }

    fn create_session(&self, topic: &TopicSelection) -> Result<QuizSession> {
        let mut state = self.state.lock();
        if !self.access_info(state.used).can_use {
            return Err(QuizError::SessionStartFailed(
                "monthly quota exceeded".to_string(),
            ));
        }

        let keys: Vec<AnswerKey> = self
            .bank
            .iter()
            .filter(|key| {
                topic.content_ids.is_empty()
                    || key
                        .content_id
                        .as_ref()
                        .is_some_and(|id| topic.content_ids.contains(id))
            })
            .take(self.questions_per_session)
            .cloned()
            .collect();

        let session = QuizSession {
            session_id: Uuid::new_v4().to_string(),
            questions: keys.iter().map(|key| key.question.clone()).collect(),
        };

        state.used += 1;
        state.sessions.insert(session.session_id.clone(), keys);
        info!(
            "Offline session {} created with {} questions for '{}'",
            session.session_id,
            session.len(),
            topic.topic_group
        );
        Ok(session)
    }

    fn score(&self, session_id: &str, answers: &[String], elapsed_seconds: u64) -> Result<QuizResult> {
        let mut state = self.state.lock();
        let keys = state
            .sessions
            .get(session_id)
            .ok_or_else(|| QuizError::SubmissionFailed(format!("unknown session {}", session_id)))?;

        if keys.len() != answers.len() {
            return Err(QuizError::SubmissionFailed(format!(
                "expected {} answers, got {}",
                keys.len(),
                answers.len()
            )));
        }

        let corrections: Vec<Correction> = keys
            .iter()
            .zip(answers)
            .map(|(key, answer)| grade(key, answer))
            .collect();

        let correct = corrections.iter().filter(|c| c.is_correct).count() as u32;
        let partial = corrections
            .iter()
            .filter(|c| !c.is_correct && c.is_partially_correct)
            .count() as u32;
        let total = corrections.len() as u32;
        let score = if total == 0 {
            0.0
        } else {
            let raw = (correct as f32 + partial as f32 * 0.5) / total as f32 * 100.0;
            (raw * 10.0).round() / 10.0
        };

        state.sessions.remove(session_id);
        debug!(
            "Scored session {} in {}s: {} correct, {} partial of {}",
            session_id, elapsed_seconds, correct, partial, total
        );

        Ok(QuizResult {
            score,
            correct_answers: correct,
            partially_correct: partial,
            total_questions: total,
            corrections,
        })
    }
}

impl QuizClient for OfflineQuizClient {
    fn check_access(&self) -> QuizFuture<AccessInfo> {
        let used = self.state.lock().used;
        Box::pin(future::ready(Ok(self.access_info(used))))
    }

    fn start_session(&self, topic: TopicSelection) -> QuizFuture<QuizSession> {
        Box::pin(future::ready(self.create_session(&topic)))
    }

    fn submit_answers(
        &self,
        session_id: String,
        answers: Vec<String>,
        elapsed_seconds: u64,
    ) -> QuizFuture<QuizResult> {
        Box::pin(future::ready(self.score(
            &session_id,
            &answers,
            elapsed_seconds,
        )))
    }
}

fn grade(key: &AnswerKey, answer: &str) -> Correction {
    let given = normalize_answer(answer);
    let expected = normalize_answer(&key.expected);

    let is_correct = !given.is_empty() && given == expected;
    let is_partially_correct = !is_correct
        && !given.is_empty()
        && (expected.contains(&given) || given.contains(&expected));

    Correction {
        is_correct,
        is_partially_correct,
        user_answer: Some(answer.to_string()),
        suggested_answer: key.expected.clone(),
        tip: if is_correct { None } else { key.tip.clone() },
    }
}

/// Lowercase, drop punctuation and collapse whitespace
pub fn normalize_answer(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::types::QuestionType;

    fn bank() -> Vec<AnswerKey> {
        vec![
            AnswerKey::new(
                Question::new("q1", QuestionType::Conjugation, "manger, je"),
                "je mange",
            )
            .with_content("verbs"),
            AnswerKey::new(
                Question::new("q2", QuestionType::Vocabulary, "dog"),
                "le chien",
            )
            .with_tip("masculine noun")
            .with_content("animals"),
            AnswerKey::new(
                Question::new("q3", QuestionType::Conjugation, "être, nous"),
                "nous sommes",
            )
            .with_content("verbs"),
        ]
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Je MANGE! "), "je mange");
        assert_eq!(normalize_answer("le  chien."), "le chien");
    }

    #[test]
    fn test_content_filter() {
        let client = OfflineQuizClient::new(bank());
        let topic = TopicSelection::new("grammar", vec!["verbs".to_string()]);
        let session = futures::executor::block_on(client.start_session(topic)).unwrap();
        let ids: Vec<_> = session.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q3"]);
    }

    #[test]
    fn test_scoring_with_partial_credit() {
        let client = OfflineQuizClient::new(bank());
        let session =
            futures::executor::block_on(client.start_session(TopicSelection::default())).unwrap();

        let answers = vec![
            "Je mange.".to_string(),
            "chien".to_string(),
            String::new(),
        ];
        let result = futures::executor::block_on(client.submit_answers(
            session.session_id.clone(),
            answers,
            12,
        ))
        .unwrap();

        assert_eq!(result.total_questions, 3);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.partially_correct, 1);
        assert!(result.corrections[1].is_partially_correct);
        assert_eq!(result.corrections[1].tip.as_deref(), Some("masculine noun"));
        assert!(!result.corrections[2].is_correct);
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn test_wrong_answer_count_is_rejected() {
        let client = OfflineQuizClient::new(bank());
        let session =
            futures::executor::block_on(client.start_session(TopicSelection::default())).unwrap();
        let result = futures::executor::block_on(client.submit_answers(
            session.session_id,
            vec![String::new()],
            1,
        ));
        assert!(matches!(result, Err(QuizError::SubmissionFailed(_))));
    }

    #[test]
    fn test_quota_enforced_server_side() {
        let client = OfflineQuizClient::new(bank()).with_monthly_limit(1);
        let access = futures::executor::block_on(client.check_access()).unwrap();
        assert!(access.can_use);
        assert_eq!(access.remaining, 1);

        futures::executor::block_on(client.start_session(TopicSelection::default())).unwrap();
        let access = futures::executor::block_on(client.check_access()).unwrap();
        assert!(!access.can_use);

        let second = futures::executor::block_on(client.start_session(TopicSelection::default()));
        assert!(matches!(second, Err(QuizError::SessionStartFailed(_))));
        assert_eq!(client.used(), 1);
    }
}
