use serde::{Deserialize, Serialize};

/// Kind of quiz item. Descriptive only, the session flow is identical for all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Conjugation,
    GrammarCorrection,
    SentenceCompletion,
    FreeWriting,
    Vocabulary,
    WordReorder,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            QuestionType::MultipleChoice => "Multiple choice",
            QuestionType::TrueFalse => "True / false",
            QuestionType::FillBlank => "Fill in the blank",
            QuestionType::Conjugation => "Conjugation",
            QuestionType::GrammarCorrection => "Grammar correction",
            QuestionType::SentenceCompletion => "Sentence completion",
            QuestionType::FreeWriting => "Free writing",
            QuestionType::Vocabulary => "Vocabulary",
            QuestionType::WordReorder => "Word reorder",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl Question {
    pub fn new(id: impl Into<String>, kind: QuestionType, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            options: None,
            hint: None,
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// One quiz attempt as created by the backend. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub session_id: String,
    pub questions: Vec<Question>,
}

impl QuizSession {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// Which content a session is generated from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSelection {
    #[serde(alias = "topic_group")]
    pub topic_group: String,
    #[serde(default, alias = "content_ids")]
    pub content_ids: Vec<String>,
}

impl TopicSelection {
    pub fn new(topic_group: impl Into<String>, content_ids: Vec<String>) -> Self {
        Self {
            topic_group: topic_group.into(),
            content_ids,
        }
    }
}

/// Scored feedback for a single question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub is_correct: bool,
    #[serde(default)]
    pub is_partially_correct: bool,
    #[serde(default)]
    pub user_answer: Option<String>,
    pub suggested_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Percentage in 0..=100
    pub score: f32,
    pub correct_answers: u32,
    pub partially_correct: u32,
    pub total_questions: u32,
    pub corrections: Vec<Correction>,
}

/// Monthly quota ceiling. Negative values on the wire mean unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum QuotaLimit {
    Limited(u32),
    Unlimited,
}

impl From<i64> for QuotaLimit {
    fn from(raw: i64) -> Self {
        if raw < 0 {
            QuotaLimit::Unlimited
        } else {
            QuotaLimit::Limited(raw.min(u32::MAX as i64) as u32)
        }
    }
}

impl From<QuotaLimit> for i64 {
    fn from(limit: QuotaLimit) -> Self {
        match limit {
            QuotaLimit::Limited(n) => n as i64,
            QuotaLimit::Unlimited => -1,
        }
    }
}

/// Quota snapshot, refreshed once per Idle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessInfo {
    pub can_use: bool,
    pub limit: QuotaLimit,
    #[serde(default)]
    pub used: u32,
    #[serde(default)]
    pub remaining: u32,
}

impl AccessInfo {
    pub fn unlimited() -> Self {
        Self {
            can_use: true,
            limit: QuotaLimit::Unlimited,
            used: 0,
            remaining: 0,
        }
    }

    pub fn limited(limit: u32, used: u32) -> Self {
        let remaining = limit.saturating_sub(used);
        Self {
            can_use: remaining > 0,
            limit: QuotaLimit::Limited(limit),
            used,
            remaining,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self.limit, QuotaLimit::Unlimited)
    }
}
