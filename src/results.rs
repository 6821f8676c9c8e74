//! Result renderer
//!
//! Turns a scored session into a feedback view. Pure: the same session,
//! answers and result always render the same view.

use crate::celebration::CelebrationConfig;
use crate::quiz::{Correction, QuestionType, QuizResult, QuizSession};
use std::fmt;

/// Feedback tier of one correction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Correct,
    Partial,
    Incorrect,
}

impl Tier {
    /// `is_correct` wins if the backend sets both flags
    pub fn of(correction: &Correction) -> Self {
        if correction.is_correct {
            Tier::Correct
        } else if correction.is_partially_correct {
            Tier::Partial
        } else {
            Tier::Incorrect
        }
    }

    fn marker(&self) -> &'static str {
        match self {
            Tier::Correct => "✓",
            Tier::Partial => "~",
            Tier::Incorrect => "✗",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackItem {
    /// 1-based question number
    pub number: usize,
    pub prompt: String,
    pub kind: Option<QuestionType>,
    pub tier: Tier,
    /// Empty when the question was skipped
    pub user_answer: String,
    pub suggested_answer: String,
    pub tip: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackView {
    pub score: f32,
    pub headline: String,
    pub correct: u32,
    pub partial: u32,
    pub total: u32,
    pub items: Vec<FeedbackItem>,
    pub celebrate: bool,
}

/// Headline for a score band
pub fn headline_for(score: f32) -> &'static str {
    if score >= 80.0 {
        "Excellent work!"
    } else if score >= 50.0 {
        "Good progress, keep going."
    } else {
        "Keep practising, you will get there."
    }
}

/// Build the feedback view.
///
/// `answers` is the payload that was submitted; it stands in for the
/// backend's echo of each answer when that echo is missing or empty.
pub fn render(
    session: &QuizSession,
    answers: &[String],
    result: &QuizResult,
    celebration: &CelebrationConfig,
) -> FeedbackView {
    let items = result
        .corrections
        .iter()
        .enumerate()
        .map(|(i, correction)| {
            let question = session.question(i);
            let echoed = correction
                .user_answer
                .as_deref()
                .map(str::trim)
                .filter(|answer| !answer.is_empty());
            let user_answer = echoed
                .or_else(|| answers.get(i).map(|a| a.trim()))
                .unwrap_or_default()
                .to_string();

            FeedbackItem {
                number: i + 1,
                prompt: question.map(|q| q.text.clone()).unwrap_or_default(),
                kind: question.map(|q| q.kind),
                tier: Tier::of(correction),
                user_answer,
                suggested_answer: correction.suggested_answer.clone(),
                tip: correction.tip.clone(),
            }
        })
        .collect();

    FeedbackView {
        score: result.score,
        headline: headline_for(result.score).to_string(),
        correct: result.correct_answers,
        partial: result.partially_correct,
        total: result.total_questions,
        items,
        celebrate: celebration.should_celebrate(result.score),
    }
}

impl fmt::Display for FeedbackView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score: {:.0}%  {}", self.score, self.headline)?;
        writeln!(
            f,
            "{} correct, {} partially correct, {} questions",
            self.correct, self.partial, self.total
        )?;

        for item in &self.items {
            writeln!(f)?;
            writeln!(f, "{} {}. {}", item.tier.marker(), item.number, item.prompt)?;
            if item.user_answer.is_empty() {
                writeln!(f, "   Your answer: (skipped)")?;
            } else {
                writeln!(f, "   Your answer: {}", item.user_answer)?;
            }
            if item.tier != Tier::Correct {
                writeln!(f, "   Suggested:   {}", item.suggested_answer)?;
            }
            if let Some(tip) = &item.tip {
                writeln!(f, "   Tip: {}", tip)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Question;

    fn correction(is_correct: bool, partial: bool, echo: Option<&str>) -> Correction {
        Correction {
            is_correct,
            is_partially_correct: partial,
            user_answer: echo.map(str::to_string),
            suggested_answer: "nous sommes".to_string(),
            tip: None,
        }
    }

    fn session(n: usize) -> QuizSession {
        QuizSession {
            session_id: "s1".to_string(),
            questions: (0..n)
                .map(|i| Question::new(format!("q{}", i), QuestionType::Conjugation, format!("Q{}", i)))
                .collect(),
        }
    }

    #[test]
    fn test_tier_precedence() {
        assert_eq!(Tier::of(&correction(true, true, None)), Tier::Correct);
        assert_eq!(Tier::of(&correction(false, true, None)), Tier::Partial);
        assert_eq!(Tier::of(&correction(false, false, None)), Tier::Incorrect);
    }

    #[test]
    fn test_missing_echo_uses_submitted_answer() {
        let result = QuizResult {
            score: 50.0,
            correct_answers: 1,
            partially_correct: 0,
            total_questions: 2,
            corrections: vec![
                correction(true, false, Some("nous sommes")),
                correction(false, false, Some("  ")),
            ],
        };
        let answers = vec!["nous sommes".to_string(), "nous êtes".to_string()];
        let view = render(&session(2), &answers, &result, &CelebrationConfig::default());

        assert_eq!(view.items[0].user_answer, "nous sommes");
        assert_eq!(view.items[1].user_answer, "nous êtes");
        assert_eq!(view.items[1].prompt, "Q1");
        assert!(!view.celebrate);
    }

    #[test]
    fn test_celebration_flag() {
        let result = QuizResult {
            score: 85.0,
            correct_answers: 1,
            partially_correct: 0,
            total_questions: 1,
            corrections: vec![correction(true, false, None)],
        };
        let view = render(&session(1), &[String::new()], &result, &CelebrationConfig::default());
        assert!(view.celebrate);
        assert_eq!(view.headline, "Excellent work!");
    }

    #[test]
    fn test_display_marks_skipped() {
        let result = QuizResult {
            score: 0.0,
            correct_answers: 0,
            partially_correct: 0,
            total_questions: 1,
            corrections: vec![correction(false, false, None)],
        };
        let text = render(&session(1), &[String::new()], &result, &CelebrationConfig::default())
            .to_string();
        assert!(text.contains("(skipped)"));
        assert!(text.contains("Suggested:   nous sommes"));
    }
}
