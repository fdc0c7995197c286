// src/attempt/scorer.rs

use serde::{Deserialize, Serialize};

use super::{AnswerMap, answer::is_answered};
use crate::models::question::Question;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: i64,
    pub answered: bool,
    pub correct: bool,
    pub points_earned: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub correct_count: usize,
    pub total_questions: usize,
    pub earned_points: i64,
    pub total_points: i64,

    /// Point-weighted, 0-100.
    pub score: i64,

    /// Every question weighs the same, 0-100.
    pub percentage: i64,

    /// One entry per question, in question order.
    pub outcomes: Vec<QuestionOutcome>,
}

/// Normalization applied to both sides before comparing answers.
pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Scores an answer map against the answer key.
///
/// Pure: the same inputs always give the same report. Comparison is exact
/// after [`normalize_answer`]; there is no partial credit and math answers
/// are compared as text.
pub fn score(questions: &[Question], answers: &AnswerMap) -> ScoreReport {
    let mut correct_count = 0;
    let mut earned_points = 0i64;
    let mut total_points = 0i64;

    let outcomes: Vec<QuestionOutcome> = questions
        .iter()
        .map(|question| {
            let points = i64::from(question.points);
            total_points += points;

            let submitted = answers.get(&question.id).map(String::as_str);
            let answered = is_answered(submitted);
            let correct = answered
                && submitted.is_some_and(|value| {
                    normalize_answer(value) == normalize_answer(&question.answer)
                });

            if correct {
                correct_count += 1;
                earned_points += points;
            }

            QuestionOutcome {
                question_id: question.id,
                answered,
                correct,
                points_earned: if correct { points } else { 0 },
            }
        })
        .collect();

    ScoreReport {
        correct_count,
        total_questions: questions.len(),
        earned_points,
        total_points,
        score: rounded_percent(earned_points, total_points),
        percentage: rounded_percent(correct_count as i64, questions.len() as i64),
        outcomes,
    }
}

/// `round(part / whole * 100)`, halves rounding up, clamped to 0-100.
/// Zero when `whole` is not positive.
fn rounded_percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    ((part * 200 + whole) / (whole * 2)).clamp(0, 100)
}
