// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::attempt::AnswerMap;

/// A scored, submitted quiz attempt. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub id: i64,
    pub quiz_id: i64,
    pub user_id: i64,
    pub correct_answers: i32,
    pub total_questions: i32,

    /// Point-weighted score, 0-100.
    pub score: i32,

    /// Share of questions answered correctly, 0-100.
    pub percentage: i32,

    /// Seconds.
    pub time_taken: i64,

    pub answers: AnswerMap,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// An attempt result before it is assigned an ID.
#[derive(Debug, Clone)]
pub struct NewAttemptResult {
    pub quiz_id: i64,
    pub user_id: i64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub score: i32,
    pub percentage: i32,
    pub time_taken: i64,
    pub answers: AnswerMap,
}

/// Aggregated row for the leaderboard: one entry per user, their best attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: String,
    pub score: i32,
    pub percentage: i32,
    pub time_taken: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for checking an access code.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AccessRequest {
    pub access_code: Option<String>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitAttemptRequest {
    /// User's answers map.
    /// Key: Question ID
    /// Value: submitted answer text
    #[serde(default)]
    pub answers: AnswerMap,

    /// Seconds since the attempt started, suspended time included, so there
    /// is no upper bound.
    #[validate(range(min = 0))]
    pub time_taken: i64,

    /// Private quizzes are gated again on submit.
    pub access_code: Option<String>,
}

/// Per-question feedback shown after submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: i64,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub correct: bool,
    pub points_earned: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub result_id: i64,
    pub score: i32,
    pub percentage: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_taken: i64,
    pub review: Vec<QuestionReview>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(time_taken: i64) -> SubmitAttemptRequest {
        SubmitAttemptRequest {
            answers: AnswerMap::new(),
            time_taken,
            access_code: None,
        }
    }

    #[test]
    fn test_time_taken_has_no_upper_bound() {
        assert!(request(0).validate().is_ok());
        // An attempt resumed weeks after it started.
        assert!(request(30 * 24 * 3600).validate().is_ok());
        assert!(request(-1).validate().is_err());
    }
}
