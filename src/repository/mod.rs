// src/repository/mod.rs

//! Storage port for the quiz service.
//!
//! Handlers only talk to [`QuizRepository`]; the Postgres implementation is
//! used in production and the in-memory one for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptResult, LeaderboardEntry, NewAttemptResult},
        question::{NewQuestion, Question},
        quiz::{NewQuiz, Quiz, QuizSummary},
        user::User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[async_trait]
pub trait QuizRepository: Send + Sync {
    // --- Users ---
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    // --- Quizzes ---
    async fn list_public_quizzes(&self) -> Result<Vec<QuizSummary>, AppError>;
    /// Loads a quiz with its questions in order.
    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;
    async fn create_quiz(&self, created_by: i64, quiz: NewQuiz) -> Result<Quiz, AppError>;
    /// Appends a question at the end of the quiz. `NotFound` if the quiz is missing.
    async fn add_question(&self, quiz_id: i64, question: NewQuestion) -> Result<Question, AppError>;
    /// Returns false when there was nothing to delete. Results go with the quiz.
    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError>;

    // --- Results ---
    async fn count_attempts(&self, quiz_id: i64, user_id: i64) -> Result<i64, AppError>;
    /// Stores a result unless the user already has `max_attempts` results for
    /// the quiz, in which case it fails with `Conflict`. The count and the
    /// insert are atomic.
    async fn insert_result(&self, result: NewAttemptResult, max_attempts: i32) -> Result<AttemptResult, AppError>;
    /// Best result per user, ranked by [`rank_best_per_user`] order.
    async fn leaderboard(&self, quiz_id: i64, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError>;
    /// Newest first.
    async fn results_for_user(&self, user_id: i64) -> Result<Vec<AttemptResult>, AppError>;
    async fn find_result(&self, id: i64) -> Result<Option<AttemptResult>, AppError>;
}

/// The error for a user who has used every allowed attempt.
pub fn attempts_exhausted(used: i64, max_attempts: i32) -> AppError {
    AppError::Conflict(format!(
        "Maximum attempts reached ({} of {})",
        used, max_attempts
    ))
}

/// Keeps each user's best entry and ranks them: higher score first, then
/// faster time, then earlier completion.
pub fn rank_best_per_user(entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    let mut best: HashMap<i64, LeaderboardEntry> = HashMap::new();
    for entry in entries {
        match best.get(&entry.user_id) {
            Some(current) if !ranks_before(&entry, current) => {}
            _ => {
                best.insert(entry.user_id, entry);
            }
        }
    }

    let mut ranked: Vec<LeaderboardEntry> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.time_taken.cmp(&b.time_taken))
            .then(a.completed_at.cmp(&b.completed_at))
    });
    ranked.truncate(limit);
    ranked
}

fn ranks_before(a: &LeaderboardEntry, b: &LeaderboardEntry) -> bool {
    (std::cmp::Reverse(a.score), a.time_taken, a.completed_at)
        < (std::cmp::Reverse(b.score), b.time_taken, b.completed_at)
}
