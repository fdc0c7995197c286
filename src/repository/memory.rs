// src/repository/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{QuizRepository, attempts_exhausted, rank_best_per_user};
use crate::{
    error::AppError,
    models::{
        attempt::{AttemptResult, LeaderboardEntry, NewAttemptResult},
        question::{NewQuestion, Question},
        quiz::{NewQuiz, Quiz, QuizSummary},
        user::User,
    },
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    quizzes: BTreeMap<i64, Quiz>,
    results: BTreeMap<i64, AttemptResult>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repository kept entirely in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn build_question(id: i64, quiz_id: i64, position: i32, q: NewQuestion) -> Question {
    Question {
        id,
        quiz_id,
        position,
        content: q.content,
        question_type: q.question_type,
        options: q.options,
        answer: q.answer,
        explanation: q.explanation,
        points: q.points,
        image_url: q.image_url,
    }
}

#[async_trait]
impl QuizRepository for MemoryRepository {
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }
        let id = tables.next_id();
        let user = User {
            id,
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Some(Utc::now()),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_public_quizzes(&self) -> Result<Vec<QuizSummary>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .quizzes
            .values()
            .rev()
            .filter(|q| q.is_public)
            .map(Quiz::summary)
            .collect())
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn create_quiz(&self, created_by: i64, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let mut tables = self.tables.write().await;
        let quiz_id = tables.next_id();
        let mut questions = Vec::with_capacity(quiz.questions.len());
        for (position, q) in quiz.questions.into_iter().enumerate() {
            let id = tables.next_id();
            questions.push(build_question(id, quiz_id, position as i32, q));
        }
        let stored = Quiz {
            id: quiz_id,
            title: quiz.title,
            description: quiz.description,
            is_public: quiz.is_public,
            access_code: quiz.access_code,
            time_limit_minutes: quiz.time_limit_minutes,
            max_attempts: quiz.max_attempts,
            created_by: Some(created_by),
            created_at: Some(Utc::now()),
            questions,
        };
        tables.quizzes.insert(quiz_id, stored.clone());
        Ok(stored)
    }

    async fn add_question(&self, quiz_id: i64, question: NewQuestion) -> Result<Question, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.quizzes.contains_key(&quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        // Reserve the ID before borrowing the quiz mutably.
        let id = tables.next_id();
        let quiz = tables
            .quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;
        let position = quiz.questions.len() as i32;
        let stored = build_question(id, quiz_id, position, question);
        quiz.questions.push(stored.clone());
        Ok(stored)
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let removed = tables.quizzes.remove(&id).is_some();
        if removed {
            tables.results.retain(|_, r| r.quiz_id != id);
        }
        Ok(removed)
    }

    async fn count_attempts(&self, quiz_id: i64, user_id: i64) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .values()
            .filter(|r| r.quiz_id == quiz_id && r.user_id == user_id)
            .count() as i64)
    }

    async fn insert_result(&self, result: NewAttemptResult, max_attempts: i32) -> Result<AttemptResult, AppError> {
        // Count and insert under the same write guard.
        let mut tables = self.tables.write().await;
        let used = tables
            .results
            .values()
            .filter(|r| r.quiz_id == result.quiz_id && r.user_id == result.user_id)
            .count() as i64;
        if used >= i64::from(max_attempts) {
            return Err(attempts_exhausted(used, max_attempts));
        }
        let id = tables.next_id();
        let stored = AttemptResult {
            id,
            quiz_id: result.quiz_id,
            user_id: result.user_id,
            correct_answers: result.correct_answers,
            total_questions: result.total_questions,
            score: result.score,
            percentage: result.percentage,
            time_taken: result.time_taken,
            answers: result.answers,
            completed_at: Utc::now(),
        };
        tables.results.insert(id, stored.clone());
        Ok(stored)
    }

    async fn leaderboard(&self, quiz_id: i64, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let tables = self.tables.read().await;
        let entries = tables
            .results
            .values()
            .filter(|r| r.quiz_id == quiz_id)
            .filter_map(|r| {
                tables.users.get(&r.user_id).map(|u| LeaderboardEntry {
                    user_id: r.user_id,
                    username: u.username.clone(),
                    score: r.score,
                    percentage: r.percentage,
                    time_taken: r.time_taken,
                    completed_at: r.completed_at,
                })
            })
            .collect();
        Ok(rank_best_per_user(entries, limit))
    }

    async fn results_for_user(&self, user_id: i64) -> Result<Vec<AttemptResult>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_result(&self, id: i64) -> Result<Option<AttemptResult>, AppError> {
        Ok(self.tables.read().await.results.get(&id).cloned())
    }
}
