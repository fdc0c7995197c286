// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::{CreateQuestionRequest, PublicQuestion, Question};
use crate::utils::sanitize::clean_html;

/// A quiz together with its ordered questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,

    /// Required to start a private quiz.
    /// Skipped during serialization so it can never reach a client.
    #[serde(skip_serializing, default)]
    pub access_code: Option<String>,

    /// Informational only; nothing force-submits on expiry.
    pub time_limit_minutes: Option<i32>,

    pub max_attempts: i32,
    pub created_by: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Whether the access gate applies to this quiz.
    pub fn requires_access_code(&self) -> bool {
        !self.is_public
            && self
                .access_code
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty())
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            is_public: self.is_public,
            requires_access_code: self.requires_access_code(),
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts,
            question_count: self.questions.len() as i64,
        }
    }

    pub fn paper(&self) -> QuizPaper {
        QuizPaper {
            quiz: self.summary(),
            questions: self.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Quiz metadata safe to show anyone: no questions, no access code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub requires_access_code: bool,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub question_count: i64,
}

/// What a quiz taker receives when starting an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizPaper {
    pub quiz: QuizSummary,
    pub questions: Vec<PublicQuestion>,
}

/// DTO for creating a quiz, optionally with its questions.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[validate(length(min = 1, max = 64))]
    pub access_code: Option<String>,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: Option<i32>,
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<CreateQuestionRequest>,
}

fn default_true() -> bool {
    true
}

/// A validated quiz ready to be stored. Questions are inserted in order.
#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub access_code: Option<String>,
    pub time_limit_minutes: Option<i32>,
    pub max_attempts: i32,
    pub questions: Vec<crate::models::question::NewQuestion>,
}

impl CreateQuizRequest {
    /// Cross-field checks the derive rules cannot express.
    pub fn check(&self) -> Result<(), String> {
        let has_code = self
            .access_code
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if !self.is_public && !has_code {
            return Err("Private quizzes require an access code".to_string());
        }
        for (i, q) in self.questions.iter().enumerate() {
            q.check_answer_key()
                .map_err(|e| format!("Question {}: {}", i + 1, e))?;
        }
        Ok(())
    }

    pub fn into_new_quiz(self) -> NewQuiz {
        NewQuiz {
            title: clean_html(self.title.trim()),
            description: self.description.as_deref().map(clean_html),
            is_public: self.is_public,
            access_code: self
                .access_code
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts.unwrap_or(1),
            questions: self
                .questions
                .into_iter()
                .map(CreateQuestionRequest::into_new_question)
                .collect(),
        }
    }
}
