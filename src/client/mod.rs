// src/client/mod.rs

//! Quiz-taker side of an attempt.
//!
//! [`session::AttemptSession`] runs the attempt lifecycle against any
//! [`QuizBackend`]; [`http::HttpBackend`] talks to the quiz service.

use std::{env, path::PathBuf};

use async_trait::async_trait;

use crate::{
    attempt::{AnswerMap, AttemptError},
    models::{
        attempt::SubmitAttemptResponse,
        quiz::{QuizPaper, QuizSummary},
    },
};

pub mod http;
pub mod prompt;
pub mod session;

pub use http::HttpBackend;
pub use session::{AttemptSession, SessionContext};

/// What the client sends when finishing an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub quiz_id: i64,
    pub answers: AnswerMap,
    /// Seconds.
    pub time_taken: u64,
    pub access_code: Option<String>,
}

/// Remote operations an attempt depends on.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    async fn quiz(&self, quiz_id: i64) -> Result<QuizSummary, AttemptError>;

    /// `Err(InvalidAccessCode)` when the code does not match.
    async fn verify_access(&self, quiz_id: i64, access_code: Option<&str>) -> Result<(), AttemptError>;

    async fn start(&self, quiz_id: i64, access_code: Option<&str>) -> Result<QuizPaper, AttemptError>;

    async fn submit(&self, submission: &Submission) -> Result<SubmitAttemptResponse, AttemptError>;
}

/// Settings for the terminal player, read from the environment.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub state_dir: PathBuf,
}

impl PlayerConfig {
    pub fn from_env() -> Result<Self, crate::config::ConfigError> {
        use crate::config::ConfigError;

        dotenvy::dotenv().ok();
        let required = |name: &'static str| {
            env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            base_url: env::var("QUIZHUB_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),
            username: required("QUIZHUB_USERNAME")?,
            password: required("QUIZHUB_PASSWORD")?,
            state_dir: env::var("QUIZHUB_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".quizhub")),
        })
    }
}
