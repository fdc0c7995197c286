// src/attempt/mod.rs

//! Quiz attempt lifecycle.
//!
//! Access gate, attempt state with local persistence, question navigation,
//! answer capture and scoring. Everything here is synchronous and owned by a
//! single caller; persistence goes through the [`storage::AttemptStorage`] port.

use std::collections::HashMap;

pub mod access;
pub mod answer;
pub mod clock;
pub mod navigator;
pub mod scorer;
pub mod storage;
pub mod store;

/// Submitted answers keyed by question ID. Sparse: a missing entry means unanswered.
pub type AnswerMap = HashMap<i64, String>;

/// Errors surfaced by attempt operations and by the attempt client.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// Input rejected locally; only the triggering action is blocked.
    #[error("{0}")]
    Validation(String),

    /// Wrong access code. Retry is always allowed.
    #[error("Invalid access code")]
    InvalidAccessCode,

    /// An attempt cannot be started on a quiz without questions.
    #[error("Quiz has no questions")]
    EmptyQuiz,

    #[error("{0} not found")]
    NotFound(String),

    /// Network or backend failure while fetching or submitting.
    #[error("Remote operation failed: {0}")]
    Remote(String),
}
