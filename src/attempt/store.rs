// src/attempt/store.rs

//! In-progress attempt state with local persistence.
//!
//! Two documents are kept per quiz/user pair: the answer map and the
//! progress record. Persistence failures are logged and otherwise ignored,
//! so an unavailable storage only costs the ability to resume after a reload.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AnswerMap, AttemptError,
    clock::Clock,
    navigator::QuestionNavigator,
    storage::{AttemptStorage, StorageError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Progress {
    current_question_index: usize,
    time_elapsed: u64,
    start_time: DateTime<Utc>,
    last_saved: DateTime<Utc>,
}

pub struct AttemptStateStore {
    quiz_id: i64,
    user_id: i64,
    navigator: QuestionNavigator,
    answers: AnswerMap,
    elapsed: u64,
    started_at: DateTime<Utc>,
    resumed: bool,
    storage: Arc<dyn AttemptStorage>,
    clock: Arc<dyn Clock>,
}

impl AttemptStateStore {
    /// Resumes the persisted attempt for this quiz/user pair, or starts a
    /// fresh one. `reset` discards any persisted attempt first.
    pub fn initialize(
        storage: Arc<dyn AttemptStorage>,
        clock: Arc<dyn Clock>,
        quiz_id: i64,
        user_id: i64,
        question_count: usize,
        reset: bool,
    ) -> Result<Self, AttemptError> {
        let mut navigator = QuestionNavigator::new(question_count)?;
        let answers_key = answers_key(quiz_id, user_id);
        let progress_key = progress_key(quiz_id, user_id);

        if reset {
            for key in [&answers_key, &progress_key] {
                if let Err(e) = storage.remove(key) {
                    tracing::warn!("Failed to discard saved attempt state '{}': {}", key, e);
                }
            }
        }

        let restored = if reset {
            None
        } else {
            match load_state(storage.as_ref(), &answers_key, &progress_key) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable attempt state for quiz {}: {}", quiz_id, e);
                    None
                }
            }
        };

        let mut store = match restored {
            Some((progress, answers)) => {
                navigator.jump_to(progress.current_question_index);
                tracing::info!(
                    "Resuming quiz {} at question {} ({} answers saved)",
                    quiz_id,
                    navigator.index() + 1,
                    answers.len()
                );
                Self {
                    quiz_id,
                    user_id,
                    navigator,
                    answers,
                    elapsed: progress.time_elapsed,
                    started_at: progress.start_time,
                    resumed: true,
                    storage,
                    clock,
                }
            }
            None => {
                let started_at = clock.now();
                Self {
                    quiz_id,
                    user_id,
                    navigator,
                    answers: AnswerMap::new(),
                    elapsed: 0,
                    started_at,
                    resumed: false,
                    storage,
                    clock,
                }
            }
        };

        // Bring elapsed time up to date before the first save.
        store.tick();
        store.persist_answers();
        Ok(store)
    }

    pub fn quiz_id(&self) -> i64 {
        self.quiz_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Whether this state was restored from storage.
    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn current_index(&self) -> usize {
        self.navigator.index()
    }

    pub fn navigator(&self) -> &QuestionNavigator {
        &self.navigator
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn answer(&self, question_id: i64) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Upserts an answer. The value is stored as given.
    pub fn record_answer(&mut self, question_id: i64, value: impl Into<String>) {
        self.answers.insert(question_id, value.into());
        self.persist_answers();
    }

    pub fn advance(&mut self) -> usize {
        let index = self.navigator.advance();
        self.persist_progress();
        index
    }

    pub fn retreat(&mut self) -> usize {
        let index = self.navigator.retreat();
        self.persist_progress();
        index
    }

    pub fn jump_to(&mut self, index: usize) -> usize {
        let index = self.navigator.jump_to(index);
        self.persist_progress();
        index
    }

    /// Recomputes elapsed time from the start timestamp. Never decreases,
    /// even if the wall clock steps backwards.
    pub fn tick(&mut self) -> u64 {
        let since_start = (self.clock.now() - self.started_at).num_seconds().max(0) as u64;
        self.elapsed = self.elapsed.max(since_start);
        self.persist_progress();
        self.elapsed
    }

    /// Removes the persisted state. Consumes the store, so it runs once.
    pub fn clear(self) {
        for key in [
            answers_key(self.quiz_id, self.user_id),
            progress_key(self.quiz_id, self.user_id),
        ] {
            if let Err(e) = self.storage.remove(&key) {
                tracing::warn!("Failed to clear attempt state '{}': {}", key, e);
            }
        }
        tracing::debug!("Cleared attempt state for quiz {}", self.quiz_id);
    }

    fn persist_answers(&self) {
        let key = answers_key(self.quiz_id, self.user_id);
        let result = serde_json::to_string(&self.answers)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.save(&key, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to save answers for quiz {}: {}", self.quiz_id, e);
        }
        self.persist_progress();
    }

    fn persist_progress(&self) {
        let progress = Progress {
            current_question_index: self.navigator.index(),
            time_elapsed: self.elapsed,
            start_time: self.started_at,
            last_saved: self.clock.now(),
        };
        let key = progress_key(self.quiz_id, self.user_id);
        let result = serde_json::to_string(&progress)
            .map_err(StorageError::from)
            .and_then(|json| self.storage.save(&key, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to save progress for quiz {}: {}", self.quiz_id, e);
        }
    }
}

fn answers_key(quiz_id: i64, user_id: i64) -> String {
    format!("quiz_answers_{}_{}", quiz_id, user_id)
}

fn progress_key(quiz_id: i64, user_id: i64) -> String {
    format!("quiz_progress_{}_{}", quiz_id, user_id)
}

/// A resume needs the progress record; a missing answers document just
/// means nothing was answered yet.
fn load_state(
    storage: &dyn AttemptStorage,
    answers_key: &str,
    progress_key: &str,
) -> Result<Option<(Progress, AnswerMap)>, StorageError> {
    let Some(progress) = storage.load(progress_key)? else {
        return Ok(None);
    };
    let progress: Progress = serde_json::from_str(&progress)?;
    let answers = match storage.load(answers_key)? {
        Some(json) => serde_json::from_str(&json)?,
        None => AnswerMap::new(),
    };
    Ok(Some((progress, answers)))
}
