use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, repository::QuizRepository};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn QuizRepository>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn QuizRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.repo.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
