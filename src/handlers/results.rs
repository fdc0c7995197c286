// src/handlers/results.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, repository::QuizRepository, utils::jwt::Claims};

/// Lists the caller's attempt results, newest first.
pub async fn list_my_results(
    State(repo): State<Arc<dyn QuizRepository>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(repo.results_for_user(user_id).await?))
}

/// Returns one result. Other users' results look like missing ones.
pub async fn get_my_result(
    State(repo): State<Arc<dyn QuizRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let result = repo
        .find_result(id)
        .await?
        .filter(|r| r.user_id == user_id || claims.is_admin())
        .ok_or_else(|| AppError::NotFound("Result not found".to_string()))?;
    Ok(Json(result))
}
