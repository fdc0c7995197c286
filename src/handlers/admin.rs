// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{question::CreateQuestionRequest, quiz::CreateQuizRequest},
    repository::QuizRepository,
    utils::jwt::Claims,
};

/// Creates a quiz together with its questions.
/// Admin only.
pub async fn create_quiz(
    State(repo): State<Arc<dyn QuizRepository>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check().map_err(AppError::BadRequest)?;

    let admin_id = claims.user_id()?;
    let quiz = repo.create_quiz(admin_id, payload.into_new_quiz()).await?;

    tracing::info!(
        "Admin {} created quiz {} with {} questions",
        claims.username,
        quiz.id,
        quiz.questions.len()
    );

    // The response goes to the author, so it includes the answer key.
    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Appends a question to an existing quiz.
/// Admin only.
pub async fn add_question(
    State(repo): State<Arc<dyn QuizRepository>>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.check_answer_key().map_err(AppError::BadRequest)?;

    let question = repo
        .add_question(quiz_id, payload.into_new_question())
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Deletes a quiz, its questions and its results.
/// Admin only.
pub async fn delete_quiz(
    State(repo): State<Arc<dyn QuizRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !repo.delete_quiz(id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tracing::info!("Deleted quiz {}", id);
    Ok(StatusCode::NO_CONTENT)
}
