// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    attempt::{AnswerMap, AttemptError, access::verify_access, scorer},
    error::AppError,
    models::{
        attempt::{
            AccessRequest, NewAttemptResult, QuestionReview, SubmitAttemptRequest,
            SubmitAttemptResponse,
        },
        quiz::Quiz,
    },
    repository::{QuizRepository, attempts_exhausted},
    utils::jwt::Claims,
};

/// How many entries the leaderboard shows.
pub const LEADERBOARD_SIZE: usize = 10;

async fn load_quiz(repo: &dyn QuizRepository, id: i64) -> Result<Quiz, AppError> {
    repo.find_quiz(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))
}

/// Rejects the caller once they have used all attempts on the quiz.
async fn ensure_attempts_left(repo: &dyn QuizRepository, quiz: &Quiz, user_id: i64) -> Result<(), AppError> {
    let used = repo.count_attempts(quiz.id, user_id).await?;
    if used >= i64::from(quiz.max_attempts) {
        return Err(attempts_exhausted(used, quiz.max_attempts));
    }
    Ok(())
}

/// Lists public quizzes, newest first.
pub async fn list_quizzes(
    State(repo): State<Arc<dyn QuizRepository>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(repo.list_public_quizzes().await?))
}

/// Returns quiz metadata. Never includes questions or the access code.
pub async fn get_quiz(
    State(repo): State<Arc<dyn QuizRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(repo.as_ref(), id).await?;
    Ok(Json(quiz.summary()))
}

/// Checks an access code without starting an attempt.
///
/// Answers `{"granted": true}` or 403; the stored code is never revealed.
pub async fn check_access(
    State(repo): State<Arc<dyn QuizRepository>>,
    Path(id): Path<i64>,
    Json(req): Json<AccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(repo.as_ref(), id).await?;
    verify_access(&quiz, req.access_code.as_deref())?;
    Ok(Json(json!({ "granted": true })))
}

/// Starts an attempt: runs the access gate and the attempts check, then
/// returns the questions without their answers.
pub async fn start_attempt(
    State(repo): State<Arc<dyn QuizRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<AccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let quiz = load_quiz(repo.as_ref(), id).await?;

    verify_access(&quiz, req.access_code.as_deref())?;
    if quiz.questions.is_empty() {
        return Err(AttemptError::EmptyQuiz.into());
    }
    ensure_attempts_left(repo.as_ref(), &quiz, user_id).await?;

    tracing::info!("User {} started quiz {}", user_id, quiz.id);
    Ok(Json(quiz.paper()))
}

/// Scores a submission against the answer key and stores the result.
///
/// * Re-runs the access gate and the attempts check.
/// * Answers for questions outside the quiz are dropped.
/// * Returns the score, percentage and a per-question review.
pub async fn submit_attempt(
    State(repo): State<Arc<dyn QuizRepository>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let quiz = load_quiz(repo.as_ref(), id).await?;

    verify_access(&quiz, req.access_code.as_deref())?;
    if quiz.questions.is_empty() {
        return Err(AttemptError::EmptyQuiz.into());
    }
    ensure_attempts_left(repo.as_ref(), &quiz, user_id).await?;

    let answers: AnswerMap = req
        .answers
        .into_iter()
        .filter(|(question_id, _)| quiz.questions.iter().any(|q| q.id == *question_id))
        .collect();

    let report = scorer::score(&quiz.questions, &answers);

    let result = NewAttemptResult {
        quiz_id: quiz.id,
        user_id,
        correct_answers: report.correct_count as i32,
        total_questions: report.total_questions as i32,
        score: report.score as i32,
        percentage: report.percentage as i32,
        time_taken: req.time_taken,
        answers,
    };
    // The attempt limit is checked again inside the insert, atomically.
    let stored = repo.insert_result(result, quiz.max_attempts).await?;

    tracing::info!(
        "User {} scored {} ({}% correct) on quiz {}",
        user_id,
        stored.score,
        stored.percentage,
        quiz.id
    );

    let review = quiz
        .questions
        .iter()
        .zip(&report.outcomes)
        .map(|(question, outcome)| QuestionReview {
            question_id: question.id,
            submitted: stored.answers.get(&question.id).cloned(),
            correct_answer: question.answer.clone(),
            correct: outcome.correct,
            points_earned: outcome.points_earned as i32,
            explanation: question.explanation.clone(),
        })
        .collect();

    Ok(Json(SubmitAttemptResponse {
        result_id: stored.id,
        score: stored.score,
        percentage: stored.percentage,
        correct_answers: stored.correct_answers,
        total_questions: stored.total_questions,
        time_taken: stored.time_taken,
        review,
    }))
}

/// Top results for a quiz: each user's best attempt.
pub async fn get_leaderboard(
    State(repo): State<Arc<dyn QuizRepository>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = load_quiz(repo.as_ref(), id).await?;
    let leaderboard = repo.leaderboard(quiz.id, LEADERBOARD_SIZE).await?;
    Ok(Json(leaderboard))
}
