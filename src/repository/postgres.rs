// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, types::Json};

use super::{QuizRepository, attempts_exhausted};
use crate::{
    attempt::AnswerMap,
    error::AppError,
    models::{
        attempt::{AttemptResult, LeaderboardEntry, NewAttemptResult},
        question::{NewQuestion, Question},
        quiz::{NewQuiz, Quiz, QuizSummary},
        user::User,
    },
};

/// Represents the 'quizzes' table.
#[derive(FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    description: Option<String>,
    is_public: bool,
    access_code: Option<String>,
    time_limit_minutes: Option<i32>,
    max_attempts: i32,
    created_by: Option<i64>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl QuizRow {
    fn into_quiz(self, questions: Vec<Question>) -> Quiz {
        Quiz {
            id: self.id,
            title: self.title,
            description: self.description,
            is_public: self.is_public,
            access_code: self.access_code,
            time_limit_minutes: self.time_limit_minutes,
            max_attempts: self.max_attempts,
            created_by: self.created_by,
            created_at: self.created_at,
            questions,
        }
    }
}

/// Represents the 'questions' table. `type` is stored as text.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    quiz_id: i64,
    position: i32,
    content: String,
    #[sqlx(rename = "type")]
    question_type: String,
    options: Json<Vec<String>>,
    answer: String,
    explanation: Option<String>,
    points: i32,
    image_url: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_type = row
            .question_type
            .parse()
            .map_err(AppError::InternalServerError)?;
        Ok(Question {
            id: row.id,
            quiz_id: row.quiz_id,
            position: row.position,
            content: row.content,
            question_type,
            options: row.options.0,
            answer: row.answer,
            explanation: row.explanation,
            points: row.points,
            image_url: row.image_url,
        })
    }
}

/// Represents the 'attempt_results' table.
#[derive(FromRow)]
struct ResultRow {
    id: i64,
    quiz_id: i64,
    user_id: i64,
    correct_answers: i32,
    total_questions: i32,
    score: i32,
    percentage: i32,
    time_taken: i64,
    answers: Json<AnswerMap>,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl From<ResultRow> for AttemptResult {
    fn from(row: ResultRow) -> Self {
        AttemptResult {
            id: row.id,
            quiz_id: row.quiz_id,
            user_id: row.user_id,
            correct_answers: row.correct_answers,
            total_questions: row.total_questions,
            score: row.score,
            percentage: row.percentage,
            time_taken: row.time_taken,
            answers: row.answers.0,
            completed_at: row.completed_at,
        }
    }
}

const QUIZ_COLUMNS: &str =
    "id, title, description, is_public, access_code, time_limit_minutes, max_attempts, created_by, created_at";
const QUESTION_COLUMNS: &str =
    "id, quiz_id, position, content, type, options, answer, explanation, points, image_url";
const RESULT_COLUMNS: &str = "id, quiz_id, user_id, correct_answers, total_questions, score, percentage, time_taken, answers, completed_at";

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn insert_question(
        conn: &mut PgConnection,
        quiz_id: i64,
        q: &NewQuestion,
    ) -> Result<Question, AppError> {
        let row: QuestionRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO questions (quiz_id, position, content, type, options, answer, explanation, points, image_url)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM questions WHERE quiz_id = $1),
                $2, $3, $4, $5, $6, $7, $8
            )
            RETURNING {}
            "#,
            QUESTION_COLUMNS
        ))
        .bind(quiz_id)
        .bind(&q.content)
        .bind(q.question_type.as_str())
        .bind(Json(&q.options))
        .bind(&q.answer)
        .bind(&q.explanation)
        .bind(q.points)
        .bind(&q.image_url)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert question: {:?}", e);
            AppError::from(e)
        })?;

        Question::try_from(row)
    }
}

#[async_trait]
impl QuizRepository for PgRepository {
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                AppError::Conflict(format!("Username '{}' already exists", username))
            } else {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_public_quizzes(&self) -> Result<Vec<QuizSummary>, AppError> {
        let quizzes = sqlx::query_as::<_, QuizSummary>(
            r#"
            SELECT
                z.id,
                z.title,
                z.description,
                z.is_public,
                FALSE AS requires_access_code,
                z.time_limit_minutes,
                z.max_attempts,
                COUNT(q.id) AS question_count
            FROM quizzes z
            LEFT JOIN questions q ON q.quiz_id = z.id
            WHERE z.is_public
            GROUP BY z.id
            ORDER BY z.id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::from(e)
        })?;
        Ok(quizzes)
    }

    async fn find_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let Some(row) = sqlx::query_as::<_, QuizRow>(&format!(
            "SELECT {} FROM quizzes WHERE id = $1",
            QUIZ_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE quiz_id = $1 ORDER BY position, id",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Question::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(row.into_quiz(questions)))
    }

    async fn create_quiz(&self, created_by: i64, quiz: NewQuiz) -> Result<Quiz, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, QuizRow>(&format!(
            r#"
            INSERT INTO quizzes (title, description, is_public, access_code, time_limit_minutes, max_attempts, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            QUIZ_COLUMNS
        ))
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.is_public)
        .bind(&quiz.access_code)
        .bind(quiz.time_limit_minutes)
        .bind(quiz.max_attempts)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quiz: {:?}", e);
            AppError::from(e)
        })?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for q in &quiz.questions {
            questions.push(Self::insert_question(&mut *tx, row.id, q).await?);
        }

        tx.commit().await?;
        Ok(row.into_quiz(questions))
    }

    async fn add_question(&self, quiz_id: i64, question: NewQuestion) -> Result<Question, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the quiz row so concurrent appends get distinct positions.
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let stored = Self::insert_question(&mut *tx, quiz_id, &question).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_attempts(&self, quiz_id: i64, user_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attempt_results WHERE quiz_id = $1 AND user_id = $2",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_result(&self, result: NewAttemptResult, max_attempts: i32) -> Result<AttemptResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the quiz row so concurrent submits are counted one at a time.
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(result.quiz_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let used = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM attempt_results WHERE quiz_id = $1 AND user_id = $2",
        )
        .bind(result.quiz_id)
        .bind(result.user_id)
        .fetch_one(&mut *tx)
        .await?;
        if used >= i64::from(max_attempts) {
            return Err(attempts_exhausted(used, max_attempts));
        }

        let row = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            INSERT INTO attempt_results
                (quiz_id, user_id, correct_answers, total_questions, score, percentage, time_taken, answers)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            RESULT_COLUMNS
        ))
        .bind(result.quiz_id)
        .bind(result.user_id)
        .bind(result.correct_answers)
        .bind(result.total_questions)
        .bind(result.score)
        .bind(result.percentage)
        .bind(result.time_taken)
        .bind(Json(&result.answers))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt result: {:?}", e);
            AppError::from(e)
        })?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn leaderboard(&self, quiz_id: i64, limit: usize) -> Result<Vec<LeaderboardEntry>, AppError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT user_id, username, score, percentage, time_taken, completed_at
            FROM (
                SELECT DISTINCT ON (r.user_id)
                    r.user_id, u.username, r.score, r.percentage, r.time_taken, r.completed_at
                FROM attempt_results r
                JOIN users u ON u.id = r.user_id
                WHERE r.quiz_id = $1
                ORDER BY r.user_id, r.score DESC, r.time_taken ASC, r.completed_at ASC
            ) best
            ORDER BY score DESC, time_taken ASC, completed_at ASC
            LIMIT $2
            "#,
        )
        .bind(quiz_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {:?}", e);
            AppError::from(e)
        })?;
        Ok(entries)
    }

    async fn results_for_user(&self, user_id: i64) -> Result<Vec<AttemptResult>, AppError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM attempt_results WHERE user_id = $1 ORDER BY completed_at DESC, id DESC",
            RESULT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(AttemptResult::from).collect())
    }

    async fn find_result(&self, id: i64) -> Result<Option<AttemptResult>, AppError> {
        let row = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {} FROM attempt_results WHERE id = $1",
            RESULT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AttemptResult::from))
    }
}
