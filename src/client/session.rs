// src/client/session.rs

use std::sync::Arc;

use super::{QuizBackend, Submission};
use crate::{
    attempt::{
        AttemptError,
        answer::{self, AnswerInput, is_answered},
        clock::Clock,
        storage::AttemptStorage,
        store::AttemptStateStore,
    },
    models::{attempt::SubmitAttemptResponse, question::PublicQuestion, quiz::QuizSummary},
};

/// Who is taking quizzes and where their progress lives.
/// Passed explicitly instead of living in globals.
#[derive(Clone)]
pub struct SessionContext {
    pub user_id: i64,
    pub storage: Arc<dyn AttemptStorage>,
    pub clock: Arc<dyn Clock>,
}

/// One quiz attempt from gate to submission.
///
/// Local state is cleared only after the service has stored the result; a
/// failed submission hands the session back so the same action can be retried.
pub struct AttemptSession<'b, B: QuizBackend + ?Sized> {
    backend: &'b B,
    quiz: QuizSummary,
    questions: Vec<PublicQuestion>,
    store: AttemptStateStore,
    access_code: Option<String>,
}

impl<'b, B: QuizBackend + ?Sized> AttemptSession<'b, B> {
    /// Runs the access gate, fetches the questions and initializes (or
    /// resumes) the local attempt state. `reset` discards saved progress.
    pub async fn start(
        backend: &'b B,
        ctx: &SessionContext,
        quiz_id: i64,
        access_code: Option<&str>,
        reset: bool,
    ) -> Result<Self, AttemptError> {
        let summary = backend.quiz(quiz_id).await?;
        if summary.requires_access_code {
            backend.verify_access(quiz_id, access_code).await?;
        }
        if summary.question_count == 0 {
            return Err(AttemptError::EmptyQuiz);
        }

        let paper = backend.start(quiz_id, access_code).await?;
        let mut questions = paper.questions;
        if questions.is_empty() {
            return Err(AttemptError::EmptyQuiz);
        }
        questions.sort_by_key(|q| q.position);

        let store = AttemptStateStore::initialize(
            ctx.storage.clone(),
            ctx.clock.clone(),
            quiz_id,
            ctx.user_id,
            questions.len(),
            reset,
        )?;

        Ok(Self {
            backend,
            quiz: paper.quiz,
            questions,
            store,
            access_code: access_code.map(str::to_string),
        })
    }

    pub fn quiz(&self) -> &QuizSummary {
        &self.quiz
    }

    pub fn questions(&self) -> &[PublicQuestion] {
        &self.questions
    }

    pub fn is_resumed(&self) -> bool {
        self.store.is_resumed()
    }

    pub fn current_index(&self) -> usize {
        self.store.current_index()
    }

    pub fn is_last(&self) -> bool {
        self.store.navigator().is_last()
    }

    pub fn current_question(&self) -> &PublicQuestion {
        // The navigator keeps the index inside the question list.
        &self.questions[self.store.current_index()]
    }

    pub fn current_answer(&self) -> Option<&str> {
        self.store.answer(self.current_question().id)
    }

    /// Answers the current question.
    pub fn answer(&mut self, input: AnswerInput) -> Result<(), AttemptError> {
        let question = self.current_question();
        let question_id = question.id;
        let value = answer::collect(question, input)?;
        self.store.record_answer(question_id, value);
        Ok(())
    }

    pub fn advance(&mut self) -> usize {
        self.store.advance()
    }

    pub fn retreat(&mut self) -> usize {
        self.store.retreat()
    }

    pub fn jump_to(&mut self, index: usize) -> usize {
        self.store.jump_to(index)
    }

    /// Call once a second while the attempt is on screen.
    pub fn tick(&mut self) -> u64 {
        self.store.tick()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.store.elapsed_seconds()
    }

    /// Seconds left under the quiz's time limit, if it has one.
    /// The limit is informational: nothing is submitted automatically.
    pub fn remaining_seconds(&self) -> Option<u64> {
        let limit = self.quiz.time_limit_minutes?;
        let limit = u64::try_from(limit).unwrap_or(0) * 60;
        Some(limit.saturating_sub(self.store.elapsed_seconds()))
    }

    pub fn is_time_expired(&self) -> bool {
        self.remaining_seconds() == Some(0)
    }

    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| is_answered(self.store.answer(q.id)))
            .count()
    }

    /// Positions (zero-based) of questions without an answer.
    pub fn unanswered(&self) -> Vec<usize> {
        self.questions
            .iter()
            .enumerate()
            .filter(|(_, q)| !is_answered(self.store.answer(q.id)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Fails when any question is still unanswered, naming them (1-based).
    pub fn ensure_complete(&self) -> Result<(), AttemptError> {
        let missing = self.unanswered();
        if missing.is_empty() {
            return Ok(());
        }
        let numbers: Vec<String> = missing.iter().map(|i| (i + 1).to_string()).collect();
        Err(AttemptError::Validation(format!(
            "Unanswered questions: {}",
            numbers.join(", ")
        )))
    }

    /// The payload `finish` would send. Empty answers are left out.
    pub fn submission(&self) -> Submission {
        Submission {
            quiz_id: self.quiz.id,
            answers: self
                .store
                .answers()
                .iter()
                .filter(|(_, v)| is_answered(Some(v.as_str())))
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            time_taken: self.store.elapsed_seconds(),
            access_code: self.access_code.clone(),
        }
    }

    /// Submits the attempt. Trailing unanswered questions are allowed.
    ///
    /// On success the local state is cleared. On failure the session comes
    /// back untouched alongside the error.
    pub async fn finish(mut self) -> Result<SubmitAttemptResponse, (AttemptError, Self)> {
        self.store.tick();
        let submission = self.submission();

        match self.backend.submit(&submission).await {
            Ok(response) => {
                tracing::info!(
                    "Submitted quiz {}: score {} ({}% correct)",
                    self.quiz.id,
                    response.score,
                    response.percentage
                );
                self.store.clear();
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("Submission for quiz {} failed, keeping local state: {}", self.quiz.id, e);
                Err((e, self))
            }
        }
    }

    /// Gives up on the attempt and discards local progress.
    pub fn abandon(self) {
        tracing::info!("Abandoned quiz {}", self.quiz.id);
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        attempt::{access::verify_access, clock::ManualClock, scorer, storage::MemoryStorage},
        models::{
            question::{Question, QuestionType},
            quiz::{Quiz, QuizPaper},
        },
    };

    /// Scores in-process with the real scorer.
    struct FakeBackend {
        quiz: Quiz,
        fail_submits: Mutex<u32>,
        submissions: Mutex<Vec<Submission>>,
    }

    impl FakeBackend {
        fn new(quiz: Quiz) -> Self {
            Self {
                quiz,
                fail_submits: Mutex::new(0),
                submissions: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuizBackend for FakeBackend {
        async fn quiz(&self, quiz_id: i64) -> Result<QuizSummary, AttemptError> {
            if quiz_id != self.quiz.id {
                return Err(AttemptError::NotFound("Quiz".to_string()));
            }
            Ok(self.quiz.summary())
        }

        async fn verify_access(&self, _quiz_id: i64, code: Option<&str>) -> Result<(), AttemptError> {
            verify_access(&self.quiz, code)
        }

        async fn start(&self, _quiz_id: i64, code: Option<&str>) -> Result<QuizPaper, AttemptError> {
            verify_access(&self.quiz, code)?;
            Ok(self.quiz.paper())
        }

        async fn submit(&self, submission: &Submission) -> Result<SubmitAttemptResponse, AttemptError> {
            {
                let mut failures = self.fail_submits.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(AttemptError::Remote("connection reset".to_string()));
                }
            }
            self.submissions.lock().unwrap().push(submission.clone());
            let report = scorer::score(&self.quiz.questions, &submission.answers);
            Ok(SubmitAttemptResponse {
                result_id: 1,
                score: report.score as i32,
                percentage: report.percentage as i32,
                correct_answers: report.correct_count as i32,
                total_questions: report.total_questions as i32,
                time_taken: submission.time_taken as i64,
                review: Vec::new(),
            })
        }
    }

    fn question(id: i64, question_type: QuestionType, options: &[&str], answer: &str, points: i32) -> Question {
        Question {
            id,
            quiz_id: 1,
            position: (id - 1) as i32,
            content: format!("Question {}", id),
            question_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            answer: answer.to_string(),
            explanation: None,
            points,
            image_url: None,
        }
    }

    fn quiz(is_public: bool) -> Quiz {
        Quiz {
            id: 1,
            title: "Geography".to_string(),
            description: None,
            is_public,
            access_code: Some("XYZ123".to_string()),
            time_limit_minutes: Some(1),
            max_attempts: 3,
            created_by: None,
            created_at: None,
            questions: vec![
                question(1, QuestionType::SingleSelect, &["Paris", "Rome"], "Paris", 1),
                question(2, QuestionType::Boolean, &[], "true", 1),
                question(3, QuestionType::FreeText, &[], "Everest", 2),
            ],
        }
    }

    fn context() -> (SessionContext, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()));
        let ctx = SessionContext {
            user_id: 9,
            storage: storage.clone(),
            clock: clock.clone(),
        };
        (ctx, storage, clock)
    }

    #[tokio::test]
    async fn test_wrong_code_blocks_initialization() {
        let backend = FakeBackend::new(quiz(false));
        let (ctx, storage, _) = context();

        let result = AttemptSession::start(&backend, &ctx, 1, Some("xyz124"), false).await;
        assert!(matches!(result, Err(AttemptError::InvalidAccessCode)));
        assert!(storage.is_empty());

        let session = AttemptSession::start(&backend, &ctx, 1, Some("xyz123"), false).await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn test_full_attempt_scores_and_clears_state() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, storage, clock) = context();
        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();

        session.answer(AnswerInput::ChoiceIndex(0)).unwrap();
        session.advance();
        // Q2 left unanswered.
        session.advance();
        session.answer(AnswerInput::Text("K2".to_string())).unwrap();
        clock.advance(Duration::seconds(20));

        let response = session.finish().await.map_err(|(e, _)| e).unwrap();
        assert_eq!(response.correct_answers, 1);
        assert_eq!(response.score, 25);
        assert_eq!(response.percentage, 33);
        assert_eq!(response.time_taken, 20);
        assert!(storage.is_empty());

        let sent = backend.submissions.lock().unwrap();
        assert_eq!(sent[0].answers.get(&1).map(String::as_str), Some("Paris"));
        assert!(!sent[0].answers.contains_key(&2));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_state_for_retry() {
        let backend = FakeBackend::new(quiz(true));
        *backend.fail_submits.lock().unwrap() = 1;
        let (ctx, storage, _) = context();

        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        session.answer(AnswerInput::Choice("Paris".to_string())).unwrap();

        let (error, session) = match session.finish().await {
            Err(failure) => failure,
            Ok(_) => panic!("first submit should fail"),
        };
        assert!(matches!(error, AttemptError::Remote(_)));
        assert!(!storage.is_empty());
        assert_eq!(session.current_answer(), Some("Paris"));

        let response = session.finish().await.map_err(|(e, _)| e).unwrap();
        assert_eq!(response.correct_answers, 1);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_resume_restores_answers_and_position() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, _, _) = context();

        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        session.answer(AnswerInput::ChoiceIndex(1)).unwrap();
        session.advance();
        session.answer(AnswerInput::Boolean(true)).unwrap();
        drop(session);

        let resumed = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        assert!(resumed.is_resumed());
        assert_eq!(resumed.current_index(), 1);
        assert_eq!(resumed.current_answer(), Some("true"));
        assert_eq!(resumed.answered_count(), 2);
        assert_eq!(resumed.unanswered(), vec![2]);
    }

    #[tokio::test]
    async fn test_abandon_discards_progress() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, storage, _) = context();

        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        session.answer(AnswerInput::ChoiceIndex(1)).unwrap();
        session.abandon();
        assert!(storage.is_empty());

        let fresh = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        assert!(!fresh.is_resumed());
        assert_eq!(fresh.answered_count(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_input_not_recorded() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, _, _) = context();
        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();

        assert!(matches!(
            session.answer(AnswerInput::Boolean(true)),
            Err(AttemptError::Validation(_))
        ));
        assert_eq!(session.current_answer(), None);
    }

    #[tokio::test]
    async fn test_time_limit_is_reported_not_enforced() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, _, clock) = context();
        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();

        assert_eq!(session.remaining_seconds(), Some(60));
        clock.advance(Duration::seconds(45));
        session.tick();
        assert_eq!(session.remaining_seconds(), Some(15));

        clock.advance(Duration::seconds(30));
        session.tick();
        assert!(session.is_time_expired());
        // Still answerable after expiry.
        assert!(session.answer(AnswerInput::ChoiceIndex(0)).is_ok());
    }

    #[tokio::test]
    async fn test_ensure_complete_lists_missing() {
        let backend = FakeBackend::new(quiz(true));
        let (ctx, _, _) = context();
        let mut session = AttemptSession::start(&backend, &ctx, 1, None, false).await.unwrap();
        session.answer(AnswerInput::ChoiceIndex(0)).unwrap();

        match session.ensure_complete() {
            Err(AttemptError::Validation(msg)) => assert_eq!(msg, "Unanswered questions: 2, 3"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_quiz_cannot_start() {
        let mut empty = quiz(true);
        empty.questions.clear();
        let backend = FakeBackend::new(empty);
        let (ctx, _, _) = context();
        assert!(matches!(
            AttemptSession::start(&backend, &ctx, 1, None, false).await,
            Err(AttemptError::EmptyQuiz)
        ));
    }
}
