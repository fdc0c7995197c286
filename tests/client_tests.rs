// tests/client_tests.rs

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{PASSWORD, geography_quiz, spawn_app, unique_name};
use quizhub::{
    attempt::{
        AttemptError,
        answer::AnswerInput,
        clock::ManualClock,
        storage::MemoryStorage,
    },
    client::{AttemptSession, HttpBackend, SessionContext},
};

struct Player {
    backend: HttpBackend,
    ctx: SessionContext,
    storage: Arc<MemoryStorage>,
    clock: Arc<ManualClock>,
}

async fn player(app: &common::TestApp, client: &reqwest::Client) -> Player {
    let username = unique_name("p");
    app.register_and_login(client, &username).await;

    let (backend, login) = HttpBackend::login(&app.address, &username, PASSWORD)
        .await
        .expect("Login through the client failed");

    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let ctx = SessionContext {
        user_id: login.user_id,
        storage: storage.clone(),
        clock: clock.clone(),
    };
    Player { backend, ctx, storage, clock }
}

#[tokio::test]
async fn client_login_rejects_bad_credentials() {
    let app = spawn_app().await;

    let result = HttpBackend::login(&app.address, "nobody", "wrong").await;
    assert!(matches!(result, Err(AttemptError::Validation(_))));
}

#[tokio::test]
async fn client_plays_private_quiz_with_resume() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.admin_token(&client).await;
    let quiz = app.create_quiz(&client, &admin, geography_quiz(2)).await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    let p = player(&app, &client).await;

    // 1. Gate: missing or wrong code, nothing is stored
    for code in [None, Some("xyz124")] {
        let denied = AttemptSession::start(&p.backend, &p.ctx, quiz_id, code, false).await;
        assert!(matches!(denied, Err(AttemptError::InvalidAccessCode)));
    }
    assert!(p.storage.is_empty());

    // 2. Answer two questions, then walk away
    let mut session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, Some("xyz123"), false)
        .await
        .unwrap();
    assert!(!session.is_resumed());
    assert_eq!(session.questions().len(), 3);

    session.answer(AnswerInput::ChoiceIndex(0)).unwrap();
    session.advance();
    session.answer(AnswerInput::Boolean(true)).unwrap();
    session.advance();
    p.clock.advance(Duration::seconds(12));
    session.tick();
    drop(session);

    // 3. Come back: same position, same answers, time keeps counting
    let mut session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, Some("xyz123"), false)
        .await
        .unwrap();
    assert!(session.is_resumed());
    assert_eq!(session.current_index(), 2);
    assert_eq!(session.answered_count(), 2);
    assert_eq!(session.elapsed_seconds(), 12);

    session.answer(AnswerInput::Text("everest".to_string())).unwrap();
    p.clock.advance(Duration::seconds(8));

    let response = session.finish().await.map_err(|(e, _)| e).unwrap();
    assert_eq!(response.score, 100);
    assert_eq!(response.percentage, 100);
    assert_eq!(response.time_taken, 20);
    assert!(p.storage.is_empty());
}

#[tokio::test]
async fn client_keeps_state_when_submit_fails() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.admin_token(&client).await;

    let mut body = geography_quiz(1);
    body["is_public"] = serde_json::json!(true);
    let quiz = app.create_quiz(&client, &admin, body).await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    let p = player(&app, &client).await;

    let listed = p.backend.list_quizzes().await.unwrap();
    assert!(listed.iter().any(|q| q.id == quiz_id));

    let mut session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, None, false)
        .await
        .unwrap();
    session.answer(AnswerInput::Choice("Paris".to_string())).unwrap();

    // The quiz disappears before submission
    let deleted = client
        .delete(app.url(&format!("/api/admin/quizzes/{}", quiz_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let (error, session) = match session.finish().await {
        Err(failure) => failure,
        Ok(_) => panic!("submit to a deleted quiz should fail"),
    };
    assert!(matches!(error, AttemptError::NotFound(_)));
    assert!(!p.storage.is_empty());
    assert_eq!(session.current_answer(), Some("Paris"));
}

#[tokio::test]
async fn client_reports_used_up_attempts() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.admin_token(&client).await;

    let mut body = geography_quiz(1);
    body["is_public"] = serde_json::json!(true);
    let quiz = app.create_quiz(&client, &admin, body).await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    let p = player(&app, &client).await;

    let session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, None, false)
        .await
        .unwrap();
    session.finish().await.map_err(|(e, _)| e).unwrap();

    let blocked = AttemptSession::start(&p.backend, &p.ctx, quiz_id, None, false).await;
    assert!(matches!(blocked, Err(AttemptError::Remote(_))));
    assert!(p.storage.is_empty());
}

#[tokio::test]
async fn client_submits_attempt_resumed_after_a_week() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let admin = app.admin_token(&client).await;
    let quiz = app.create_quiz(&client, &admin, geography_quiz(1)).await;
    let quiz_id = quiz["id"].as_i64().unwrap();
    let p = player(&app, &client).await;

    let mut session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, Some("XYZ123"), false)
        .await
        .unwrap();
    session.answer(AnswerInput::ChoiceIndex(0)).unwrap();
    drop(session);

    // Suspended time counts toward elapsed time.
    p.clock.advance(Duration::days(8));
    let session = AttemptSession::start(&p.backend, &p.ctx, quiz_id, Some("XYZ123"), false)
        .await
        .unwrap();
    assert!(session.is_resumed());

    let response = session.finish().await.map_err(|(e, _)| e).unwrap();
    assert_eq!(response.time_taken, 8 * 24 * 3600);
    assert_eq!(response.correct_answers, 1);
    assert!(p.storage.is_empty());
}
