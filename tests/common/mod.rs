// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use quizhub::{
    config::Config,
    models::user::ROLE_ADMIN,
    repository::{MemoryRepository, PgRepository, QuizRepository},
    routes,
    state::AppState,
    utils::password::hash_password,
};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    /// Base URL, e.g. "http://127.0.0.1:12345".
    pub address: String,
    pub repo: Arc<dyn QuizRepository>,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

pub fn test_state() -> AppState {
    AppState {
        repo: Arc::new(MemoryRepository::new()),
        config: test_config(),
    }
}

/// Spawns the app on a random port, backed by the in-memory repository.
pub async fn spawn_app() -> TestApp {
    spawn_with(Arc::new(MemoryRepository::new()), test_config()).await
}

/// Spawns the app against the Postgres database in `DATABASE_URL`.
/// Returns `None` (and the caller skips) when it is not set.
pub async fn spawn_pg_app() -> Option<TestApp> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    let repo = PgRepository::new(pool);
    repo.migrate().await.expect("Failed to migrate database");

    let config = Config {
        database_url: Some(database_url),
        ..test_config()
    };
    Some(spawn_with(Arc::new(repo), config).await)
}

async fn spawn_with(repo: Arc<dyn QuizRepository>, config: Config) -> TestApp {
    let state = AppState {
        repo: repo.clone(),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, repo }
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user and returns its bearer token.
    pub async fn register_and_login(&self, client: &reqwest::Client, username: &str) -> String {
        let response = client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(response.status().as_u16(), 201);
        self.login(client, username).await
    }

    pub async fn login(&self, client: &reqwest::Client, username: &str) -> String {
        let body = client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Login failed")
            .json::<serde_json::Value>()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    /// Seeds an admin straight into the repository and logs in.
    pub async fn admin_token(&self, client: &reqwest::Client) -> String {
        let username = unique_name("admin");
        let hashed = hash_password(PASSWORD).unwrap();
        self.repo
            .create_user(&username, &hashed, ROLE_ADMIN)
            .await
            .expect("Failed to seed admin");
        self.login(client, &username).await
    }

    /// Creates a quiz as admin and returns the created quiz JSON.
    pub async fn create_quiz(
        &self,
        client: &reqwest::Client,
        admin_token: &str,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let response = client
            .post(self.url("/api/admin/quizzes"))
            .bearer_auth(admin_token)
            .json(&body)
            .send()
            .await
            .expect("Create quiz failed");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

/// Private quiz "XYZ123" with three questions worth 1, 1 and 2 points.
pub fn geography_quiz(max_attempts: i32) -> serde_json::Value {
    serde_json::json!({
        "title": "Geography",
        "description": "Capitals and peaks",
        "is_public": false,
        "access_code": "XYZ123",
        "time_limit_minutes": 5,
        "max_attempts": max_attempts,
        "questions": [
            {
                "content": "Capital of France?",
                "question_type": "single_select",
                "options": ["Paris", "Rome", "Madrid"],
                "answer": "Paris",
                "points": 1
            },
            {
                "content": "The Nile is in Africa.",
                "question_type": "boolean",
                "answer": "true",
                "points": 1
            },
            {
                "content": "Highest mountain on Earth?",
                "question_type": "free_text",
                "answer": "Everest",
                "explanation": "8,849 m",
                "points": 2
            }
        ]
    })
}

pub fn question_ids(quiz: &serde_json::Value) -> Vec<i64> {
    quiz["questions"]
        .as_array()
        .expect("questions missing")
        .iter()
        .map(|q| q["id"].as_i64().unwrap())
        .collect()
}
