// src/client/http.rs

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::{QuizBackend, Submission};
use crate::{
    attempt::AttemptError,
    models::{
        attempt::{AccessRequest, SubmitAttemptRequest, SubmitAttemptResponse},
        quiz::{QuizPaper, QuizSummary},
        user::{LoginRequest, LoginResponse},
    },
};

/// [`QuizBackend`] over the quiz service's JSON API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, AttemptError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AttemptError::Validation(format!("Invalid service URL '{}': {}", base_url, e)))?;
        // Without a trailing slash `join` would replace the last path segment.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Logs in and returns a backend that sends the issued bearer token.
    pub async fn login(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(Self, LoginResponse), AttemptError> {
        let backend = Self::new(base_url)?;
        let response = backend
            .client
            .post(backend.endpoint("api/auth/login")?)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(remote)?;

        let login: LoginResponse = match response.status() {
            // Bad credentials are not an access-code problem.
            StatusCode::UNAUTHORIZED => {
                return Err(AttemptError::Validation("Invalid username or password".to_string()));
            }
            _ => parse(response).await?,
        };

        tracing::info!("Logged in as {}", username);
        Ok((backend.with_token(login.token.clone()), login))
    }

    /// Public quizzes, newest first.
    pub async fn list_quizzes(&self) -> Result<Vec<QuizSummary>, AttemptError> {
        let url = self.endpoint("api/quizzes")?;
        let response = self.client.get(url).send().await.map_err(remote)?;
        parse(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, AttemptError> {
        self.base
            .join(path)
            .map_err(|e| AttemptError::Validation(format!("Invalid endpoint '{}': {}", path, e)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn remote(err: reqwest::Error) -> AttemptError {
    tracing::warn!("Request failed: {}", err);
    AttemptError::Remote(err.to_string())
}

/// Maps the service's `{"error": ...}` responses onto [`AttemptError`].
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, AttemptError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(remote);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| status.to_string());

    tracing::debug!("Service answered {}: {}", status, message);
    Err(match status {
        StatusCode::FORBIDDEN => AttemptError::InvalidAccessCode,
        StatusCode::NOT_FOUND => {
            AttemptError::NotFound(message.trim_end_matches(" not found").to_string())
        }
        StatusCode::BAD_REQUEST => AttemptError::Validation(message),
        _ => AttemptError::Remote(format!("{} ({})", message, status)),
    })
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn quiz(&self, quiz_id: i64) -> Result<QuizSummary, AttemptError> {
        let url = self.endpoint(&format!("api/quizzes/{}", quiz_id))?;
        let response = self.client.get(url).send().await.map_err(remote)?;
        parse(response).await
    }

    async fn verify_access(&self, quiz_id: i64, access_code: Option<&str>) -> Result<(), AttemptError> {
        let url = self.endpoint(&format!("api/quizzes/{}/access", quiz_id))?;
        let response = self
            .client
            .post(url)
            .json(&AccessRequest {
                access_code: access_code.map(str::to_string),
            })
            .send()
            .await
            .map_err(remote)?;
        let _: serde_json::Value = parse(response).await?;
        Ok(())
    }

    async fn start(&self, quiz_id: i64, access_code: Option<&str>) -> Result<QuizPaper, AttemptError> {
        let url = self.endpoint(&format!("api/quizzes/{}/start", quiz_id))?;
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "access_code": access_code }))
            .send()
            .await
            .map_err(remote)?;
        parse(response).await
    }

    async fn submit(&self, submission: &Submission) -> Result<SubmitAttemptResponse, AttemptError> {
        let url = self.endpoint(&format!("api/quizzes/{}/submit", submission.quiz_id))?;
        let body = SubmitAttemptRequest {
            answers: submission.answers.clone(),
            time_taken: i64::try_from(submission.time_taken).unwrap_or(i64::MAX),
            access_code: submission.access_code.clone(),
        };
        let response = self
            .authorized(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(remote)?;
        parse(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = HttpBackend::new("http://localhost:3000/quiz").unwrap();
        assert_eq!(
            backend.endpoint("api/quizzes/1").unwrap().as_str(),
            "http://localhost:3000/quiz/api/quizzes/1"
        );

        let root = HttpBackend::new("http://localhost:3000").unwrap();
        assert_eq!(
            root.endpoint("api/quizzes").unwrap().as_str(),
            "http://localhost:3000/api/quizzes"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpBackend::new("not a url"),
            Err(AttemptError::Validation(_))
        ));
    }
}
