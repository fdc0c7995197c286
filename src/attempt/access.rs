// src/attempt/access.rs

use super::AttemptError;
use crate::models::quiz::Quiz;

/// Checks a supplied access code against a quiz.
///
/// Public quizzes, and private quizzes without a code, always pass. Otherwise
/// the trimmed codes must match ignoring case. There is no lockout; callers
/// may retry as often as they like.
pub fn verify_access(quiz: &Quiz, supplied: Option<&str>) -> Result<(), AttemptError> {
    if !quiz.requires_access_code() {
        return Ok(());
    }

    let expected = quiz.access_code.as_deref().unwrap_or_default();
    match supplied {
        Some(code) if codes_match(expected, code) => Ok(()),
        _ => {
            tracing::debug!("Access code rejected for quiz {}", quiz.id);
            Err(AttemptError::InvalidAccessCode)
        }
    }
}

fn codes_match(expected: &str, supplied: &str) -> bool {
    expected.trim().to_lowercase() == supplied.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(is_public: bool, code: Option<&str>) -> Quiz {
        Quiz {
            id: 7,
            title: "Gate".to_string(),
            description: None,
            is_public,
            access_code: code.map(str::to_string),
            time_limit_minutes: None,
            max_attempts: 3,
            created_by: None,
            created_at: None,
            questions: Vec::new(),
        }
    }

    #[test]
    fn test_case_insensitive_match() {
        let q = quiz(false, Some("XYZ123"));
        assert!(verify_access(&q, Some("xyz123")).is_ok());
        assert!(verify_access(&q, Some("  XyZ123 ")).is_ok());
    }

    #[test]
    fn test_wrong_code_rejected_and_retry_allowed() {
        let q = quiz(false, Some("XYZ123"));
        assert!(matches!(
            verify_access(&q, Some("xyz124")),
            Err(AttemptError::InvalidAccessCode)
        ));
        assert!(matches!(
            verify_access(&q, None),
            Err(AttemptError::InvalidAccessCode)
        ));
        // No lockout after failures.
        assert!(verify_access(&q, Some("XYZ123")).is_ok());
    }

    #[test]
    fn test_public_quiz_passes_without_code() {
        let q = quiz(true, Some("XYZ123"));
        assert!(verify_access(&q, None).is_ok());
        assert!(verify_access(&q, Some("wrong")).is_ok());
    }

    #[test]
    fn test_private_quiz_without_code_passes() {
        assert!(verify_access(&quiz(false, None), None).is_ok());
    }
}
