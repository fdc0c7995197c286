// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::sanitize::{clean_html, sanitize_rich_text};

/// Canonical boolean answer tokens, used by every flow.
pub const TRUE_TOKEN: &str = "true";
pub const FALSE_TOKEN: &str = "false";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleSelect,
    Boolean,
    FreeText,
    Math,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleSelect => "single_select",
            QuestionType::Boolean => "boolean",
            QuestionType::FreeText => "free_text",
            QuestionType::Math => "math",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_select" => Ok(QuestionType::SingleSelect),
            "boolean" => Ok(QuestionType::Boolean),
            "free_text" => Ok(QuestionType::FreeText),
            "math" => Ok(QuestionType::Math),
            other => Err(format!("Unknown question type '{}'", other)),
        }
    }
}

/// A quiz question including its answer key. Never sent to quiz takers as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Zero-based order within the quiz.
    pub position: i32,

    /// Display text; may embed `$...$` math markup.
    pub content: String,

    pub question_type: QuestionType,

    /// Choices for single-select questions, in display order. Empty otherwise.
    pub options: Vec<String>,

    /// The correct answer, compared textually after trimming and lowercasing.
    pub answer: String,

    pub explanation: Option<String>,

    pub points: i32,

    pub image_url: Option<String>,
}

/// DTO for sending a question to a quiz taker (excludes answer and explanation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i32,
    pub content: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: i32,
    pub image_url: Option<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            position: q.position,
            content: q.content.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            points: q.points,
            image_url: q.image_url.clone(),
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub question_type: QuestionType,
    #[serde(default)]
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(range(min = 1, max = 1000))]
    pub points: Option<i32>,
    #[validate(custom(function = validate_image_url))]
    pub image_url: Option<String>,
}

/// A validated, sanitized question ready to be stored.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub content: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: Option<String>,
    pub points: i32,
    pub image_url: Option<String>,
}

impl CreateQuestionRequest {
    /// Checks the answer key against the question type.
    ///
    /// The trimmed answer may not be blank. Single-select answers must be one
    /// of the options; boolean answers must be one of the canonical tokens.
    pub fn check_answer_key(&self) -> Result<(), String> {
        if self.answer.trim().is_empty() {
            return Err("Answer cannot be blank".to_string());
        }
        match self.question_type {
            QuestionType::SingleSelect => {
                if self.options.len() < 2 {
                    return Err("Single-select questions need at least two options".to_string());
                }
                if !self.options.iter().any(|o| o.trim() == self.answer.trim()) {
                    return Err("Answer must be one of the options".to_string());
                }
            }
            QuestionType::Boolean => {
                let answer = self.answer.trim();
                if answer != TRUE_TOKEN && answer != FALSE_TOKEN {
                    return Err(format!(
                        "Boolean answers must be '{}' or '{}'",
                        TRUE_TOKEN, FALSE_TOKEN
                    ));
                }
            }
            QuestionType::FreeText | QuestionType::Math => {
                if !self.options.is_empty() {
                    return Err(format!(
                        "Options are only allowed on {} questions",
                        QuestionType::SingleSelect
                    ));
                }
            }
        }
        Ok(())
    }

    /// Sanitizes display text and fills defaults.
    pub fn into_new_question(self) -> NewQuestion {
        let options = match self.question_type {
            QuestionType::SingleSelect => self.options.iter().map(|o| o.trim().to_string()).collect(),
            _ => Vec::new(),
        };
        NewQuestion {
            content: sanitize_rich_text(&self.content),
            question_type: self.question_type,
            options,
            answer: self.answer.trim().to_string(),
            explanation: self.explanation.as_deref().map(clean_html),
            points: self.points.unwrap_or(1),
            image_url: self.image_url,
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_image_url(url: &str) -> Result<(), validator::ValidationError> {
    if url::Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_image_url"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_type: QuestionType, options: &[&str], answer: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            content: "What?".to_string(),
            question_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            answer: answer.to_string(),
            explanation: None,
            points: None,
            image_url: None,
        }
    }

    #[test]
    fn test_single_select_answer_must_be_an_option() {
        let ok = request(QuestionType::SingleSelect, &["Paris", "Rome"], "Paris");
        assert!(ok.check_answer_key().is_ok());

        let bad = request(QuestionType::SingleSelect, &["Paris", "Rome"], "Berlin");
        assert!(bad.check_answer_key().is_err());
    }

    #[test]
    fn test_boolean_answer_uses_canonical_tokens() {
        assert!(request(QuestionType::Boolean, &[], "true").check_answer_key().is_ok());
        assert!(request(QuestionType::Boolean, &[], "false").check_answer_key().is_ok());
        assert!(request(QuestionType::Boolean, &[], "True").check_answer_key().is_err());
        assert!(request(QuestionType::Boolean, &[], "yes").check_answer_key().is_err());
    }

    #[test]
    fn test_free_text_rejects_options() {
        let bad = request(QuestionType::FreeText, &["A"], "A");
        assert!(bad.check_answer_key().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_points_and_url() {
        let mut req = request(QuestionType::FreeText, &[], "x");
        req.points = Some(0);
        assert!(req.validate().is_err());

        req.points = Some(2);
        req.image_url = Some("not a url".to_string());
        assert!(req.validate().is_err());

        req.image_url = Some("https://example.com/a.png".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_into_new_question_defaults_points() {
        let q = request(QuestionType::SingleSelect, &[" A ", "B"], " A ").into_new_question();
        assert_eq!(q.points, 1);
        assert_eq!(q.options, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(q.answer, "A");
    }

    #[test]
    fn test_question_type_parse() {
        assert_eq!("math".parse::<QuestionType>().unwrap(), QuestionType::Math);
        assert!("multiple".parse::<QuestionType>().is_err());
        assert_eq!(QuestionType::FreeText.to_string(), "free_text");
    }

    #[test]
    fn test_blank_answer_key_rejected() {
        assert!(request(QuestionType::FreeText, &[], "   ").check_answer_key().is_err());
        assert!(request(QuestionType::Math, &[], " \t").check_answer_key().is_err());
        assert!(request(QuestionType::FreeText, &[], " Everest ").check_answer_key().is_ok());
    }
}
