// src/attempt/answer.rs

//! Answer capture for the four question variants.
//!
//! Every input is normalized to the string stored in the answer map.
//! Single-select answers are stored as the option text, never the index,
//! because scoring compares strings.

use super::AttemptError;
use crate::models::question::{FALSE_TOKEN, PublicQuestion, QuestionType, TRUE_TOKEN};
use crate::utils::sanitize::sanitize_latex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    /// Single-select, chosen by option text.
    Choice(String),
    /// Single-select, chosen by zero-based option index.
    ChoiceIndex(usize),
    Boolean(bool),
    Text(String),
    /// A LaTeX expression.
    Math(String),
}

/// Converts an input into the stored answer value for `question`.
pub fn collect(question: &PublicQuestion, input: AnswerInput) -> Result<String, AttemptError> {
    match (question.question_type, input) {
        (QuestionType::SingleSelect, AnswerInput::Choice(text)) => question
            .options
            .iter()
            .find(|option| option.trim() == text.trim())
            .cloned()
            .ok_or_else(|| AttemptError::Validation(format!("'{}' is not one of the options", text))),
        (QuestionType::SingleSelect, AnswerInput::ChoiceIndex(i)) => {
            question.options.get(i).cloned().ok_or_else(|| {
                AttemptError::Validation(format!(
                    "Option {} is out of range (1-{})",
                    i + 1,
                    question.options.len()
                ))
            })
        }
        (QuestionType::Boolean, AnswerInput::Boolean(value)) => Ok(boolean_token(value).to_string()),
        (QuestionType::FreeText, AnswerInput::Text(text)) => Ok(text.trim().to_string()),
        (QuestionType::Math, AnswerInput::Math(expr)) => Ok(sanitize_latex(&expr)),
        (expected, input) => Err(AttemptError::Validation(format!(
            "{:?} does not fit a {} question",
            input, expected
        ))),
    }
}

pub fn boolean_token(value: bool) -> &'static str {
    if value { TRUE_TOKEN } else { FALSE_TOKEN }
}

/// Empty or whitespace-only answers count as unanswered.
pub fn is_answered(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(question_type: QuestionType, options: &[&str]) -> PublicQuestion {
        PublicQuestion {
            id: 1,
            position: 0,
            content: "Q".to_string(),
            question_type,
            options: options.iter().map(|s| s.to_string()).collect(),
            points: 1,
            image_url: None,
        }
    }

    #[test]
    fn test_choice_stores_option_text() {
        let q = question(QuestionType::SingleSelect, &["Paris", "Rome"]);
        assert_eq!(collect(&q, AnswerInput::ChoiceIndex(1)).unwrap(), "Rome");
        assert_eq!(collect(&q, AnswerInput::Choice(" Paris ".into())).unwrap(), "Paris");
    }

    #[test]
    fn test_choice_outside_options_rejected() {
        let q = question(QuestionType::SingleSelect, &["Paris", "Rome"]);
        assert!(matches!(
            collect(&q, AnswerInput::ChoiceIndex(2)),
            Err(AttemptError::Validation(_))
        ));
        assert!(collect(&q, AnswerInput::Choice("Berlin".into())).is_err());
    }

    #[test]
    fn test_boolean_uses_canonical_tokens() {
        let q = question(QuestionType::Boolean, &[]);
        assert_eq!(collect(&q, AnswerInput::Boolean(true)).unwrap(), "true");
        assert_eq!(collect(&q, AnswerInput::Boolean(false)).unwrap(), "false");
    }

    #[test]
    fn test_text_is_trimmed_and_math_sanitized() {
        let text = question(QuestionType::FreeText, &[]);
        assert_eq!(collect(&text, AnswerInput::Text("  Paris \n".into())).unwrap(), "Paris");

        let math = question(QuestionType::Math, &[]);
        assert_eq!(
            collect(&math, AnswerInput::Math(r" \frac{1}{2}\href{x}{y} ".into())).unwrap(),
            r"\frac{1}{2}"
        );
    }

    #[test]
    fn test_mismatched_input_rejected() {
        let q = question(QuestionType::Boolean, &[]);
        assert!(collect(&q, AnswerInput::Text("true".into())).is_err());
    }

    #[test]
    fn test_is_answered() {
        assert!(!is_answered(None));
        assert!(!is_answered(Some("")));
        assert!(!is_answered(Some("   ")));
        assert!(is_answered(Some("a")));
    }
}
