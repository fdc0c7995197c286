// src/client/prompt.rs

//! Line-oriented input for the terminal player.
//!
//! Lines starting with `:` are commands; anything else answers the current
//! question.

use std::fmt::Write;

use crate::{
    attempt::{AttemptError, answer::AnswerInput},
    models::question::{PublicQuestion, QuestionType},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    /// Zero-based question index.
    Goto(usize),
    Finish,
    /// Leave and keep progress for later.
    Quit,
    /// Leave and discard progress.
    Abandon,
    Help,
    Answer(AnswerInput),
}

pub const HELP: &str = "\
Commands:
  :n            next question
  :p            previous question
  :g <number>   go to question
  :f            finish and submit
  :q            quit, progress is kept
  :abandon      quit and discard progress
  :h            this help
Anything else answers the current question.";

pub fn parse_command(question: &PublicQuestion, line: &str) -> Result<Command, AttemptError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(AttemptError::Validation("Type an answer or :h for help".to_string()));
    }

    if let Some(rest) = line.strip_prefix(':') {
        let mut parts = rest.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        return match command.as_str() {
            "n" | "next" => Ok(Command::Next),
            "p" | "prev" => Ok(Command::Previous),
            "g" | "goto" => {
                let number = parts
                    .next()
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| AttemptError::Validation("Usage: :g <question number>".to_string()))?;
                Ok(Command::Goto(number - 1))
            }
            "f" | "finish" => Ok(Command::Finish),
            "q" | "quit" => Ok(Command::Quit),
            "abandon" => Ok(Command::Abandon),
            "h" | "help" => Ok(Command::Help),
            other => Err(AttemptError::Validation(format!("Unknown command ':{}'", other))),
        };
    }

    let input = match question.question_type {
        // Option text wins over position, so numeric options stay answerable.
        QuestionType::SingleSelect if question.options.iter().any(|o| o.trim() == line) => {
            AnswerInput::Choice(line.to_string())
        }
        QuestionType::SingleSelect => match line.parse::<usize>() {
            Ok(0) => return Err(AttemptError::Validation("Options start at 1".to_string())),
            Ok(n) => AnswerInput::ChoiceIndex(n - 1),
            Err(_) => AnswerInput::Choice(line.to_string()),
        },
        QuestionType::Boolean => match line.to_lowercase().as_str() {
            "t" | "true" | "y" | "yes" => AnswerInput::Boolean(true),
            "f" | "false" | "n" | "no" => AnswerInput::Boolean(false),
            _ => return Err(AttemptError::Validation("Answer true or false".to_string())),
        },
        QuestionType::FreeText => AnswerInput::Text(line.to_string()),
        QuestionType::Math => AnswerInput::Math(line.to_string()),
    };
    Ok(Command::Answer(input))
}

/// Formats a question for display, marking the stored answer.
pub fn render_question(
    index: usize,
    total: usize,
    question: &PublicQuestion,
    current: Option<&str>,
    remaining_seconds: Option<u64>,
) -> String {
    let mut out = String::new();
    let _ = write!(out, "\nQuestion {}/{} ({} pt)", index + 1, total, question.points);
    if let Some(secs) = remaining_seconds {
        let _ = write!(out, "  [{:02}:{:02} left]", secs / 60, secs % 60);
    }
    let _ = writeln!(out, "\n{}", question.content);
    if let Some(url) = &question.image_url {
        let _ = writeln!(out, "Image: {}", url);
    }

    match question.question_type {
        QuestionType::SingleSelect => {
            for (i, option) in question.options.iter().enumerate() {
                let marker = if current == Some(option.as_str()) { '*' } else { ' ' };
                let _ = writeln!(out, " {} {}. {}", marker, i + 1, option);
            }
        }
        QuestionType::Boolean => {
            let _ = writeln!(out, "   true / false");
        }
        QuestionType::FreeText | QuestionType::Math => {}
    }

    if let Some(answer) = current.filter(|a| !a.trim().is_empty()) {
        let _ = writeln!(out, "Your answer: {}", answer);
    }
    out
}
