// src/attempt/navigator.rs

use super::AttemptError;

/// Linear cursor over an ordered question list.
///
/// Movement is clamped at both ends and never wraps. Reaching the last
/// question does not finish the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionNavigator {
    index: usize,
    len: usize,
}

impl QuestionNavigator {
    pub fn new(len: usize) -> Result<Self, AttemptError> {
        Self::resume(len, 0)
    }

    /// Starts at `index`, clamped into range.
    pub fn resume(len: usize, index: usize) -> Result<Self, AttemptError> {
        if len == 0 {
            return Err(AttemptError::EmptyQuiz);
        }
        Ok(Self {
            index: index.min(len - 1),
            len,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index == self.len - 1
    }

    pub fn advance(&mut self) -> usize {
        if !self.is_last() {
            self.index += 1;
        }
        self.index
    }

    pub fn retreat(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    pub fn jump_to(&mut self, index: usize) -> usize {
        self.index = index.min(self.len - 1);
        self.index
    }
}
