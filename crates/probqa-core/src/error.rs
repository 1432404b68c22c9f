//! Engine error types.
//!
//! Every misuse the engine can detect is reported as a `PqaError` variant
//! carrying the offending value. A call that returns an error has not
//! mutated the engine.

use thiserror::Error;

use crate::model::TPqaId;

/// Errors that can occur when calling into a probqa engine.
#[derive(Debug, Error)]
pub enum PqaError {
    /// The declared number of answered questions does not match the slice length.
    #[error("length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch { declared: i64, actual: usize },

    /// The target id is out of range or has been removed.
    #[error("invalid target id: {0}")]
    InvalidTarget(TPqaId),

    /// The question id is out of range or has been removed.
    #[error("invalid question id: {0}")]
    InvalidQuestion(TPqaId),

    /// The answer id is outside `0..n_answers`.
    #[error("invalid answer id {answer} for question {question}")]
    InvalidAnswer { question: TPqaId, answer: TPqaId },

    /// The training amount is negative, NaN or infinite.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    /// The quiz id does not reference an open quiz.
    #[error("invalid quiz id: {0}")]
    InvalidQuiz(TPqaId),

    /// The quiz has no active question to record an answer for.
    #[error("quiz {0} has no active question")]
    NoActiveQuestion(TPqaId),

    /// Every live question has already been asked in the quiz.
    #[error("quiz {0} has no questions left to ask")]
    QuestionsExhausted(TPqaId),

    /// The operation is not allowed in the engine's current mode.
    #[error("operation {operation} is not allowed in {mode} mode")]
    WrongMode {
        operation: &'static str,
        mode: &'static str,
    },

    /// Maintenance was requested while quizzes are still open.
    #[error("{0} quiz(zes) in progress")]
    QuizzesActive(usize),

    /// The engine has been shut down.
    #[error("engine has been shut down")]
    ShutDown,

    /// The engine definition is not usable.
    #[error("invalid engine definition: {0}")]
    InvalidDefinition(String),

    /// The requested backend or precision has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Reading or writing a knowledge base file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A knowledge base file is malformed or inconsistent.
    #[error("knowledge base format error: {0}")]
    Format(String),

    /// An internal invariant was violated (e.g. a poisoned lock).
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Result alias used throughout the engine.
pub type PqaResult<T> = Result<T, PqaError>;

impl PqaError {
    /// Returns `true` if the error reflects bad caller input rather than an
    /// engine fault or lifecycle state.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PqaError::LengthMismatch { .. }
                | PqaError::InvalidTarget(_)
                | PqaError::InvalidQuestion(_)
                | PqaError::InvalidAnswer { .. }
                | PqaError::InvalidAmount(_)
                | PqaError::InvalidQuiz(_)
                | PqaError::InvalidDefinition(_)
        )
    }
}

impl From<serde_json::Error> for PqaError {
    fn from(e: serde_json::Error) -> Self {
        PqaError::Format(e.to_string())
    }
}
