//! Stable result codes for the binding surface.

use probqa_core::PqaError;
use thiserror::Error;

/// Result of a binding call. The numeric values cross language boundaries
/// and must never change; new codes are only ever appended.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("ok")]
    Ok = 0,
    /// The handle was never issued or has been released.
    #[error("invalid engine handle")]
    InvalidHandle = 1,
    #[error("declared count does not match the sequence length")]
    LengthMismatch = 2,
    #[error("invalid target id")]
    InvalidTarget = 3,
    #[error("invalid question id")]
    InvalidQuestionId = 4,
    #[error("invalid answer id")]
    InvalidAnswerId = 5,
    /// Negative, NaN or infinite amount.
    #[error("invalid amount")]
    InvalidAmount = 6,
    #[error("invalid quiz id")]
    InvalidQuizId = 7,
    /// The engine or quiz is not in a state that allows the call.
    #[error("operation not allowed in the current mode")]
    WrongMode = 8,
    #[error("no questions left to ask")]
    QuestionsExhausted = 9,
    #[error("not implemented")]
    NotImplemented = 10,
    #[error("internal failure")]
    InternalFailure = 11,
    #[error("invalid engine definition")]
    InvalidDefinition = 12,
    /// A knowledge base file could not be read, written or parsed.
    #[error("knowledge base I/O failure")]
    IoFailure = 13,
}

impl ErrorCode {
    const ALL: [ErrorCode; 14] = [
        ErrorCode::Ok,
        ErrorCode::InvalidHandle,
        ErrorCode::LengthMismatch,
        ErrorCode::InvalidTarget,
        ErrorCode::InvalidQuestionId,
        ErrorCode::InvalidAnswerId,
        ErrorCode::InvalidAmount,
        ErrorCode::InvalidQuizId,
        ErrorCode::WrongMode,
        ErrorCode::QuestionsExhausted,
        ErrorCode::NotImplemented,
        ErrorCode::InternalFailure,
        ErrorCode::InvalidDefinition,
        ErrorCode::IoFailure,
    ];

    pub fn is_ok(self) -> bool {
        self == ErrorCode::Ok
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Collapse a unit result into a code.
    pub fn from_result(result: Result<(), ErrorCode>) -> ErrorCode {
        match result {
            Ok(()) => ErrorCode::Ok,
            Err(code) => code,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(value)
    }
}

impl From<&PqaError> for ErrorCode {
    fn from(err: &PqaError) -> Self {
        match err {
            PqaError::LengthMismatch { .. } => ErrorCode::LengthMismatch,
            PqaError::InvalidTarget(_) => ErrorCode::InvalidTarget,
            PqaError::InvalidQuestion(_) => ErrorCode::InvalidQuestionId,
            PqaError::InvalidAnswer { .. } => ErrorCode::InvalidAnswerId,
            PqaError::InvalidAmount(_) => ErrorCode::InvalidAmount,
            PqaError::InvalidQuiz(_) => ErrorCode::InvalidQuizId,
            PqaError::NoActiveQuestion(_)
            | PqaError::WrongMode { .. }
            | PqaError::QuizzesActive(_) => ErrorCode::WrongMode,
            PqaError::QuestionsExhausted(_) => ErrorCode::QuestionsExhausted,
            // A shut down engine is only reachable through a handle that is
            // being released.
            PqaError::ShutDown => ErrorCode::InvalidHandle,
            PqaError::InvalidDefinition(_) => ErrorCode::InvalidDefinition,
            PqaError::NotImplemented(_) => ErrorCode::NotImplemented,
            PqaError::Io(_) | PqaError::Format(_) => ErrorCode::IoFailure,
            PqaError::Internal(_) => ErrorCode::InternalFailure,
        }
    }
}

impl From<PqaError> for ErrorCode {
    fn from(err: PqaError) -> Self {
        ErrorCode::from(&err)
    }
}
