//! Core data model types for probqa.
//!
//! These are the plain values that cross the engine surface: answered
//! questions, dimensions, rated targets and the parameter/result records of
//! maintenance operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier type for questions, answers, targets and quizzes.
pub type TPqaId = i64;

/// Sentinel for "no id", e.g. a quiz without an active question.
pub const INVALID_PQA_ID: TPqaId = -1;

/// Default training weight.
pub const DEFAULT_AMOUNT: f64 = 1.0;

/// A single (question, answer) pair, in compact ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    /// Compact question id.
    pub question: TPqaId,
    /// Answer index in `0..n_answers`.
    pub answer: TPqaId,
}

impl AnsweredQuestion {
    pub fn new(question: TPqaId, answer: TPqaId) -> Self {
        Self { question, answer }
    }
}

impl From<(TPqaId, TPqaId)> for AnsweredQuestion {
    fn from((question, answer): (TPqaId, TPqaId)) -> Self {
        Self { question, answer }
    }
}

/// Engine dimensions in compact ids, gaps included until compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDimensions {
    pub n_answers: TPqaId,
    pub n_questions: TPqaId,
    pub n_targets: TPqaId,
}

/// A target together with its current posterior probability in a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatedTarget {
    pub target: TPqaId,
    pub probability: f64,
}

/// Parameters for adding a question in maintenance mode.
///
/// `question` is filled in by the engine with the assigned compact id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AddQuestionParam {
    pub initial_amount: f64,
    #[serde(default = "invalid_id")]
    pub question: TPqaId,
}

impl AddQuestionParam {
    pub fn new(initial_amount: f64) -> Self {
        Self {
            initial_amount,
            question: INVALID_PQA_ID,
        }
    }
}

/// Parameters for adding a target in maintenance mode.
///
/// `target` is filled in by the engine with the assigned compact id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AddTargetParam {
    pub initial_amount: f64,
    #[serde(default = "invalid_id")]
    pub target: TPqaId,
}

impl AddTargetParam {
    pub fn new(initial_amount: f64) -> Self {
        Self {
            initial_amount,
            target: INVALID_PQA_ID,
        }
    }
}

fn invalid_id() -> TPqaId {
    INVALID_PQA_ID
}

/// Outcome of compaction: for every new compact id, the old compact id it
/// was moved from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionResult {
    pub old_questions: Vec<TPqaId>,
    pub old_targets: Vec<TPqaId>,
}

/// Numeric precision of the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float,
    Double,
    Arbitrary,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Float => write!(f, "float"),
            Precision::Double => write!(f, "double"),
            Precision::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float" | "f32" => Ok(Precision::Float),
            "double" | "f64" => Ok(Precision::Double),
            "arbitrary" => Ok(Precision::Arbitrary),
            other => Err(format!("unknown precision: {other}")),
        }
    }
}

/// Where the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    Cpu,
    Cuda,
    Grid,
}

impl fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineBackend::Cpu => write!(f, "cpu"),
            EngineBackend::Cuda => write!(f, "cuda"),
            EngineBackend::Grid => write!(f, "grid"),
        }
    }
}

impl FromStr for EngineBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(EngineBackend::Cpu),
            "cuda" | "gpu" => Ok(EngineBackend::Cuda),
            "grid" => Ok(EngineBackend::Grid),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_display_and_parse() {
        assert_eq!(Precision::Double.to_string(), "double");
        assert_eq!("F64".parse::<Precision>().unwrap(), Precision::Double);
        assert_eq!("float".parse::<Precision>().unwrap(), Precision::Float);
        assert!("half".parse::<Precision>().is_err());
    }

    #[test]
    fn backend_display_and_parse() {
        assert_eq!(EngineBackend::Cpu.to_string(), "cpu");
        assert_eq!("gpu".parse::<EngineBackend>().unwrap(), EngineBackend::Cuda);
        assert!("tpu".parse::<EngineBackend>().is_err());
    }

    #[test]
    fn answered_question_from_tuple() {
        let aq: AnsweredQuestion = (5, 1).into();
        assert_eq!(aq, AnsweredQuestion::new(5, 1));
    }

    #[test]
    fn add_params_start_unassigned() {
        assert_eq!(AddQuestionParam::new(0.5).question, INVALID_PQA_ID);
        assert_eq!(AddTargetParam::new(0.5).target, INVALID_PQA_ID);
    }
}
