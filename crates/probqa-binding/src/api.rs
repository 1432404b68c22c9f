//! Handle-based calls into the process-wide engine registry.
//!
//! Every function looks the handle up, runs one engine call and reports the
//! outcome as an [`ErrorCode`]. A non-`Ok` code means nothing was mutated.

use std::path::Path;

use probqa_core::{
    AnsweredQuestion, EngineDefinition, PqaEngine, PqaResult, RatedTarget, TPqaId, DEFAULT_AMOUNT,
};

use crate::error_code::ErrorCode;
use crate::registry::{log_error, EngineHandle, EngineRegistry};

fn with_engine<T>(
    handle: EngineHandle,
    operation: &'static str,
    call: impl FnOnce(&PqaEngine) -> PqaResult<T>,
) -> Result<T, ErrorCode> {
    let engine = EngineRegistry::global().get(handle)?;
    call(engine.as_ref()).map_err(|e| log_error(operation, e))
}

fn status(
    handle: EngineHandle,
    operation: &'static str,
    call: impl FnOnce(&PqaEngine) -> PqaResult<()>,
) -> ErrorCode {
    ErrorCode::from_result(with_engine(handle, operation, call))
}

fn translated(
    handle: EngineHandle,
    operation: &'static str,
    call: impl FnOnce(&PqaEngine) -> PqaResult<bool>,
) -> bool {
    with_engine(handle, operation, call).unwrap_or(false)
}

/// Create an engine with a fresh knowledge base.
pub fn create(def: &EngineDefinition) -> Result<EngineHandle, ErrorCode> {
    EngineRegistry::global().create(def)
}

/// Create an engine from a knowledge base file.
pub fn load(path: &Path, max_quizzes: usize) -> Result<EngineHandle, ErrorCode> {
    EngineRegistry::global().load(path, max_quizzes)
}

/// Destroy an engine. Every later call with `handle` fails with
/// `InvalidHandle`.
pub fn release(handle: EngineHandle) -> ErrorCode {
    EngineRegistry::global().release(handle)
}

/// Fold `count` answered questions into the statistics of `target`.
pub fn train(
    handle: EngineHandle,
    count: TPqaId,
    answered: &[AnsweredQuestion],
    target: TPqaId,
    amount: f64,
) -> ErrorCode {
    status(handle, "train", |e| e.train(count, answered, target, amount))
}

/// `train` with the default amount of 1.
pub fn train_default(
    handle: EngineHandle,
    count: TPqaId,
    answered: &[AnsweredQuestion],
    target: TPqaId,
) -> ErrorCode {
    train(handle, count, answered, target, DEFAULT_AMOUNT)
}

/// Translate compact question ids to permanent ids in place.
///
/// Returns `false`, leaving `ids` untouched, for an invalid handle, an
/// unknown or removed id, or an id listed twice.
pub fn question_perm_from_comp(handle: EngineHandle, ids: &mut [TPqaId]) -> bool {
    translated(handle, "question_perm_from_comp", |e| {
        e.question_perm_from_comp(ids)
    })
}

pub fn question_comp_from_perm(handle: EngineHandle, ids: &mut [TPqaId]) -> bool {
    translated(handle, "question_comp_from_perm", |e| {
        e.question_comp_from_perm(ids)
    })
}

pub fn target_perm_from_comp(handle: EngineHandle, ids: &mut [TPqaId]) -> bool {
    translated(handle, "target_perm_from_comp", |e| e.target_perm_from_comp(ids))
}

pub fn target_comp_from_perm(handle: EngineHandle, ids: &mut [TPqaId]) -> bool {
    translated(handle, "target_comp_from_perm", |e| e.target_comp_from_perm(ids))
}

pub fn start_quiz(handle: EngineHandle) -> Result<TPqaId, ErrorCode> {
    with_engine(handle, "start_quiz", PqaEngine::start_quiz)
}

pub fn next_question(handle: EngineHandle, quiz: TPqaId) -> Result<TPqaId, ErrorCode> {
    with_engine(handle, "next_question", |e| e.next_question(quiz))
}

pub fn record_answer(handle: EngineHandle, quiz: TPqaId, answer: TPqaId) -> ErrorCode {
    status(handle, "record_answer", |e| e.record_answer(quiz, answer))
}

pub fn list_top_targets(
    handle: EngineHandle,
    quiz: TPqaId,
    max_count: usize,
) -> Result<Vec<RatedTarget>, ErrorCode> {
    with_engine(handle, "list_top_targets", |e| {
        e.list_top_targets(quiz, max_count)
    })
}

pub fn record_quiz_target(
    handle: EngineHandle,
    quiz: TPqaId,
    target: TPqaId,
    amount: f64,
) -> ErrorCode {
    status(handle, "record_quiz_target", |e| {
        e.record_quiz_target(quiz, target, amount)
    })
}

pub fn release_quiz(handle: EngineHandle, quiz: TPqaId) -> ErrorCode {
    status(handle, "release_quiz", |e| e.release_quiz(quiz))
}

pub fn save_kb(handle: EngineHandle, path: &Path) -> ErrorCode {
    status(handle, "save_kb", |e| e.save_kb(path))
}

/// Exclusive owner of an engine handle.
///
/// The engine is released when the owner goes out of scope, on every exit
/// path, unless it was released explicitly first.
#[derive(Debug)]
pub struct ScopedEngine {
    handle: Option<EngineHandle>,
}

impl ScopedEngine {
    pub fn create(def: &EngineDefinition) -> Result<Self, ErrorCode> {
        create(def).map(Self::from_handle)
    }

    pub fn load(path: &Path, max_quizzes: usize) -> Result<Self, ErrorCode> {
        load(path, max_quizzes).map(Self::from_handle)
    }

    /// Take over a handle; it must not be released elsewhere.
    pub fn from_handle(handle: EngineHandle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// The raw handle, for the free functions of this module.
    pub fn handle(&self) -> EngineHandle {
        // Only `release(self)` and `drop` clear the option.
        self.handle.unwrap_or(EngineHandle::from_raw(0))
    }

    /// Release the engine now and report the outcome.
    pub fn release(mut self) -> ErrorCode {
        self.handle.take().map_or(ErrorCode::InvalidHandle, release)
    }
}

impl Drop for ScopedEngine {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let code = release(handle);
            if !code.is_ok() {
                tracing::warn!(handle = %handle, code = code.as_i32(), "scoped release failed");
            }
        }
    }
}
