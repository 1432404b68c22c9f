//! The probqa engine.
//!
//! `PqaEngine` owns the knowledge base, the id mappers and the open quizzes,
//! and is safe to share between threads. Internally the quiz pool sits behind
//! a `Mutex` and everything else behind an `RwLock`; when both are needed the
//! quiz pool is always locked first.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::EngineDefinition;
use crate::error::{PqaError, PqaResult};
use crate::id_mapper::IdMapper;
use crate::inference;
use crate::kb::KnowledgeBase;
use crate::model::{
    AddQuestionParam, AddTargetParam, AnsweredQuestion, CompactionResult, EngineDimensions,
    Precision, RatedTarget, TPqaId,
};
use crate::persistence::{self, KbSnapshot, FORMAT_VERSION};
use crate::quiz::{Quiz, QuizPool};

/// Lifecycle mode of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// Quizzes and training are allowed.
    Regular,
    /// Questions and targets can be added, removed and compacted; no quizzes.
    Maintenance,
    /// Terminal: every call fails with `PqaError::ShutDown`.
    ShutDown,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Regular => "regular",
            EngineMode::Maintenance => "maintenance",
            EngineMode::ShutDown => "shutdown",
        }
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct EngineState {
    mode: EngineMode,
    kb: KnowledgeBase,
    questions: IdMapper,
    targets: IdMapper,
}

impl EngineState {
    fn require_mode(&self, wanted: EngineMode, operation: &'static str) -> PqaResult<()> {
        if self.mode == wanted {
            Ok(())
        } else {
            Err(PqaError::WrongMode {
                operation,
                mode: self.mode.as_str(),
            })
        }
    }

    fn check_target(&self, target: TPqaId) -> PqaResult<()> {
        if self.targets.is_live(target) {
            Ok(())
        } else {
            Err(PqaError::InvalidTarget(target))
        }
    }

    fn check_question(&self, question: TPqaId) -> PqaResult<()> {
        if self.questions.is_live(question) {
            Ok(())
        } else {
            Err(PqaError::InvalidQuestion(question))
        }
    }

    fn check_answer(&self, question: TPqaId, answer: TPqaId) -> PqaResult<()> {
        if (0..self.kb.n_answers() as TPqaId).contains(&answer) {
            Ok(())
        } else {
            Err(PqaError::InvalidAnswer { question, answer })
        }
    }

    fn check_answered(&self, aqs: &[AnsweredQuestion]) -> PqaResult<()> {
        for aq in aqs {
            self.check_question(aq.question)?;
            self.check_answer(aq.question, aq.answer)?;
        }
        Ok(())
    }

    fn dims(&self) -> EngineDimensions {
        EngineDimensions {
            n_answers: self.kb.n_answers() as TPqaId,
            n_questions: self.kb.n_questions() as TPqaId,
            n_targets: self.kb.n_targets() as TPqaId,
        }
    }
}

fn check_amount(amount: f64) -> PqaResult<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(PqaError::InvalidAmount(amount))
    }
}

fn check_count(count: TPqaId, aqs: &[AnsweredQuestion]) -> PqaResult<()> {
    if usize::try_from(count).ok() == Some(aqs.len()) {
        Ok(())
    } else {
        Err(PqaError::LengthMismatch {
            declared: count,
            actual: aqs.len(),
        })
    }
}

fn check_initial_amount(amount: f64) -> PqaResult<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(PqaError::InvalidAmount(amount))
    }
}

fn poisoned<T>(_: T) -> PqaError {
    PqaError::Internal("engine lock poisoned".into())
}

/// A probabilistic question-answering engine.
pub struct PqaEngine {
    id: Uuid,
    precision: Precision,
    max_quizzes: usize,
    quizzes: Mutex<QuizPool>,
    state: RwLock<EngineState>,
    total_questions_asked: AtomicU64,
}

impl fmt::Debug for PqaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PqaEngine")
            .field("id", &self.id)
            .field("precision", &self.precision)
            .field("max_quizzes", &self.max_quizzes)
            .finish_non_exhaustive()
    }
}

impl PqaEngine {
    /// Create an engine with a fresh knowledge base.
    pub fn new(def: &EngineDefinition) -> PqaResult<Self> {
        def.validate()?;
        let kb = KnowledgeBase::new(
            def.n_answers as usize,
            def.n_questions as usize,
            def.n_targets as usize,
            def.initial_amount,
        )?;
        let engine = Self::assemble(
            Uuid::new_v4(),
            def.precision,
            def.max_quizzes,
            kb,
            IdMapper::with_len(def.n_questions),
            IdMapper::with_len(def.n_targets),
            0,
        );
        tracing::info!(
            engine_id = %engine.id,
            answers = def.n_answers,
            questions = def.n_questions,
            targets = def.n_targets,
            "created engine"
        );
        Ok(engine)
    }

    /// Rebuild an engine from a validated snapshot.
    pub fn from_snapshot(snapshot: KbSnapshot, max_quizzes: usize) -> PqaResult<Self> {
        snapshot.validate()?;
        let engine = Self::assemble(
            Uuid::new_v4(),
            snapshot.precision,
            max_quizzes.max(1),
            snapshot.kb,
            snapshot.questions,
            snapshot.targets,
            snapshot.total_questions_asked,
        );
        tracing::info!(
            engine_id = %engine.id,
            source_engine = %snapshot.engine_id,
            "restored engine from snapshot"
        );
        Ok(engine)
    }

    fn assemble(
        id: Uuid,
        precision: Precision,
        max_quizzes: usize,
        kb: KnowledgeBase,
        questions: IdMapper,
        targets: IdMapper,
        total_questions_asked: u64,
    ) -> Self {
        Self {
            id,
            precision,
            max_quizzes,
            quizzes: Mutex::new(QuizPool::new()),
            state: RwLock::new(EngineState {
                mode: EngineMode::Regular,
                kb,
                questions,
                targets,
            }),
            total_questions_asked: AtomicU64::new(total_questions_asked),
        }
    }

    /// Instance id, used in logs and knowledge base files.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Current lifecycle mode.
    pub fn mode(&self) -> PqaResult<EngineMode> {
        Ok(self.state.read().map_err(poisoned)?.mode)
    }

    fn read_state(&self) -> PqaResult<RwLockReadGuard<'_, EngineState>> {
        let guard = self.state.read().map_err(poisoned)?;
        if guard.mode == EngineMode::ShutDown {
            return Err(PqaError::ShutDown);
        }
        Ok(guard)
    }

    fn write_state(&self) -> PqaResult<RwLockWriteGuard<'_, EngineState>> {
        let guard = self.state.write().map_err(poisoned)?;
        if guard.mode == EngineMode::ShutDown {
            return Err(PqaError::ShutDown);
        }
        Ok(guard)
    }

    fn lock_quizzes(&self) -> PqaResult<MutexGuard<'_, QuizPool>> {
        self.quizzes.lock().map_err(poisoned)
    }

    // -----------------------------------------------------------------------
    // Training
    // -----------------------------------------------------------------------

    /// Fold `aqs` into the statistics of `target`, scaled by `amount`.
    ///
    /// `count` must equal `aqs.len()`. Every id is validated before anything
    /// is written, so an error leaves the knowledge base unchanged.
    pub fn train(
        &self,
        count: TPqaId,
        aqs: &[AnsweredQuestion],
        target: TPqaId,
        amount: f64,
    ) -> PqaResult<()> {
        let mut state = self.write_state()?;
        check_count(count, aqs)?;
        check_amount(amount)?;
        state.check_target(target)?;
        state.check_answered(aqs)?;
        state.kb.apply_training(aqs, target as usize, amount);
        tracing::debug!(
            engine_id = %self.id,
            target_id = target,
            amount,
            answered = aqs.len(),
            "trained"
        );
        Ok(())
    }

    /// Current dimensions, gaps included.
    pub fn dims(&self) -> PqaResult<EngineDimensions> {
        Ok(self.read_state()?.dims())
    }

    /// Number of questions handed out by `next_question` over the lifetime
    /// of the knowledge base.
    pub fn total_questions_asked(&self) -> PqaResult<u64> {
        let _state = self.read_state()?;
        Ok(self.total_questions_asked.load(Ordering::Relaxed))
    }

    /// Copy `A[question][answer][*]` for at most `max_targets` targets.
    pub fn copy_a_targets(
        &self,
        question: TPqaId,
        answer: TPqaId,
        max_targets: usize,
    ) -> PqaResult<Vec<f64>> {
        let state = self.read_state()?;
        state.check_question(question)?;
        state.check_answer(question, answer)?;
        let row = state.kb.a_row(question as usize, answer as usize);
        Ok(row[..max_targets.min(row.len())].to_vec())
    }

    /// Copy `D[question][*]` for at most `max_targets` targets.
    pub fn copy_d_targets(&self, question: TPqaId, max_targets: usize) -> PqaResult<Vec<f64>> {
        let state = self.read_state()?;
        state.check_question(question)?;
        let row = state.kb.d_row(question as usize);
        Ok(row[..max_targets.min(row.len())].to_vec())
    }

    /// Copy `B[*]` for at most `max_targets` targets.
    pub fn copy_b_targets(&self, max_targets: usize) -> PqaResult<Vec<f64>> {
        let state = self.read_state()?;
        let row = state.kb.b_row();
        Ok(row[..max_targets.min(row.len())].to_vec())
    }

    // -----------------------------------------------------------------------
    // Id mappers
    // -----------------------------------------------------------------------

    /// Translate compact question ids to permanent ids in place.
    ///
    /// `Ok(false)` means some id is not a live question or is listed twice;
    /// `ids` is then left untouched. Never mutates the knowledge base.
    pub fn question_perm_from_comp(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        Ok(self.read_state()?.questions.perm_from_comp(ids))
    }

    pub fn question_comp_from_perm(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        Ok(self.read_state()?.questions.comp_from_perm(ids))
    }

    pub fn target_perm_from_comp(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        Ok(self.read_state()?.targets.perm_from_comp(ids))
    }

    pub fn target_comp_from_perm(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        Ok(self.read_state()?.targets.comp_from_perm(ids))
    }

    pub fn quiz_perm_from_comp(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        let pool = self.lock_quizzes()?;
        let _state = self.read_state()?;
        Ok(pool.ids().perm_from_comp(ids))
    }

    pub fn quiz_comp_from_perm(&self, ids: &mut [TPqaId]) -> PqaResult<bool> {
        let pool = self.lock_quizzes()?;
        let _state = self.read_state()?;
        Ok(pool.ids().comp_from_perm(ids))
    }

    /// Ensure the next permanent quiz id is greater than `bound`.
    /// Returns whether it had to be raised.
    pub fn ensure_perm_quiz_greater(&self, bound: TPqaId) -> PqaResult<bool> {
        let mut pool = self.lock_quizzes()?;
        let _state = self.read_state()?;
        Ok(pool.ids_mut().ensure_perm_greater(bound))
    }

    /// Give the open quiz with permanent id `src` the unused permanent id `dest`.
    pub fn remap_quiz_perm_id(&self, src: TPqaId, dest: TPqaId) -> PqaResult<bool> {
        let mut pool = self.lock_quizzes()?;
        let _state = self.read_state()?;
        Ok(pool.ids_mut().remap_perm(src, dest))
    }

    // -----------------------------------------------------------------------
    // Quizzes (regular mode only)
    // -----------------------------------------------------------------------

    /// Open a quiz whose posterior is the current prior.
    pub fn start_quiz(&self) -> PqaResult<TPqaId> {
        self.create_quiz(0, &[])
    }

    /// Open a quiz and apply already known answers.
    pub fn resume_quiz(&self, count: TPqaId, aqs: &[AnsweredQuestion]) -> PqaResult<TPqaId> {
        self.create_quiz(count, aqs)
    }

    fn create_quiz(&self, count: TPqaId, aqs: &[AnsweredQuestion]) -> PqaResult<TPqaId> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "start_quiz")?;
        check_count(count, aqs)?;
        state.check_answered(aqs)?;

        let mut quiz = Quiz::new(inference::prior(&state.kb, &state.targets), Utc::now());
        for &aq in aqs {
            quiz.apply(&state.kb, aq);
        }

        if pool.len() >= self.max_quizzes {
            if let Some(oldest) = pool.oldest() {
                pool.remove(oldest)?;
                tracing::warn!(
                    engine_id = %self.id,
                    quiz = oldest,
                    limit = self.max_quizzes,
                    "quiz limit reached, released oldest quiz"
                );
            }
        }
        let quiz_id = pool.insert(quiz);
        tracing::debug!(engine_id = %self.id, quiz = quiz_id, resumed = aqs.len(), "quiz started");
        Ok(quiz_id)
    }

    /// Choose the next question to ask and make it the active one.
    ///
    /// Calling this again without `record_answer` skips the active question.
    pub fn next_question(&self, quiz_id: TPqaId) -> PqaResult<TPqaId> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "next_question")?;
        let quiz = pool.get_mut(quiz_id)?;
        let (question, expected_entropy) = inference::pick_next_question(
            &state.kb,
            quiz.posterior(),
            quiz.candidates(&state.questions),
        )
        .ok_or(PqaError::QuestionsExhausted(quiz_id))?;
        let question = question as TPqaId;
        quiz.set_active_question(question);
        self.total_questions_asked.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(quiz = quiz_id, question, expected_entropy, "next question");
        Ok(question)
    }

    /// Record the answer to the active question of a quiz.
    pub fn record_answer(&self, quiz_id: TPqaId, answer: TPqaId) -> PqaResult<()> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "record_answer")?;
        let quiz = pool.get_mut(quiz_id)?;
        let question = quiz
            .active_question()
            .ok_or(PqaError::NoActiveQuestion(quiz_id))?;
        state.check_answer(question, answer)?;
        quiz.record_answer(quiz_id, &state.kb, answer)
    }

    /// The question currently awaiting an answer, if any.
    pub fn active_question(&self, quiz_id: TPqaId) -> PqaResult<Option<TPqaId>> {
        let pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "active_question")?;
        Ok(pool.get(quiz_id)?.active_question())
    }

    /// Force the active question, e.g. when resuming a quiz mid-question.
    pub fn set_active_question(&self, quiz_id: TPqaId, question: TPqaId) -> PqaResult<()> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "set_active_question")?;
        state.check_question(question)?;
        pool.get_mut(quiz_id)?.set_active_question(question);
        Ok(())
    }

    /// The `max_count` most probable targets of a quiz, most probable first.
    pub fn list_top_targets(&self, quiz_id: TPqaId, max_count: usize) -> PqaResult<Vec<RatedTarget>> {
        let pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "list_top_targets")?;
        let quiz = pool.get(quiz_id)?;
        Ok(inference::top_targets(quiz.posterior(), &state.targets, max_count))
    }

    /// Train the knowledge base with the quiz's answers toward `target`.
    ///
    /// Can be called several times per quiz, for different targets.
    pub fn record_quiz_target(&self, quiz_id: TPqaId, target: TPqaId, amount: f64) -> PqaResult<()> {
        let pool = self.lock_quizzes()?;
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Regular, "record_quiz_target")?;
        check_amount(amount)?;
        state.check_target(target)?;
        let quiz = pool.get(quiz_id)?;
        state.check_answered(quiz.answered())?;
        state.kb.apply_training(quiz.answered(), target as usize, amount);
        tracing::debug!(
            engine_id = %self.id,
            quiz = quiz_id,
            target_id = target,
            amount,
            "recorded quiz target"
        );
        Ok(())
    }

    /// Close a quiz and free its resources.
    pub fn release_quiz(&self, quiz_id: TPqaId) -> PqaResult<()> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "release_quiz")?;
        pool.remove(quiz_id)?;
        Ok(())
    }

    /// Keep at most `max_count` most recent quizzes and release those older
    /// than `max_age`. Returns how many were released.
    pub fn clear_old_quizzes(&self, max_count: usize, max_age: Duration) -> PqaResult<usize> {
        let mut pool = self.lock_quizzes()?;
        let state = self.read_state()?;
        state.require_mode(EngineMode::Regular, "clear_old_quizzes")?;
        let released = pool.clear_old(max_count, max_age, Utc::now());
        if !released.is_empty() {
            tracing::info!(engine_id = %self.id, released = released.len(), "cleared old quizzes");
        }
        Ok(released.len())
    }

    /// Number of open quizzes.
    pub fn quiz_count(&self) -> PqaResult<usize> {
        let pool = self.lock_quizzes()?;
        let _state = self.read_state()?;
        Ok(pool.len())
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Enter maintenance mode.
    ///
    /// Fails with `QuizzesActive` if quizzes are open, unless `force_quizzes`
    /// is set, in which case they are all closed.
    pub fn start_maintenance(&self, force_quizzes: bool) -> PqaResult<()> {
        let mut pool = self.lock_quizzes()?;
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Regular, "start_maintenance")?;
        if !pool.is_empty() {
            if !force_quizzes {
                return Err(PqaError::QuizzesActive(pool.len()));
            }
            let closed = pool.clear();
            tracing::warn!(engine_id = %self.id, closed, "closed quizzes for maintenance");
        }
        state.mode = EngineMode::Maintenance;
        tracing::info!(engine_id = %self.id, "entered maintenance mode");
        Ok(())
    }

    /// Return to regular mode.
    pub fn finish_maintenance(&self) -> PqaResult<()> {
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Maintenance, "finish_maintenance")?;
        state.mode = EngineMode::Regular;
        tracing::info!(engine_id = %self.id, "left maintenance mode");
        Ok(())
    }

    /// Append questions and targets with their initial amounts.
    ///
    /// The assigned compact ids are written back into the params. Cells
    /// where both the question and the target are new take the question's
    /// initial amount.
    pub fn add_questions_targets(
        &self,
        questions: &mut [AddQuestionParam],
        targets: &mut [AddTargetParam],
    ) -> PqaResult<()> {
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Maintenance, "add_questions_targets")?;
        for p in questions.iter() {
            check_initial_amount(p.initial_amount)?;
        }
        for p in targets.iter() {
            check_initial_amount(p.initial_amount)?;
        }

        let q_inits: Vec<f64> = questions.iter().map(|p| p.initial_amount).collect();
        let t_inits: Vec<f64> = targets.iter().map(|p| p.initial_amount).collect();
        state.kb.grow(&q_inits, &t_inits)?;
        for p in questions.iter_mut() {
            p.question = state.questions.push_new();
        }
        for p in targets.iter_mut() {
            p.target = state.targets.push_new();
        }
        tracing::info!(
            engine_id = %self.id,
            added_questions = questions.len(),
            added_targets = targets.len(),
            "grew knowledge base"
        );
        Ok(())
    }

    /// Remove questions, leaving gaps until `compact`.
    pub fn remove_questions(&self, ids: &[TPqaId]) -> PqaResult<()> {
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Maintenance, "remove_questions")?;
        let mut seen = HashSet::new();
        for &id in ids {
            if !seen.insert(id) {
                return Err(PqaError::InvalidQuestion(id));
            }
            state.check_question(id)?;
        }
        for &id in ids {
            state.questions.remove(id);
        }
        tracing::info!(engine_id = %self.id, removed = ids.len(), "removed questions");
        Ok(())
    }

    /// Remove targets, leaving gaps until `compact`.
    pub fn remove_targets(&self, ids: &[TPqaId]) -> PqaResult<()> {
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Maintenance, "remove_targets")?;
        let mut seen = HashSet::new();
        for &id in ids {
            if !seen.insert(id) {
                return Err(PqaError::InvalidTarget(id));
            }
            state.check_target(id)?;
        }
        // A knowledge base keeps at least one live target.
        if let Some(&last) = ids.last().filter(|_| ids.len() >= state.targets.live_count()) {
            return Err(PqaError::InvalidTarget(last));
        }
        for &id in ids {
            state.targets.remove(id);
        }
        tracing::info!(engine_id = %self.id, removed = ids.len(), "removed targets");
        Ok(())
    }

    /// Drop gaps and renumber compact ids. Permanent ids are preserved.
    pub fn compact(&self) -> PqaResult<CompactionResult> {
        let mut state = self.write_state()?;
        state.require_mode(EngineMode::Maintenance, "compact")?;
        let old_questions = state.questions.compact();
        let old_targets = state.targets.compact();
        let keep_q: Vec<usize> = old_questions.iter().map(|&q| q as usize).collect();
        let keep_t: Vec<usize> = old_targets.iter().map(|&t| t as usize).collect();
        state.kb.retain(&keep_q, &keep_t);
        tracing::info!(
            engine_id = %self.id,
            questions = keep_q.len(),
            targets = keep_t.len(),
            "compacted knowledge base"
        );
        Ok(CompactionResult {
            old_questions,
            old_targets,
        })
    }

    // -----------------------------------------------------------------------
    // Persistence and shutdown
    // -----------------------------------------------------------------------

    fn snapshot(&self, state: &EngineState) -> KbSnapshot {
        KbSnapshot {
            format_version: FORMAT_VERSION,
            engine_id: self.id,
            saved_at: Utc::now(),
            precision: self.precision,
            dims: state.dims(),
            kb: state.kb.clone(),
            questions: state.questions.clone(),
            targets: state.targets.clone(),
            total_questions_asked: self.total_questions_asked.load(Ordering::Relaxed),
        }
    }

    /// Save the knowledge base (not the quizzes) to `path`.
    ///
    /// The knowledge base is only locked while it is copied; the file is
    /// written afterwards.
    pub fn save_kb(&self, path: &Path) -> PqaResult<()> {
        let snapshot = {
            let state = self.read_state()?;
            self.snapshot(&state)
        };
        persistence::save_snapshot(path, &snapshot)
    }

    /// Shut the engine down, optionally saving the knowledge base first.
    ///
    /// Waits for in-flight calls to finish. The engine cannot be brought
    /// back; every later call fails with `PqaError::ShutDown`.
    pub fn shutdown(&self, save_path: Option<&Path>) -> PqaResult<()> {
        let snapshot = {
            let mut pool = self.lock_quizzes()?;
            let mut state = self.write_state()?;
            let snapshot = save_path.map(|_| self.snapshot(&state));
            pool.clear();
            state.mode = EngineMode::ShutDown;
            snapshot
        };
        tracing::info!(engine_id = %self.id, "engine shut down");
        match (save_path, snapshot) {
            (Some(path), Some(snapshot)) => persistence::save_snapshot(path, &snapshot),
            _ => Ok(()),
        }
    }
}

impl Drop for PqaEngine {
    fn drop(&mut self) {
        tracing::debug!(engine_id = %self.id, "engine dropped");
    }
}
