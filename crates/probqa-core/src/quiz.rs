//! Quizzes: interactive sessions that narrow down the target.
//!
//! A quiz owns its own posterior over targets, so training the knowledge base
//! while a quiz is open does not disturb it.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{PqaError, PqaResult};
use crate::id_mapper::IdMapper;
use crate::inference;
use crate::kb::KnowledgeBase;
use crate::model::{AnsweredQuestion, TPqaId};

/// A single open quiz.
#[derive(Debug, Clone)]
pub struct Quiz {
    created_at: DateTime<Utc>,
    posterior: Vec<f64>,
    answered: Vec<AnsweredQuestion>,
    asked: HashSet<TPqaId>,
    active_question: Option<TPqaId>,
}

impl Quiz {
    pub fn new(prior: Vec<f64>, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            posterior: prior,
            answered: Vec::new(),
            asked: HashSet::new(),
            active_question: None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn posterior(&self) -> &[f64] {
        &self.posterior
    }

    /// Answers recorded so far, in order.
    pub fn answered(&self) -> &[AnsweredQuestion] {
        &self.answered
    }

    pub fn active_question(&self) -> Option<TPqaId> {
        self.active_question
    }

    /// Make `question` the active one and mark it as asked.
    pub fn set_active_question(&mut self, question: TPqaId) {
        self.asked.insert(question);
        self.active_question = Some(question);
    }

    /// Live questions that have not been asked yet, ascending.
    pub fn candidates<'a>(&'a self, questions: &'a IdMapper) -> impl Iterator<Item = usize> + 'a {
        questions
            .live_comps()
            .filter(|q| !self.asked.contains(q))
            .map(|q| q as usize)
    }

    /// Apply an already validated answer to the posterior.
    pub fn apply(&mut self, kb: &KnowledgeBase, aq: AnsweredQuestion) {
        let (q, a) = (aq.question as usize, aq.answer as usize);
        if !inference::apply_answer(kb, &mut self.posterior, q, a) {
            tracing::warn!(
                question = aq.question,
                answer = aq.answer,
                "posterior underflow, answer ignored for ranking"
            );
        }
        self.asked.insert(aq.question);
        self.answered.push(aq);
    }

    /// Record `answer` for the active question.
    ///
    /// The caller validates `answer` against the number of answers.
    pub fn record_answer(&mut self, quiz_id: TPqaId, kb: &KnowledgeBase, answer: TPqaId) -> PqaResult<()> {
        let question = self
            .active_question
            .take()
            .ok_or(PqaError::NoActiveQuestion(quiz_id))?;
        self.apply(kb, AnsweredQuestion::new(question, answer));
        Ok(())
    }
}

/// All open quizzes, addressed by compact quiz id.
#[derive(Debug, Default)]
pub struct QuizPool {
    slots: Vec<Option<Quiz>>,
    ids: IdMapper,
}

impl QuizPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open quizzes.
    pub fn len(&self) -> usize {
        self.ids.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> &IdMapper {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut IdMapper {
        &mut self.ids
    }

    /// Store a quiz and return its compact id.
    pub fn insert(&mut self, quiz: Quiz) -> TPqaId {
        let comp = self.ids.allocate_reusing_gap();
        let idx = comp as usize;
        if idx == self.slots.len() {
            self.slots.push(Some(quiz));
        } else {
            self.slots[idx] = Some(quiz);
        }
        comp
    }

    pub fn get(&self, quiz_id: TPqaId) -> PqaResult<&Quiz> {
        usize::try_from(quiz_id)
            .ok()
            .and_then(|idx| self.slots.get(idx))
            .and_then(Option::as_ref)
            .ok_or(PqaError::InvalidQuiz(quiz_id))
    }

    pub fn get_mut(&mut self, quiz_id: TPqaId) -> PqaResult<&mut Quiz> {
        usize::try_from(quiz_id)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(Option::as_mut)
            .ok_or(PqaError::InvalidQuiz(quiz_id))
    }

    pub fn remove(&mut self, quiz_id: TPqaId) -> PqaResult<Quiz> {
        let quiz = usize::try_from(quiz_id)
            .ok()
            .and_then(|idx| self.slots.get_mut(idx))
            .and_then(Option::take)
            .ok_or(PqaError::InvalidQuiz(quiz_id))?;
        self.ids.remove(quiz_id);
        Ok(quiz)
    }

    /// Close every quiz. Returns how many were open.
    pub fn clear(&mut self) -> usize {
        let n = self.len();
        let open: Vec<TPqaId> = self.ids.live_comps().collect();
        for id in open {
            self.ids.remove(id);
        }
        self.slots.clear();
        self.ids.compact();
        n
    }

    /// Compact id of the quiz created first.
    pub fn oldest(&self) -> Option<TPqaId> {
        self.open_quizzes()
            .min_by_key(|&(id, created)| (created, self.ids.perm_of(id)))
            .map(|(id, _)| id)
    }

    /// Open quizzes with their creation times.
    fn open_quizzes(&self) -> impl Iterator<Item = (TPqaId, DateTime<Utc>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|q| (idx as TPqaId, q.created_at)))
    }

    /// Keep no more than `max_count` most recent quizzes and release those
    /// older than `max_age` at `now`. Returns the released quiz ids.
    pub fn clear_old(&mut self, max_count: usize, max_age: Duration, now: DateTime<Utc>) -> Vec<TPqaId> {
        let mut open: Vec<(TPqaId, DateTime<Utc>)> = self.open_quizzes().collect();
        // Newest first; equal timestamps fall back to permanent id order.
        open.sort_by_key(|&(id, created)| std::cmp::Reverse((created, self.ids.perm_of(id))));

        let mut released = Vec::new();
        for (rank, (id, created)) in open.into_iter().enumerate() {
            let age = (now - created).to_std().unwrap_or_default();
            if rank >= max_count || age > max_age {
                released.push(id);
            }
        }
        for &id in &released {
            // Ids come from the live slots above.
            let _ = self.remove(id);
        }
        released.sort_unstable();
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn quiz_at(secs: i64) -> Quiz {
        Quiz::new(vec![0.5, 0.5], at(secs))
    }

    #[test]
    fn record_answer_requires_active_question() {
        let kb = KnowledgeBase::new(2, 2, 2, 1.0).unwrap();
        let mut quiz = quiz_at(0);
        assert!(matches!(
            quiz.record_answer(7, &kb, 0),
            Err(PqaError::NoActiveQuestion(7))
        ));
        quiz.set_active_question(1);
        quiz.record_answer(7, &kb, 0).unwrap();
        assert_eq!(quiz.answered(), &[AnsweredQuestion::new(1, 0)]);
        assert!(quiz.active_question().is_none());
    }

    #[test]
    fn candidates_skip_asked_and_removed() {
        let mut questions = IdMapper::with_len(4);
        questions.remove(2);
        let mut quiz = quiz_at(0);
        quiz.set_active_question(0);
        let left: Vec<usize> = quiz.candidates(&questions).collect();
        assert_eq!(left, vec![1, 3]);
    }

    #[test]
    fn pool_reuses_released_slots() {
        let mut pool = QuizPool::new();
        let a = pool.insert(quiz_at(0));
        let b = pool.insert(quiz_at(1));
        assert_eq!((a, b), (0, 1));
        pool.remove(a).unwrap();
        assert!(matches!(pool.get(a), Err(PqaError::InvalidQuiz(0))));
        let c = pool.insert(quiz_at(2));
        assert_eq!(c, 0);
        assert_eq!(pool.len(), 2);
        // Permanent ids keep growing even when the slot is reused.
        assert_eq!(pool.ids().perm_of(c), Some(2));
    }

    #[test]
    fn oldest_quiz_by_creation_time() {
        let mut pool = QuizPool::new();
        pool.insert(quiz_at(10));
        pool.insert(quiz_at(5));
        pool.insert(quiz_at(20));
        assert_eq!(pool.oldest(), Some(1));
    }

    #[test]
    fn oldest_tie_goes_to_first_created() {
        let mut pool = QuizPool::new();
        let first = pool.insert(quiz_at(5));
        let second = pool.insert(quiz_at(5));
        pool.remove(first).unwrap();
        // Reuses slot 0 but was created after `second`.
        let third = pool.insert(quiz_at(5));
        assert_eq!(third, 0);
        assert_eq!(pool.oldest(), Some(second));

        let released = pool.clear_old(1, Duration::from_secs(1000), at(10));
        assert_eq!(released, vec![second]);
        assert!(pool.get(third).is_ok());
    }

    #[test]
    fn clear_old_by_count_and_age() {
        let mut pool = QuizPool::new();
        for secs in [0, 100, 200, 300] {
            pool.insert(quiz_at(secs));
        }
        // At t=350: quiz 0 is 350s old, quiz 1 is 250s old.
        let released = pool.clear_old(3, Duration::from_secs(260), at(350));
        assert_eq!(released, vec![0]);
        let released = pool.clear_old(1, Duration::from_secs(1000), at(350));
        assert_eq!(released, vec![1, 2]);
        assert_eq!(pool.len(), 1);
        assert!(pool.get(3).is_ok());
    }

    #[test]
    fn clear_closes_everything() {
        let mut pool = QuizPool::new();
        pool.insert(quiz_at(0));
        pool.insert(quiz_at(1));
        assert_eq!(pool.clear(), 2);
        assert!(pool.is_empty());
        assert!(pool.get(0).is_err());
        assert_eq!(pool.insert(quiz_at(2)), 0);
    }
}
