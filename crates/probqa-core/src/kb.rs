//! The knowledge base: raw training statistics.
//!
//! For `K` answers, `Q` questions and `T` targets it stores
//! - `A[q][a][t]`: accumulated amount of target `t` answering `a` to `q`,
//! - `D[q][t]`: `Σ_a A[q][a][t]`,
//! - `B[t]`: accumulated amount of target `t` being the outcome.
//!
//! Indices here are plain compact indices; validating them against removed
//! ids is the engine's job.

use serde::{Deserialize, Serialize};

use crate::error::{PqaError, PqaResult};
use crate::model::AnsweredQuestion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    n_answers: usize,
    n_questions: usize,
    n_targets: usize,
    a: Vec<f64>,
    d: Vec<f64>,
    b: Vec<f64>,
}

impl KnowledgeBase {
    /// Fresh knowledge base with every `A` cell at `initial_amount`.
    ///
    /// Fails with `InvalidDefinition` if the arrays cannot be addressed and
    /// with `Internal` if they cannot be allocated.
    pub fn new(
        n_answers: usize,
        n_questions: usize,
        n_targets: usize,
        initial_amount: f64,
    ) -> PqaResult<Self> {
        let (a_len, d_len) = cell_counts(n_answers, n_questions, n_targets).ok_or_else(|| {
            PqaError::InvalidDefinition(format!(
                "{n_questions} questions x {n_answers} answers x {n_targets} targets is too large"
            ))
        })?;
        Ok(Self {
            n_answers,
            n_questions,
            n_targets,
            a: filled(a_len, initial_amount)?,
            d: filled(d_len, initial_amount * n_answers as f64)?,
            b: filled(n_targets, initial_amount)?,
        })
    }

    pub fn n_answers(&self) -> usize {
        self.n_answers
    }

    pub fn n_questions(&self) -> usize {
        self.n_questions
    }

    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    #[inline]
    fn a_index(&self, question: usize, answer: usize, target: usize) -> usize {
        (question * self.n_answers + answer) * self.n_targets + target
    }

    #[inline]
    pub fn a(&self, question: usize, answer: usize, target: usize) -> f64 {
        self.a[self.a_index(question, answer, target)]
    }

    #[inline]
    pub fn d(&self, question: usize, target: usize) -> f64 {
        self.d[question * self.n_targets + target]
    }

    #[inline]
    pub fn b(&self, target: usize) -> f64 {
        self.b[target]
    }

    /// `A[q][a][*]` as a slice over targets.
    pub fn a_row(&self, question: usize, answer: usize) -> &[f64] {
        let start = self.a_index(question, answer, 0);
        &self.a[start..start + self.n_targets]
    }

    /// `D[q][*]` as a slice over targets.
    pub fn d_row(&self, question: usize) -> &[f64] {
        let start = question * self.n_targets;
        &self.d[start..start + self.n_targets]
    }

    pub fn b_row(&self) -> &[f64] {
        &self.b
    }

    /// `P(answer | question, target)`.
    #[inline]
    pub fn likelihood(&self, question: usize, answer: usize, target: usize) -> f64 {
        let d = self.d(question, target);
        if d > 0.0 {
            self.a(question, answer, target) / d
        } else {
            0.0
        }
    }

    /// Fold a batch of answered questions into the statistics of `target`.
    ///
    /// All ids must already be validated; each occurrence in `aqs` is
    /// applied, duplicates included.
    pub fn apply_training(&mut self, aqs: &[AnsweredQuestion], target: usize, amount: f64) {
        for aq in aqs {
            let question = aq.question as usize;
            let answer = aq.answer as usize;
            let ai = self.a_index(question, answer, target);
            self.a[ai] += amount;
            self.d[question * self.n_targets + target] += amount;
        }
        self.b[target] += amount;
    }

    /// Append questions and targets.
    ///
    /// New cells take the initial amount of their question when the question
    /// is new, else the initial amount of their target. On error the
    /// knowledge base is unchanged.
    pub fn grow(&mut self, question_inits: &[f64], target_inits: &[f64]) -> PqaResult<()> {
        let old_q = self.n_questions;
        let old_t = self.n_targets;
        let k = self.n_answers;
        let too_large = || {
            PqaError::InvalidDefinition(format!(
                "adding {} questions and {} targets exceeds the addressable size",
                question_inits.len(),
                target_inits.len()
            ))
        };
        let new_q = old_q.checked_add(question_inits.len()).ok_or_else(too_large)?;
        let new_t = old_t.checked_add(target_inits.len()).ok_or_else(too_large)?;
        let (a_len, d_len) = cell_counts(k, new_q, new_t).ok_or_else(too_large)?;

        let mut a = filled(a_len, 0.0)?;
        let mut d = filled(d_len, 0.0)?;
        let mut b = Vec::new();
        b.try_reserve_exact(new_t).map_err(alloc_failed)?;
        b.extend_from_slice(&self.b);
        b.extend_from_slice(target_inits);

        for q in 0..new_q {
            for t in 0..new_t {
                let init = if q >= old_q {
                    Some(question_inits[q - old_q])
                } else if t >= old_t {
                    Some(target_inits[t - old_t])
                } else {
                    None
                };
                let mut sum = 0.0;
                for ans in 0..k {
                    let v = init.unwrap_or_else(|| self.a(q, ans, t));
                    a[(q * k + ans) * new_t + t] = v;
                    sum += v;
                }
                d[q * new_t + t] = match init {
                    Some(_) => sum,
                    None => self.d(q, t),
                };
            }
        }

        self.a = a;
        self.d = d;
        self.b = b;
        self.n_questions = new_q;
        self.n_targets = new_t;
        Ok(())
    }

    /// Keep only the listed questions and targets, in the given order.
    pub fn retain(&mut self, questions: &[usize], targets: &[usize]) {
        let k = self.n_answers;
        let new_t = targets.len();
        let mut a = Vec::with_capacity(questions.len() * k * new_t);
        let mut d = Vec::with_capacity(questions.len() * new_t);
        for &q in questions {
            for ans in 0..k {
                a.extend(targets.iter().map(|&t| self.a(q, ans, t)));
            }
            d.extend(targets.iter().map(|&t| self.d(q, t)));
        }
        self.b = targets.iter().map(|&t| self.b[t]).collect();
        self.a = a;
        self.d = d;
        self.n_questions = questions.len();
        self.n_targets = new_t;
    }

    /// Check that the array lengths agree with the dimensions, e.g. after
    /// deserialising a file.
    pub fn check_shape(&self) -> PqaResult<()> {
        let (expect_a, expect_d) = cell_counts(self.n_answers, self.n_questions, self.n_targets)
            .ok_or_else(|| {
                PqaError::Format(format!(
                    "dimensions {}x{}x{} exceed the addressable size",
                    self.n_questions, self.n_answers, self.n_targets
                ))
            })?;
        if self.a.len() != expect_a {
            return Err(PqaError::Format(format!(
                "A has {} cells, expected {expect_a}",
                self.a.len()
            )));
        }
        if self.d.len() != expect_d {
            return Err(PqaError::Format(format!(
                "D has {} cells, expected {expect_d}",
                self.d.len()
            )));
        }
        if self.b.len() != self.n_targets {
            return Err(PqaError::Format(format!(
                "B has {} cells, expected {}",
                self.b.len(),
                self.n_targets
            )));
        }
        if self.a.iter().chain(&self.d).chain(&self.b).any(|v| !v.is_finite()) {
            return Err(PqaError::Format("non-finite statistics".into()));
        }
        Ok(())
    }
}

/// Lengths of the `A` and `D` arrays, or `None` if either array would not
/// fit in the address space.
pub fn cell_counts(
    n_answers: usize,
    n_questions: usize,
    n_targets: usize,
) -> Option<(usize, usize)> {
    let d_len = n_questions.checked_mul(n_targets)?;
    let a_len = d_len.checked_mul(n_answers)?;
    let max_cells = isize::MAX as usize / std::mem::size_of::<f64>();
    (a_len <= max_cells && n_targets <= max_cells).then_some((a_len, d_len))
}

fn filled(len: usize, value: f64) -> PqaResult<Vec<f64>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(alloc_failed)?;
    v.resize(len, value);
    Ok(v)
}

fn alloc_failed(err: std::collections::TryReserveError) -> PqaError {
    PqaError::Internal(format!("knowledge base allocation failed: {err}"))
}
