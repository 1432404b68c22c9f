//! Posterior updates, question selection and target ranking.
//!
//! The model is naive Bayes over the knowledge base:
//! `P(t) = B[t] / Σ B`, `P(a | q, t) = A[q][a][t] / D[q][t]`, and answers are
//! treated as conditionally independent given the target.

use std::cmp::Ordering;

use crate::id_mapper::IdMapper;
use crate::kb::KnowledgeBase;
use crate::model::RatedTarget;

/// Normalised prior over targets; removed targets get zero mass.
pub fn prior(kb: &KnowledgeBase, targets: &IdMapper) -> Vec<f64> {
    let mut p = vec![0.0; kb.n_targets()];
    for t in targets.live_comps() {
        let t = t as usize;
        p[t] = kb.b(t);
    }
    normalize(&mut p);
    p
}

/// Multiply the posterior by `P(answer | question, ·)` and renormalise.
///
/// Returns `false` and leaves `posterior` untouched if the update would
/// leave no probability mass (numerical underflow).
pub fn apply_answer(
    kb: &KnowledgeBase,
    posterior: &mut [f64],
    question: usize,
    answer: usize,
) -> bool {
    let updated: Vec<f64> = posterior
        .iter()
        .enumerate()
        .map(|(t, &p)| p * kb.likelihood(question, answer, t))
        .collect();
    let total: f64 = updated.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        return false;
    }
    for (dst, v) in posterior.iter_mut().zip(updated) {
        *dst = v / total;
    }
    true
}

/// Shannon entropy in nats of a normalised distribution.
pub fn entropy(p: &[f64]) -> f64 {
    p.iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| -x * x.ln())
        .sum()
}

/// Expected entropy of the posterior after asking `question`.
///
/// `Σ_a P(a) · H(posterior | a)` where `P(a) = Σ_t P(t) P(a | q, t)`.
pub fn expected_entropy(kb: &KnowledgeBase, posterior: &[f64], question: usize) -> f64 {
    let mut expected = 0.0;
    let mut joint = vec![0.0; posterior.len()];
    for answer in 0..kb.n_answers() {
        let mut p_answer = 0.0;
        for (t, (&p, slot)) in posterior.iter().zip(joint.iter_mut()).enumerate() {
            *slot = p * kb.likelihood(question, answer, t);
            p_answer += *slot;
        }
        if p_answer <= 0.0 {
            continue;
        }
        // H(posterior | a) with posterior_t = joint_t / P(a)
        let h: f64 = joint
            .iter()
            .filter(|&&j| j > 0.0)
            .map(|&j| {
                let x = j / p_answer;
                -x * x.ln()
            })
            .sum();
        expected += p_answer * h;
    }
    expected
}

/// Pick the candidate question with the lowest expected posterior entropy.
///
/// Ties go to the earliest candidate, so callers pass candidates in
/// ascending id order. Returns `None` if there are no candidates.
pub fn pick_next_question(
    kb: &KnowledgeBase,
    posterior: &[f64],
    candidates: impl IntoIterator<Item = usize>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for q in candidates {
        let h = expected_entropy(kb, posterior, q);
        match best {
            Some((_, best_h)) if h >= best_h => {}
            _ => best = Some((q, h)),
        }
    }
    best
}

/// The `max_count` most probable live targets, most probable first.
///
/// Equal probabilities are ordered by target id.
pub fn top_targets(posterior: &[f64], targets: &IdMapper, max_count: usize) -> Vec<RatedTarget> {
    let mut rated: Vec<RatedTarget> = targets
        .live_comps()
        .map(|t| RatedTarget {
            target: t,
            probability: posterior[t as usize],
        })
        .collect();
    let n = max_count.min(rated.len());
    if n == 0 {
        return Vec::new();
    }
    // Partition first so only the head needs sorting when few targets are requested.
    if n < rated.len() {
        rated.select_nth_unstable_by(n - 1, rank_order);
        rated.truncate(n);
    }
    rated.sort_unstable_by(rank_order);
    rated
}

fn rank_order(x: &RatedTarget, y: &RatedTarget) -> Ordering {
    y.probability
        .partial_cmp(&x.probability)
        .unwrap_or(Ordering::Equal)
        .then(x.target.cmp(&y.target))
}

fn normalize(p: &mut [f64]) {
    let total: f64 = p.iter().sum();
    if total > 0.0 {
        for x in p.iter_mut() {
            *x /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnsweredQuestion, TPqaId};

    fn trained_kb() -> (KnowledgeBase, IdMapper) {
        // 2 answers, 2 questions, 3 targets. Question 0 separates target 0
        // from the rest; question 1 carries no information.
        let mut kb = KnowledgeBase::new(2, 2, 3, 0.1).unwrap();
        for _ in 0..10 {
            kb.apply_training(&[AnsweredQuestion::new(0, 1)], 0, 1.0);
            kb.apply_training(&[AnsweredQuestion::new(0, 0)], 1, 1.0);
            kb.apply_training(&[AnsweredQuestion::new(0, 0)], 2, 1.0);
        }
        (kb, IdMapper::with_len(3))
    }

    #[test]
    fn prior_is_normalised_and_skips_gaps() {
        let (kb, mut targets) = trained_kb();
        targets.remove(2);
        let p = prior(&kb, &targets);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(p[2], 0.0);
    }

    #[test]
    fn answer_moves_mass_toward_consistent_target() {
        let (kb, targets) = trained_kb();
        let mut p = prior(&kb, &targets);
        assert!(apply_answer(&kb, &mut p, 0, 1));
        assert!(p[0] > 0.9, "expected target 0 to dominate, got {p:?}");
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn informative_question_is_preferred() {
        let (kb, targets) = trained_kb();
        let p = prior(&kb, &targets);
        let (q, _) = pick_next_question(&kb, &p, [1, 0]).unwrap();
        assert_eq!(q, 0);
        assert!(pick_next_question(&kb, &p, std::iter::empty()).is_none());
    }

    #[test]
    fn ties_break_to_earliest_candidate() {
        let kb = KnowledgeBase::new(2, 3, 2, 1.0).unwrap();
        let p = vec![0.5, 0.5];
        let (q, _) = pick_next_question(&kb, &p, [2, 1]).unwrap();
        assert_eq!(q, 2);
        let (q, _) = pick_next_question(&kb, &p, [1, 2]).unwrap();
        assert_eq!(q, 1);
    }

    #[test]
    fn entropy_of_uniform_and_certain() {
        assert!((entropy(&[0.5, 0.5]) - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(entropy(&[1.0, 0.0]), 0.0);
    }

    #[test]
    fn top_targets_sorted_and_truncated() {
        let targets = IdMapper::with_len(4);
        let p = vec![0.1, 0.4, 0.1, 0.4];
        let top = top_targets(&p, &targets, 3);
        let ids: Vec<TPqaId> = top.iter().map(|r| r.target).collect();
        assert_eq!(ids, vec![1, 3, 0]);
        assert_eq!(top_targets(&p, &targets, 10).len(), 4);
        assert!(top_targets(&p, &targets, 0).is_empty());
    }
}
