//! Contract tests for training, id mapping and persistence through the
//! public engine API.

use std::sync::Arc;
use std::thread;

use probqa_core::model::{AddQuestionParam, AddTargetParam};
use probqa_core::{
    create_engine, load_engine, AnsweredQuestion, EngineDefinition, PqaEngine, PqaError, TPqaId,
};

/// Targets {0,1,2,3}, questions {0..=10}, yes/no answers.
fn engine() -> PqaEngine {
    create_engine(&EngineDefinition::new(2, 11, 4)).unwrap()
}

fn aqs(pairs: &[(TPqaId, TPqaId)]) -> Vec<AnsweredQuestion> {
    pairs.iter().map(|&p| p.into()).collect()
}

/// Every statistic the engine exposes, flattened.
fn fingerprint(e: &PqaEngine) -> Vec<f64> {
    let dims = e.dims().unwrap();
    let n_targets = dims.n_targets as usize;
    let mut out = e.copy_b_targets(n_targets).unwrap();
    for q in 0..dims.n_questions {
        out.extend(e.copy_d_targets(q, n_targets).unwrap());
        for a in 0..dims.n_answers {
            out.extend(e.copy_a_targets(q, a, n_targets).unwrap());
        }
    }
    out
}

#[test]
fn documented_example() {
    let e = engine();
    let batch = aqs(&[(5, 1), (7, 0)]);
    e.train(2, &batch, 3, 1.0).unwrap();
    assert!(matches!(
        e.train(2, &batch, 99, 1.0),
        Err(PqaError::InvalidTarget(99))
    ));
}

#[test]
fn failed_train_leaves_statistics_unchanged() {
    let e = engine();
    e.train(1, &aqs(&[(2, 1)]), 1, 1.0).unwrap();
    let before = fingerprint(&e);

    let batch = aqs(&[(5, 1), (7, 0)]);
    assert!(e.train(3, &batch, 0, 1.0).is_err());
    assert!(e.train(2, &batch, 4, 1.0).is_err());
    assert!(e.train(2, &aqs(&[(5, 1), (11, 0)]), 0, 1.0).is_err());
    assert!(e.train(2, &batch, 0, f64::NAN).is_err());

    assert_eq!(fingerprint(&e), before);
}

#[test]
fn training_is_not_idempotent() {
    let once = engine();
    let twice = engine();
    let batch = aqs(&[(5, 1), (7, 0)]);
    once.train(2, &batch, 3, 1.0).unwrap();
    twice.train(2, &batch, 3, 1.0).unwrap();
    twice.train(2, &batch, 3, 1.0).unwrap();
    assert_ne!(fingerprint(&once), fingerprint(&twice));
}

#[test]
fn permutation_queries_do_not_affect_training() {
    let queried = engine();
    let untouched = engine();
    for _ in 0..10 {
        let mut ids: Vec<TPqaId> = (0..11).rev().collect();
        assert!(queried.question_perm_from_comp(&mut ids).unwrap());
        let mut bad = vec![3, 3, 12];
        assert!(!queried.question_perm_from_comp(&mut bad).unwrap());
    }
    let batch = aqs(&[(1, 0), (9, 1)]);
    queried.train(2, &batch, 2, 0.5).unwrap();
    untouched.train(2, &batch, 2, 0.5).unwrap();
    assert_eq!(fingerprint(&queried), fingerprint(&untouched));
}

#[test]
fn concurrent_training_accumulates_exactly() {
    let e = Arc::new(engine());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let e = Arc::clone(&e);
            thread::spawn(move || {
                for _ in 0..100 {
                    e.train(1, &aqs(&[(0, 1)]), 0, 1.0).unwrap();
                    let mut ids = vec![0, 1, 2];
                    assert!(e.question_perm_from_comp(&mut ids).unwrap());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let b = e.copy_b_targets(4).unwrap();
    assert!((b[0] - 800.1).abs() < 1e-6, "got {}", b[0]);
}

#[test]
fn save_and_load_preserves_knowledge_base() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");

    let e = engine();
    e.train(2, &aqs(&[(5, 1), (7, 0)]), 3, 2.0).unwrap();
    e.start_maintenance(false).unwrap();
    e.remove_questions(&[4]).unwrap();
    e.remove_targets(&[0]).unwrap();
    e.compact().unwrap();
    let mut qs = [AddQuestionParam::new(0.3)];
    let mut ts = [AddTargetParam::new(0.4)];
    e.add_questions_targets(&mut qs, &mut ts).unwrap();
    e.finish_maintenance().unwrap();
    e.save_kb(&path).unwrap();

    let restored = load_engine(&path, 16).unwrap();
    assert_ne!(restored.id(), e.id());
    assert_eq!(restored.dims().unwrap(), e.dims().unwrap());
    assert_eq!(fingerprint(&restored), fingerprint(&e));

    let mut q_ids: Vec<TPqaId> = (0..11).collect();
    let mut expected = q_ids.clone();
    assert!(e.question_perm_from_comp(&mut expected).unwrap());
    assert!(restored.question_perm_from_comp(&mut q_ids).unwrap());
    assert_eq!(q_ids, expected);
    // Permanent question ids skip the removed one and continue past it.
    assert_eq!(q_ids[4], 5);
    assert_eq!(q_ids[10], 11);

    let mut t_ids = vec![0, 1, 2, 3];
    assert!(restored.target_perm_from_comp(&mut t_ids).unwrap());
    assert_eq!(t_ids, vec![1, 2, 3, 4]);
}

#[test]
fn shutdown_with_save_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("final.json");
    let e = engine();
    e.train(1, &aqs(&[(0, 0)]), 0, 1.0).unwrap();
    e.shutdown(Some(&path)).unwrap();
    assert!(path.exists());
    assert!(matches!(
        e.question_perm_from_comp(&mut [0]),
        Err(PqaError::ShutDown)
    ));
    let restored = load_engine(&path, 4).unwrap();
    assert!((restored.copy_b_targets(1).unwrap()[0] - 1.1).abs() < 1e-12);
}

#[test]
fn oversized_definition_is_an_error() {
    let def = EngineDefinition::new(2, 1 << 32, 1 << 32);
    assert!(matches!(
        create_engine(&def),
        Err(PqaError::InvalidDefinition(_))
    ));
}

#[test]
fn tampered_next_perm_does_not_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kb.json");
    engine().save_kb(&path).unwrap();

    let mut json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    json["questions"]["next_perm"] = 0.into();
    std::fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    assert!(matches!(load_engine(&path, 4), Err(PqaError::Format(_))));
}
