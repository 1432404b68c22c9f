use criterion::{black_box, criterion_group, criterion_main, Criterion};

use probqa_core::id_mapper::IdMapper;
use probqa_core::inference;
use probqa_core::kb::KnowledgeBase;
use probqa_core::AnsweredQuestion;

/// A knowledge base where every target has a distinct answer pattern.
fn trained_kb(n_answers: usize, n_questions: usize, n_targets: usize) -> KnowledgeBase {
    let mut kb = KnowledgeBase::new(n_answers, n_questions, n_targets, 0.1).unwrap();
    for t in 0..n_targets {
        let aqs: Vec<AnsweredQuestion> = (0..n_questions)
            .map(|q| AnsweredQuestion::new(q as i64, ((t * 7 + q * 3) % n_answers) as i64))
            .collect();
        kb.apply_training(&aqs, t, 5.0);
    }
    kb
}

fn bench_next_question(c: &mut Criterion) {
    let mut group = c.benchmark_group("pick_next_question");

    for (questions, targets) in [(16, 64), (128, 512), (512, 2048)] {
        let kb = trained_kb(3, questions, targets);
        let mapper = IdMapper::with_len(targets as i64);
        let prior = inference::prior(&kb, &mapper);

        group.bench_function(format!("{questions}x{targets}"), |b| {
            b.iter(|| inference::pick_next_question(&kb, black_box(&prior), 0..questions))
        });
    }

    group.finish();
}

fn bench_top_targets(c: &mut Criterion) {
    let mut group = c.benchmark_group("top_targets");
    let targets = 100_000;
    let kb = trained_kb(2, 4, targets);
    let mapper = IdMapper::with_len(targets as i64);
    let mut posterior = inference::prior(&kb, &mapper);
    inference::apply_answer(&kb, &mut posterior, 0, 1);
    inference::apply_answer(&kb, &mut posterior, 2, 0);

    for max_count in [1usize, 10, 1000] {
        group.bench_function(format!("top_{max_count}_of_{targets}"), |b| {
            b.iter(|| inference::top_targets(black_box(&posterior), &mapper, max_count))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_next_question, bench_top_targets);
criterion_main!(benches);
