use criterion::{black_box, criterion_group, criterion_main, Criterion};

use probqa_core::{create_engine, AnsweredQuestion, EngineDefinition, TPqaId};

fn batch(len: TPqaId, n_answers: TPqaId) -> Vec<AnsweredQuestion> {
    (0..len)
        .map(|q| AnsweredQuestion::new(q, q % n_answers))
        .collect()
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");

    for (questions, targets) in [(32, 64), (256, 1024), (1024, 4096)] {
        let engine = create_engine(&EngineDefinition::new(4, questions, targets)).unwrap();
        let short = batch(8, 4);
        let long = batch(questions, 4);

        group.bench_function(format!("{questions}x{targets}/8_answers"), |b| {
            b.iter(|| {
                engine
                    .train(8, black_box(&short), black_box(targets / 2), 1.0)
                    .unwrap()
            })
        });

        group.bench_function(format!("{questions}x{targets}/all_answers"), |b| {
            b.iter(|| {
                engine
                    .train(questions, black_box(&long), black_box(targets / 2), 1.0)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_perm_from_comp(c: &mut Criterion) {
    let mut group = c.benchmark_group("question_perm_from_comp");
    let engine = create_engine(&EngineDefinition::new(2, 4096, 16)).unwrap();

    for len in [1usize, 64, 4096] {
        let ids: Vec<TPqaId> = (0..len as TPqaId).collect();
        group.bench_function(format!("{len}_ids"), |b| {
            b.iter(|| {
                let mut ids = ids.clone();
                engine.question_perm_from_comp(black_box(&mut ids)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_train, bench_perm_from_comp);
criterion_main!(benches);
