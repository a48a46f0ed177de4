//! Benchmarks for completion and reduction.
//!
//! Completion runs from scratch on each iteration, so these measure the
//! whole pipeline: normalization, admission, overlap expansion and
//! reclamation.

use confluence::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn presentation(names: &[&str], relations: &[(&str, &str)]) -> CompletionEngine {
    let alphabet = Alphabet::new(names.iter().copied()).unwrap();
    let order = Box::new(ShortLex::new(names.len()));
    let mut engine = CompletionEngine::new(alphabet, order, EngineConfig::default())
        .unwrap()
        .with_progress(Box::new(NoProgress));
    for (lhs, rhs) in relations {
        engine.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap();
    }
    engine
}

/// a² = b³ = (ab)³ = 1, twelve elements.
const A4: &[(&str, &str)] = &[("aa", "1"), ("bbb", "1"), ("ababab", "1")];

/// a² = b³ = (ab)⁵ = 1, the icosahedral group.
const A5: &[(&str, &str)] = &[("aa", "1"), ("bbb", "1"), ("ababababab", "1")];

fn bench_complete_a4(c: &mut Criterion) {
    c.bench_function("complete_a4", |b| {
        b.iter(|| {
            let mut engine = presentation(&["a", "b"], black_box(A4));
            assert_eq!(engine.run_pass(&LimitPolicy::default()), PassOutcome::Confluent);
        });
    });
}

fn bench_complete_a5(c: &mut Criterion) {
    c.bench_function("complete_a5", |b| {
        b.iter(|| {
            let mut engine = presentation(&["a", "b"], black_box(A5));
            engine.run_pass(&LimitPolicy::default())
        });
    });
}

/// Reduction of a long word against a confluent system.
fn bench_reduce_long_word(c: &mut Criterion) {
    let mut engine = presentation(&["a", "b"], A5);
    engine.run_pass(&LimitPolicy::default());
    let word = engine.alphabet().parse(&"abbab".repeat(200)).unwrap();

    c.bench_function("reduce_1000_letters", |b| {
        b.iter(|| engine.reduce(black_box(&word)));
    });
}

/// Free abelian group of rank 3 with inverses; the rule set is infinite
/// without them and small with them.
fn bench_free_abelian_with_inverses(c: &mut Criterion) {
    c.bench_function("free_abelian_rank_3", |b| {
        b.iter(|| {
            let alphabet = Alphabet::new(["a", "A", "b", "B", "c", "C"])
                .and_then(|a| a.with_inverse("a", "A"))
                .and_then(|a| a.with_inverse("b", "B"))
                .and_then(|a| a.with_inverse("c", "C"))
                .unwrap();
            let mut engine = CompletionEngine::new(alphabet, Box::new(ShortLex::new(6)), EngineConfig::default())
                .unwrap()
                .with_progress(Box::new(NoProgress));
            for (lhs, rhs) in [("ba", "ab"), ("ca", "ac"), ("cb", "bc")] {
                engine.add_relation_str(lhs, rhs, RelationFlags::axiom()).unwrap();
            }
            engine.run_pass(&LimitPolicy::rounds(4))
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_complete_a4, bench_complete_a5, bench_reduce_long_word, bench_free_abelian_with_inverses
);
criterion_main!(benches);
