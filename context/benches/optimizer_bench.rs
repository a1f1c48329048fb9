use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use ragctx_context::ContextConfig;
use ragctx_context::ContextOptimizer;
use ragctx_retrieval::Candidate;
use ragctx_retrieval::SearchMethod;

fn create_candidates(count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            // Every fifth chunk repeats an earlier one to exercise deduplication
            let topic = if i % 5 == 0 { 0 } else { i };
            Candidate::new(
                i.to_string(),
                format!(
                    "Article {topic} explains how orders are processed.\n\n\n\
                     Orders ship within {topic} business days.   Click here to track your order. \
                     Copyright 2024 Example Inc. All rights reserved."
                ),
                format!("https://example.com/help/{topic}"),
                SearchMethod::Vector,
            )
            .with_vector_score(1.0 - i as f32 / (count as f32 * 2.0))
        })
        .collect()
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize");

    for count in [5, 20, 100] {
        let candidates = create_candidates(count);
        let Ok(optimizer) = ContextOptimizer::new(ContextConfig::default()) else {
            return;
        };

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(optimizer.optimize(black_box(candidates.clone()))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_optimize);
criterion_main!(benches);
