use std::hint::black_box;

use chrono::Utc;
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use uuid::Uuid;

use pulse_worker::pipeline::clustering::{
    ClusteringParams, cluster_candidates, cosine_similarity,
};
use pulse_worker::pipeline::types::ContentItem;

const EMBEDDING_DIM: usize = 64;

/// Deterministic synthetic candidates: a handful of dense regions plus noise,
/// roughly the shape of a real discovery run.
fn synthetic_candidates(count: usize) -> Vec<ContentItem> {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f32 / (1_u64 << 53) as f32
    };

    (0..count)
        .map(|i| {
            let region = i % 8;
            let embedding = (0..EMBEDDING_DIM)
                .map(|dim| {
                    let base = if dim % 8 == region { 1.0 } else { 0.0 };
                    base + next() * 0.1
                })
                .collect();
            ContentItem {
                id: Uuid::new_v4(),
                content: format!("post {i}"),
                embedding,
                author_id: Uuid::new_v4(),
                created_at: Utc::now(),
                like_count: 0,
                comment_count: 0,
                share_count: 0,
                state: None,
                city: None,
            }
        })
        .collect()
}

fn bench_clustering(c: &mut Criterion) {
    let params = ClusteringParams::default();

    let mut group = c.benchmark_group("clustering");
    for size in [100_usize, 500] {
        let candidates = synthetic_candidates(size);
        group.bench_function(format!("cluster_{size}_candidates"), |b| {
            b.iter_batched(
                || candidates.clone(),
                |input| cluster_candidates(black_box(&params), input),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let items = synthetic_candidates(2);
    let a = items[0].embedding.clone();
    let b_vec = items[1].embedding.clone();
    c.bench_function("cosine_similarity_64d", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&b_vec)));
    });
}

criterion_group!(benches, bench_clustering, bench_cosine_similarity);
criterion_main!(benches);
