//! Benchmarks for full searches over a synthetic corpus.
//!
//! Run with: `cargo bench -p jobsearch-retrieval --bench pipeline_benchmarks`

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jobsearch_core::Job;
use jobsearch_retrieval::{
    AdvisorConfig, DidYouMeanAdvisor, InMemoryJobCorpus, JobSearchService, LocalEmbedding,
    PipelineConfig, SearchRequest,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

const TITLES: [&str; 8] = [
    "Software Engineer",
    "Data Scientist",
    "Product Manager",
    "DevOps Engineer",
    "UX Designer",
    "Backend Developer",
    "Registered Nurse",
    "Account Executive",
];

const COMPANIES: [&str; 6] = ["Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark Labs"];

const SKILLS: [&str; 8] = [
    "rust", "python", "kubernetes", "postgres", "react", "figma", "sales", "aws",
];

fn synthetic_jobs(n: usize) -> Vec<Job> {
    let now = Utc::now();
    (0..n)
        .map(|i| {
            Job::new(
                TITLES[i % TITLES.len()],
                COMPANIES[i % COMPANIES.len()],
                now - Duration::hours(i as i64),
            )
            .with_skills([SKILLS[i % SKILLS.len()], SKILLS[(i * 3 + 1) % SKILLS.len()]])
            .with_remote(i % 4 == 0)
            .with_description(format!("Role {i} working on {}", SKILLS[(i + 2) % SKILLS.len()]))
        })
        .collect()
}

fn build_service(rt: &Runtime, n: usize) -> JobSearchService {
    rt.block_on(async {
        let embedder = LocalEmbedding::default();
        let corpus = InMemoryJobCorpus::new();
        corpus
            .insert_all(synthetic_jobs(n), Some(&embedder))
            .await
            .unwrap_or_default();
        let corpus = Arc::new(corpus);
        let advisor = DidYouMeanAdvisor::from_corpus(corpus.as_ref(), AdvisorConfig::default())
            .await
            .unwrap_or_else(|e| panic!("advisor: {e}"));
        JobSearchService::new(
            corpus,
            Some(Arc::new(LocalEmbedding::default())),
            Arc::new(advisor),
            PipelineConfig::default(),
        )
        .unwrap_or_else(|e| panic!("service: {e}"))
    })
}

fn bench_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap_or_else(|e| panic!("runtime: {e}"));
    let mut group = c.benchmark_group("search");

    for &size in &[100usize, 1_000] {
        let service = build_service(&rt, size);
        for (label, query) in [
            ("exact", "Software Engineer"),
            ("misspelled", "sofware enginer"),
            ("nonsense", "zzz_no_such_term_999"),
        ] {
            let request = SearchRequest::new(query);
            group.bench_with_input(BenchmarkId::new(label, size), &request, |b, request| {
                b.to_async(&rt)
                    .iter(|| async { black_box(service.search(request).await.ok()) });
            });
        }
    }
    group.finish();
}

fn bench_advisor(c: &mut Criterion) {
    let rt = Runtime::new().unwrap_or_else(|e| panic!("runtime: {e}"));
    let service = build_service(&rt, 1_000);
    c.bench_function("did_you_mean", |b| {
        b.iter(|| black_box(service.suggest("kuberntes enginer")));
    });
}

criterion_group!(benches, bench_search, bench_advisor);
criterion_main!(benches);
