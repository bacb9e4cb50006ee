// Criterion benchmarks for Breed Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use breed_match::core::{
    build_filter, build_recommendation, plan_attempts, select_best, tiers::DEFAULT_POPULARITY_CAPS,
    BreedMatcher,
};
use breed_match::models::{BreedRecord, PreferenceConstraints, SearchHit};
use breed_match::services::InMemoryBackend;
use std::sync::Arc;

fn create_hit(id: usize) -> SearchHit {
    let weight = 3.0 + (id % 60) as f64;
    SearchHit {
        id: format!("Breed {}", id),
        score: 0.5 + (id % 50) as f64 / 100.0,
        record: BreedRecord {
            breed: format!("Breed {}", id),
            temperament: vec!["friendly".to_string(), "alert".to_string()],
            popularity: if id % 7 == 0 { None } else { Some((id % 200) as i64 + 1) },
            min_height: 30.0,
            max_height: 60.0,
            min_weight: weight,
            max_weight: weight + 10.0,
            trainability_value: Some((id % 10) as f64 / 10.0),
            energy_level_value: Some((id % 5) as f64 / 5.0),
            shedding_value: Some(0.4),
            grooming_frequency_value: Some(0.2),
            ..Default::default()
        },
    }
}

fn create_constraints() -> PreferenceConstraints {
    PreferenceConstraints {
        search_query: "friendly medium dog for a family".to_string(),
        temperament_tags: vec!["friendly".to_string(), "calm".to_string()],
        energy_min_value: Some(0.2),
        energy_max_value: Some(0.8),
        shedding_max_value: Some(0.4),
        grooming_max_value: Some(0.4),
        weight_min_kg: Some(11.5),
        weight_max_kg: Some(22.0),
        min_trainability_value: Some(0.6),
        popularity_max_rank: Some(100),
    }
}

fn bench_build_filter(c: &mut Criterion) {
    let constraints = create_constraints();

    c.bench_function("build_filter", |b| {
        b.iter(|| build_filter(black_box(&constraints)).map(|f| f.to_string()));
    });
}

fn bench_plan_attempts(c: &mut Criterion) {
    let constraints = create_constraints();

    c.bench_function("plan_attempts", |b| {
        b.iter(|| plan_attempts(black_box(&constraints), black_box(&DEFAULT_POPULARITY_CAPS)));
    });
}

fn bench_select_best(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_best");

    for size in [8, 64, 300].iter() {
        let hits: Vec<SearchHit> = (0..*size).map(create_hit).collect();

        group.bench_with_input(BenchmarkId::new("hits", size), size, |b, _| {
            b.iter(|| select_best(black_box(&hits)).map(|h| h.id.len()));
        });
    }

    group.finish();
}

fn bench_build_recommendation(c: &mut Criterion) {
    let constraints = create_constraints();
    let hit = create_hit(14);

    c.bench_function("build_recommendation", |b| {
        b.iter(|| build_recommendation(black_box(&constraints), black_box(&hit)));
    });
}

fn bench_find_best_match(c: &mut Criterion) {
    let hits: Vec<SearchHit> = (0..300).map(create_hit).collect();
    let matcher = BreedMatcher::with_default_settings(Arc::new(InMemoryBackend::new(hits)));
    let constraints = PreferenceConstraints {
        popularity_max_rank: None,
        ..create_constraints()
    };

    c.bench_function("find_best_match_in_memory", |b| {
        b.iter(|| tokio_test::block_on(matcher.find_best_match(black_box(&constraints))).is_ok());
    });
}

criterion_group!(
    benches,
    bench_build_filter,
    bench_plan_attempts,
    bench_select_best,
    bench_build_recommendation,
    bench_find_best_match
);
criterion_main!(benches);
