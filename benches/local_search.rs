use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dcore::prelude::*;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::time::Duration;

fn random_graph(n: usize, avg_degree: f64) -> Graph {
    let mut rng = XorShiftRng::seed_from_u64(0xBEEF);
    Graph::random(&mut rng, n, avg_degree / n as f64, 100)
}

fn bench_greedy_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_fill");
    for n in [1_000, 5_000] {
        let g = random_graph(n, 8.0);
        group.bench_with_input(BenchmarkId::from_parameter(n), &g, |b, g| {
            b.iter(|| {
                let mut ls = LocalSearch::new(g, 1, EngineConfig::default());
                ls.greedy_fill(g);
                black_box(ls.cost())
            })
        });
    }
    group.finish();
}

fn bench_explore(c: &mut Criterion) {
    let mut group = c.benchmark_group("explore_1000_iterations");
    let g = random_graph(5_000, 8.0);
    let mut ls = LocalSearch::new(&g, 7, EngineConfig::default());
    ls.greedy_fill(&g);
    ls.commit();
    group.bench_function("n=5000", |b| {
        b.iter(|| black_box(ls.explore(&g, Duration::from_secs(60), 1_000)))
    });
    group.finish();
}

fn bench_subgraph(c: &mut Criterion) {
    let mut group = c.benchmark_group("induced_subgraph");
    let g = random_graph(10_000, 10.0);
    let mask: Vec<bool> = (0..g.len()).map(|u| u % 3 != 0).collect();
    let mut buffers = SubgraphBuffers::new(&g);

    group.bench_function("sequential", |b| b.iter(|| black_box(g.induced_subgraph(&mask))));
    for workers in [1, 4] {
        group.bench_with_input(BenchmarkId::new("parallel", workers), &workers, |b, &workers| {
            b.iter(|| black_box(buffers.extract_parallel(&g, &mask, workers).edge_count()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_greedy_fill, bench_explore, bench_subgraph);
criterion_main!(benches);
