// Benchmark SQLite store operations: bulk upsert, stats coalesce, edge lookup.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use depgraph_core::store::{GraphStore, SqliteStore};
use depgraph_core::types::{ComponentRecord, ComponentStats, DependencyEdgeRecord};

fn components(n: usize) -> Vec<ComponentRecord> {
    (0..n)
        .map(|i| ComponentRecord::new(format!("c{i}"), Some(&format!("Class{i}")), Some("ApexClass")))
        .collect()
}

fn edges(n: usize) -> Vec<DependencyEdgeRecord> {
    (0..n)
        .map(|i| DependencyEdgeRecord {
            source_id: format!("c{i}"),
            target_id: format!("c{}", (i * 7 + 1) % n),
            ..DependencyEdgeRecord::default()
        })
        .collect()
}

fn bench_bulk_upsert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("store_upsert");

    for count in [100, 1_000, 5_000] {
        let nodes = components(count);
        let links = edges(count);
        group.bench_with_input(BenchmarkId::new("count", count), &count, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    let store = SqliteStore::in_memory().unwrap();
                    store.upsert_nodes(&nodes).await.unwrap();
                    store.upsert_edges(&links).await.unwrap();
                });
            });
        });
    }
    group.finish();
}

fn bench_stats_coalesce(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(async {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&components(1_000)).await.unwrap();
        store
    });
    #[allow(clippy::cast_possible_wrap)]
    let stats: Vec<ComponentStats> = (0..1_000)
        .map(|i| ComponentStats {
            id: format!("c{i}"),
            size: (i % 2 == 0).then_some(i as i64),
            coverage: Some((i % 101) as i64),
        })
        .collect();

    c.bench_function("store_update_stats_1000", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.update_stats(&stats).await.unwrap();
            });
        });
    });
}

fn bench_edges_touching(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = rt.block_on(async {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert_nodes(&components(5_000)).await.unwrap();
        store.upsert_edges(&edges(5_000)).await.unwrap();
        store
    });

    c.bench_function("store_edges_touching", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.edges_touching("c2500").await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_bulk_upsert,
    bench_stats_coalesce,
    bench_edges_touching,
);
criterion_main!(benches);
