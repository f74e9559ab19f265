//! Benchmarks for the prepare/commit loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use migrateflow::config::RunConfig;
use migrateflow::orchestrator::Manager;
use migrateflow::testing::{as_pipelines, MockPipeline};
use std::sync::Arc;

fn prepare_and_commit(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let ids: Vec<String> = (0..1000).map(|i| i.to_string()).collect();
    let mut group = c.benchmark_group("prepare_and_commit");

    for concurrency in [1usize, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    let pipeline = Arc::new(
                        MockPipeline::new("BenchPipeline")
                            .with_units(ids.iter().cloned())
                            .with_marker("bench"),
                    );
                    let pipelines = as_pipelines(&[pipeline]);
                    let mut manager =
                        Manager::new(RunConfig::new().with_unit_concurrency(concurrency));

                    runtime.block_on(async {
                        manager.prepare(&pipelines).await.expect("prepare");
                        manager.commit(&pipelines).await.expect("commit");
                    });
                    black_box(manager.prepared_count())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, prepare_and_commit);
criterion_main!(benches);
