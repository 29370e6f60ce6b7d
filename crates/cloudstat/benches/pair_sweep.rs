use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use cloudstat::{ParallelSpec, StatRequest, calc_pairwise_stat_outputs};
use cloudstat_test::PointSetData;

fn bench_auto_sweep(c: &mut Criterion, stat_name: &str, pairwise_op: &str, n_value_comps: usize) {
    let bin_edges = [0.0, 1.0, 2.0, 4.0, 8.0];
    let stat_list = [StatRequest::new(stat_name)];

    let mut group = c.benchmark_group(format!("{pairwise_op}/{stat_name}"));
    for n_points in [64_usize, 256, 1024].into_iter() {
        let data = PointSetData::from_random(n_points, n_value_comps, 8.0, 2525365464);
        let n_pairs = (n_points * (n_points - 1) / 2) as u64;

        group.throughput(Throughput::Elements(n_pairs));
        group.bench_with_input(
            BenchmarkId::from_parameter(n_points),
            &data,
            |b, data: &PointSetData| {
                b.iter(|| {
                    calc_pairwise_stat_outputs(
                        &data.points(),
                        None,
                        pairwise_op,
                        &stat_list,
                        &bin_edges,
                        &ParallelSpec::serial(),
                    )
                    .unwrap()
                })
            },
        );
    }
    group.finish();
}

fn criterion_benchmark(c: &mut Criterion) {
    bench_auto_sweep(c, "mean", "sf", 3);
    bench_auto_sweep(c, "variance", "sf", 3);
    bench_auto_sweep(c, "mean", "correlate", 1);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
