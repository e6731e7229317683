use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kdscan::cluster::{Dbscan, Optics, XiParams};
use kdscan::kdtree::{KdTree, SearchScratch};
use kdscan::space::{PointSet, PointSpace};
use rand::prelude::*;

/// `n` points in Gaussian-ish blobs (sum of uniforms) around 10 random centers.
fn blobs(rng: &mut StdRng, n: usize, dims: usize) -> Vec<Vec<f64>> {
    let centers: Vec<Vec<f64>> = (0..10)
        .map(|_| (0..dims).map(|_| rng.random::<f64>() * 100.0).collect())
        .collect();
    (0..n)
        .map(|i| {
            let c = &centers[i % centers.len()];
            c.iter()
                .map(|&v| v + (0..3).map(|_| rng.random::<f64>() - 0.5).sum::<f64>() * 2.0)
                .collect()
        })
        .collect()
}

fn bench_kdtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("kdtree");
    let mut rng = StdRng::seed_from_u64(42);

    for &dims in &[2usize, 3, 8] {
        let points = blobs(&mut rng, 10_000, dims);

        group.bench_with_input(BenchmarkId::new("build_n10000", dims), &points, |b, points| {
            b.iter(|| {
                let mut tree = KdTree::new(dims).unwrap();
                for (i, p) in points.iter().enumerate() {
                    tree.insert(p, i).unwrap();
                }
                black_box(tree.len())
            })
        });

        let mut tree = KdTree::new(dims).unwrap();
        for (i, p) in points.iter().enumerate() {
            tree.insert(p, i).unwrap();
        }
        let dist = tree.distance_fn();
        let queries: Vec<&Vec<f64>> = points.iter().step_by(97).collect();

        group.bench_with_input(BenchmarkId::new("knn10", dims), &queries, |b, queries| {
            let mut scratch = SearchScratch::new();
            b.iter(|| {
                for q in queries {
                    let hits = tree.nearest_with(q, 10, &dist, &mut scratch).unwrap();
                    black_box(hits.len());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("range_r1", dims), &queries, |b, queries| {
            let mut scratch = SearchScratch::new();
            b.iter(|| {
                let mut count = 0usize;
                for q in queries {
                    tree.for_each_within(q, 1.0, &dist, &mut scratch, |_| count += 1)
                        .unwrap();
                }
                black_box(count)
            })
        });
    }

    group.finish();
}

fn bench_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("clustering");
    group.sample_size(20);

    let mut rng = StdRng::seed_from_u64(7);
    let rows = blobs(&mut rng, 5_000, 2);
    let coords: Vec<f64> = rows.iter().flatten().copied().collect();
    let space = PointSpace::new(PointSet::from_flat(2, coords).unwrap()).unwrap();

    group.bench_function("dbscan_n5000_d2", |b| {
        let dbscan = Dbscan::new(1.0, 5);
        b.iter(|| black_box(dbscan.run(&space).unwrap()))
    });

    group.bench_function("optics_n5000_d2", |b| {
        let optics = Optics::new(5, 2.0);
        b.iter(|| black_box(optics.run(&space).unwrap()))
    });

    let mut result = Optics::new(5, 2.0).run(&space).unwrap();
    group.bench_function("extract_threshold_n5000", |b| {
        b.iter(|| black_box(result.extract_dbscan_clustering(1.0, false).unwrap()))
    });
    group.bench_function("extract_xi_n5000", |b| {
        let xi = XiParams::new(0.05);
        b.iter(|| black_box(result.extract_clusters(&xi).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_kdtree, bench_clustering);
criterion_main!(benches);
