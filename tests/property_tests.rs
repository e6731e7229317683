use std::collections::HashSet;

use kdscan::cluster::{ClusteringResult, Dbscan, Optics, OpticsParams, XiParams, NOISE};
use kdscan::kdtree::{squared_euclidean_for, DistanceFn, KdTree, KdTreeParams};
use kdscan::metrics::rand_index;
use kdscan::renumber::{renumber, Renumber};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn split_xy(points: &[(f32, f32)]) -> (Vec<f32>, Vec<f32>) {
    points.iter().copied().unzip()
}

/// Jittered 4x4 grids (spacing 0.1) centred `spacing` apart along x.
fn dense_blobs(jitter: &[(f32, f32)], blobs: usize, spacing: f32) -> (Vec<f32>, Vec<f32>) {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for b in 0..blobs {
        for i in 0..16 {
            let (jx, jy) = jitter[(b * 16 + i) % jitter.len()];
            x.push(b as f32 * spacing + (i % 4) as f32 * 0.1 + jx);
            y.push((i / 4) as f32 * 0.1 + jy);
        }
    }
    (x, y)
}

fn brute_force_knn(points: &[Vec<f64>], query: &[f64], k: usize) -> Vec<f64> {
    let dist = squared_euclidean_for(query.len(), None);
    let mut d: Vec<f64> = points.iter().map(|p| dist.distance(query, p)).collect();
    d.sort_by(f64::total_cmp);
    d.truncate(k);
    d
}

fn check_knn(points: &[Vec<f64>], query: &[f64], k: usize, bucket: usize) -> Result<(), TestCaseError> {
    let dims = query.len();
    let mut tree = KdTree::with_params(dims, KdTreeParams::default().with_bucket_size(bucket)).unwrap();
    for (i, p) in points.iter().enumerate() {
        tree.insert(p, i).unwrap();
    }
    let dist = tree.distance_fn();
    let found = tree.nearest(query, k, &dist).unwrap();
    let expected = brute_force_knn(points, query, k);

    prop_assert_eq!(found.len(), expected.len());
    for (n, e) in found.iter().zip(&expected) {
        prop_assert!((n.distance - e).abs() <= 1e-9 * e.max(1.0));
        prop_assert_eq!(n.coords, points[*n.value].as_slice());
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_ordering_is_a_permutation(
        points in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 0..80),
        min_pts in 1usize..6,
        eps in 0.1f64..5.0,
    ) {
        let (x, y) = split_xy(&points);
        let result = Optics::new(min_pts, eps).run_xy(&x, &y).unwrap();

        let mut seen = result.ordering().to_vec();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..points.len()).collect::<Vec<_>>());

        let reach = result.reachability_profile();
        if let Some(first) = reach.first() {
            prop_assert!(first.is_infinite());
        }
    }

    #[test]
    fn prop_knn_matches_brute_force_2d(
        points in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 2), 1..200),
        query in prop::collection::vec(-120.0f64..120.0, 2),
        k in 1usize..12,
        bucket in 1usize..10,
    ) {
        check_knn(&points, &query, k, bucket)?;
    }

    #[test]
    fn prop_knn_matches_brute_force_3d(
        points in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 3), 1..200),
        query in prop::collection::vec(-120.0f64..120.0, 3),
        k in 1usize..12,
        bucket in 1usize..10,
    ) {
        check_knn(&points, &query, k, bucket)?;
    }

    #[test]
    fn prop_threshold_matches_dbscan_without_border_points(
        points in prop::collection::vec((0.0f32..20.0, 0.0f32..20.0), 1..120),
        min_pts in 1usize..=2,
        eps in 0.2f64..3.0,
    ) {
        // With min_pts <= 2 every clustered point is core, so the partition is unique.
        let (x, y) = split_xy(&points);
        let mut optics = Optics::new(min_pts, eps).run_xy(&x, &y).unwrap();
        optics.extract_dbscan_clustering(eps, false).unwrap();
        let dbscan = Dbscan::new(eps, min_pts).run_xy(&x, &y).unwrap();

        prop_assert_eq!(optics.num_clusters(), dbscan.num_clusters());
        prop_assert_eq!(rand_index(optics.cluster_ids(), dbscan.cluster_ids()), 1.0);
    }

    #[test]
    fn prop_threshold_and_dbscan_agree_on_noise(
        points in prop::collection::vec((0.0f32..10.0, 0.0f32..10.0), 1..120),
        min_pts in 3usize..6,
        eps in 0.3f64..2.0,
    ) {
        // Border points may join either neighbouring cluster, so only the
        // noise / clustered split is compared.
        let (x, y) = split_xy(&points);
        let mut optics = Optics::new(min_pts, eps).run_xy(&x, &y).unwrap();
        optics.extract_dbscan_clustering(eps, false).unwrap();
        let dbscan = Dbscan::new(eps, min_pts).run_xy(&x, &y).unwrap();

        for (i, (a, b)) in optics.cluster_ids().iter().zip(dbscan.cluster_ids()).enumerate() {
            prop_assert_eq!(*a == NOISE, *b == NOISE, "point {} disagrees", i);
        }
    }

    #[test]
    fn prop_threshold_matches_dbscan_on_blobs(
        jitter in prop::collection::vec((-0.02f32..0.02, -0.02f32..0.02), 16),
        blobs in 1usize..6,
        min_pts in 3usize..=5,
    ) {
        let (x, y) = dense_blobs(&jitter, blobs, 3.0);
        let eps = 0.35;
        let mut optics = Optics::new(min_pts, 1.0).run_xy(&x, &y).unwrap();
        optics.extract_dbscan_clustering(eps, false).unwrap();
        let dbscan = Dbscan::new(eps, min_pts).run_xy(&x, &y).unwrap();

        prop_assert_eq!(optics.num_clusters(), blobs);
        prop_assert_eq!(dbscan.num_clusters(), blobs);
        prop_assert_eq!(rand_index(optics.cluster_ids(), dbscan.cluster_ids()), 1.0);
    }

    #[test]
    fn prop_scramble_preserves_partition(
        jitter in prop::collection::vec((-0.02f32..0.02, -0.02f32..0.02), 16),
        blobs in 3usize..7,
        seed in any::<u64>(),
    ) {
        let (x, y) = dense_blobs(&jitter, blobs, 3.0);
        let mut result = Optics::new(4, 0.35).run_xy(&x, &y).unwrap();
        result.extract_dbscan_clustering(0.35, false).unwrap();
        let before = result.cluster_ids().to_vec();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut changed = false;
        for _ in 0..20 {
            result.scramble_clusters(&mut rng);
            prop_assert_eq!(rand_index(&before, result.cluster_ids()), 1.0);
            for (a, b) in before.iter().zip(result.cluster_ids()) {
                prop_assert_eq!(*a == NOISE, *b == NOISE);
            }
            changed |= result.cluster_ids() != before.as_slice();
        }
        prop_assert!(changed);
    }

    #[test]
    fn prop_renumber_is_a_dense_bijection(
        ids in prop::collection::vec(prop_oneof![-5i64..20, any::<i64>()], 0..200),
        switch_point in 0usize..64,
    ) {
        let mut r = Renumber::new().with_cache(true);
        let out = r.apply(&ids);

        let distinct: HashSet<i64> = ids.iter().copied().collect();
        let values: HashSet<usize> = out.iter().copied().collect();
        prop_assert_eq!(values, (0..distinct.len()).collect::<HashSet<_>>());

        // First-seen order: each new id is exactly one past the largest so far.
        let mut next = 0;
        for &v in &out {
            prop_assert!(v <= next);
            if v == next {
                next += 1;
            }
        }

        let again: Vec<i64> = out.iter().map(|&v| v as i64).collect();
        prop_assert_eq!(renumber(&again), out.clone());

        let forward = r.forward_map().unwrap();
        let inverse = r.inverse_map().unwrap();
        for &id in &ids {
            prop_assert_eq!(inverse[forward[&id]], id);
        }

        let sparse = Renumber::new().with_switch_point(switch_point).apply(&ids);
        prop_assert_eq!(sparse, out);
    }

    #[test]
    fn prop_hull_and_bounds_contain_members(
        points in prop::collection::vec((-5.0f32..5.0, -5.0f32..5.0), 1..100),
        min_pts in 2usize..6,
        eps in 0.3f64..2.0,
    ) {
        let (x, y) = split_xy(&points);
        let mut result = Optics::new(min_pts, eps).run_xy(&x, &y).unwrap();
        result.extract_dbscan_clustering(eps, false).unwrap();

        for id in 1..=result.num_clusters() {
            let hull = result.convex_hull(id).unwrap();
            let bounds = result.bounds(id).unwrap();
            for m in result.cluster_members(id) {
                let p = [f64::from(x[m]), f64::from(y[m])];
                prop_assert!(hull.contains(&p, 1e-6));
                prop_assert!(bounds.contains(&p, 0.0));
            }
        }
        prop_assert!(result.convex_hull(0).is_none());
        prop_assert!(result.convex_hull(result.num_clusters() + 1).is_none());
    }

    #[test]
    fn prop_xi_children_are_strictly_nested(
        points in prop::collection::vec((0.0f32..10.0, 0.0f32..10.0), 0..120),
        xi in 0.01f64..0.9,
    ) {
        let (x, y) = split_xy(&points);
        let params = OpticsParams::default().with_min_pts(4).with_generating_distance(2.0);
        let mut result = Optics::with_params(params).run_xy(&x, &y).unwrap();
        let k = result.extract_clusters(&XiParams::new(xi)).unwrap();
        prop_assert_eq!(k, result.all_clusters().count());

        for root in result.clusters() {
            for c in root.iter() {
                prop_assert!(c.end < points.len());
                for child in &c.children {
                    prop_assert!(c.strictly_contains(child));
                    prop_assert!(c.level > child.level);
                }
                for pair in c.children.windows(2) {
                    prop_assert!(pair[0].end < pair[1].start);
                }
            }
        }
    }
}

#[test]
fn unit_square_with_outlier() {
    let x = [0.0, 1.0, 0.0, 1.0, 100.0];
    let y = [0.0, 0.0, 1.0, 1.0, 100.0];

    let mut result = Optics::new(3, 2.0).run_xy(&x, &y).unwrap();
    assert_eq!(result.extract_dbscan_clustering(2.0, false).unwrap(), 1);
    assert_eq!(result.cluster_members(1).len(), 4);
    assert_eq!(result.cluster_ids()[4], NOISE);

    assert_eq!(result.extract_dbscan_clustering(0.5, false).unwrap(), 0);
    assert!(result.cluster_ids().iter().all(|&c| c == NOISE));

    let dbscan = Dbscan::new(2.0, 3).run_xy(&x, &y).unwrap();
    assert_eq!(dbscan.cluster_members(1), vec![0, 1, 2, 3]);
}
