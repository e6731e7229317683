//! k-nearest-neighbour and radius queries.
//!
//! Nearest-neighbour search is best-first: unexplored subtrees sit in a
//! priority queue keyed by the lower bound on their distance to the query, and
//! the `K` best hits so far sit in a [`BoundedHeap`]. Once the closest pending
//! subtree is farther than the current `K`-th hit (with `K` hits in hand) the
//! search stops.
//!
//! All mutable traversal state lives in a [`SearchScratch`] owned by the
//! caller, never on the tree, so queries are reentrant and may run
//! concurrently on a shared `&KdTree`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{DistanceFn, KdTree, NodeKind};
use crate::error::{Error, Result};
use crate::heap::BoundedHeap;

/// A query hit: distance, stored coordinates and payload.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a, T> {
    /// Distance as reported by the query's [`DistanceFn`].
    pub distance: f64,
    /// Coordinates of the stored point.
    pub coords: &'a [f64],
    /// Payload stored with the point.
    pub value: &'a T,
}

/// Subtree waiting to be explored, ordered so that `BinaryHeap` pops the nearest first.
#[derive(Debug, Clone, Copy)]
struct Pending {
    bound: f64,
    node: usize,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .bound
            .total_cmp(&self.bound)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Reusable per-query buffers.
///
/// One scratch per thread; it carries no results between calls.
#[derive(Debug, Default)]
pub struct SearchScratch {
    pending: BinaryHeap<Pending>,
    stack: Vec<usize>,
    /// Best hits as `(leaf node, slot within leaf)`.
    best: Option<BoundedHeap<(usize, usize)>>,
}

impl SearchScratch {
    /// Create empty scratch buffers.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T> KdTree<T> {
    /// Up to `k` nearest points to `query`, nearest first.
    ///
    /// Points whose distance is `NaN` are never returned.
    pub fn nearest<D: DistanceFn + ?Sized>(
        &self,
        query: &[f64],
        k: usize,
        dist: &D,
    ) -> Result<Vec<Neighbor<'_, T>>> {
        let mut scratch = SearchScratch::new();
        self.nearest_with(query, k, dist, &mut scratch)
    }

    /// [`nearest`](Self::nearest) using caller-owned scratch buffers.
    pub fn nearest_with<D: DistanceFn + ?Sized>(
        &self,
        query: &[f64],
        k: usize,
        dist: &D,
        scratch: &mut SearchScratch,
    ) -> Result<Vec<Neighbor<'_, T>>> {
        self.check_query(query)?;
        scratch.pending.clear();
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let root = &self.nodes[0];
        scratch.pending.push(Pending {
            bound: dist.distance_to_rect(query, &root.min, &root.max),
            node: 0,
        });

        let SearchScratch { pending, best, .. } = scratch;
        let best = best.get_or_insert_with(|| BoundedHeap::smallest(k));
        best.reset(k);

        while let Some(Pending { bound, node }) = pending.pop() {
            if best.is_full() && bound > best.threshold() {
                break;
            }
            match &self.nodes[node].kind {
                NodeKind::Leaf { coords, .. } => {
                    for (slot, p) in coords.chunks_exact(self.dimensions()).enumerate() {
                        best.offer(dist.distance(query, p), (node, slot));
                    }
                }
                NodeKind::Stem { left, right, .. } => {
                    for &child in [*left, *right].iter() {
                        let c = &self.nodes[child];
                        let child_bound = dist.distance_to_rect(query, &c.min, &c.max);
                        if best.is_full() && child_bound > best.threshold() {
                            continue;
                        }
                        pending.push(Pending {
                            bound: child_bound,
                            node: child,
                        });
                    }
                }
            }
        }
        pending.clear();

        Ok(best
            .drain_sorted()
            .into_iter()
            .map(|(distance, (node, slot))| self.neighbor_at(node, slot, distance))
            .collect())
    }

    /// All points within `radius` of `query` (inclusive), in traversal order.
    ///
    /// `radius` is in the units of `dist`; for the squared Euclidean
    /// strategies it is a squared radius.
    pub fn range_query<D: DistanceFn + ?Sized>(
        &self,
        query: &[f64],
        radius: f64,
        dist: &D,
    ) -> Result<Vec<Neighbor<'_, T>>> {
        let mut out = Vec::new();
        let mut scratch = SearchScratch::new();
        self.for_each_within(query, radius, dist, &mut scratch, |n| out.push(n))?;
        Ok(out)
    }

    /// Visit every point within `radius` of `query` without allocating results.
    ///
    /// Traversal is deterministic: left subtrees before right subtrees, leaf
    /// slots in insertion order.
    pub fn for_each_within<'a, D, F>(
        &'a self,
        query: &[f64],
        radius: f64,
        dist: &D,
        scratch: &mut SearchScratch,
        mut visit: F,
    ) -> Result<()>
    where
        D: DistanceFn + ?Sized,
        F: FnMut(Neighbor<'a, T>),
    {
        self.check_query(query)?;
        if self.is_empty() {
            return Ok(());
        }

        let stack = &mut scratch.stack;
        stack.clear();
        stack.push(0);
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if dist.distance_to_rect(query, &node.min, &node.max) > radius {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf { coords, values, .. } => {
                    for (p, value) in coords.chunks_exact(self.dimensions()).zip(values.iter()) {
                        let d = dist.distance(query, p);
                        if d <= radius {
                            visit(Neighbor {
                                distance: d,
                                coords: p,
                                value,
                            });
                        }
                    }
                }
                NodeKind::Stem { left, right, .. } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
        Ok(())
    }

    fn check_query(&self, query: &[f64]) -> Result<()> {
        if query.len() != self.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions(),
                found: query.len(),
            });
        }
        Ok(())
    }

    fn neighbor_at(&self, node: usize, slot: usize, distance: f64) -> Neighbor<'_, T> {
        let dims = self.dimensions();
        match &self.nodes[node].kind {
            NodeKind::Leaf { coords, values, .. } => Neighbor {
                distance,
                coords: &coords[slot * dims..(slot + 1) * dims],
                value: &values[slot],
            },
            NodeKind::Stem { .. } => unreachable!("hits are only recorded in leaves"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{KdTreeParams, SquaredEuclidean, SquaredEuclidean2D};
    use super::*;
    use rand::prelude::*;

    fn random_tree(n: usize, dims: usize, seed: u64) -> (KdTree<usize>, Vec<Vec<f64>>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let params = KdTreeParams::default().with_bucket_size(5);
        let mut tree = KdTree::with_params(dims, params).unwrap();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let p: Vec<f64> = (0..dims).map(|_| rng.random::<f64>() * 100.0).collect();
            tree.insert(&p, i).unwrap();
            points.push(p);
        }
        (tree, points)
    }

    fn brute_force(points: &[Vec<f64>], query: &[f64], k: usize) -> Vec<f64> {
        let mut d: Vec<f64> = points
            .iter()
            .map(|p| SquaredEuclidean.distance(query, p))
            .collect();
        d.sort_by(|a, b| a.total_cmp(b));
        d.truncate(k);
        d
    }

    #[test]
    fn nearest_matches_brute_force() {
        for dims in [2, 3, 5] {
            let (tree, points) = random_tree(300, dims, 7 + dims as u64);
            let mut scratch = SearchScratch::new();
            let mut rng = StdRng::seed_from_u64(99);
            for _ in 0..20 {
                let q: Vec<f64> = (0..dims).map(|_| rng.random::<f64>() * 100.0).collect();
                let hits = tree
                    .nearest_with(&q, 8, &SquaredEuclidean, &mut scratch)
                    .unwrap();
                let got: Vec<f64> = hits.iter().map(|h| h.distance).collect();
                let want = brute_force(&points, &q, 8);
                assert_eq!(got.len(), want.len());
                for (a, b) in got.iter().zip(want.iter()) {
                    assert!((a - b).abs() < 1e-9, "{a} != {b}");
                }
                for h in &hits {
                    assert_eq!(h.coords, points[*h.value].as_slice());
                }
            }
        }
    }

    #[test]
    fn nearest_returns_fewer_than_k_when_small() {
        let mut tree = KdTree::new(2).unwrap();
        tree.insert(&[0.0, 0.0], 'a').unwrap();
        tree.insert(&[1.0, 0.0], 'b').unwrap();
        let hits = tree.nearest(&[0.9, 0.0], 5, &SquaredEuclidean2D).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(*hits[0].value, 'b');
        assert_eq!(*hits[1].value, 'a');

        assert!(tree.nearest(&[0.0, 0.0], 0, &SquaredEuclidean2D).unwrap().is_empty());
        let empty: KdTree<()> = KdTree::new(2).unwrap();
        assert!(empty.nearest(&[0.0, 0.0], 3, &SquaredEuclidean2D).unwrap().is_empty());
    }

    #[test]
    fn range_query_matches_brute_force() {
        let (tree, points) = random_tree(400, 2, 3);
        let q = [50.0, 50.0];
        let r2 = 15.0 * 15.0;
        let mut got: Vec<usize> = tree
            .range_query(&q, r2, &SquaredEuclidean2D)
            .unwrap()
            .into_iter()
            .map(|n| *n.value)
            .collect();
        got.sort_unstable();
        let want: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| SquaredEuclidean.distance(&q, p) <= r2)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(got, want);
    }

    #[test]
    fn nan_points_are_skipped_not_fatal() {
        let mut tree = KdTree::with_params(2, KdTreeParams::default().with_bucket_size(2)).unwrap();
        tree.insert(&[0.0, 0.0], 0).unwrap();
        tree.insert(&[f64::NAN, 0.0], 1).unwrap();
        tree.insert(&[1.0, 1.0], 2).unwrap();
        tree.insert(&[2.0, 2.0], 3).unwrap();

        let hits = tree.nearest(&[0.0, 0.0], 4, &SquaredEuclidean2D).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| *h.value).collect();
        assert_eq!(ids, vec![0, 2, 3]);

        let within = tree.range_query(&[0.0, 0.0], 100.0, &SquaredEuclidean2D).unwrap();
        assert_eq!(within.len(), 3);
    }

    #[test]
    fn query_dimension_is_checked() {
        let (tree, _) = random_tree(10, 3, 1);
        assert!(tree.nearest(&[0.0, 0.0], 1, &SquaredEuclidean).is_err());
        assert!(tree.range_query(&[0.0; 4], 1.0, &SquaredEuclidean).is_err());
    }

    #[test]
    fn concurrent_queries_share_the_tree() {
        let (tree, points) = random_tree(500, 3, 11);
        std::thread::scope(|s| {
            for t in 0..4 {
                let tree = &tree;
                let points = &points;
                s.spawn(move || {
                    let mut scratch = SearchScratch::new();
                    for q in points.iter().skip(t).step_by(4).take(50) {
                        let hits = tree.nearest_with(q, 1, &SquaredEuclidean, &mut scratch).unwrap();
                        assert_eq!(hits[0].distance, 0.0);
                    }
                });
            }
        });
    }
}
