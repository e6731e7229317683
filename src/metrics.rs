//! Pair-counting comparison of two labelings of the same points.
//!
//! Labels are compared as partitions: only co-membership matters, so the
//! actual id values (and which one marks noise) are irrelevant.

use std::collections::HashMap;

use crate::renumber::renumber;

struct PairCounts {
    pairs: f64,
    same_a: f64,
    same_b: f64,
    same_both: f64,
}

#[inline]
fn choose2(n: usize) -> f64 {
    let n = n as f64;
    n * (n - 1.0) / 2.0
}

fn pair_counts(a: &[usize], b: &[usize]) -> PairCounts {
    assert_eq!(a.len(), b.len(), "labelings must cover the same points");
    let ra = renumber(&a.iter().map(|&x| x as i64).collect::<Vec<_>>());
    let rb = renumber(&b.iter().map(|&x| x as i64).collect::<Vec<_>>());

    let ka = ra.iter().max().map_or(0, |m| m + 1);
    let kb = rb.iter().max().map_or(0, |m| m + 1);
    let mut row = vec![0usize; ka];
    let mut col = vec![0usize; kb];
    let mut cells: HashMap<(usize, usize), usize> = HashMap::new();
    for (&x, &y) in ra.iter().zip(rb.iter()) {
        row[x] += 1;
        col[y] += 1;
        *cells.entry((x, y)).or_insert(0) += 1;
    }

    PairCounts {
        pairs: choose2(a.len()),
        same_a: row.iter().map(|&c| choose2(c)).sum(),
        same_b: col.iter().map(|&c| choose2(c)).sum(),
        same_both: cells.values().map(|&c| choose2(c)).sum(),
    }
}

/// Rand index: the fraction of point pairs on which both labelings agree.
///
/// Returns `1.0` for fewer than two points.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn rand_index(a: &[usize], b: &[usize]) -> f64 {
    let c = pair_counts(a, b);
    if c.pairs == 0.0 {
        return 1.0;
    }
    let disagree = c.same_a + c.same_b - 2.0 * c.same_both;
    1.0 - disagree / c.pairs
}

/// Adjusted Rand index (Hubert & Arabie), `1.0` for identical partitions.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn adjusted_rand_index(a: &[usize], b: &[usize]) -> f64 {
    let c = pair_counts(a, b);
    if c.pairs == 0.0 {
        return 1.0;
    }
    let expected = c.same_a * c.same_b / c.pairs;
    let max = 0.5 * (c.same_a + c.same_b);
    if max == expected {
        return 1.0;
    }
    (c.same_both - expected) / (max - expected)
}
