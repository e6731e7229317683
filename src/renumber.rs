//! Compaction of arbitrary integer ids to a dense `0..n` range.
//!
//! Ids are numbered in first-seen order, so the output is stable for a fixed
//! input. Two strategies produce identical output:
//!
//! - **dense**: when `max - min` is at most the switch point, a lookup array
//!   indexed by `id - min` is used;
//! - **sparse**: otherwise a `HashMap` is used.
//!
//! Negative ids (e.g. noise sentinels) are ordinary ids here.

use std::collections::HashMap;

/// Largest id span handled with the dense lookup array by default.
pub const DEFAULT_SWITCH_POINT: usize = 1 << 16;

/// Configurable renumbering with optional caching of the forward and inverse maps.
#[derive(Debug, Clone)]
pub struct Renumber {
    switch_point: usize,
    cache_maps: bool,
    forward: Option<HashMap<i64, usize>>,
    inverse: Option<Vec<i64>>,
}

impl Default for Renumber {
    fn default() -> Self {
        Self {
            switch_point: DEFAULT_SWITCH_POINT,
            cache_maps: false,
            forward: None,
            inverse: None,
        }
    }
}

impl Renumber {
    /// Renumbering with the default switch point and no map caching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the id span above which the sparse strategy is used.
    pub fn with_switch_point(mut self, switch_point: usize) -> Self {
        self.switch_point = switch_point;
        self
    }

    /// Keep the maps from the most recent [`apply`](Self::apply).
    pub fn with_cache(mut self, cache_maps: bool) -> Self {
        self.cache_maps = cache_maps;
        self
    }

    /// Map each id to its first-seen rank.
    pub fn apply(&mut self, ids: &[i64]) -> Vec<usize> {
        let (out, inverse) = match (ids.iter().min(), ids.iter().max()) {
            (Some(&lo), Some(&hi)) if span(lo, hi) <= self.switch_point as u128 => {
                dense(ids, lo, hi)
            }
            _ => sparse(ids),
        };

        if self.cache_maps {
            let forward = inverse.iter().enumerate().map(|(new, &old)| (old, new)).collect();
            self.forward = Some(forward);
            self.inverse = Some(inverse);
        } else {
            self.forward = None;
            self.inverse = None;
        }
        out
    }

    /// Original id → dense id, when caching is enabled and `apply` has run.
    pub fn forward_map(&self) -> Option<&HashMap<i64, usize>> {
        self.forward.as_ref()
    }

    /// Dense id → original id, when caching is enabled and `apply` has run.
    pub fn inverse_map(&self) -> Option<&[i64]> {
        self.inverse.as_deref()
    }
}

/// Renumber with default settings.
pub fn renumber(ids: &[i64]) -> Vec<usize> {
    Renumber::new().apply(ids)
}

#[inline]
fn span(lo: i64, hi: i64) -> u128 {
    (i128::from(hi) - i128::from(lo)) as u128
}

fn dense(ids: &[i64], lo: i64, hi: i64) -> (Vec<usize>, Vec<i64>) {
    let mut lookup = vec![usize::MAX; span(lo, hi) as usize + 1];
    let mut inverse = Vec::new();
    let out = ids
        .iter()
        .map(|&id| {
            let slot = &mut lookup[(i128::from(id) - i128::from(lo)) as usize];
            if *slot == usize::MAX {
                *slot = inverse.len();
                inverse.push(id);
            }
            *slot
        })
        .collect();
    (out, inverse)
}

fn sparse(ids: &[i64]) -> (Vec<usize>, Vec<i64>) {
    let mut lookup: HashMap<i64, usize> = HashMap::new();
    let mut inverse = Vec::new();
    let out = ids
        .iter()
        .map(|&id| {
            *lookup.entry(id).or_insert_with(|| {
                inverse.push(id);
                inverse.len() - 1
            })
        })
        .collect();
    (out, inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order() {
        assert_eq!(renumber(&[7, -1, 7, 3, -1, 10]), vec![0, 1, 0, 2, 1, 3]);
        assert!(renumber(&[]).is_empty());
    }

    #[test]
    fn strategies_agree() {
        let ids = [5, i64::MIN, 5, 0, i64::MAX, 0, -3];
        let sparse_out = Renumber::new().with_switch_point(0).apply(&ids);
        let small: Vec<i64> = vec![40, -2, 40, 17, 17, 0, -2];
        let dense_out = Renumber::new().apply(&small);
        let forced_sparse = Renumber::new().with_switch_point(0).apply(&small);
        assert_eq!(dense_out, forced_sparse);
        assert_eq!(sparse_out, vec![0, 1, 0, 2, 3, 2, 4]);
    }

    #[test]
    fn maps_are_cached_only_on_request() {
        let mut plain = Renumber::new();
        plain.apply(&[3, 1]);
        assert!(plain.forward_map().is_none());
        assert!(plain.inverse_map().is_none());

        let mut cached = Renumber::new().with_cache(true);
        cached.apply(&[9, -4, 9]);
        assert_eq!(cached.inverse_map(), Some(&[9, -4][..]));
        assert_eq!(cached.forward_map().unwrap()[&-4], 1);
    }
}
