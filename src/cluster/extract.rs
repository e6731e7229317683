//! Cluster extraction from an OPTICS ordering.
//!
//! Two strategies read the same reachability plot:
//!
//! - **Threshold** (`ε'`): a horizontal cut through the plot. Equivalent to a
//!   DBSCAN run with radius `ε' <= ε` and the same `min_pts`.
//! - **Xi**: steep down areas followed by steep up areas delimit "valleys";
//!   every valid down/up pair is a candidate cluster range (Ankerst et al.,
//!   1999, section 4.3). Ranges nest into a hierarchy.
//!
//! A reachability of `f64::INFINITY` means "undefined": the point started a
//! new connected component of the ordering.

use tracing::trace;

use super::dbscan::NOISE;
use super::hierarchy::OpticsCluster;

/// Per-point distances recorded by an OPTICS run (indexed by original point).
pub(crate) struct Profile<'a> {
    /// Ordering position -> original point index.
    pub order: &'a [usize],
    pub reach: &'a [f64],
    pub core: &'a [f64],
    /// Smallest reachability offered by a core point processed after this one.
    pub late_reach: &'a [f64],
    pub late_pred: &'a [Option<usize>],
}

/// Flat labels for a cut at `eps`. Returns `(ids, num_clusters)`.
///
/// A point whose reachability exceeds `eps` starts a new cluster if it is
/// core at `eps`, and is noise otherwise. Everything else joins the current
/// cluster. Points left as noise that a later core point reaches within `eps`
/// are attached to that point's cluster. With `core_only`, points that are not
/// core at `eps` end up as noise.
pub(crate) fn threshold_clusters(p: &Profile<'_>, eps: f64, core_only: bool) -> (Vec<usize>, usize) {
    let n = p.order.len();
    let mut ids = vec![NOISE; n];
    let mut current = NOISE;
    let mut count = 0;

    for &i in p.order {
        if p.reach[i] > eps {
            if p.core[i] <= eps {
                count += 1;
                current = count;
                ids[i] = current;
            }
        } else {
            ids[i] = current;
        }
    }

    for &i in p.order {
        if ids[i] != NOISE || p.late_reach[i] > eps {
            continue;
        }
        if let Some(c) = p.late_pred[i] {
            ids[i] = ids[c];
        }
    }

    if core_only {
        for (i, id) in ids.iter_mut().enumerate() {
            if p.core[i] > eps {
                *id = NOISE;
            }
        }
    }
    (ids, count)
}

#[derive(Debug, Clone, Copy)]
struct SteepDownArea {
    start: usize,
    end: usize,
    /// Maximum reachability seen between the end of the area and the scan position.
    mib: f64,
}

/// Reachability plot with a trailing `+inf` so every position has a successor.
struct Plot<'a> {
    reach: &'a [f64],
    ixi: f64,
}

impl Plot<'_> {
    fn len(&self) -> usize {
        self.reach.len()
    }

    fn r(&self, i: usize) -> f64 {
        self.reach.get(i).copied().unwrap_or(f64::INFINITY)
    }

    fn steep_down(&self, i: usize) -> bool {
        let (a, b) = (self.r(i), self.r(i + 1));
        b < a && a * self.ixi >= b
    }

    fn steep_up(&self, i: usize) -> bool {
        let (a, b) = (self.r(i), self.r(i + 1));
        a < b && a <= b * self.ixi
    }

    /// Last position of the steep down area starting at `start`.
    fn down_area_end(&self, start: usize, max_non_steep: usize) -> usize {
        let mut end = start;
        let mut non_steep = 0;
        for i in start + 1..self.len() {
            if self.steep_down(i) {
                end = i;
                non_steep = 0;
            } else if self.r(i) >= self.r(i + 1) {
                non_steep += 1;
                if non_steep > max_non_steep {
                    break;
                }
            } else {
                break;
            }
        }
        end
    }

    /// Last position of the steep up area starting at `start`.
    fn up_area_end(&self, start: usize, max_non_steep: usize) -> usize {
        let mut end = start;
        let mut non_steep = 0;
        for i in start + 1..self.len() {
            if self.steep_up(i) {
                end = i;
                non_steep = 0;
            } else if self.r(i) <= self.r(i + 1) {
                non_steep += 1;
                if non_steep > max_non_steep {
                    break;
                }
            } else {
                break;
            }
        }
        end
    }
}

fn update_areas(areas: &mut Vec<SteepDownArea>, plot: &Plot<'_>, mib: f64) {
    areas.retain(|a| plot.r(a.start) * plot.ixi >= mib);
    for a in areas.iter_mut() {
        a.mib = a.mib.max(mib);
    }
}

/// Candidate cluster ranges (ordering positions, inclusive) from the xi method.
///
/// `reach` is the reachability plot in ordering order. No range crosses an
/// undefined (infinite) reachability after its first position.
pub(crate) fn xi_ranges(
    reach: &[f64],
    xi: f64,
    min_cluster_size: usize,
    max_non_steep: usize,
) -> Vec<(usize, usize)> {
    let plot = Plot { reach, ixi: 1.0 - xi };
    let n = plot.len();
    let mut areas: Vec<SteepDownArea> = Vec::new();
    let mut ranges = Vec::new();
    let mut mib = 0.0f64;
    let mut index = 0;

    while index < n {
        if index > 0 && plot.r(index).is_infinite() {
            areas.clear();
        }
        mib = mib.max(plot.r(index));

        if plot.steep_down(index) {
            update_areas(&mut areas, &plot, mib);
            let end = plot.down_area_end(index, max_non_steep);
            trace!(start = index, end, "steep down area");
            areas.push(SteepDownArea {
                start: index,
                end,
                mib: 0.0,
            });
            index = end + 1;
            mib = plot.r(index);
        } else if plot.steep_up(index) {
            update_areas(&mut areas, &plot, mib);
            let up_start = index;
            let up_end = plot.up_area_end(index, max_non_steep);
            trace!(start = up_start, end = up_end, "steep up area");
            index = up_end + 1;
            mib = plot.r(index);

            let after = plot.r(up_end + 1);
            for area in &areas {
                if area.mib > after * plot.ixi {
                    continue;
                }
                let start_r = plot.r(area.start);
                let mut start = area.start;
                let mut end = up_end;
                if start_r * plot.ixi >= after {
                    // Start much higher than the end: move the start right.
                    start = (area.start..=area.end)
                        .rev()
                        .find(|&x| plot.r(x) > after)
                        .unwrap_or(area.start);
                } else if after * plot.ixi >= start_r {
                    // End much higher than the start: move the end left.
                    end = (up_start..=up_end)
                        .rev()
                        .find(|&x| plot.r(x) <= start_r)
                        .unwrap_or(up_start);
                }
                if end > start && end - start + 1 >= min_cluster_size {
                    trace!(start, end, "xi cluster");
                    ranges.push((start, end));
                }
            }
        } else {
            index += 1;
        }
    }
    ranges
}

/// Label each point with the deepest cluster covering its ordering position.
///
/// Returns the ids plus each id's range, indexed by `id - 1`.
pub(crate) fn label_forest(order: &[usize], forest: &[OpticsCluster]) -> (Vec<usize>, Vec<(usize, usize)>) {
    let mut ids = vec![NOISE; order.len()];
    let mut ranges = Vec::new();
    for c in forest.iter().flat_map(|root| root.iter()) {
        if ranges.len() < c.cluster_id {
            ranges.resize(c.cluster_id, (0, 0));
        }
        ranges[c.cluster_id - 1] = (c.start, c.end);
        // Pre-order: children overwrite their parent.
        for &i in &order[c.start..=c.end] {
            ids[i] = c.cluster_id;
        }
    }
    (ids, ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::hierarchy::nest_ranges;

    const INF: f64 = f64::INFINITY;

    fn profile_parts(reach: &[f64], core: &[f64]) -> (Vec<usize>, Vec<f64>, Vec<Option<usize>>) {
        let n = reach.len();
        assert_eq!(core.len(), n);
        ((0..n).collect(), vec![INF; n], vec![None; n])
    }

    #[test]
    fn threshold_starts_clusters_at_core_points() {
        // Two valleys separated by an undefined jump, and an isolated point.
        let reach = [INF, 1.0, 1.0, 1.0, INF, 0.5, 0.5, INF];
        let core = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, INF];
        let (order, late_reach, late_pred) = profile_parts(&reach, &core);
        let p = Profile {
            order: &order,
            reach: &reach,
            core: &core,
            late_reach: &late_reach,
            late_pred: &late_pred,
        };

        let (ids, k) = threshold_clusters(&p, 2.0, false);
        assert_eq!(k, 2);
        assert_eq!(ids, vec![1, 1, 1, 1, 2, 2, 2, 0]);

        let (ids, k) = threshold_clusters(&p, 0.75, false);
        assert_eq!(k, 1);
        assert_eq!(ids, vec![0, 0, 0, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn threshold_core_only_and_late_border() {
        // Point 0 is processed before its only core neighbour, point 2.
        let order = vec![0, 1, 2, 3];
        let reach = [INF, INF, INF, 0.4];
        let core = [INF, INF, 0.4, 0.4];
        let late_reach = vec![0.45, INF, INF, INF];
        let late_pred = vec![Some(2), None, None, None];
        let p = Profile {
            order: &order,
            reach: &reach,
            core: &core,
            late_reach: &late_reach,
            late_pred: &late_pred,
        };

        let (ids, k) = threshold_clusters(&p, 0.5, false);
        assert_eq!(k, 1);
        assert_eq!(ids, vec![1, 0, 1, 1]);

        let (ids, _) = threshold_clusters(&p, 0.5, true);
        assert_eq!(ids, vec![0, 0, 1, 1]);

        // Too far for the repair at a tighter cut.
        let (ids, _) = threshold_clusters(&p, 0.42, false);
        assert_eq!(ids, vec![0, 0, 1, 1]);
    }

    #[test]
    fn xi_finds_two_valleys_inside_one() {
        // High start, two valleys separated by a moderate peak, then a high end.
        let reach = [
            INF, 10.0, 1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0, 10.0, 10.0,
        ];
        let ranges = xi_ranges(&reach, 0.3, 3, 2);
        let forest = nest_ranges(ranges);
        assert!(!forest.is_empty());

        let all: Vec<(usize, usize)> = forest
            .iter()
            .flat_map(|r| r.iter())
            .map(|c| (c.start, c.end))
            .collect();
        assert!(all.iter().any(|&(s, e)| s <= 2 && e >= 5 && e < 7), "{all:?}");
        assert!(all.iter().any(|&(s, e)| s >= 5 && s <= 7 && e >= 10), "{all:?}");

        for root in &forest {
            for c in root.iter() {
                for child in &c.children {
                    assert!(c.strictly_contains(child));
                }
            }
        }
    }

    #[test]
    fn xi_on_flat_plot_finds_nothing_inside() {
        let reach = [INF, 1.0, 1.0, 1.0, 1.0];
        let ranges = xi_ranges(&reach, 0.1, 2, 3);
        // Only the whole component qualifies.
        assert_eq!(ranges, vec![(0, 4)]);

        assert!(xi_ranges(&[], 0.1, 2, 3).is_empty());
        assert!(xi_ranges(&[INF], 0.1, 1, 3).is_empty());
    }

    #[test]
    fn xi_ranges_never_cross_undefined_reachability() {
        let reach = [INF, 1.0, 1.0, 1.0, INF, 1.0, 1.0, 1.0];
        for (s, e) in xi_ranges(&reach, 0.2, 2, 2) {
            assert!(!(s < 4 && e >= 4), "({s}, {e}) crosses position 4");
        }
    }

    #[test]
    fn forest_labels_use_the_deepest_cluster() {
        let order = vec![3, 1, 0, 2, 4];
        let forest = nest_ranges(vec![(0, 4), (1, 2)]);
        let (ids, ranges) = label_forest(&order, &forest);
        assert_eq!(ranges, vec![(0, 4), (1, 2)]);
        assert_eq!(ids, vec![2, 2, 1, 1, 1]);
    }
}
