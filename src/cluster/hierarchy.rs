//! Nested clusters over an OPTICS ordering.

/// A cluster covering the contiguous range `start..=end` of an ordering.
///
/// Children are strictly contained in their parent and pairwise disjoint.
/// `level` is `0` for a leaf and one more than the deepest child otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticsCluster {
    /// First ordering position in the cluster.
    pub start: usize,
    /// Last ordering position in the cluster (inclusive).
    pub end: usize,
    /// Cluster id (`1..=num_clusters`).
    pub cluster_id: usize,
    /// Nesting level; `0` for leaves.
    pub level: usize,
    /// Directly nested clusters, in ordering order.
    pub children: Vec<OpticsCluster>,
}

impl OpticsCluster {
    /// A leaf cluster.
    pub fn new(start: usize, end: usize, cluster_id: usize) -> Self {
        Self {
            start,
            end,
            cluster_id,
            level: 0,
            children: Vec::new(),
        }
    }

    /// Number of ordering positions covered.
    pub fn size(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether `other`'s range lies within this one and differs from it.
    pub fn strictly_contains(&self, other: &OpticsCluster) -> bool {
        self.start <= other.start && other.end <= self.end && self.size() > other.size()
    }

    /// Attach a child and update this cluster's level.
    pub fn add_child(&mut self, child: OpticsCluster) {
        self.level = self.level.max(child.level + 1);
        self.children.push(child);
    }

    /// Pre-order walk over this cluster and all descendants.
    pub fn iter(&self) -> impl Iterator<Item = &OpticsCluster> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }

    pub(crate) fn relabel(&mut self, map: &[usize]) {
        self.cluster_id = map[self.cluster_id];
        for c in &mut self.children {
            c.relabel(map);
        }
    }
}

/// Nest candidate ranges into a forest by containment.
///
/// Duplicates are dropped. A range that partially overlaps an accepted range
/// without containing it (or being contained) is discarded in favour of the
/// earlier, broader one. Ids are assigned `1..` in pre-order.
pub(crate) fn nest_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<OpticsCluster> {
    ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
    ranges.dedup();

    let mut accepted: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    let mut parent: Vec<Option<usize>> = Vec::with_capacity(ranges.len());
    let mut open: Vec<usize> = Vec::new();

    'candidates: for (s, e) in ranges {
        while let Some(&top) = open.last() {
            let (ts, te) = accepted[top];
            if ts <= s && e <= te {
                break;
            }
            if te >= s {
                continue 'candidates;
            }
            open.pop();
        }
        parent.push(open.last().copied());
        open.push(accepted.len());
        accepted.push((s, e));
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); accepted.len()];
    let mut roots = Vec::new();
    for (i, p) in parent.iter().enumerate() {
        match p {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    fn build(i: usize, accepted: &[(usize, usize)], children: &[Vec<usize>]) -> OpticsCluster {
        let (s, e) = accepted[i];
        let mut node = OpticsCluster::new(s, e, 0);
        for &c in &children[i] {
            node.add_child(build(c, accepted, children));
        }
        node
    }

    let mut forest: Vec<OpticsCluster> = roots
        .into_iter()
        .map(|r| build(r, &accepted, &children))
        .collect();
    let mut next_id = 0;
    for root in &mut forest {
        assign_ids(root, &mut next_id);
    }
    forest
}

fn assign_ids(node: &mut OpticsCluster, next_id: &mut usize) {
    *next_id += 1;
    node.cluster_id = *next_id;
    for c in &mut node.children {
        assign_ids(c, next_id);
    }
}
