//! Convex hulls and bounding boxes for cluster members.
//!
//! [`HullBuilder`] accumulates points one at a time. In 2D it keeps a convex
//! polygon that is valid after every [`add`](HullBuilder::add): points inside
//! the current polygon are discarded, and a point outside it is merged by
//! re-running Andrew's monotone chain over the current vertices plus the new
//! point. Only hull vertices are ever stored. For three or more dimensions
//! the hull degenerates to the bounding box.
//!
//! Non-finite coordinates are skipped for both the hull and the bounds.

mod cache;

pub(crate) use cache::{ClusterGeometry, GeometryCache};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl Bounds {
    /// Box from explicit corners.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Self {
        debug_assert_eq!(min.len(), max.len());
        Self { min, max }
    }

    /// Lower corner.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Upper corner.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.min.len()
    }

    /// Width along axis `d`.
    pub fn extent(&self, d: usize) -> f64 {
        self.max[d] - self.min[d]
    }

    /// Product of the extents.
    pub fn volume(&self) -> f64 {
        (0..self.dims()).map(|d| self.extent(d)).product()
    }

    /// Whether `p` lies inside or on the box, with slack `tol`.
    pub fn contains(&self, p: &[f64], tol: f64) -> bool {
        p.iter()
            .zip(self.min.iter().zip(self.max.iter()))
            .all(|(&v, (&lo, &hi))| v >= lo - tol && v <= hi + tol)
    }
}

/// Convex hull of a point set.
#[derive(Debug, Clone, PartialEq)]
pub enum Hull {
    /// 2D polygon, vertices counter-clockwise without collinear points.
    ///
    /// One vertex for a single distinct point, two for collinear input.
    Polygon(Vec<[f64; 2]>),
    /// Higher-dimensional hulls are reported as their bounding box.
    Box(Bounds),
}

impl Hull {
    /// Number of polygon vertices, or box corners.
    ///
    /// Saturates at `usize::MAX` for boxes with too many dimensions to count.
    pub fn len(&self) -> usize {
        match self {
            Hull::Polygon(v) => v.len(),
            Hull::Box(b) => u32::try_from(b.dims())
                .ok()
                .and_then(|d| 1usize.checked_shl(d))
                .unwrap_or(usize::MAX),
        }
    }

    /// Always `false`: a hull is only built from at least one point.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Polygon area, or box volume.
    pub fn area(&self) -> f64 {
        match self {
            Hull::Polygon(v) if v.len() >= 3 => {
                let mut twice = 0.0;
                for i in 0..v.len() {
                    let a = v[i];
                    let b = v[(i + 1) % v.len()];
                    twice += a[0] * b[1] - b[0] * a[1];
                }
                twice / 2.0
            }
            Hull::Polygon(_) => 0.0,
            Hull::Box(b) => b.volume(),
        }
    }

    /// Whether `p` lies inside or on the hull, with slack `tol`.
    pub fn contains(&self, p: &[f64], tol: f64) -> bool {
        match self {
            Hull::Box(b) => b.contains(p, tol),
            Hull::Polygon(v) => polygon_contains(v, [p[0], p[1]], tol),
        }
    }
}

#[inline]
fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn polygon_contains(v: &[[f64; 2]], p: [f64; 2], tol: f64) -> bool {
    match v.len() {
        0 => false,
        1 => (p[0] - v[0][0]).hypot(p[1] - v[0][1]) <= tol,
        2 => segment_distance(v[0], v[1], p) <= tol,
        n => (0..n).all(|i| {
            let a = v[i];
            let b = v[(i + 1) % n];
            let len = (b[0] - a[0]).hypot(b[1] - a[1]);
            // Signed distance to the edge line; positive is inside for CCW order.
            cross(a, b, p) >= -tol * len
        }),
    }
}

fn segment_distance(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p[0] - (a[0] + t * dx)).hypot(p[1] - (a[1] + t * dy))
}

/// Andrew's monotone chain. Consumes `points`, returns CCW hull vertices.
fn monotone_chain(mut points: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    points.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    points.dedup();
    if points.len() <= 2 {
        return points;
    }

    let mut hull: Vec<[f64; 2]> = Vec::with_capacity(points.len() + 1);
    for &p in &points {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower = hull.len() + 1;
    for &p in points.iter().rev().skip(1) {
        while hull.len() >= lower && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Accumulates points and tracks their hull and bounds.
#[derive(Debug, Clone)]
pub struct HullBuilder {
    dims: usize,
    count: usize,
    min: Vec<f64>,
    max: Vec<f64>,
    polygon: Vec<[f64; 2]>,
}

impl HullBuilder {
    /// Builder for points of `dims` dimensions.
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            count: 0,
            min: vec![f64::INFINITY; dims],
            max: vec![f64::NEG_INFINITY; dims],
            polygon: Vec::new(),
        }
    }

    /// Number of points accepted so far.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no point has been accepted.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Add a point. Points containing a non-finite coordinate are ignored.
    pub fn add(&mut self, p: &[f64]) {
        debug_assert_eq!(p.len(), self.dims);
        if p.iter().any(|v| !v.is_finite()) {
            return;
        }
        self.count += 1;
        for ((lo, hi), &v) in self.min.iter_mut().zip(self.max.iter_mut()).zip(p) {
            *lo = lo.min(v);
            *hi = hi.max(v);
        }
        if self.dims == 2 {
            let q = [p[0], p[1]];
            if !polygon_contains(&self.polygon, q, 0.0) {
                let mut merged = std::mem::take(&mut self.polygon);
                merged.push(q);
                self.polygon = monotone_chain(merged);
            }
        }
    }

    /// Add a 2D point.
    pub fn add_xy(&mut self, x: f64, y: f64) {
        self.add(&[x, y]);
    }

    /// Add a 3D point.
    pub fn add_xyz(&mut self, x: f64, y: f64, z: f64) {
        self.add(&[x, y, z]);
    }

    /// Current hull vertices (2D only; empty otherwise).
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.polygon
    }

    /// Bounds of the accepted points, or `None` if none were accepted.
    pub fn bounds(&self) -> Option<Bounds> {
        (self.count > 0).then(|| Bounds::new(self.min.clone(), self.max.clone()))
    }

    /// Hull of the accepted points, or `None` if none were accepted.
    pub fn build(&self) -> Option<Hull> {
        if self.count == 0 {
            return None;
        }
        if self.dims == 2 {
            Some(Hull::Polygon(self.polygon.clone()))
        } else {
            self.bounds().map(Hull::Box)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_with_interior_points() {
        let mut b = HullBuilder::new(2);
        for p in [[0.5, 0.5], [0.0, 0.0], [1.0, 0.0], [0.2, 0.7], [1.0, 1.0], [0.0, 1.0], [0.5, 0.0]] {
            b.add(&p);
        }
        let hull = b.build().unwrap();
        let Hull::Polygon(v) = &hull else {
            panic!("expected a polygon");
        };
        assert_eq!(v.len(), 4);
        assert!((hull.area() - 1.0).abs() < 1e-12);
        assert!(hull.contains(&[0.5, 0.5], 0.0));
        assert!(hull.contains(&[1.0, 0.5], 1e-12));
        assert!(!hull.contains(&[1.5, 0.5], 1e-9));

        let bounds = b.bounds().unwrap();
        assert_eq!(bounds.min(), &[0.0, 0.0]);
        assert_eq!(bounds.max(), &[1.0, 1.0]);
    }

    #[test]
    fn polygon_stays_convex_while_growing() {
        let mut b = HullBuilder::new(2);
        let pts: Vec<[f64; 2]> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.37;
                [t.cos() * (1.0 + (i % 3) as f64), t.sin() * (1.0 + (i % 5) as f64)]
            })
            .collect();
        for (i, p) in pts.iter().enumerate() {
            b.add(p);
            let v = b.vertices();
            if v.len() >= 3 {
                for j in 0..v.len() {
                    let c = cross(v[j], v[(j + 1) % v.len()], v[(j + 2) % v.len()]);
                    assert!(c > 0.0, "not strictly convex after {} points", i + 1);
                }
            }
            for q in &pts[..=i] {
                assert!(polygon_contains(v, *q, 1e-9));
            }
        }
    }

    #[test]
    fn degenerate_inputs() {
        let mut single = HullBuilder::new(2);
        single.add_xy(1.0, 2.0);
        single.add_xy(1.0, 2.0);
        assert_eq!(single.build(), Some(Hull::Polygon(vec![[1.0, 2.0]])));

        let mut line = HullBuilder::new(2);
        for i in 0..5 {
            line.add_xy(i as f64, 2.0 * i as f64);
        }
        let hull = line.build().unwrap();
        assert_eq!(hull, Hull::Polygon(vec![[0.0, 0.0], [4.0, 8.0]]));
        assert!(hull.contains(&[2.0, 4.0], 1e-12));
        assert_eq!(hull.area(), 0.0);

        assert!(HullBuilder::new(2).build().is_none());
        assert!(HullBuilder::new(3).bounds().is_none());
    }

    #[test]
    fn three_dimensions_reduce_to_box() {
        let mut b = HullBuilder::new(3);
        b.add_xyz(0.0, 0.0, 0.0);
        b.add_xyz(2.0, 1.0, 3.0);
        b.add_xyz(1.0, f64::NAN, 1.0);
        assert_eq!(b.len(), 2);
        let hull = b.build().unwrap();
        assert_eq!(hull.len(), 8);
        assert_eq!(hull.area(), 6.0);
        assert!(hull.contains(&[1.0, 0.5, 1.5], 0.0));
        assert!(!hull.contains(&[1.0, 1.5, 1.5], 0.0));
    }

    #[test]
    fn corner_count_saturates_in_high_dimensions() {
        let boxed = |d: usize| Hull::Box(Bounds::new(vec![0.0; d], vec![1.0; d]));
        assert_eq!(boxed(10).len(), 1024);
        assert_eq!(boxed(20).len(), 1 << 20);
        assert_eq!(boxed(usize::BITS as usize).len(), usize::MAX);
        assert_eq!(boxed(200).len(), usize::MAX);
    }
}
