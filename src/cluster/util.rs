use std::f64::consts::PI;

/// Volume of the unit ball in `dims` dimensions.
pub(crate) fn unit_ball_volume(dims: usize) -> f64 {
    // V(0) = 1, V(1) = 2, V(d) = V(d - 2) * 2π / d
    let mut v = if dims % 2 == 0 { 1.0 } else { 2.0 };
    let mut d = if dims % 2 == 0 { 2 } else { 3 };
    while d <= dims {
        v *= 2.0 * PI / d as f64;
        d += 2;
    }
    v
}

/// Radius at which, for uniformly spread data, a ball is expected to hold `min_pts` points.
///
/// `volume` is the volume of the occupied region in `dims` dimensions
/// (Ankerst et al., 1999). Returns `None` when no finite positive radius results.
pub(crate) fn estimate_generating_distance(
    min_pts: usize,
    volume: f64,
    n: usize,
    dims: usize,
) -> Option<f64> {
    if n == 0 || dims == 0 {
        return None;
    }
    let eps = (volume * min_pts as f64 / (n as f64 * unit_ball_volume(dims))).powf(1.0 / dims as f64);
    (eps.is_finite() && eps > 0.0).then_some(eps)
}
