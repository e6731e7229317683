use crate::error::Result;

/// Common interface for hard clustering algorithms (one label per point).
pub trait Clustering {
    /// Fit the model (if needed) and return one cluster label per input point.
    ///
    /// Labels run `1..=k`; `0` marks noise.
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>>;
}
