//! NaN-aware summary statistics for logging and reports.

use ndarray::{ArrayBase, Data, Ix2};
use num_traits::Float;
use serde::Serialize;

/// Summary of a raster, ignoring no-data samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

impl RasterStats {
    pub fn compute<S, A>(image: &ArrayBase<S, Ix2>) -> Self
    where
        S: Data<Elem = A>,
        A: Float,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid_count = 0usize;
        let mut nodata_count = 0usize;

        for v in image.iter() {
            match v.to_f64() {
                Some(x) if !x.is_nan() => {
                    min = min.min(x);
                    max = max.max(x);
                    sum += x;
                    valid_count += 1;
                }
                _ => nodata_count += 1,
            }
        }

        if valid_count == 0 {
            return Self { min: None, max: None, mean: None, valid_count, nodata_count };
        }

        Self {
            min: Some(min),
            max: Some(max),
            mean: Some(sum / valid_count as f64),
            valid_count,
            nodata_count,
        }
    }

    /// Fraction of samples that are no-data
    pub fn nodata_fraction(&self) -> f64 {
        let total = self.valid_count + self.nodata_count;
        if total == 0 {
            0.0
        } else {
            self.nodata_count as f64 / total as f64
        }
    }
}

/// Population variance over every sample (no NaN handling)
pub fn population_variance<S, A>(image: &ArrayBase<S, Ix2>) -> f64
where
    S: Data<Elem = A>,
    A: Float,
{
    let n = image.len();
    if n == 0 {
        return 0.0;
    }
    let as_f64 = |v: &A| v.to_f64().unwrap_or(f64::NAN);
    let mean = image.iter().map(as_f64).sum::<f64>() / n as f64;
    image
        .iter()
        .map(|v| {
            let d = as_f64(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_stats_skip_nan() {
        let image = array![[1.0f32, f32::NAN], [3.0, -2.0]];
        let stats = RasterStats::compute(&image);
        assert_eq!(stats.min, Some(-2.0));
        assert_eq!(stats.max, Some(3.0));
        assert_eq!(stats.valid_count, 3);
        assert_eq!(stats.nodata_count, 1);
        assert!((stats.mean.unwrap() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.nodata_fraction(), 0.25);
    }

    #[test]
    fn test_all_nodata_has_no_extrema() {
        let image = ndarray::Array2::from_elem((3, 3), f32::NAN);
        let stats = RasterStats::compute(&image);
        assert_eq!(stats.min, None);
        assert_eq!(stats.valid_count, 0);
        assert_eq!(stats.nodata_fraction(), 1.0);
    }

    #[test]
    fn test_population_variance() {
        let image = array![[1.0f32, 2.0], [3.0, 4.0]];
        assert!((population_variance(&image) - 1.25).abs() < 1e-12);
        assert_eq!(population_variance(&ndarray::Array2::from_elem((4, 4), 7.0f32)), 0.0);
    }
}
