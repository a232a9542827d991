use crate::core::calibrate::{fill_nodata, nodata_mask, restore_nodata};
use crate::core::statistics::population_variance;
use crate::types::{PipelineError, PipelineResult, RealImage};
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};

/// Speckle filtering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeckleFilterParams {
    /// Filter window size (must be odd)
    pub window_size: usize,
    /// Value substituted for no-data while the window slides (dB)
    pub nodata_fill: f32,
}

impl Default for SpeckleFilterParams {
    fn default() -> Self {
        Self {
            window_size: 5,     // 5x5 window
            nodata_fill: -40.0, // lower mask bound
        }
    }
}

impl SpeckleFilterParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(PipelineError::InvalidParameter(format!(
                "Window size must be odd, got {}",
                self.window_size
            )));
        }
        if !self.nodata_fill.is_finite() {
            return Err(PipelineError::InvalidParameter(
                "No-data fill value must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Adaptive (Lee) speckle filter on log-scale backscatter
pub struct SpeckleFilter {
    params: SpeckleFilterParams,
}

impl SpeckleFilter {
    /// Create a new speckle filter with default parameters
    pub fn new() -> Self {
        Self {
            params: SpeckleFilterParams::default(),
        }
    }

    /// Create a speckle filter with custom parameters
    pub fn with_params(params: SpeckleFilterParams) -> Self {
        Self { params }
    }

    /// Apply the Lee filter.
    ///
    /// No-data is replaced by `nodata_fill` while local and global statistics
    /// are taken, then put back at the same positions. Each output sample is
    /// `m + k * (x - m)` with `m`, `v` the local box mean and variance, `g` the
    /// variance of the whole filled window and `k = v / (v + g)`; `k = 0` when
    /// both variances vanish.
    pub fn apply_lee(&self, image: &RealImage) -> PipelineResult<RealImage> {
        self.params.validate()?;
        log::info!(
            "Applying Lee filter ({}x{} window) to {}x{} image",
            self.params.window_size,
            self.params.window_size,
            image.nrows(),
            image.ncols()
        );

        if image.is_empty() {
            return Ok(image.clone());
        }

        let mask = nodata_mask(image);
        let filled: Array2<f64> = fill_nodata(image, self.params.nodata_fill).mapv(f64::from);

        let local_mean = uniform_filter(&filled, self.params.window_size);
        let local_mean_sq = uniform_filter(&filled.mapv(|v| v * v), self.params.window_size);
        let global_variance = population_variance(&filled);
        log::debug!("Global variance: {:.6}", global_variance);

        let mut filtered = Zip::from(&filled)
            .and(&local_mean)
            .and(&local_mean_sq)
            .map_collect(|&x, &m, &m2| {
                let local_variance = (m2 - m * m).max(0.0);
                let denom = local_variance + global_variance;
                let weight = if denom > 0.0 { local_variance / denom } else { 0.0 };
                (m + weight * (x - m)) as f32
            });

        restore_nodata(&mut filtered, &mask);

        log::info!("Speckle filtering completed successfully");
        Ok(filtered)
    }
}

impl Default for SpeckleFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Box (uniform) mean over a `size` x `size` window.
///
/// Borders are mirror-reflected about the edge (`d c b a | a b c d | d c b a`).
/// `size` is expected to be odd.
pub fn uniform_filter(image: &Array2<f64>, size: usize) -> Array2<f64> {
    let mut rows_done = Array2::zeros(image.dim());
    let mut result = Array2::zeros(image.dim());

    #[cfg(feature = "parallel")]
    {
        Zip::from(rows_done.rows_mut())
            .and(image.rows())
            .par_for_each(|dst, src| box_mean_1d(src, dst, size));
        Zip::from(result.columns_mut())
            .and(rows_done.columns())
            .par_for_each(|dst, src| box_mean_1d(src, dst, size));
    }

    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(rows_done.rows_mut())
            .and(image.rows())
            .for_each(|dst, src| box_mean_1d(src, dst, size));
        Zip::from(result.columns_mut())
            .and(rows_done.columns())
            .for_each(|dst, src| box_mean_1d(src, dst, size));
    }

    result
}

fn box_mean_1d(src: ArrayView1<f64>, mut dst: ArrayViewMut1<f64>, size: usize) {
    let n = src.len();
    let half = (size / 2) as isize;
    for i in 0..n {
        let mut sum = 0.0;
        for k in -half..=half {
            sum += src[reflect_index(i as isize + k, n)];
        }
        dst[i] = sum / size as f64;
    }
}

/// Map an out-of-range index back inside `0..n` by mirror reflection
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - m - 1) as usize
    }
}
