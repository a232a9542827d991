use crate::core::statistics::RasterStats;
use crate::types::{PipelineError, PipelineResult, RealImage, NO_DATA};
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Radiometric calibration parameters for GRD digital numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// DN to linear sigma0 divisor
    pub scaling_factor: f32,
    /// Added before log10 to keep zero samples finite
    pub epsilon: f32,
    /// Lowest plausible backscatter (dB), inclusive
    pub min_db: f32,
    /// Highest plausible backscatter (dB), inclusive
    pub max_db: f32,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            scaling_factor: 10000.0,
            epsilon: 1e-10,
            min_db: -40.0,
            max_db: 5.0,
        }
    }
}

impl CalibrationParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.scaling_factor > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "scaling factor must be positive, got {}",
                self.scaling_factor
            )));
        }
        if !(self.epsilon >= 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if !(self.min_db < self.max_db) {
            return Err(PipelineError::InvalidParameter(format!(
                "dB range [{}, {}] is empty",
                self.min_db, self.max_db
            )));
        }
        Ok(())
    }
}

/// Calibration processor: DN -> linear sigma0 -> dB -> range mask
pub struct CalibrationProcessor {
    params: CalibrationParams,
}

impl CalibrationProcessor {
    pub fn new() -> Self {
        Self { params: CalibrationParams::default() }
    }

    pub fn with_params(params: CalibrationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Scale digital numbers back to linear sigma0
    pub fn to_linear(&self, dn: &RealImage) -> RealImage {
        let factor = self.params.scaling_factor;
        dn.mapv(|v| v / factor)
    }

    /// Convert linear values to decibels, `10 * log10(x + epsilon)`
    pub fn to_db(&self, linear: &RealImage) -> RealImage {
        let eps = self.params.epsilon;
        linear.mapv(|v| 10.0 * (v + eps).log10())
    }

    /// Replace samples outside `[min_db, max_db]` with no-data, in place
    pub fn mask_implausible(&self, db: &mut RealImage) -> usize {
        let (lo, hi) = (self.params.min_db, self.params.max_db);
        let mut masked = 0usize;
        db.mapv_inplace(|v| {
            if v < lo || v > hi {
                masked += 1;
                NO_DATA
            } else {
                v
            }
        });
        masked
    }

    /// Full calibration chain; the range mask is applied on the dB values
    pub fn calibrate(&self, dn: &RealImage) -> PipelineResult<RealImage> {
        self.params.validate()?;
        log::info!("Calibrating {}x{} window to sigma0 dB", dn.nrows(), dn.ncols());

        let linear = self.to_linear(dn);
        let stats = RasterStats::compute(&linear);
        log::debug!("Linear min: {:?}, max: {:?}", stats.min, stats.max);

        let mut db = self.to_db(&linear);
        let before = RasterStats::compute(&db);
        log::debug!("Before masking dB min: {:?}, max: {:?}", before.min, before.max);

        let masked = self.mask_implausible(&mut db);
        let after = RasterStats::compute(&db);
        log::debug!("After masking dB min: {:?}, max: {:?}", after.min, after.max);
        log::info!(
            "Masked {} implausible samples, {} no-data in total",
            masked,
            after.nodata_count
        );

        Ok(db)
    }
}

impl Default for CalibrationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Positions holding no-data
pub fn nodata_mask(image: &RealImage) -> Array2<bool> {
    image.mapv(|v| v.is_nan())
}

/// Copy of `image` with no-data replaced by `fill`
pub fn fill_nodata(image: &RealImage, fill: f32) -> RealImage {
    image.mapv(|v| if v.is_nan() { fill } else { v })
}

/// Put no-data back wherever `mask` is set
pub fn restore_nodata(image: &mut RealImage, mask: &Array2<bool>) {
    Zip::from(image).and(mask).for_each(|v, &m| {
        if m {
            *v = NO_DATA;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_db_conversion() {
        let processor = CalibrationProcessor::new();
        let linear_data = Array2::from_elem((10, 10), 100.0f32);
        let db_data = processor.to_db(&linear_data);

        // 100.0 in linear scale should be 20 dB
        assert!((db_data[[0, 0]] - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_unit_dn_calibrates_to_zero_db() {
        let processor = CalibrationProcessor::new();
        let dn = Array2::from_elem((5, 5), 10000.0f32);

        let linear = processor.to_linear(&dn);
        assert!(linear.iter().all(|&v| v == 1.0));

        let db = processor.calibrate(&dn).unwrap();
        for &v in db.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_dn_is_masked() {
        let processor = CalibrationProcessor::new();
        let db = processor.calibrate(&Array2::zeros((4, 4))).unwrap();
        assert!(db.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_mask_bounds_are_inclusive() {
        let processor = CalibrationProcessor::new();
        let mut db = array![[-40.0f32, 5.0, -40.5, 5.5], [0.0, -12.0, f32::NAN, 20.0]];
        let masked = processor.mask_implausible(&mut db);

        assert_eq!(masked, 3);
        assert_eq!(db[[0, 0]], -40.0);
        assert_eq!(db[[0, 1]], 5.0);
        assert!(db[[0, 2]].is_nan());
        assert!(db[[0, 3]].is_nan());
        assert!(db[[1, 2]].is_nan());
        assert!(db[[1, 3]].is_nan());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = CalibrationParams { scaling_factor: 0.0, ..Default::default() };
        assert!(CalibrationProcessor::with_params(params)
            .calibrate(&Array2::zeros((2, 2)))
            .is_err());

        let params = CalibrationParams { min_db: 5.0, max_db: -40.0, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_nodata_fill_and_restore() {
        let image = array![[1.0f32, f32::NAN], [f32::NAN, 4.0]];
        let mask = nodata_mask(&image);
        let mut filled = fill_nodata(&image, -40.0);
        assert_eq!(filled[[0, 1]], -40.0);
        restore_nodata(&mut filled, &mask);
        assert!(filled[[0, 1]].is_nan() && filled[[1, 0]].is_nan());
        assert_eq!(filled[[1, 1]], 4.0);
    }
}
