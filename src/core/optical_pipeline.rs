use crate::core::cloud_mask::{apply_cloud_mask, to_class_codes, CloudMaskParams};
use crate::core::resample::resample_nearest;
use crate::core::statistics::RasterStats;
use crate::core::vegetation_index::{ndvi, to_reflectance};
use crate::types::{PipelineError, PipelineResult, RasterProfile, RasterWindow, RealImage};
use serde::{Deserialize, Serialize};

/// Parameters for the optical index chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalParams {
    /// DN to reflectance divisor, shared with the radar DN convention
    pub scaling_factor: f32,
    pub epsilon: f32,
    /// How many index pixels one classification pixel spans per axis
    pub class_resolution_ratio: usize,
    pub cloud_mask: CloudMaskParams,
}

impl Default for OpticalParams {
    fn default() -> Self {
        Self {
            scaling_factor: 10000.0,
            epsilon: 1e-10,
            class_resolution_ratio: 2,
            cloud_mask: CloudMaskParams::default(),
        }
    }
}

impl OpticalParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.scaling_factor > 0.0) {
            return Err(PipelineError::InvalidParameter(format!(
                "scaling factor must be positive, got {}",
                self.scaling_factor
            )));
        }
        if self.class_resolution_ratio == 0 {
            return Err(PipelineError::InvalidParameter(
                "classification resolution ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unmasked and cloud-masked NDVI for one window
#[derive(Debug)]
pub struct OpticalProducts {
    pub ndvi: RealImage,
    pub ndvi_masked: RealImage,
    pub profile: RasterProfile,
    pub masked_count: usize,
    pub stats: RasterStats,
}

impl OpticalProducts {
    pub fn masked_fraction(&self) -> f64 {
        if self.ndvi.is_empty() {
            0.0
        } else {
            self.masked_count as f64 / self.ndvi.len() as f64
        }
    }
}

/// Red/NIR/SCL windows -> NDVI and cloud-masked NDVI
pub struct OpticalPipeline {
    params: OpticalParams,
}

impl OpticalPipeline {
    pub fn new(params: OpticalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &OpticalParams {
        &self.params
    }

    /// The output profile is taken from the red window.
    pub fn process(
        &self,
        red: RasterWindow,
        nir: RasterWindow,
        classification: RasterWindow,
    ) -> PipelineResult<OpticalProducts> {
        self.params.validate()?;
        if red.shape() != nir.shape() {
            return Err(PipelineError::ShapeMismatch {
                red: red.shape(),
                nir: nir.shape(),
            });
        }
        log::info!("Optical pipeline: {}x{} window", red.data.nrows(), red.data.ncols());

        let red_refl = to_reflectance(&red.data, self.params.scaling_factor);
        let nir_refl = to_reflectance(&nir.data, self.params.scaling_factor);
        let index = ndvi(&red_refl, &nir_refl, self.params.epsilon)?;
        let stats = RasterStats::compute(&index);
        log::info!("NDVI min: {:?}, max: {:?}", stats.min, stats.max);

        let classes = to_class_codes(&classification.data);
        let classes = resample_nearest(&classes, index.dim())?;
        let (ndvi_masked, masked_count) =
            apply_cloud_mask(&index, &classes, &self.params.cloud_mask)?;
        log::info!(
            "Cloud mask removed {} of {} pixels",
            masked_count,
            index.len()
        );

        Ok(OpticalProducts {
            ndvi: index,
            ndvi_masked,
            profile: red.profile,
            masked_count,
            stats,
        })
    }
}

impl Default for OpticalPipeline {
    fn default() -> Self {
        Self::new(OpticalParams::default())
    }
}
