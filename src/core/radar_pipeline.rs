use crate::core::calibrate::{CalibrationParams, CalibrationProcessor};
use crate::core::speckle_filter::{SpeckleFilter, SpeckleFilterParams};
use crate::core::statistics::RasterStats;
use crate::core::texture::{GlcmProperties, GlcmTexture, TextureParams};
use crate::types::{PipelineResult, RasterProfile, RasterWindow, RealImage};
use serde::{Deserialize, Serialize};

/// Parameters for the whole radar chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParams {
    pub calibration: CalibrationParams,
    pub speckle: SpeckleFilterParams,
    pub texture: TextureParams,
}

impl RadarParams {
    pub fn validate(&self) -> PipelineResult<()> {
        self.calibration.validate()?;
        self.speckle.validate()?;
        self.texture.validate()
    }
}

/// Everything the radar chain produces for one window
#[derive(Debug)]
pub struct RadarProducts {
    /// Range-masked sigma0 in dB, before filtering
    pub sigma0_db: RealImage,
    /// Lee-filtered sigma0 in dB, no-data where `sigma0_db` is no-data
    pub filtered: RealImage,
    /// Texture of the filtered raster; a degenerate sub-window only fails this field
    pub texture: PipelineResult<GlcmProperties>,
    pub profile: RasterProfile,
    pub stats: RasterStats,
}

impl RadarProducts {
    pub fn texture_contrast(&self) -> Option<f64> {
        self.texture.as_ref().ok().map(|t| t.contrast)
    }
}

/// DN window -> calibrated, masked, despeckled dB backscatter + texture
pub struct RadarPipeline {
    params: RadarParams,
}

impl RadarPipeline {
    pub fn new(params: RadarParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RadarParams {
        &self.params
    }

    pub fn process(&self, window: RasterWindow) -> PipelineResult<RadarProducts> {
        self.params.validate()?;
        let RasterWindow { data, profile } = window;
        log::info!("Radar pipeline: {}x{} window", data.nrows(), data.ncols());

        let sigma0_db = CalibrationProcessor::with_params(self.params.calibration.clone())
            .calibrate(&data)?;
        drop(data);

        let filtered = SpeckleFilter::with_params(self.params.speckle.clone())
            .apply_lee(&sigma0_db)?;

        let texture = GlcmTexture::with_params(self.params.texture.clone()).compute(&filtered);
        if let Err(e) = &texture {
            log::warn!("Texture step failed, filtered raster is still valid: {}", e);
        }

        let stats = RasterStats::compute(&filtered);
        log::info!(
            "Filtered backscatter: min {:?} dB, max {:?} dB, {} no-data",
            stats.min,
            stats.max,
            stats.nodata_count
        );

        Ok(RadarProducts {
            sigma0_db,
            filtered,
            texture,
            profile,
            stats,
        })
    }
}

impl Default for RadarPipeline {
    fn default() -> Self {
        Self::new(RadarParams::default())
    }
}
