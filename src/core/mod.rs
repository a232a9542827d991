//! Core selection and raster processing modules

pub mod overlap;
pub mod statistics;
pub mod calibrate;
pub mod speckle_filter;
pub mod texture;
pub mod radar_pipeline;
pub mod vegetation_index;
pub mod resample;
pub mod cloud_mask;
pub mod optical_pipeline;

// Re-export main types
pub use overlap::{overlap_percent, OverlapScore, OverlapSelector};
pub use statistics::RasterStats;
pub use calibrate::{CalibrationParams, CalibrationProcessor};
pub use speckle_filter::{uniform_filter, SpeckleFilter, SpeckleFilterParams};
pub use texture::{GlcmProperties, GlcmTexture, TextureParams};
pub use radar_pipeline::{RadarParams, RadarPipeline, RadarProducts};
pub use vegetation_index::{ndvi, normalized_difference};
pub use resample::resample_nearest;
pub use cloud_mask::{CloudMaskParams, SceneClass};
pub use optical_pipeline::{OpticalParams, OpticalPipeline, OpticalProducts};
