//! sarveg: Sentinel-1 / Sentinel-2 pair selection and co-registered
//! backscatter and vegetation products.
//!
//! Picks the radar/optical acquisition pair whose footprints overlap most,
//! then runs two independent raster chains over a fixed window: calibrated
//! and Lee-filtered sigma0 with GLCM texture, and cloud-masked NDVI.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    Footprint, GeoTransform, PipelineError, PipelineResult, PixelWindow, RasterProfile,
    RasterWindow, RealImage, SelectedPair, Sensor,
};

pub use config::PipelineConfig;
pub use io::{CatalogClient, GdalRasterStore, MemoryRasterStore, RasterStore};
pub use pipeline::{PipelineReport, PipelineRunner};

/// Python module definition
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn _core(_py: pyo3::Python, m: &pyo3::types::PyModule) -> pyo3::PyResult<()> {
    python::register(m)
}
