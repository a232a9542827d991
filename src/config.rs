//! Run configuration. Every section falls back to its defaults, so a config
//! file only needs the fields it changes.

use crate::core::optical_pipeline::OpticalParams;
use crate::core::radar_pipeline::RadarParams;
use crate::io::catalog::CatalogConfig;
use crate::types::{PipelineError, PipelineResult, PixelWindow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed square read window on the full-resolution grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub col_off: usize,
    pub row_off: usize,
    pub size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { col_off: 0, row_off: 0, size: 4000 }
    }
}

impl WindowConfig {
    pub fn pixel_window(&self) -> PixelWindow {
        PixelWindow::square(self.col_off, self.row_off, self.size)
    }
}

/// Where products and quicklooks go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub quicklooks: bool,
    /// Stride used for full-window quicklooks
    pub downsample: usize,
    pub display_min_db: f32,
    pub display_max_db: f32,
    /// Before/after zoom patch
    pub zoom_row: usize,
    pub zoom_col: usize,
    pub zoom_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            quicklooks: true,
            downsample: 5,
            display_min_db: -25.0,
            display_max_db: 5.0,
            zoom_row: 1000,
            zoom_col: 1000,
            zoom_size: 500,
        }
    }
}

impl OutputConfig {
    pub fn radar_dir(&self) -> PathBuf {
        self.directory.join("sentinel1")
    }

    pub fn optical_dir(&self) -> PathBuf {
        self.directory.join("sentinel2")
    }
}

/// Complete configuration of a selection + processing run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub window: WindowConfig,
    pub radar: RadarParams,
    pub optical: OpticalParams,
    pub output: OutputConfig,
    pub catalog: CatalogConfig,
}

impl PipelineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        log::info!("Loading configuration from: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.window.size == 0 {
            return Err(PipelineError::InvalidParameter(
                "window size must be positive".to_string(),
            ));
        }
        if self.window.size < self.optical.class_resolution_ratio {
            return Err(PipelineError::InvalidParameter(format!(
                "window size {} is smaller than the classification ratio {}",
                self.window.size, self.optical.class_resolution_ratio
            )));
        }
        if self.output.downsample == 0 {
            return Err(PipelineError::InvalidParameter(
                "quicklook downsample must be positive".to_string(),
            ));
        }
        self.radar.validate()?;
        self.optical.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.radar.calibration.scaling_factor, 10000.0);
        assert_eq!(config.radar.calibration.min_db, -40.0);
        assert_eq!(config.radar.calibration.max_db, 5.0);
        assert_eq!(config.radar.speckle.window_size, 5);
        assert_eq!(config.radar.speckle.nodata_fill, -40.0);
        assert_eq!(config.radar.texture.size, 200);
        assert_eq!(config.optical.scaling_factor, 10000.0);
        assert_eq!(config.optical.cloud_mask.excluded_classes, vec![3, 8, 9, 10, 11]);
        assert_eq!(config.window.size, 4000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"window": {"size": 512}, "radar": {"speckle": {"window_size": 7}}}"#,
        )
        .unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.window.size, 512);
        assert_eq!(config.radar.speckle.window_size, 7);
        assert_eq!(config.radar.speckle.nodata_fill, -40.0);
        assert_eq!(config.optical.class_resolution_ratio, 2);
    }

    #[test]
    fn test_round_trip_through_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        let mut config = PipelineConfig::default();
        config.optical.cloud_mask.excluded_classes = vec![8, 9];
        config.to_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"radar": {"speckle": {"window_size": 6}}}"#).unwrap();
        assert!(matches!(
            PipelineConfig::from_file(&path),
            Err(PipelineError::InvalidParameter(_))
        ));
    }
}
