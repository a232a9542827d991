//! Runs the radar and optical chains for a selected pair and writes their
//! products. The two chains share nothing but the read-only store and
//! config, and are joined before the run is reported.

use crate::config::PipelineConfig;
use crate::core::optical_pipeline::OpticalPipeline;
use crate::core::radar_pipeline::{RadarPipeline, RadarProducts};
use crate::core::statistics::RasterStats;
use crate::core::texture::{GlcmProperties, GlcmTexture};
use crate::io::fetcher::OpticalBandPaths;
use crate::io::quicklook;
use crate::io::raster::RasterStore;
use crate::types::{PipelineError, PipelineResult, RealImage, Sensor};
use ndarray::s;
use std::path::{Path, PathBuf};

/// Outcome of a successful radar run
#[derive(Debug, Clone)]
pub struct RadarSummary {
    pub filtered_path: PathBuf,
    pub texture: Option<GlcmProperties>,
    pub stats: RasterStats,
    pub quicklooks: Vec<PathBuf>,
}

/// Outcome of a successful optical run
#[derive(Debug, Clone)]
pub struct OpticalSummary {
    pub ndvi_path: PathBuf,
    pub ndvi_masked_path: PathBuf,
    pub masked_fraction: f64,
    pub stats: RasterStats,
    pub quicklooks: Vec<PathBuf>,
}

/// Both outcomes, kept apart so one failure never hides the other
#[derive(Debug)]
pub struct PipelineReport {
    pub radar: PipelineResult<RadarSummary>,
    pub optical: PipelineResult<OpticalSummary>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.radar.is_ok() && self.optical.is_ok()
    }

    pub fn failures(&self) -> Vec<(Sensor, &PipelineError)> {
        let mut failures = Vec::new();
        if let Err(e) = &self.radar {
            failures.push((Sensor::Radar, e));
        }
        if let Err(e) = &self.optical {
            failures.push((Sensor::Optical, e));
        }
        failures
    }
}

/// Drives both chains against a raster store
pub struct PipelineRunner<'a, S: RasterStore> {
    store: &'a S,
    config: &'a PipelineConfig,
}

impl<'a, S: RasterStore> PipelineRunner<'a, S> {
    pub fn new(store: &'a S, config: &'a PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Read, process and write the radar window
    pub fn run_radar(&self, band_path: &Path) -> PipelineResult<RadarSummary> {
        self.config.validate()?;
        log::info!("Running radar pipeline on {}", band_path.display());

        let window = self
            .store
            .read_window(band_path, 1, self.config.window.pixel_window())?;
        let products = RadarPipeline::new(self.config.radar.clone()).process(window)?;

        let out_dir = self.config.output.radar_dir();
        let filtered_path = out_dir.join("s1_lee_filtered.tif");
        self.store
            .write_band(&filtered_path, &products.filtered, &products.profile)?;

        let quicklooks = if self.config.output.quicklooks {
            self.radar_quicklooks(&products, &out_dir)?
        } else {
            Vec::new()
        };

        Ok(RadarSummary {
            filtered_path,
            texture: products.texture.as_ref().ok().copied(),
            stats: products.stats,
            quicklooks,
        })
    }

    /// Read, process and write the optical windows
    pub fn run_optical(&self, bands: &OpticalBandPaths) -> PipelineResult<OpticalSummary> {
        self.config.validate()?;
        log::info!("Running optical pipeline on {}", bands.red.display());

        let window = self.config.window.pixel_window();
        let class_window = window.coarsened(self.config.optical.class_resolution_ratio);
        let red = self.store.read_window(&bands.red, 1, window)?;
        let nir = self.store.read_window(&bands.nir, 1, window)?;
        let scl = self.store.read_window(&bands.scl, 1, class_window)?;

        let products = OpticalPipeline::new(self.config.optical.clone()).process(red, nir, scl)?;

        let out_dir = self.config.output.optical_dir();
        let ndvi_path = out_dir.join("s2_ndvi.tif");
        let ndvi_masked_path = out_dir.join("s2_ndvi_cloud_masked.tif");
        self.store.write_band(&ndvi_path, &products.ndvi, &products.profile)?;
        self.store
            .write_band(&ndvi_masked_path, &products.ndvi_masked, &products.profile)?;

        let mut quicklooks = Vec::new();
        if self.config.output.quicklooks {
            let stride = self.config.output.downsample;
            let raw = out_dir.join("s2_ndvi_raw.png");
            quicklook::save_rgb(&quicklook::render_index(&products.ndvi, stride), &raw)?;
            let masked = out_dir.join("s2_ndvi_cloud_masked.png");
            quicklook::save_rgb(&quicklook::render_index(&products.ndvi_masked, stride), &masked)?;
            quicklooks.extend([raw, masked]);
        }

        Ok(OpticalSummary {
            ndvi_path,
            ndvi_masked_path,
            masked_fraction: products.masked_fraction(),
            stats: products.stats,
            quicklooks,
        })
    }

    /// Run both chains concurrently and join them
    pub fn run_concurrent(&self, radar_band: &Path, optical_bands: &OpticalBandPaths) -> PipelineReport {
        #[cfg(feature = "parallel")]
        let (radar, optical) = rayon::join(
            || self.run_radar(radar_band),
            || self.run_optical(optical_bands),
        );

        #[cfg(not(feature = "parallel"))]
        let (radar, optical) = (self.run_radar(radar_band), self.run_optical(optical_bands));

        let report = PipelineReport { radar, optical };
        for (sensor, error) in report.failures() {
            log::error!("{} pipeline failed: {}", sensor, error);
        }
        report
    }

    fn radar_quicklooks(&self, products: &RadarProducts, out_dir: &Path) -> PipelineResult<Vec<PathBuf>> {
        let output = &self.config.output;
        let (vmin, vmax) = (output.display_min_db, output.display_max_db);
        let mut written = Vec::new();

        let db_path = out_dir.join("s1_sigma0_db_downsampled.png");
        quicklook::save_gray(
            &quicklook::render_gray(&products.sigma0_db, vmin, vmax, output.downsample),
            &db_path,
        )?;
        written.push(db_path);

        let filtered_path = out_dir.join("s1_lee_filtered.png");
        quicklook::save_gray(
            &quicklook::render_gray(&products.filtered, vmin, vmax, output.downsample),
            &filtered_path,
        )?;
        written.push(filtered_path);

        if let (Some(before), Some(after)) = (
            self.zoom(&products.sigma0_db),
            self.zoom(&products.filtered),
        ) {
            let path = out_dir.join("s1_before_after_filtering.png");
            let panel = quicklook::side_by_side(
                &quicklook::render_gray(&before, vmin, vmax, 1),
                &quicklook::render_gray(&after, vmin, vmax, 1),
                10,
            );
            quicklook::save_gray(&panel, &path)?;
            written.push(path);
        }

        if products.texture.is_ok() {
            let texture = GlcmTexture::with_params(self.config.radar.texture.clone());
            let levels = texture.quantize(&texture.extract_patch(&products.filtered)?)?;
            let path = out_dir.join("s1_texture_patch.png");
            quicklook::save_gray(&quicklook::render_levels(&levels), &path)?;
            written.push(path);
        }

        Ok(written)
    }

    fn zoom(&self, image: &RealImage) -> Option<RealImage> {
        let output = &self.config.output;
        let (rows, cols) = image.dim();
        let row_end = output.zoom_row.saturating_add(output.zoom_size).min(rows);
        let col_end = output.zoom_col.saturating_add(output.zoom_size).min(cols);
        if output.zoom_row >= row_end || output.zoom_col >= col_end {
            return None;
        }
        Some(image.slice(s![output.zoom_row..row_end, output.zoom_col..col_end]).to_owned())
    }
}
