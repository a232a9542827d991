use crate::types::{
    GeoTransform, PipelineError, PipelineResult, PixelWindow, RasterProfile, RasterWindow,
    RealImage,
};
use gdal::raster::Buffer;
use gdal::{Dataset, DriverManager};
use ndarray::{s, Array2};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Windowed access to georeferenced single-band rasters.
///
/// Bands are 1-based. Reads never load more than the requested window and fail
/// with `RasterRead` when the window leaves the raster. Writes produce a
/// single Float32 band with NaN as no-data.
pub trait RasterStore: Sync {
    fn read_window(
        &self,
        path: &Path,
        band: usize,
        window: PixelWindow,
    ) -> PipelineResult<RasterWindow>;

    fn write_band(
        &self,
        path: &Path,
        data: &RealImage,
        profile: &RasterProfile,
    ) -> PipelineResult<()>;
}

/// GDAL-backed store (GeoTIFF, JPEG2000, SAFE measurement files)
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalRasterStore;

impl GdalRasterStore {
    pub fn new() -> Self {
        Self
    }
}

impl RasterStore for GdalRasterStore {
    fn read_window(
        &self,
        path: &Path,
        band: usize,
        window: PixelWindow,
    ) -> PipelineResult<RasterWindow> {
        log::info!("Reading band {} window {:?} from: {}", band, window, path.display());

        let dataset = Dataset::open(path).map_err(|e| {
            PipelineError::RasterRead(format!("cannot open {}: {}", path.display(), e))
        })?;

        let (width, height) = dataset.raster_size();
        let band_count = dataset.raster_count();
        log::debug!("Raster size: {}x{}, {} band(s)", width, height, band_count);

        if band == 0 || band as isize > band_count {
            return Err(PipelineError::RasterRead(format!(
                "band {} not present in {} ({} bands)",
                band,
                path.display(),
                band_count
            )));
        }
        if !window.fits_within(width, height) {
            return Err(PipelineError::RasterRead(format!(
                "window {:?} exceeds {}x{} raster {}",
                window,
                width,
                height,
                path.display()
            )));
        }

        let geo_transform = match dataset.geo_transform() {
            Ok(gt) => GeoTransform::from_gdal(gt),
            Err(e) => {
                log::warn!("No geotransform on {}: {}", path.display(), e);
                GeoTransform::default()
            }
        };

        let rasterband = dataset.rasterband(band as isize)?;
        let buffer = rasterband
            .read_as::<f32>(
                (window.col_off as isize, window.row_off as isize),
                (window.width, window.height),
                (window.width, window.height),
                None,
            )
            .map_err(|e| PipelineError::RasterRead(format!("{}: {}", path.display(), e)))?;

        let data = Array2::from_shape_vec((window.height, window.width), buffer.data)
            .map_err(|e| PipelineError::RasterRead(format!("Failed to reshape band data: {}", e)))?;

        Ok(RasterWindow {
            data,
            profile: RasterProfile {
                geo_transform: geo_transform.window_transform(window.col_off, window.row_off),
                projection: dataset.projection(),
                width: window.width,
                height: window.height,
            },
        })
    }

    fn write_band(
        &self,
        path: &Path,
        data: &RealImage,
        profile: &RasterProfile,
    ) -> PipelineResult<()> {
        log::info!("Saving raster as GeoTIFF: {}", path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let (height, width) = data.dim();

        let mut dataset =
            driver.create_with_band_type::<f32, _>(path, width as isize, height as isize, 1)?;
        dataset.set_geo_transform(&profile.geo_transform.to_gdal())?;
        if !profile.projection.is_empty() {
            dataset.set_projection(&profile.projection)?;
        }

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<f32> = data.iter().cloned().collect();
        let buffer = Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;
        rasterband.set_no_data_value(Some(f64::NAN))?;

        log::info!("Saved: {}", path.display());
        Ok(())
    }
}

/// Raster held in a `MemoryRasterStore`
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    pub bands: Vec<RealImage>,
    pub geo_transform: GeoTransform,
    pub projection: String,
}

impl MemoryRaster {
    pub fn single_band(data: RealImage) -> Self {
        Self {
            bands: vec![data],
            geo_transform: GeoTransform::default(),
            projection: String::new(),
        }
    }
}

/// In-process store keyed by path; shared safely between pipeline threads
#[derive(Debug, Default)]
pub struct MemoryRasterStore {
    rasters: Mutex<HashMap<PathBuf, MemoryRaster>>,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<PathBuf>>(&self, path: P, raster: MemoryRaster) -> PipelineResult<()> {
        self.lock()?.insert(path.into(), raster);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> PipelineResult<Option<MemoryRaster>> {
        Ok(self.lock()?.get(path).cloned())
    }

    pub fn paths(&self) -> PipelineResult<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = self.lock()?.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    fn lock(&self) -> PipelineResult<std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryRaster>>> {
        self.rasters
            .lock()
            .map_err(|_| PipelineError::Processing("raster store lock poisoned".to_string()))
    }
}

impl RasterStore for MemoryRasterStore {
    fn read_window(
        &self,
        path: &Path,
        band: usize,
        window: PixelWindow,
    ) -> PipelineResult<RasterWindow> {
        let rasters = self.lock()?;
        let raster = rasters.get(path).ok_or_else(|| {
            PipelineError::RasterRead(format!("no raster at {}", path.display()))
        })?;
        let data = band
            .checked_sub(1)
            .and_then(|i| raster.bands.get(i))
            .ok_or_else(|| {
                PipelineError::RasterRead(format!("band {} not present in {}", band, path.display()))
            })?;

        let (height, width) = data.dim();
        if !window.fits_within(width, height) {
            return Err(PipelineError::RasterRead(format!(
                "window {:?} exceeds {}x{} raster {}",
                window,
                width,
                height,
                path.display()
            )));
        }

        let view = data.slice(s![
            window.row_off..window.row_off + window.height,
            window.col_off..window.col_off + window.width
        ]);
        Ok(RasterWindow {
            data: view.to_owned(),
            profile: RasterProfile {
                geo_transform: raster.geo_transform.window_transform(window.col_off, window.row_off),
                projection: raster.projection.clone(),
                width: window.width,
                height: window.height,
            },
        })
    }

    fn write_band(
        &self,
        path: &Path,
        data: &RealImage,
        profile: &RasterProfile,
    ) -> PipelineResult<()> {
        log::debug!("Storing {}x{} raster at {}", data.nrows(), data.ncols(), path.display());
        self.insert(
            path,
            MemoryRaster {
                bands: vec![data.clone()],
                geo_transform: profile.geo_transform,
                projection: profile.projection.clone(),
            },
        )
    }
}
