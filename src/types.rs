use chrono::{DateTime, Utc};
use geo::MultiPolygon;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued raster sample (reflectance, sigma0, dB, index)
pub type RasterReal = f32;

/// 2D real raster array (rows x cols)
pub type RealImage = Array2<RasterReal>;

/// 2D categorical raster (scene classification codes)
pub type ClassImage = Array2<u8>;

/// No-data marker used in every floating-point output
pub const NO_DATA: RasterReal = f32::NAN;

/// Sensor family a product belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    /// C-band SAR (Sentinel-1 GRD)
    Radar,
    /// Multispectral imager (Sentinel-2 L2A)
    Optical,
}

impl std::fmt::Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Radar => write!(f, "Sentinel-1"),
            Sensor::Optical => write!(f, "Sentinel-2"),
        }
    }
}

/// Ground-coverage polygon of a catalogue product plus its metadata.
///
/// Coordinates are geographic degrees (lon, lat). Immutable once built.
#[derive(Debug, Clone)]
pub struct Footprint {
    pub product_id: String,
    pub name: String,
    pub product_type: String,
    pub acquisition_time: DateTime<Utc>,
    pub content_length: u64,
    pub geometry: MultiPolygon<f64>,
}

/// Best radar/optical combination found by the overlap selector
#[derive(Debug, Clone)]
pub struct SelectedPair {
    pub radar: Footprint,
    pub optical: Footprint,
    /// Intersection area over optical footprint area, in percent
    pub overlap_percent: f64,
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Transform of a sub-window whose top-left pixel is (`col_off`, `row_off`)
    pub fn window_transform(&self, col_off: usize, row_off: usize) -> Self {
        let (c, r) = (col_off as f64, row_off as f64);
        Self {
            top_left_x: self.top_left_x + c * self.pixel_width + r * self.rotation_x,
            top_left_y: self.top_left_y + c * self.rotation_y + r * self.pixel_height,
            ..*self
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

/// Pixel-offset window into a source raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self { col_off, row_off, width, height }
    }

    pub fn square(col_off: usize, row_off: usize, size: usize) -> Self {
        Self::new(col_off, row_off, size, size)
    }

    /// Same window on a raster `ratio` times coarser
    pub fn coarsened(&self, ratio: usize) -> Self {
        Self {
            col_off: self.col_off / ratio,
            row_off: self.row_off / ratio,
            width: self.width / ratio,
            height: self.height / ratio,
        }
    }

    /// Whether the window lies inside a `raster_width` x `raster_height` raster
    pub fn fits_within(&self, raster_width: usize, raster_height: usize) -> bool {
        self.width > 0
            && self.height > 0
            && self.col_off.checked_add(self.width).map_or(false, |end| end <= raster_width)
            && self.row_off.checked_add(self.height).map_or(false, |end| end <= raster_height)
    }
}

/// Georeferencing carried along with a window so outputs can be written back
#[derive(Debug, Clone, PartialEq)]
pub struct RasterProfile {
    /// Transform of the window itself, not of the source raster
    pub geo_transform: GeoTransform,
    /// Coordinate reference system as WKT (may be empty)
    pub projection: String,
    pub width: usize,
    pub height: usize,
}

/// Single-band window read from a source raster
#[derive(Debug, Clone)]
pub struct RasterWindow {
    pub data: RealImage,
    pub profile: RasterProfile,
}

impl RasterWindow {
    /// Wrap an array with an identity georeference (synthetic data, tests)
    pub fn from_array(data: RealImage) -> Self {
        let (height, width) = data.dim();
        Self {
            data,
            profile: RasterProfile {
                geo_transform: GeoTransform::default(),
                projection: String::new(),
                width,
                height,
            },
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Error types for pair selection and raster processing
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No overlapping radar/optical pair found")]
    NoOverlapFound,

    #[error("Raster read error: {0}")]
    RasterRead(String),

    #[error("Shape mismatch: red {red:?} vs NIR {nir:?}")]
    ShapeMismatch { red: (usize, usize), nir: (usize, usize) },

    #[error("Degenerate window: {0}")]
    DegenerateWindow(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Catalogue error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
