//! Raster storage, catalogue access and product fetching

pub mod raster;
pub mod catalog;
pub mod fetcher;
pub mod quicklook;

pub use raster::{GdalRasterStore, MemoryRaster, MemoryRasterStore, RasterStore};
pub use catalog::{parse_products, CatalogClient, CatalogConfig, CatalogQuery};
pub use fetcher::{
    extract_archive, find_safe_dir, locate_optical_bands, locate_radar_band, OpticalBandPaths,
    ProductFetcher,
};
