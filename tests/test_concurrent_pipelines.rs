use ndarray::Array2;
use sarveg::io::fetcher::OpticalBandPaths;
use sarveg::io::raster::{MemoryRaster, MemoryRasterStore, RasterStore};
use sarveg::{GeoTransform, PipelineConfig, PipelineError, PipelineRunner, PixelWindow, Sensor};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SIZE: usize = 64;

fn small_config(output: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.window.col_off = 8;
    config.window.row_off = 4;
    config.window.size = 32;
    config.radar.texture.origin_row = 0;
    config.radar.texture.origin_col = 0;
    config.radar.texture.size = 16;
    config.output.directory = output.to_path_buf();
    config.output.downsample = 2;
    config.output.zoom_row = 0;
    config.output.zoom_col = 0;
    config.output.zoom_size = 16;
    config
}

fn optical_paths() -> OpticalBandPaths {
    OpticalBandPaths {
        red: PathBuf::from("s2/B04_10m.jp2"),
        nir: PathBuf::from("s2/B08_10m.jp2"),
        scl: PathBuf::from("s2/SCL_20m.jp2"),
    }
}

fn populated_store() -> MemoryRasterStore {
    let store = MemoryRasterStore::new();
    let radar = Array2::from_shape_fn((SIZE, SIZE), |(r, c)| {
        400.0 + ((r * 31 + c * 17) % 23) as f32 * 40.0
    });
    let mut radar_raster = MemoryRaster::single_band(radar);
    radar_raster.geo_transform = GeoTransform::from_gdal([500000.0, 10.0, 0.0, 1900000.0, 0.0, -10.0]);
    radar_raster.projection = "EPSG:32644".to_string();
    store.insert("s1/measurement/vh.tiff", radar_raster).unwrap();

    let paths = optical_paths();
    store
        .insert(&paths.red, MemoryRaster::single_band(Array2::from_elem((SIZE, SIZE), 800.0)))
        .unwrap();
    store
        .insert(&paths.nir, MemoryRaster::single_band(Array2::from_elem((SIZE, SIZE), 3200.0)))
        .unwrap();
    // left half vegetation, right half high-probability cloud
    let scl = Array2::from_shape_fn((SIZE / 2, SIZE / 2), |(_, c)| if c < SIZE / 4 { 4.0 } else { 9.0 });
    store.insert(&paths.scl, MemoryRaster::single_band(scl)).unwrap();
    store
}

#[test]
fn test_both_pipelines_write_products() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(tmp.path());
    let store = populated_store();

    let report = PipelineRunner::new(&store, &config)
        .run_concurrent(Path::new("s1/measurement/vh.tiff"), &optical_paths());
    assert!(report.is_success(), "{:?}", report.failures());

    let radar = report.radar.as_ref().unwrap();
    assert_eq!(radar.filtered_path, tmp.path().join("sentinel1").join("s1_lee_filtered.tif"));
    assert!(radar.texture.is_some());
    let filtered = store.get(&radar.filtered_path).unwrap().unwrap();
    assert_eq!(filtered.bands[0].dim(), (32, 32));
    // window origin is carried into the written georeference
    assert_eq!(filtered.geo_transform.top_left_x, 500000.0 + 8.0 * 10.0);
    assert_eq!(filtered.geo_transform.top_left_y, 1900000.0 - 4.0 * 10.0);
    assert_eq!(filtered.projection, "EPSG:32644");
    for png in &radar.quicklooks {
        assert!(png.exists(), "{}", png.display());
    }
    assert_eq!(radar.quicklooks.len(), 4);

    let optical = report.optical.as_ref().unwrap();
    let masked = store.get(&optical.ndvi_masked_path).unwrap().unwrap();
    let masked = &masked.bands[0];
    assert_eq!(masked.dim(), (32, 32));
    // window col_off 8 -> classification col_off 4; class boundary at 16 -> index col 24
    for c in 0..32 {
        let expect_masked = c + 8 >= SIZE / 2;
        assert_eq!(masked[[0, c]].is_nan(), expect_masked, "column {}", c);
    }
    assert!((optical.masked_fraction - 0.25).abs() < 1e-12);
    assert!(store.get(&optical.ndvi_path).unwrap().is_some());
}

#[test]
fn test_radar_failure_does_not_hide_optical_result() {
    let tmp = TempDir::new().unwrap();
    let mut config = small_config(tmp.path());
    config.output.quicklooks = false;
    let store = populated_store();

    let report = PipelineRunner::new(&store, &config)
        .run_concurrent(Path::new("s1/measurement/missing.tiff"), &optical_paths());

    assert!(!report.is_success());
    assert!(matches!(report.radar, Err(PipelineError::RasterRead(_))));
    assert!(report.optical.is_ok());

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, Sensor::Radar);
}

#[test]
fn test_window_outside_raster_fails_both() {
    let tmp = TempDir::new().unwrap();
    let mut config = small_config(tmp.path());
    config.window.col_off = SIZE;
    let store = populated_store();

    let report = PipelineRunner::new(&store, &config)
        .run_concurrent(Path::new("s1/measurement/vh.tiff"), &optical_paths());

    assert_eq!(report.failures().len(), 2);
    assert!(store
        .read_window(Path::new("s2/SCL_20m.jp2"), 1, PixelWindow::square(0, 0, SIZE))
        .is_err());
}
