use ndarray::Array2;
use sarveg::io::raster::{GdalRasterStore, RasterStore};
use sarveg::{GeoTransform, PipelineError, PixelWindow, RasterProfile};
use tempfile::TempDir;

#[test]
fn test_geotiff_window_round_trip() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("ramp.tif");
    let store = GdalRasterStore::new();

    let mut data = Array2::from_shape_fn((20, 30), |(r, c)| (r * 100 + c) as f32);
    data[[5, 7]] = f32::NAN;
    let profile = RasterProfile {
        geo_transform: GeoTransform::from_gdal([78.3, 0.0001, 0.0, 17.6, 0.0, -0.0001]),
        projection: String::new(),
        width: 30,
        height: 20,
    };
    store.write_band(&path, &data, &profile).unwrap();

    let window = store.read_window(&path, 1, PixelWindow::new(6, 4, 10, 8)).unwrap();
    assert_eq!(window.shape(), (8, 10));
    assert_eq!(window.data[[0, 0]], 406.0);
    assert!(window.data[[1, 1]].is_nan());
    assert!((window.profile.geo_transform.top_left_x - (78.3 + 6.0 * 0.0001)).abs() < 1e-12);
    assert!((window.profile.geo_transform.top_left_y - (17.6 - 4.0 * 0.0001)).abs() < 1e-12);
}

#[test]
fn test_geotiff_window_out_of_bounds() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("small.tif");
    let store = GdalRasterStore::new();
    let data = Array2::zeros((4, 4));
    let profile = RasterProfile {
        geo_transform: GeoTransform::default(),
        projection: String::new(),
        width: 4,
        height: 4,
    };
    store.write_band(&path, &data, &profile).unwrap();

    assert!(matches!(
        store.read_window(&path, 1, PixelWindow::square(2, 2, 4)),
        Err(PipelineError::RasterRead(_))
    ));
    assert!(matches!(
        store.read_window(&path, 2, PixelWindow::square(0, 0, 2)),
        Err(PipelineError::RasterRead(_))
    ));
    assert!(store.read_window(&tmp.path().join("missing.tif"), 1, PixelWindow::square(0, 0, 1)).is_err());
}
