use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use sarveg::core::cloud_mask::SceneClass;
use sarveg::core::optical_pipeline::{OpticalParams, OpticalPipeline};
use sarveg::{PipelineError, RasterWindow};

fn window(data: Array2<f32>) -> RasterWindow {
    RasterWindow::from_array(data)
}

#[test]
fn test_ndvi_and_cloud_mask_on_4x4_scene() {
    // red 0.1, nir 0.5 -> NDVI 2/3 everywhere
    let red = Array2::from_elem((4, 4), 1000.0f32);
    let nir = Array2::from_elem((4, 4), 5000.0f32);
    // 2x2 classification grid: vegetation, cloud shadow / high cloud, water
    let scl = array![
        [SceneClass::Vegetation.code() as f32, SceneClass::CloudShadow.code() as f32],
        [SceneClass::CloudHighProbability.code() as f32, SceneClass::Water.code() as f32],
    ];

    let products = OpticalPipeline::new(OpticalParams::default())
        .process(window(red), window(nir), window(scl))
        .unwrap();

    for &v in products.ndvi.iter() {
        assert_abs_diff_eq!(v, 2.0 / 3.0, epsilon = 1e-5);
    }

    // every classification pixel covers a 2x2 block of the index grid
    assert_eq!(products.masked_count, 8);
    assert_abs_diff_eq!(products.masked_fraction(), 0.5);
    for r in 0..4 {
        for c in 0..4 {
            let masked = products.ndvi_masked[[r, c]].is_nan();
            let expected = (r < 2 && c >= 2) || (r >= 2 && c < 2);
            assert_eq!(masked, expected, "pixel ({}, {})", r, c);
        }
    }
}

#[test]
fn test_custom_exclusion_list() {
    let red = Array2::from_elem((2, 2), 2000.0f32);
    let nir = Array2::from_elem((2, 2), 2000.0f32);
    let scl = array![[SceneClass::Water.code() as f32]];

    let mut params = OpticalParams::default();
    params.cloud_mask.excluded_classes = vec![SceneClass::Water.code()];

    let products = OpticalPipeline::new(params)
        .process(window(red), window(nir), window(scl))
        .unwrap();

    assert_abs_diff_eq!(products.ndvi[[0, 0]], 0.0, epsilon = 1e-6);
    assert!(products.ndvi_masked.iter().all(|v| v.is_nan()));
}

#[test]
fn test_zero_reflectance_is_finite() {
    let zeros = Array2::zeros((2, 2));
    let scl = array![[SceneClass::Vegetation.code() as f32]];

    let products = OpticalPipeline::new(OpticalParams::default())
        .process(window(zeros.clone()), window(zeros), window(scl))
        .unwrap();

    assert!(products.ndvi.iter().all(|v| *v == 0.0));
    assert_eq!(products.masked_count, 0);
}

#[test]
fn test_band_shape_mismatch() {
    let result = OpticalPipeline::new(OpticalParams::default()).process(
        window(Array2::zeros((4, 4))),
        window(Array2::zeros((4, 2))),
        window(Array2::zeros((2, 2))),
    );
    assert!(matches!(
        result,
        Err(PipelineError::ShapeMismatch { red: (4, 4), nir: (4, 2) })
    ));
}
