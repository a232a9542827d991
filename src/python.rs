//! Python bindings for the array-level operations

use crate::core::calibrate::{CalibrationParams, CalibrationProcessor};
use crate::core::cloud_mask::{apply_cloud_mask, CloudMaskParams};
use crate::core::overlap;
use crate::core::resample::resample_nearest;
use crate::core::speckle_filter::{SpeckleFilter, SpeckleFilterParams};
use crate::core::texture::{GlcmTexture, TextureParams};
use crate::core::vegetation_index;
use crate::types::PipelineError;
use geo::{LineString, MultiPolygon, Polygon};
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(e: PipelineError) -> PyErr {
    match e {
        PipelineError::InvalidParameter(_) | PipelineError::ShapeMismatch { .. } => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn ring_to_multipolygon(ring: Vec<(f64, f64)>) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring), vec![])])
}

/// Overlap of two single-ring footprints as a percentage of the optical area
#[pyfunction]
fn overlap_percent(radar: Vec<(f64, f64)>, optical: Vec<(f64, f64)>) -> f64 {
    overlap::overlap_percent(&ring_to_multipolygon(radar), &ring_to_multipolygon(optical))
}

/// DN to masked sigma0 in dB
#[pyfunction]
#[pyo3(signature = (dn, scaling_factor=10000.0, min_db=-40.0, max_db=5.0))]
fn calibrate<'py>(
    py: Python<'py>,
    dn: PyReadonlyArray2<f32>,
    scaling_factor: f32,
    min_db: f32,
    max_db: f32,
) -> PyResult<&'py PyArray2<f32>> {
    let params = CalibrationParams {
        scaling_factor,
        min_db,
        max_db,
        ..CalibrationParams::default()
    };
    let processor = CalibrationProcessor::with_params(params);
    let db = processor
        .calibrate(&dn.as_array().to_owned())
        .map_err(to_py_err)?;
    Ok(db.into_pyarray(py))
}

#[pyfunction]
#[pyo3(signature = (image, window_size=5, nodata_fill=-40.0))]
fn lee_filter<'py>(
    py: Python<'py>,
    image: PyReadonlyArray2<f32>,
    window_size: usize,
    nodata_fill: f32,
) -> PyResult<&'py PyArray2<f32>> {
    let filter = SpeckleFilter::with_params(SpeckleFilterParams { window_size, nodata_fill });
    let filtered = filter
        .apply_lee(&image.as_array().to_owned())
        .map_err(to_py_err)?;
    Ok(filtered.into_pyarray(py))
}

/// GLCM contrast of the square sub-window at (row, col)
#[pyfunction]
#[pyo3(signature = (image, row=1000, col=1000, size=200))]
fn glcm_contrast(image: PyReadonlyArray2<f32>, row: usize, col: usize, size: usize) -> PyResult<f64> {
    let texture = GlcmTexture::with_params(TextureParams {
        origin_row: row,
        origin_col: col,
        size,
        ..TextureParams::default()
    });
    let props = texture
        .compute(&image.as_array().to_owned())
        .map_err(to_py_err)?;
    Ok(props.contrast)
}

#[pyfunction]
#[pyo3(signature = (red, nir, epsilon=1e-10))]
fn ndvi<'py>(
    py: Python<'py>,
    red: PyReadonlyArray2<f32>,
    nir: PyReadonlyArray2<f32>,
    epsilon: f32,
) -> PyResult<&'py PyArray2<f32>> {
    let index = vegetation_index::ndvi(
        &red.as_array().to_owned(),
        &nir.as_array().to_owned(),
        epsilon,
    )
    .map_err(to_py_err)?;
    Ok(index.into_pyarray(py))
}

/// Upsample `scl` to the index grid and blank excluded classes
#[pyfunction]
#[pyo3(signature = (index, scl, excluded_classes=None))]
fn cloud_mask<'py>(
    py: Python<'py>,
    index: PyReadonlyArray2<f32>,
    scl: PyReadonlyArray2<u8>,
    excluded_classes: Option<Vec<u8>>,
) -> PyResult<&'py PyArray2<f32>> {
    let index = index.as_array().to_owned();
    let classes =
        resample_nearest(&scl.as_array().to_owned(), index.dim()).map_err(to_py_err)?;
    let params = match excluded_classes {
        Some(excluded_classes) => CloudMaskParams { excluded_classes },
        None => CloudMaskParams::default(),
    };
    let (masked, _) = apply_cloud_mask(&index, &classes, &params).map_err(to_py_err)?;
    Ok(masked.into_pyarray(py))
}

pub fn register(m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(overlap_percent, m)?)?;
    m.add_function(wrap_pyfunction!(calibrate, m)?)?;
    m.add_function(wrap_pyfunction!(lee_filter, m)?)?;
    m.add_function(wrap_pyfunction!(glcm_contrast, m)?)?;
    m.add_function(wrap_pyfunction!(ndvi, m)?)?;
    m.add_function(wrap_pyfunction!(cloud_mask, m)?)?;
    Ok(())
}
