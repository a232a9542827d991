//! Grey-level co-occurrence (GLCM) texture on a fixed sub-window.
//!
//! The sub-window is min/max normalised on its own finite values, no-data
//! becomes 0, and the result is quantised to `levels` grey levels. The
//! co-occurrence matrix counts horizontal neighbour pairs at `distance`
//! pixels (angle 0), is made symmetric and normalised to sum to one.

use crate::core::statistics::RasterStats;
use crate::types::{PipelineError, PipelineResult, RealImage};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

/// Texture sub-window and GLCM parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    pub origin_row: usize,
    pub origin_col: usize,
    /// Side length of the square sub-window
    pub size: usize,
    /// Number of grey levels (at most 256)
    pub levels: usize,
    /// Pixel offset of the neighbour, along the row
    pub distance: usize,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            origin_row: 1000,
            origin_col: 1000,
            size: 200,
            levels: 256,
            distance: 1,
        }
    }
}

impl TextureParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.size == 0 {
            return Err(PipelineError::InvalidParameter(
                "Texture window size must be positive".to_string(),
            ));
        }
        if !(2..=256).contains(&self.levels) {
            return Err(PipelineError::InvalidParameter(format!(
                "GLCM levels must be in 2..=256, got {}",
                self.levels
            )));
        }
        if self.distance == 0 {
            return Err(PipelineError::InvalidParameter(
                "GLCM distance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Haralick-style properties of a normalised co-occurrence matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlcmProperties {
    pub contrast: f64,
    pub dissimilarity: f64,
    pub homogeneity: f64,
    pub asm: f64,
    pub energy: f64,
    pub correlation: f64,
}

impl GlcmProperties {
    pub fn from_matrix(p: &Array2<f64>) -> Self {
        let mut contrast = 0.0;
        let mut dissimilarity = 0.0;
        let mut homogeneity = 0.0;
        let mut asm = 0.0;
        let mut mean_i = 0.0;
        let mut mean_j = 0.0;

        for ((i, j), &pij) in p.indexed_iter() {
            if pij == 0.0 {
                continue;
            }
            let d = i as f64 - j as f64;
            contrast += d * d * pij;
            dissimilarity += d.abs() * pij;
            homogeneity += pij / (1.0 + d * d);
            asm += pij * pij;
            mean_i += i as f64 * pij;
            mean_j += j as f64 * pij;
        }

        let mut var_i = 0.0;
        let mut var_j = 0.0;
        let mut cov = 0.0;
        for ((i, j), &pij) in p.indexed_iter() {
            if pij == 0.0 {
                continue;
            }
            let di = i as f64 - mean_i;
            let dj = j as f64 - mean_j;
            var_i += di * di * pij;
            var_j += dj * dj * pij;
            cov += di * dj * pij;
        }
        let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
        let correlation = if std_i < 1e-15 || std_j < 1e-15 {
            1.0
        } else {
            cov / (std_i * std_j)
        };

        Self {
            contrast,
            dissimilarity,
            homogeneity,
            asm,
            energy: asm.sqrt(),
            correlation,
        }
    }
}

/// GLCM texture extractor
pub struct GlcmTexture {
    params: TextureParams,
}

impl GlcmTexture {
    pub fn new() -> Self {
        Self { params: TextureParams::default() }
    }

    pub fn with_params(params: TextureParams) -> Self {
        Self { params }
    }

    /// Sub-window clipped to the image extent
    pub fn extract_patch(&self, image: &RealImage) -> PipelineResult<RealImage> {
        let (rows, cols) = image.dim();
        let p = &self.params;
        let row_end = p.origin_row.saturating_add(p.size).min(rows);
        let col_end = p.origin_col.saturating_add(p.size).min(cols);
        if p.origin_row >= row_end || p.origin_col >= col_end {
            return Err(PipelineError::DegenerateWindow(format!(
                "texture window at ({}, {}) lies outside {}x{} image",
                p.origin_row, p.origin_col, rows, cols
            )));
        }
        Ok(image.slice(s![p.origin_row..row_end, p.origin_col..col_end]).to_owned())
    }

    /// Min/max normalise the patch and quantise to grey levels
    pub fn quantize(&self, patch: &RealImage) -> PipelineResult<Array2<u8>> {
        let stats = RasterStats::compute(patch);
        let (min, max) = match (stats.min, stats.max) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return Err(PipelineError::DegenerateWindow(
                    "texture window contains no valid samples".to_string(),
                ))
            }
        };
        if max == min {
            return Err(PipelineError::DegenerateWindow(format!(
                "texture window has no dynamic range (all samples {})",
                min
            )));
        }

        let range = max - min;
        let top = (self.params.levels - 1) as f64;
        Ok(patch.mapv(|v| {
            if v.is_nan() {
                0
            } else {
                let norm = ((v as f64 - min) / range).clamp(0.0, 1.0);
                (norm * top).round_ties_even() as u8
            }
        }))
    }

    /// Symmetric, normalised co-occurrence matrix at (distance, 0 degrees)
    pub fn cooccurrence(&self, quantized: &Array2<u8>) -> PipelineResult<Array2<f64>> {
        let levels = self.params.levels;
        let d = self.params.distance;
        let mut matrix = Array2::<f64>::zeros((levels, levels));

        let (rows, cols) = quantized.dim();
        for r in 0..rows {
            for c in 0..cols.saturating_sub(d) {
                let i = quantized[[r, c]] as usize;
                let j = quantized[[r, c + d]] as usize;
                if i >= levels || j >= levels {
                    return Err(PipelineError::Processing(format!(
                        "grey level {} exceeds {} levels",
                        i.max(j),
                        levels
                    )));
                }
                matrix[[i, j]] += 1.0;
                matrix[[j, i]] += 1.0;
            }
        }

        let total = matrix.sum();
        if total == 0.0 {
            return Err(PipelineError::DegenerateWindow(format!(
                "no pixel pairs at distance {} in {}x{} window",
                d, rows, cols
            )));
        }
        matrix.mapv_inplace(|v| v / total);
        Ok(matrix)
    }

    /// Texture properties of the configured sub-window of `image`
    pub fn compute(&self, image: &RealImage) -> PipelineResult<GlcmProperties> {
        self.params.validate()?;
        let patch = self.extract_patch(image)?;
        let quantized = self.quantize(&patch)?;
        let matrix = self.cooccurrence(&quantized)?;
        let props = GlcmProperties::from_matrix(&matrix);
        log::info!("GLCM contrast: {:.4}", props.contrast);
        log::debug!("GLCM properties: {:?}", props);
        Ok(props)
    }
}

impl Default for GlcmTexture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn texture(levels: usize, size: usize) -> GlcmTexture {
        GlcmTexture::with_params(TextureParams {
            origin_row: 0,
            origin_col: 0,
            size,
            levels,
            distance: 1,
        })
    }

    #[test]
    fn test_reference_matrix() {
        let image = array![[0u8, 0, 1, 1], [0, 0, 1, 1], [0, 2, 2, 2], [2, 2, 3, 3]];
        let matrix = texture(4, 4).cooccurrence(&image).unwrap();

        let expected = array![
            [4.0, 2.0, 1.0, 0.0],
            [2.0, 4.0, 0.0, 0.0],
            [1.0, 0.0, 6.0, 1.0],
            [0.0, 0.0, 1.0, 2.0]
        ] / 24.0;
        for (a, b) in matrix.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }

        let props = GlcmProperties::from_matrix(&matrix);
        assert_relative_eq!(props.contrast, 14.0 / 24.0, epsilon = 1e-12);
        assert_relative_eq!(props.energy, props.asm.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_stripes_have_maximum_contrast() {
        let image = RealImage::from_shape_fn((6, 6), |(_, j)| if j % 2 == 0 { -20.0 } else { -5.0 });
        let props = texture(256, 6).compute(&image).unwrap();
        assert_relative_eq!(props.contrast, 255.0 * 255.0, epsilon = 1e-9);
        assert_relative_eq!(props.correlation, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_flat_window_is_degenerate() {
        let image = RealImage::from_elem((10, 10), -8.0);
        assert!(matches!(
            texture(256, 10).compute(&image),
            Err(PipelineError::DegenerateWindow(_))
        ));
    }

    #[test]
    fn test_all_nodata_window_is_degenerate() {
        let image = RealImage::from_elem((10, 10), f32::NAN);
        assert!(matches!(
            texture(256, 10).compute(&image),
            Err(PipelineError::DegenerateWindow(_))
        ));
    }

    #[test]
    fn test_window_outside_image() {
        let image = RealImage::from_elem((50, 50), 1.0);
        assert!(matches!(
            GlcmTexture::new().compute(&image),
            Err(PipelineError::DegenerateWindow(_))
        ));
    }

    #[test]
    fn test_huge_origin_is_degenerate() {
        let image = RealImage::from_shape_fn((8, 8), |(r, c)| (r * 8 + c) as f32);
        let texture = GlcmTexture::with_params(TextureParams {
            origin_row: usize::MAX,
            origin_col: 0,
            size: 4,
            ..Default::default()
        });
        assert!(matches!(
            texture.compute(&image),
            Err(PipelineError::DegenerateWindow(_))
        ));
    }

    #[test]
    fn test_quantize_maps_nodata_to_zero() {
        let patch = array![[0.0f32, f32::NAN], [10.0, 5.0]];
        let q = texture(256, 2).quantize(&patch).unwrap();
        assert_eq!(q, array![[0u8, 0], [255, 128]]);
    }
}
