use crate::types::{PipelineError, PipelineResult, RealImage};
use ndarray::Zip;

/// Digital numbers to surface reflectance
pub fn to_reflectance(dn: &RealImage, scaling_factor: f32) -> RealImage {
    dn.mapv(|v| v / scaling_factor)
}

/// Normalized difference `(a - b) / (a + b + epsilon)`.
///
/// Bounded to [-1, 1] for non-negative inputs; nothing is clamped, so
/// negative reflectances can push values outside that range.
pub fn normalized_difference(
    a: &RealImage,
    b: &RealImage,
    epsilon: f32,
) -> PipelineResult<RealImage> {
    if a.dim() != b.dim() {
        return Err(PipelineError::ShapeMismatch { red: b.dim(), nir: a.dim() });
    }
    Ok(Zip::from(a)
        .and(b)
        .map_collect(|&x, &y| (x - y) / (x + y + epsilon)))
}

/// NDVI from red and near-infrared reflectance
pub fn ndvi(red: &RealImage, nir: &RealImage, epsilon: f32) -> PipelineResult<RealImage> {
    normalized_difference(nir, red, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_ndvi_reference_values() {
        let eps = 1e-10;
        let equal = ndvi(&Array2::from_elem((3, 3), 0.2), &Array2::from_elem((3, 3), 0.2), eps).unwrap();
        assert!(equal.iter().all(|v| v.abs() < 1e-6));

        let no_red = ndvi(&Array2::zeros((3, 3)), &Array2::from_elem((3, 3), 0.4), eps).unwrap();
        assert!(no_red.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let no_nir = ndvi(&Array2::from_elem((3, 3), 0.4), &Array2::zeros((3, 3)), eps).unwrap();
        assert!(no_nir.iter().all(|&v| (v + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_both_zero_is_zero() {
        let zero = Array2::<f32>::zeros((2, 2));
        let index = ndvi(&zero, &zero, 1e-10).unwrap();
        assert!(index.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reflectance_scaling() {
        let dn = Array2::from_elem((2, 2), 2500.0f32);
        let refl = to_reflectance(&dn, 10000.0);
        assert_abs_diff_eq!(refl[[1, 1]], 0.25, epsilon = 1e-7);
    }

    #[test]
    fn test_shape_mismatch() {
        let red = Array2::<f32>::zeros((4, 4));
        let nir = Array2::<f32>::zeros((4, 5));
        match ndvi(&red, &nir, 1e-10) {
            Err(PipelineError::ShapeMismatch { red, nir }) => {
                assert_eq!(red, (4, 4));
                assert_eq!(nir, (4, 5));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }
}
