use crate::types::{PipelineError, PipelineResult};
use ndarray::Array2;

/// Nearest-neighbour resampling to an exact `(rows, cols)` shape.
///
/// Pixel centres are mapped as `src = (dst + 0.5) * in / out - 0.5` and
/// rounded, so a 2x upsample repeats every source pixel twice. Only source
/// values are ever emitted, which keeps categorical codes intact.
pub fn resample_nearest<T: Copy>(
    src: &Array2<T>,
    shape: (usize, usize),
) -> PipelineResult<Array2<T>> {
    let (in_rows, in_cols) = src.dim();
    let (out_rows, out_cols) = shape;
    if in_rows == 0 || in_cols == 0 {
        return Err(PipelineError::InvalidParameter(
            "cannot resample an empty raster".to_string(),
        ));
    }
    log::debug!(
        "Nearest-neighbour resampling {}x{} -> {}x{}",
        in_rows,
        in_cols,
        out_rows,
        out_cols
    );

    let row_map = source_indices(in_rows, out_rows);
    let col_map = source_indices(in_cols, out_cols);
    Ok(Array2::from_shape_fn(shape, |(r, c)| src[[row_map[r], col_map[c]]]))
}

fn source_indices(len_in: usize, len_out: usize) -> Vec<usize> {
    let scale = len_in as f64 / len_out as f64;
    (0..len_out)
        .map(|i| {
            let x = (i as f64 + 0.5) * scale - 0.5;
            (x + 0.5).floor().clamp(0.0, (len_in - 1) as f64) as usize
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_upsample_by_two_repeats_pixels() {
        let scl = array![[4u8, 8], [9, 3]];
        let up = resample_nearest(&scl, (4, 4)).unwrap();
        assert_eq!(
            up,
            array![[4, 4, 8, 8], [4, 4, 8, 8], [9, 9, 3, 3], [9, 9, 3, 3]]
        );
    }

    #[test]
    fn test_odd_target_keeps_only_source_codes() {
        let scl = array![[1u8, 2, 3], [4, 5, 6]];
        let up = resample_nearest(&scl, (5, 7)).unwrap();
        assert_eq!(up.dim(), (5, 7));
        assert!(up.iter().all(|v| (1..=6).contains(v)));
        assert_eq!(up[[0, 0]], 1);
        assert_eq!(up[[4, 6]], 6);
    }

    #[test]
    fn test_identity_shape() {
        let scl = array![[7u8, 8], [9, 10]];
        assert_eq!(resample_nearest(&scl, (2, 2)).unwrap(), scl);
    }
}
