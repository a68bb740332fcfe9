//! Dense block builders used by the covariance layer.
use ndarray::{Array1, Array2, s};

/// Stack square blocks along the diagonal; off-block entries are zero.
pub fn block_diag(blocks: &[Array2<f64>]) -> Array2<f64> {
    let dim: usize = blocks.iter().map(|b| b.nrows()).sum();
    let mut out = Array2::<f64>::zeros((dim, dim));
    let mut offset = 0;
    for block in blocks {
        let n = block.nrows();
        out.slice_mut(s![offset..offset + n, offset..offset + n]).assign(block);
        offset += n;
    }
    out
}

/// Toeplitz AR(1) correlation block with entries `rho^|i-j|`.
pub fn ar1_correlation(rho: f64, size: usize) -> Array2<f64> {
    Array2::from_shape_fn((size, size), |(i, j)| rho.powi(i.abs_diff(j) as i32))
}

/// Square diagonal matrix from a vector.
pub fn diag_from(values: &Array1<f64>) -> Array2<f64> {
    Array2::from_diag(values)
}

/// `D^{1/2} C D^{1/2}` for a diagonal `D` given by its entries.
///
/// Negative entries of `d` are treated as zero.
pub fn scale_correlation(corr: &Array2<f64>, d: &Array1<f64>) -> Array2<f64> {
    let sd = d.mapv(|v| v.max(0.0).sqrt());
    Array2::from_shape_fn(corr.dim(), |(i, j)| sd[i] * corr[[i, j]] * sd[j])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Blocks land on the diagonal with zeros elsewhere.
    //
    // Given
    // -----
    // - A 1×1 block and a 2×2 block.
    //
    // Expect
    // ------
    // - A 3×3 matrix with the blocks on the diagonal and zero cross terms.
    fn block_diag_places_blocks_on_diagonal() {
        // Arrange
        let a = array![[2.0]];
        let b = array![[1.0, 0.5], [0.5, 1.0]];

        // Act
        let out = block_diag(&[a, b]);

        // Assert
        assert_eq!(out, array![[2.0, 0.0, 0.0], [0.0, 1.0, 0.5], [0.0, 0.5, 1.0]]);
    }

    #[test]
    // Purpose
    // -------
    // The AR(1) block is symmetric Toeplitz with unit diagonal.
    //
    // Given
    // -----
    // - `rho = 0.5`, size 3.
    //
    // Expect
    // ------
    // - Entries `0.5^|i-j|`.
    fn ar1_correlation_is_toeplitz_in_powers() {
        // Arrange / Act
        let c = ar1_correlation(0.5, 3);

        // Assert
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(c[[i, j]], 0.5_f64.powi(i.abs_diff(j) as i32));
                assert_relative_eq!(c[[i, j]], c[[j, i]]);
            }
        }
    }
}
