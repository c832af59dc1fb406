//! # Linear Algebra
//!
//! $$
//! \Sigma = LL^\top,\qquad L_{jj}=\sqrt{\Sigma_{jj}-\sum_{k<j}L_{jk}^2},\qquad
//! L_{ij}=\frac{\Sigma_{ij}-\sum_{k<j}L_{ik}L_{jk}}{L_{jj}}
//! $$
//!
//! Cholesky factorization for positive semi-definite covariance matrices.

use ndarray::Array2;
use tracing::debug;

use crate::config::PSD_TOLERANCE;
use crate::error::EngineError;
use crate::error::Result;

/// Lower-triangular `L` with `L·Lᵗ = cov`.
///
/// Rank-deficient (semi-definite) matrices are accepted: a pivot within tolerance
/// of zero produces a zero column, provided every residual below it satisfies
/// `|r_i| <= sqrt(tol * max(cov_ii, tol))`, the Cauchy-Schwarz bound for a pivot
/// of size `tol`. The bound depends only on the two variances involved, so the
/// outcome does not depend on asset order. Anything else fails with [`EngineError::NonPositiveDefiniteCovariance`];
/// the matrix is never regularized.
pub fn cholesky_psd(cov: &Array2<f64>) -> Result<Array2<f64>> {
  let (rows, cols) = cov.dim();
  if rows != cols {
    return Err(EngineError::matrix_mismatch("covariance", (rows, rows), (rows, cols)));
  }

  let n = rows;
  let scale = (0..n).map(|i| cov[[i, i]].abs()).fold(1.0_f64, f64::max);
  let zero_tol = PSD_TOLERANCE * scale;
  let mut l = Array2::<f64>::zeros((n, n));
  let mut rank = 0usize;

  for j in 0..n {
    let mut pivot = cov[[j, j]];
    for k in 0..j {
      pivot -= l[[j, k]] * l[[j, k]];
    }

    if pivot < -zero_tol || !pivot.is_finite() {
      return Err(EngineError::NonPositiveDefiniteCovariance {
        pivot_index: j,
        pivot,
      });
    }

    if pivot <= zero_tol {
      for i in (j + 1)..n {
        let mut residual = cov[[i, j]];
        for k in 0..j {
          residual -= l[[i, k]] * l[[j, k]];
        }
        let residual_tol = (zero_tol * cov[[i, i]].max(zero_tol)).sqrt();
        if residual.abs() > residual_tol {
          return Err(EngineError::NonPositiveDefiniteCovariance {
            pivot_index: j,
            pivot,
          });
        }
      }
      continue;
    }

    let diag = pivot.sqrt();
    l[[j, j]] = diag;
    rank += 1;
    for i in (j + 1)..n {
      let mut residual = cov[[i, j]];
      for k in 0..j {
        residual -= l[[i, k]] * l[[j, k]];
      }
      l[[i, j]] = residual / diag;
    }
  }

  debug!(dim = n, rank, "factored covariance matrix");
  Ok(l)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn assert_reconstructs(cov: &Array2<f64>, l: &Array2<f64>) {
    let rebuilt = l.dot(&l.t());
    for ((i, j), v) in cov.indexed_iter() {
      assert_abs_diff_eq!(rebuilt[[i, j]], *v, epsilon = 1e-12);
    }
    for i in 0..l.nrows() {
      for j in (i + 1)..l.ncols() {
        assert_eq!(l[[i, j]], 0.0, "upper triangle must be zero");
      }
    }
  }

  #[test]
  fn factors_positive_definite_matrix() {
    let cov = array![
      [0.0004, 0.0001, 0.00005],
      [0.0001, 0.0009, 0.0002],
      [0.00005, 0.0002, 0.0016]
    ];
    let l = cholesky_psd(&cov).unwrap();
    assert_reconstructs(&cov, &l);
  }

  #[test]
  fn factors_rank_deficient_matrix() {
    let s = 0.0004;
    let cov = array![[s, s], [s, s]];
    let l = cholesky_psd(&cov).unwrap();
    assert_reconstructs(&cov, &l);
    assert_abs_diff_eq!(l[[1, 1]], 0.0);
    assert_abs_diff_eq!(l[[0, 0]], l[[1, 0]], epsilon = 1e-15);
  }

  #[test]
  fn factors_zero_matrix() {
    let cov = Array2::<f64>::zeros((3, 3));
    let l = cholesky_psd(&cov).unwrap();
    assert!(l.iter().all(|v| *v == 0.0));
  }

  #[test]
  fn factors_rank_deficient_three_asset_matrix() {
    // Third asset is an exact blend of the first two.
    let a = array![0.012, 0.0, 0.0];
    let b = array![0.004, 0.009, 0.0];
    let c = &a * 0.5 + &b * 0.5;
    let rows = [a, b, c];
    let cov = Array2::from_shape_fn((3, 3), |(i, j)| rows[i].dot(&rows[j]));
    let l = cholesky_psd(&cov).unwrap();
    assert_reconstructs(&cov, &l);
    assert_abs_diff_eq!(l[[2, 2]], 0.0, epsilon = 1e-8);
  }

  #[test]
  fn zero_variance_with_small_daily_covariance_fails_in_either_order() {
    let zero_first = array![[0.0, 5e-7], [5e-7, 1e-4]];
    let zero_last = array![[1e-4, 5e-7], [5e-7, 0.0]];

    let err = cholesky_psd(&zero_first).unwrap_err();
    assert!(matches!(
      err,
      EngineError::NonPositiveDefiniteCovariance { pivot_index: 0, .. }
    ));
    let err = cholesky_psd(&zero_last).unwrap_err();
    assert!(matches!(
      err,
      EngineError::NonPositiveDefiniteCovariance { pivot_index: 1, .. }
    ));
  }

  #[test]
  fn accepted_daily_scale_matrices_reconstruct() {
    let s = 1e-4;
    let cases = [
      array![[s, 0.3 * s], [0.3 * s, 2.0 * s]],
      array![[s, s, 0.0], [s, s, 0.0], [0.0, 0.0, 3.0 * s]],
      array![[0.0, 0.0], [0.0, s]],
    ];
    for cov in &cases {
      let l = cholesky_psd(cov).unwrap();
      assert_reconstructs(cov, &l);
    }
  }

  #[test]
  fn rejects_indefinite_matrix() {
    let cov = array![[1.0, 2.0], [2.0, 1.0]];
    let err = cholesky_psd(&cov).unwrap_err();
    assert!(matches!(
      err,
      EngineError::NonPositiveDefiniteCovariance { pivot_index: 1, .. }
    ));
  }

  #[test]
  fn rejects_zero_variance_with_nonzero_covariance() {
    let cov = array![[0.0, 0.1], [0.1, 1.0]];
    let err = cholesky_psd(&cov).unwrap_err();
    assert!(matches!(
      err,
      EngineError::NonPositiveDefiniteCovariance { pivot_index: 0, .. }
    ));
  }
}
