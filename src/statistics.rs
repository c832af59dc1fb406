//! # Statistics Snapshot
//!
//! $$
//! \Sigma_{ij} = \frac{1}{n-1}\sum_t (r_{i,t}-\bar r_i)(r_{j,t}-\bar r_j),\qquad
//! \rho_{ij} = \frac{\Sigma_{ij}}{\sqrt{\Sigma_{ii}\Sigma_{jj}}}
//! $$
//!
//! Immutable per-request view of historical price statistics. Asset order defines
//! the index alignment of every vector and matrix in the engine.

use std::collections::HashSet;

use ndarray::Array1;
use ndarray::Array2;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::MIN_OBSERVATIONS;
use crate::error::EngineError;
use crate::error::Result;

const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// One asset of the basket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Asset {
  /// Ticker symbol, unique within a snapshot.
  pub ticker: String,
  /// Mean historical close.
  pub mean_price: f64,
  /// Mean daily simple return.
  pub mean_return: f64,
}

impl Asset {
  /// Create an asset entry.
  pub fn new(ticker: impl Into<String>, mean_price: f64, mean_return: f64) -> Self {
    Self {
      ticker: ticker.into(),
      mean_price,
      mean_return,
    }
  }
}

/// Controls estimation of a snapshot from raw closes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationConfig {
  /// Minimum daily returns per asset. The effective floor is never below `K + 1`.
  pub min_observations: usize,
}

impl Default for EstimationConfig {
  fn default() -> Self {
    Self {
      min_observations: MIN_OBSERVATIONS,
    }
  }
}

/// Mean prices, mean returns, covariance and correlation of daily returns.
#[derive(Clone, Debug)]
pub struct StatisticsSnapshot {
  assets: Vec<Asset>,
  covariance: Array2<f64>,
  correlation: Array2<f64>,
}

impl StatisticsSnapshot {
  /// Validate and assemble a snapshot supplied by a data collaborator.
  ///
  /// Positive semi-definiteness is not checked here; the simulator's Cholesky
  /// factorization reports it.
  pub fn new(assets: Vec<Asset>, covariance: Array2<f64>, correlation: Array2<f64>) -> Result<Self> {
    let k = assets.len();
    if k == 0 {
      return Err(EngineError::invalid_input("snapshot needs at least one asset"));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(k);
    for asset in &assets {
      if !seen.insert(asset.ticker.as_str()) {
        return Err(EngineError::invalid_input(format!(
          "duplicate ticker {}",
          asset.ticker
        )));
      }
      if !(asset.mean_price.is_finite() && asset.mean_price > 0.0) {
        return Err(EngineError::invalid_input(format!(
          "mean price of {} must be positive and finite, got {}",
          asset.ticker, asset.mean_price
        )));
      }
      if !asset.mean_return.is_finite() {
        return Err(EngineError::invalid_input(format!(
          "mean return of {} is not finite",
          asset.ticker
        )));
      }
    }
    drop(seen);

    if covariance.dim() != (k, k) {
      return Err(EngineError::matrix_mismatch("covariance", (k, k), covariance.dim()));
    }
    if correlation.dim() != (k, k) {
      return Err(EngineError::matrix_mismatch("correlation", (k, k), correlation.dim()));
    }
    if covariance.iter().any(|v| !v.is_finite()) {
      return Err(EngineError::invalid_input("covariance contains non-finite entries"));
    }

    for i in 0..k {
      if covariance[[i, i]] < 0.0 {
        return Err(EngineError::invalid_input(format!(
          "variance of {} is negative: {}",
          assets[i].ticker,
          covariance[[i, i]]
        )));
      }
      for j in (i + 1)..k {
        let a = covariance[[i, j]];
        let b = covariance[[j, i]];
        let scale = a.abs().max(b.abs()).max(1.0);
        if (a - b).abs() > SYMMETRY_TOLERANCE * scale {
          return Err(EngineError::invalid_input(format!(
            "covariance is not symmetric at ({i}, {j}): {a} vs {b}"
          )));
        }
      }
    }

    Ok(Self {
      assets,
      covariance,
      correlation,
    })
  }

  /// Snapshot whose correlation matrix is derived from the covariance.
  pub fn with_derived_correlation(assets: Vec<Asset>, covariance: Array2<f64>) -> Result<Self> {
    let correlation = correlation_from_covariance(&covariance);
    Self::new(assets, covariance, correlation)
  }

  /// Estimate a snapshot from index-aligned daily closes, one series per ticker.
  ///
  /// Returns are simple percent changes; covariance uses the `n - 1` divisor.
  pub fn from_closes(
    tickers: &[&str],
    closes: &[Vec<f64>],
    config: &EstimationConfig,
  ) -> Result<Self> {
    let k = tickers.len();
    if closes.len() != k {
      return Err(EngineError::length_mismatch("close series", k, closes.len()));
    }
    if k == 0 {
      return Err(EngineError::invalid_input("snapshot needs at least one asset"));
    }

    let len = closes[0].len();
    for series in closes {
      if series.len() != len {
        return Err(EngineError::length_mismatch("close series length", len, series.len()));
      }
    }

    let required = config.min_observations.max(k + 1);
    let mut returns = Vec::with_capacity(k);
    for (ticker, series) in tickers.iter().zip(closes) {
      let r = simple_returns(ticker, series)?;
      if r.len() < required {
        return Err(EngineError::InsufficientObservations {
          asset: ticker.to_string(),
          required,
          available: r.len(),
        });
      }
      returns.push(r);
    }

    let n = returns[0].len();
    let means: Vec<f64> = returns.iter().map(|r| sample_mean(r)).collect();
    let mut covariance = Array2::<f64>::zeros((k, k));
    for i in 0..k {
      for j in i..k {
        let c = returns[i]
          .iter()
          .zip(&returns[j])
          .map(|(a, b)| (a - means[i]) * (b - means[j]))
          .sum::<f64>()
          / (n - 1) as f64;
        covariance[[i, j]] = c;
        covariance[[j, i]] = c;
      }
    }

    let assets = tickers
      .iter()
      .zip(closes)
      .zip(&means)
      .map(|((ticker, series), &mean_return)| Asset::new(*ticker, sample_mean(series), mean_return))
      .collect();

    debug!(assets = k, observations = n, "estimated statistics snapshot from closes");
    Self::with_derived_correlation(assets, covariance)
  }

  /// Assets in index order.
  pub fn assets(&self) -> &[Asset] {
    &self.assets
  }

  /// Number of assets `K`.
  pub fn len(&self) -> usize {
    self.assets.len()
  }

  /// Always false for a validated snapshot.
  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  /// Ticker labels in index order.
  pub fn tickers(&self) -> Vec<String> {
    self.assets.iter().map(|a| a.ticker.clone()).collect()
  }

  /// Mean historical close per asset.
  pub fn mean_prices(&self) -> Array1<f64> {
    self.assets.iter().map(|a| a.mean_price).collect()
  }

  /// Mean daily return per asset.
  pub fn mean_returns(&self) -> Array1<f64> {
    self.assets.iter().map(|a| a.mean_return).collect()
  }

  /// `K x K` covariance of daily returns.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  /// `K x K` correlation of daily returns.
  pub fn correlation(&self) -> &Array2<f64> {
    &self.correlation
  }
}

fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

fn simple_returns(ticker: &str, closes: &[f64]) -> Result<Vec<f64>> {
  let mut out = Vec::with_capacity(closes.len().saturating_sub(1));
  for (t, w) in closes.windows(2).enumerate() {
    if !(w[0].is_finite() && w[0] > 0.0 && w[1].is_finite()) {
      return Err(EngineError::invalid_input(format!(
        "close of {ticker} at index {t} is not a positive finite price"
      )));
    }
    out.push(w[1] / w[0] - 1.0);
  }
  Ok(out)
}

/// Pearson correlation implied by a covariance matrix.
///
/// Assets with zero variance get unit self-correlation and zero cross-correlation.
pub fn correlation_from_covariance(cov: &Array2<f64>) -> Array2<f64> {
  let n = cov.nrows().min(cov.ncols());
  let sd: Vec<f64> = (0..n).map(|i| cov[[i, i]].max(0.0).sqrt()).collect();
  Array2::from_shape_fn((n, n), |(i, j)| {
    if i == j {
      return 1.0;
    }
    let denom = sd[i] * sd[j];
    if denom > 1e-15 {
      (cov[[i, j]] / denom).clamp(-1.0, 1.0)
    } else {
      0.0
    }
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn two_assets() -> Vec<Asset> {
    vec![Asset::new("AAA", 100.0, 0.001), Asset::new("BBB", 50.0, 0.0)]
  }

  #[test]
  fn new_rejects_wrong_covariance_shape() {
    let err = StatisticsSnapshot::new(two_assets(), Array2::zeros((2, 3)), Array2::eye(2)).unwrap_err();
    assert_eq!(err, EngineError::matrix_mismatch("covariance", (2, 2), (2, 3)));
  }

  #[test]
  fn new_rejects_asymmetric_covariance() {
    let cov = array![[0.04, 0.01], [0.02, 0.09]];
    let err = StatisticsSnapshot::new(two_assets(), cov, Array2::eye(2)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput { .. }));
  }

  #[test]
  fn new_rejects_duplicate_tickers_and_bad_prices() {
    let dup = vec![Asset::new("AAA", 1.0, 0.0), Asset::new("AAA", 2.0, 0.0)];
    assert!(StatisticsSnapshot::with_derived_correlation(dup, Array2::zeros((2, 2))).is_err());

    let bad = vec![Asset::new("AAA", 0.0, 0.0)];
    assert!(StatisticsSnapshot::with_derived_correlation(bad, Array2::zeros((1, 1))).is_err());
  }

  #[test]
  fn derived_correlation_matches_covariance() {
    let cov = array![[0.04, 0.018], [0.018, 0.09]];
    let corr = correlation_from_covariance(&cov);
    assert_abs_diff_eq!(corr[[0, 1]], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(corr[[1, 0]], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(corr[[0, 0]], 1.0);
  }

  #[test]
  fn from_closes_estimates_means_and_covariance() {
    let a: Vec<f64> = (0..41).map(|i| 100.0 * (1.0 + 0.01 * (i % 3) as f64)).collect();
    let b: Vec<f64> = a.iter().map(|p| p * 0.5).collect();
    let snap = StatisticsSnapshot::from_closes(&["A", "B"], &[a.clone(), b], &EstimationConfig::default()).unwrap();

    assert_eq!(snap.len(), 2);
    assert_abs_diff_eq!(snap.assets()[1].mean_price * 2.0, snap.assets()[0].mean_price, epsilon = 1e-9);
    // Scaled series share identical returns.
    assert_abs_diff_eq!(snap.assets()[0].mean_return, snap.assets()[1].mean_return, epsilon = 1e-15);
    assert_abs_diff_eq!(snap.covariance()[[0, 1]], snap.covariance()[[0, 0]], epsilon = 1e-15);
    assert_abs_diff_eq!(snap.correlation()[[0, 1]], 1.0, epsilon = 1e-12);
  }

  #[test]
  fn from_closes_enforces_minimum_observations() {
    let a = vec![10.0; 11];
    let err = StatisticsSnapshot::from_closes(&["A"], &[a], &EstimationConfig::default()).unwrap_err();
    assert_eq!(
      err,
      EngineError::InsufficientObservations {
        asset: "A".to_string(),
        required: MIN_OBSERVATIONS,
        available: 10,
      }
    );
  }

  #[test]
  fn from_closes_floor_is_at_least_asset_count_plus_one() {
    let cfg = EstimationConfig { min_observations: 1 };
    let closes = vec![vec![1.0, 1.1, 1.2]; 3];
    let err = StatisticsSnapshot::from_closes(&["A", "B", "C"], &closes, &cfg).unwrap_err();
    assert!(matches!(
      err,
      EngineError::InsufficientObservations { required: 4, available: 2, .. }
    ));
  }

  #[test]
  fn from_closes_rejects_ragged_series() {
    let err = StatisticsSnapshot::from_closes(
      &["A", "B"],
      &[vec![1.0; 40], vec![1.0; 39]],
      &EstimationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::ShapeMismatch { .. }));
  }
}
