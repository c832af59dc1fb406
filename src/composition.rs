//! # Portfolio Composition
//!
//! $$
//! v_i = s_i\,\bar p_i,\qquad w_i = \frac{v_i}{\sum_j v_j}
//! $$
//!
//! Share counts to capital values and normalized weights.

use ndarray::Array1;
use serde::Serialize;

use crate::config::DEFAULT_SHARES;
use crate::error::EngineError;
use crate::error::Result;
use crate::statistics::StatisticsSnapshot;

/// Per-asset holdings with derived values and weights, index-aligned with the snapshot.
#[derive(Clone, Debug)]
pub struct PortfolioComposition {
  shares: Vec<u64>,
  values: Array1<f64>,
  weights: Array1<f64>,
  total_value: f64,
}

/// Flat summary of a portfolio for presentation layers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyData {
  pub assets: Vec<String>,
  pub mean_price_per_asset: Vec<f64>,
  pub mean_return_per_asset: Vec<f64>,
  pub shares_per_asset: Vec<u64>,
  pub value_per_asset: Vec<f64>,
  pub portfolio_weights: Vec<f64>,
  pub portfolio_value: f64,
}

impl PortfolioComposition {
  /// Build from explicit share counts, or [`DEFAULT_SHARES`] of every asset when `None`.
  pub fn new(statistics: &StatisticsSnapshot, shares: Option<&[u64]>) -> Result<Self> {
    let k = statistics.len();
    let shares = match shares {
      Some(s) if s.len() != k => return Err(EngineError::length_mismatch("shares", k, s.len())),
      Some(s) => s.to_vec(),
      None => vec![DEFAULT_SHARES; k],
    };

    if let Some(i) = shares.iter().position(|&s| s == 0) {
      return Err(EngineError::invalid_input(format!(
        "share count of {} must be positive",
        statistics.assets()[i].ticker
      )));
    }

    let values: Array1<f64> = shares
      .iter()
      .zip(statistics.assets())
      .map(|(&s, asset)| s as f64 * asset.mean_price)
      .collect();
    let total_value = values.sum();
    if !(total_value.is_finite() && total_value > 0.0) {
      return Err(EngineError::DegenerateWeights { total: total_value });
    }
    let weights = &values / total_value;

    Ok(Self {
      shares,
      values,
      weights,
      total_value,
    })
  }

  /// Share count per asset.
  pub fn shares(&self) -> &[u64] {
    &self.shares
  }

  /// Capital held per asset, `s_i * p_i`.
  pub fn values(&self) -> &Array1<f64> {
    &self.values
  }

  /// Normalized weights; they sum to one.
  pub fn weights(&self) -> &Array1<f64> {
    &self.weights
  }

  /// Sum of per-asset values.
  pub fn total_value(&self) -> f64 {
    self.total_value
  }

  /// Number of assets.
  pub fn len(&self) -> usize {
    self.shares.len()
  }

  /// Whether the composition holds no assets.
  pub fn is_empty(&self) -> bool {
    self.shares.is_empty()
  }

  /// Asset-level summary joined with the snapshot it was built from.
  pub fn key_data(&self, statistics: &StatisticsSnapshot) -> KeyData {
    KeyData {
      assets: statistics.tickers(),
      mean_price_per_asset: statistics.mean_prices().to_vec(),
      mean_return_per_asset: statistics.mean_returns().to_vec(),
      shares_per_asset: self.shares.clone(),
      value_per_asset: self.values.to_vec(),
      portfolio_weights: self.weights.to_vec(),
      portfolio_value: self.total_value,
    }
  }
}
