//! # Result Projection
//!
//! $$
//! \bar V_t = \frac1N\sum_{r} V_{t,r},\qquad
//! \bar S_{t,k} = \frac1N\sum_{r} S_{t,r,k},\qquad
//! \bar R_{t,k} = \frac{\bar S_{t,k}}{\bar p_k}-1
//! $$
//!
//! Rendering-agnostic views over a [`SimulationEnsemble`]. Every function is pure:
//! no randomness, no mutation.

use ndarray::Array1;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::config::TAIL_LEVEL;
use crate::error::EngineError;
use crate::error::Result;
use crate::risk::tail_metrics;
use crate::simulation::SimulationEnsemble;
use crate::statistics::StatisticsSnapshot;

/// One named series over forecast days.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
  pub name: String,
  pub days: Vec<usize>,
  pub values: Vec<f64>,
}

impl Series {
  fn new(name: impl Into<String>, values: Array1<f64>) -> Self {
    let values = values.to_vec();
    Self {
      name: name.into(),
      days: (0..values.len()).collect(),
      values,
    }
  }
}

/// Every run's portfolio value path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationLines {
  pub days: Vec<usize>,
  /// One entry per run, each of length `T`.
  pub runs: Vec<Vec<f64>>,
  pub min_value: f64,
  pub max_value: f64,
}

/// Terminal values with tail-risk markers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistogramView {
  pub final_values: Vec<f64>,
  pub var_5: f64,
  pub cvar_5: f64,
}

/// Equal-width histogram bucket; the last bucket is closed on the right.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Bucket {
  pub lower: f64,
  pub upper: f64,
  pub count: usize,
}

impl HistogramView {
  /// Equal-width buckets spanning the observed range.
  pub fn buckets(&self, bins: usize) -> Result<Vec<Bucket>> {
    if bins == 0 {
      return Err(EngineError::invalid_input("histogram needs at least one bin"));
    }
    let values = Array1::from(self.final_values.clone());
    let lo = *values
      .min()
      .map_err(|e| EngineError::invalid_input(format!("histogram range: {e}")))?;
    let hi = *values
      .max()
      .map_err(|e| EngineError::invalid_input(format!("histogram range: {e}")))?;

    let width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };
    let mut out: Vec<Bucket> = (0..bins)
      .map(|b| Bucket {
        lower: lo + b as f64 * width,
        upper: lo + (b + 1) as f64 * width,
        count: 0,
      })
      .collect();
    for &v in values.iter() {
      let idx = (((v - lo) / width) as usize).min(bins - 1);
      out[idx].count += 1;
    }
    Ok(out)
  }
}

/// Correlation matrix with axis labels in asset order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationView {
  pub labels: Vec<String>,
  pub matrix: Vec<Vec<f64>>,
}

/// Every run's portfolio value path with the overall value range.
pub fn simulation_lines(ensemble: &SimulationEnsemble) -> SimulationLines {
  let values = ensemble.portfolio_values();
  let (min_value, max_value) = values
    .iter()
    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
  SimulationLines {
    days: (0..ensemble.horizon()).collect(),
    runs: values.columns().into_iter().map(|c| c.to_vec()).collect(),
    min_value,
    max_value,
  }
}

/// Mean portfolio value per day across runs.
pub fn average_path(ensemble: &SimulationEnsemble) -> Series {
  Series::new("average", mean_over_runs(ensemble.portfolio_values().view()))
}

/// Mean simulated price per asset per day.
pub fn asset_average_prices(ensemble: &SimulationEnsemble) -> Vec<Series> {
  ensemble
    .tickers()
    .iter()
    .enumerate()
    .map(|(k, ticker)| {
      let avg = mean_over_runs(ensemble.prices().index_axis(Axis(2), k));
      Series::new(ticker.clone(), avg)
    })
    .collect()
}

/// Mean simulated price relative to the asset's mean historical price, minus one.
pub fn asset_cumulative_returns(ensemble: &SimulationEnsemble) -> Vec<Series> {
  asset_average_prices(ensemble)
    .into_iter()
    .zip(ensemble.mean_prices().iter())
    .map(|(mut series, &p0)| {
      for v in series.values.iter_mut() {
        *v = *v / p0 - 1.0;
      }
      series
    })
    .collect()
}

/// Final values with VaR and CVaR at the default tail level.
pub fn histogram(ensemble: &SimulationEnsemble) -> Result<HistogramView> {
  let final_values = ensemble.final_values().to_vec();
  let (var_5, cvar_5) = tail_metrics(&final_values, TAIL_LEVEL)?;
  Ok(HistogramView {
    final_values,
    var_5,
    cvar_5,
  })
}

/// Correlation matrix of the snapshot labelled by ticker.
pub fn correlation(statistics: &StatisticsSnapshot) -> CorrelationView {
  CorrelationView {
    labels: statistics.tickers(),
    matrix: statistics
      .correlation()
      .rows()
      .into_iter()
      .map(|r| r.to_vec())
      .collect(),
  }
}

/// Column mean of a `(T, N)` view.
fn mean_over_runs(view: ArrayView2<'_, f64>) -> Array1<f64> {
  let n = view.ncols().max(1) as f64;
  view.sum_axis(Axis(1)) / n
}
