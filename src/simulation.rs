//! # Path Simulation
//!
//! $$
//! r_t = \mu + L z_t,\quad z_t \sim \mathcal N(0, I_K),\qquad
//! S_{t,k} = \bar p_k \prod_{s\le t}(1+r_{s,k}),\qquad
//! V_t = V_0 \prod_{s\le t}(1+w^\top r_s)
//! $$
//!
//! Correlated multi-asset Monte Carlo. The covariance is factored once and shared
//! read-only; each run owns its slice of the output tensors and draws from its own
//! generator seeded from the caller's, so results do not depend on thread scheduling.

use std::time::Instant;

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut1;
use ndarray::ArrayViewMut2;
use ndarray::Axis;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::composition::PortfolioComposition;
use crate::config::SimulationConfig;
use crate::error::EngineError;
use crate::error::Result;
use crate::linalg::cholesky_psd;
use crate::statistics::StatisticsSnapshot;

/// Which tensor a diagnostic refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticSeries {
  AssetPrices,
  PortfolioValues,
}

/// Non-fatal numerical warning attached to an ensemble.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum SimulationDiagnostic {
  /// Compounding overflowed or produced NaN.
  NonFinite {
    series: DiagnosticSeries,
    count: usize,
    first_day: usize,
    first_run: usize,
  },
  /// A path crossed zero (a simulated daily return below -100%).
  NonPositive {
    series: DiagnosticSeries,
    count: usize,
    first_day: usize,
    first_run: usize,
  },
}

/// Immutable output of one [`simulate`] call.
#[derive(Clone, Debug)]
pub struct SimulationEnsemble {
  prices: Array3<f64>,
  portfolio_values: Array2<f64>,
  initial_value: f64,
  tickers: Vec<String>,
  mean_prices: Array1<f64>,
  diagnostics: Vec<SimulationDiagnostic>,
}

impl SimulationEnsemble {
  /// Simulated asset prices, shape `(T, N, K)`.
  pub fn prices(&self) -> &Array3<f64> {
    &self.prices
  }

  /// Simulated portfolio values, shape `(T, N)`.
  pub fn portfolio_values(&self) -> &Array2<f64> {
    &self.portfolio_values
  }

  /// Portfolio values on the last forecast day, one per run.
  pub fn final_values(&self) -> ArrayView1<'_, f64> {
    self.portfolio_values.row(self.horizon() - 1)
  }

  /// Portfolio value series of run `r`.
  pub fn run(&self, r: usize) -> ArrayView1<'_, f64> {
    self.portfolio_values.column(r)
  }

  /// Price paths of run `r`, shape `(T, K)`.
  pub fn run_prices(&self, r: usize) -> ArrayView2<'_, f64> {
    self.prices.index_axis(Axis(1), r)
  }

  /// Portfolio value at day zero, `V_0`.
  pub fn initial_value(&self) -> f64 {
    self.initial_value
  }

  /// Asset labels in snapshot order.
  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  /// Starting price of each asset path.
  pub fn mean_prices(&self) -> &Array1<f64> {
    &self.mean_prices
  }

  /// Forecast horizon `T`.
  pub fn horizon(&self) -> usize {
    self.portfolio_values.nrows()
  }

  /// Number of runs `N`.
  pub fn num_runs(&self) -> usize {
    self.portfolio_values.ncols()
  }

  /// Number of assets `K`.
  pub fn num_assets(&self) -> usize {
    self.prices.len_of(Axis(2))
  }

  /// Numerical warnings found after sampling; empty for a clean ensemble.
  pub fn diagnostics(&self) -> &[SimulationDiagnostic] {
    &self.diagnostics
  }
}

/// Inputs shared read-only by every run.
struct RunModel {
  horizon: usize,
  chol: Array2<f64>,
  mean_returns: Array1<f64>,
  mean_prices: Array1<f64>,
  weights: Array1<f64>,
  initial_value: f64,
}

impl RunModel {
  fn simulate_run(&self, seed: u64, mut prices: ArrayViewMut2<f64>, mut values: ArrayViewMut1<f64>) {
    let k = self.mean_prices.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let z = Array2::<f64>::random_using((self.horizon, k), StandardNormal, &mut rng);
    let daily_returns = z.dot(&self.chol.t()) + &self.mean_returns;

    let mut growth = Array1::<f64>::ones(k);
    let mut portfolio_growth = 1.0;
    for (t, r) in daily_returns.outer_iter().enumerate() {
      growth.zip_mut_with(&r, |g, &x| *g *= 1.0 + x);
      prices.row_mut(t).assign(&(&growth * &self.mean_prices));
      portfolio_growth *= 1.0 + self.weights.dot(&r);
      values[t] = portfolio_growth * self.initial_value;
    }
  }
}

/// Run `config.num_runs` independent correlated simulations over `config.horizon` days.
///
/// The generator is only used to draw one seed per run, so a seeded `rng`
/// reproduces the ensemble exactly.
pub fn simulate<R: Rng + ?Sized>(
  statistics: &StatisticsSnapshot,
  composition: &PortfolioComposition,
  config: &SimulationConfig,
  rng: &mut R,
) -> Result<SimulationEnsemble> {
  config.validate()?;
  let k = statistics.len();
  if composition.weights().len() != k {
    return Err(EngineError::length_mismatch("weights", k, composition.weights().len()));
  }

  let (horizon, num_runs) = (config.horizon, config.num_runs);
  let initial_value = config.initial_value.unwrap_or_else(|| composition.total_value());
  let chol = cholesky_psd(statistics.covariance())?;

  let model = RunModel {
    horizon,
    chol,
    mean_returns: statistics.mean_returns(),
    mean_prices: statistics.mean_prices(),
    weights: composition.weights().clone(),
    initial_value,
  };

  info!(runs = num_runs, horizon, assets = k, initial_value, "starting simulation");
  let started = Instant::now();

  let seeds: Vec<u64> = (0..num_runs).map(|_| rng.next_u64()).collect();
  let mut prices = Array3::<f64>::zeros((horizon, num_runs, k));
  let mut portfolio_values = Array2::<f64>::zeros((horizon, num_runs));

  prices
    .axis_iter_mut(Axis(1))
    .into_par_iter()
    .zip(portfolio_values.axis_iter_mut(Axis(1)).into_par_iter())
    .zip(seeds.par_iter())
    .for_each(|((run_prices, run_values), &seed)| {
      model.simulate_run(seed, run_prices, run_values);
    });

  let mut diagnostics = Vec::new();
  diagnostics.extend(scan(DiagnosticSeries::AssetPrices, prices.view().into_dyn()));
  diagnostics.extend(scan(DiagnosticSeries::PortfolioValues, portfolio_values.view().into_dyn()));
  for d in &diagnostics {
    warn!(diagnostic = ?d, "numerical warning in simulated paths");
  }

  info!(elapsed_ms = started.elapsed().as_millis() as u64, "simulation finished");

  Ok(SimulationEnsemble {
    prices,
    portfolio_values,
    initial_value,
    tickers: statistics.tickers(),
    mean_prices: model.mean_prices,
    diagnostics,
  })
}

/// [`simulate`] with a `StdRng` seeded from `config.seed`, or from entropy when unset.
pub fn simulate_seeded(
  statistics: &StatisticsSnapshot,
  composition: &PortfolioComposition,
  config: &SimulationConfig,
) -> Result<SimulationEnsemble> {
  let mut rng = match config.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };
  simulate(statistics, composition, config, &mut rng)
}

/// Count non-finite and non-positive entries. Axis 0 is the day, axis 1 the run.
fn scan(series: DiagnosticSeries, data: ndarray::ArrayViewD<'_, f64>) -> Vec<SimulationDiagnostic> {
  let mut non_finite: Option<(usize, usize, usize)> = None;
  let mut non_positive: Option<(usize, usize, usize)> = None;

  for (idx, &v) in data.indexed_iter() {
    let slot = if !v.is_finite() {
      &mut non_finite
    } else if v <= 0.0 {
      &mut non_positive
    } else {
      continue;
    };
    slot.get_or_insert((0, idx[0], idx[1])).0 += 1;
  }

  let mut out = Vec::new();
  if let Some((count, first_day, first_run)) = non_finite {
    out.push(SimulationDiagnostic::NonFinite {
      series,
      count,
      first_day,
      first_run,
    });
  }
  if let Some((count, first_day, first_run)) = non_positive {
    out.push(SimulationDiagnostic::NonPositive {
      series,
      count,
      first_day,
      first_run,
    });
  }
  if out.is_empty() {
    debug!(?series, "no numerical warnings");
  }
  out
}
