//! # Configuration
//!
//! $$
//! (N, T, V_0) \mapsto \text{ensemble of } N \text{ paths over } T \text{ days}
//! $$
//!
//! Engine-wide defaults and the per-request [`SimulationConfig`].

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::error::EngineError;
use crate::error::Result;

/// Shares held per asset when the caller supplies none.
pub const DEFAULT_SHARES: u64 = 100;
/// Default number of independent runs.
pub const DEFAULT_NUM_RUNS: usize = 100;
/// Default forecast horizon in trading days.
pub const DEFAULT_HORIZON: usize = 30;
/// Tail probability used for VaR / CVaR.
pub const TAIL_LEVEL: f64 = 0.05;
/// Pivots of magnitude below this are treated as exact zeros by the Cholesky factorization.
pub const PSD_TOLERANCE: f64 = 1e-12;
/// Minimum daily return observations per asset for covariance estimation.
pub const MIN_OBSERVATIONS: usize = 30;

/// Parameters of one simulation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
  /// Number of independent runs `N`.
  pub num_runs: usize,
  /// Forecast horizon `T` in trading days.
  pub horizon: usize,
  /// Starting portfolio value. `None` uses the composition's total value.
  pub initial_value: Option<f64>,
  /// Seed for [`crate::simulation::simulate_seeded`]. `None` seeds from entropy.
  pub seed: Option<u64>,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      num_runs: DEFAULT_NUM_RUNS,
      horizon: DEFAULT_HORIZON,
      initial_value: None,
      seed: None,
    }
  }
}

impl SimulationConfig {
  /// Config with explicit `N` and `T`; everything else at defaults.
  pub fn new(num_runs: usize, horizon: usize) -> Self {
    Self {
      num_runs,
      horizon,
      ..Self::default()
    }
  }

  /// Override the starting portfolio value.
  pub fn with_initial_value(mut self, initial_value: f64) -> Self {
    self.initial_value = Some(initial_value);
    self
  }

  /// Fix the seed used by [`crate::simulation::simulate_seeded`].
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  /// Defaults overridden by `MC_NUM_RUNS`, `MC_HORIZON`, `MC_INITIAL_VALUE` and `MC_SEED`.
  ///
  /// Unparseable values are logged and ignored.
  pub fn from_env() -> Self {
    let mut config = Self::default();
    if let Some(v) = env_parse::<usize>("MC_NUM_RUNS") {
      config.num_runs = v;
    }
    if let Some(v) = env_parse::<usize>("MC_HORIZON") {
      config.horizon = v;
    }
    if let Some(v) = env_parse::<f64>("MC_INITIAL_VALUE") {
      config.initial_value = Some(v);
    }
    if let Some(v) = env_parse::<u64>("MC_SEED") {
      config.seed = Some(v);
    }
    config
  }

  /// Reject configurations the simulator cannot run.
  pub fn validate(&self) -> Result<()> {
    if self.num_runs == 0 {
      return Err(EngineError::invalid_config("num_runs must be at least 1"));
    }
    if self.horizon == 0 {
      return Err(EngineError::invalid_config("horizon must be at least 1"));
    }
    if let Some(v) = self.initial_value {
      if !(v.is_finite() && v > 0.0) {
        return Err(EngineError::invalid_config(format!(
          "initial_value must be positive and finite, got {v}"
        )));
      }
    }
    Ok(())
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  let raw = std::env::var(key).ok()?;
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  match trimmed.parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!("ignoring {}={:?}: not a valid value", key, trimmed);
      None
    }
  }
}
