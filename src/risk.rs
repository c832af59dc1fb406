//! # Risk Summary
//!
//! $$
//! \operatorname{VaR}_\alpha = Q_\alpha(V_T),\qquad
//! \operatorname{CVaR}_\alpha = \mathbb E\left[V_T \mid V_T \le \operatorname{VaR}_\alpha\right],\qquad
//! \text{Sharpe} = \frac{\mathbb E[V_T]-V_0}{\sigma(V_T)}
//! $$
//!
//! Descriptive statistics over terminal portfolio values, plus an optional
//! heuristic annotation layer.

use serde::Deserialize;
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::config::TAIL_LEVEL;
use crate::error::EngineError;
use crate::error::Result;
use crate::simulation::SimulationEnsemble;

/// Risk metrics over the `N` terminal portfolio values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskMetrics {
  /// Population standard deviation of final values.
  pub std_dev: f64,
  /// Mean final value.
  pub mean_final: f64,
  /// `(mean_final - initial_value) / std_dev`.
  pub sharpe: f64,
  /// 5th percentile of final values (linear interpolation).
  pub var_5: f64,
  /// Mean of final values at or below `var_5`.
  pub cvar_5: f64,
  pub initial_value: f64,
  pub num_runs: usize,
}

impl RiskMetrics {
  /// Metrics over the ensemble's final values against its initial value.
  pub fn from_ensemble(ensemble: &SimulationEnsemble) -> Result<Self> {
    let final_values = ensemble.final_values().to_vec();
    Self::from_final_values(&final_values, ensemble.initial_value())
  }

  /// Fails with [`EngineError::NonFiniteOutcome`] when any final value overflowed
  /// and with [`EngineError::UndefinedRiskRatio`] when all final values coincide.
  pub fn from_final_values(final_values: &[f64], initial_value: f64) -> Result<Self> {
    if final_values.is_empty() {
      return Err(EngineError::invalid_input("no final values to summarize"));
    }
    let non_finite = final_values.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
      return Err(EngineError::NonFiniteOutcome {
        count: non_finite,
        num_runs: final_values.len(),
      });
    }

    let mean_final = final_values.iter().mean();
    let std_dev = final_values.iter().population_std_dev();
    let sharpe = sharpe_ratio(mean_final, initial_value, std_dev)?;
    let (var_5, cvar_5) = tail_metrics(final_values, TAIL_LEVEL)?;

    Ok(Self {
      std_dev,
      mean_final,
      sharpe,
      var_5,
      cvar_5,
      initial_value,
      num_runs: final_values.len(),
    })
  }
}

/// Excess mean over the initial value per unit of dispersion.
pub fn sharpe_ratio(mean_final: f64, initial_value: f64, std_dev: f64) -> Result<f64> {
  if !(std_dev.is_finite() && std_dev > 0.0) {
    return Err(EngineError::UndefinedRiskRatio { std_dev });
  }
  Ok((mean_final - initial_value) / std_dev)
}

/// Percentile `q` in `[0, 1]` with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
  if values.is_empty() {
    return Err(EngineError::invalid_input("percentile of empty sample"));
  }
  if !(0.0..=1.0).contains(&q) {
    return Err(EngineError::invalid_input(format!("percentile level {q} outside [0, 1]")));
  }

  let mut sorted = values.to_vec();
  sorted.sort_by(f64::total_cmp);
  let h = (sorted.len() - 1) as f64 * q;
  let lo = h.floor() as usize;
  let hi = h.ceil() as usize;
  Ok(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// `(VaR, CVaR)` at tail probability `level`.
pub fn tail_metrics(values: &[f64], level: f64) -> Result<(f64, f64)> {
  if !(level > 0.0 && level < 1.0) {
    return Err(EngineError::invalid_input(format!("tail level {level} outside (0, 1)")));
  }
  let var = percentile(values, level)?;
  let tail: Vec<f64> = values.iter().copied().filter(|&v| v <= var).collect();
  // Linear interpolation never falls below the sample minimum, so the tail is non-empty.
  let cvar = tail.iter().sum::<f64>() / tail.len() as f64;
  Ok((var, cvar))
}

/// Bucket edges for the heuristic commentary.
///
/// These are rules of thumb in currency units and Sharpe units, not statistically
/// derived; callers should tune them to portfolio size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
  pub low_volatility: f64,
  pub moderate_volatility: f64,
  pub excellent_sharpe: f64,
  pub decent_sharpe: f64,
}

impl Default for InsightThresholds {
  fn default() -> Self {
    Self {
      low_volatility: 1000.0,
      moderate_volatility: 2000.0,
      excellent_sharpe: 1.0,
      decent_sharpe: 0.5,
    }
  }
}

/// Bucket of the final-value standard deviation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VolatilityBand {
  Low,
  Moderate,
  High,
}

/// Bucket of the Sharpe-like ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SharpeBand {
  Excellent,
  Decent,
  Low,
}

/// Optional narration attached next to (never inside) [`RiskMetrics`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RiskInsights {
  pub volatility: VolatilityBand,
  pub sharpe: SharpeBand,
  pub messages: Vec<String>,
}

impl RiskInsights {
  /// Bucket `metrics` against `thresholds` and attach one message per bucket.
  pub fn annotate(metrics: &RiskMetrics, thresholds: &InsightThresholds) -> Self {
    let (volatility, vol_msg) = if metrics.std_dev < thresholds.low_volatility {
      (
        VolatilityBand::Low,
        "Low portfolio volatility indicates stable performance.",
      )
    } else if metrics.std_dev < thresholds.moderate_volatility {
      (
        VolatilityBand::Moderate,
        "Moderate portfolio volatility; keep an eye on market conditions.",
      )
    } else {
      (
        VolatilityBand::High,
        "High portfolio volatility; diversification might reduce risk.",
      )
    };

    let (sharpe, sharpe_msg) = if metrics.sharpe > thresholds.excellent_sharpe {
      (
        SharpeBand::Excellent,
        "Excellent risk-adjusted returns; the portfolio is performing well.",
      )
    } else if metrics.sharpe > thresholds.decent_sharpe {
      (
        SharpeBand::Decent,
        "Decent risk-adjusted returns; consider small optimizations.",
      )
    } else {
      (
        SharpeBand::Low,
        "Low risk-adjusted returns; revisit strategy or rebalance.",
      )
    };

    Self {
      volatility,
      sharpe,
      messages: vec![vol_msg.to_string(), sharpe_msg.to_string()],
    }
  }
}
