//! # Monte Carlo Engine
//!
//! $$
//! (\text{snapshot}, \text{shares}) \mapsto (\text{ensemble}, \text{risk}, \text{views})
//! $$
//!
//! High-level orchestration over composition, simulation and summaries.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::composition::KeyData;
use crate::composition::PortfolioComposition;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::projection;
use crate::projection::CorrelationView;
use crate::projection::HistogramView;
use crate::projection::Series;
use crate::projection::SimulationLines;
use crate::risk::InsightThresholds;
use crate::risk::RiskInsights;
use crate::risk::RiskMetrics;
use crate::simulation::SimulationEnsemble;
use crate::simulation::simulate;
use crate::simulation::simulate_seeded;
use crate::statistics::StatisticsSnapshot;

/// Runtime configuration for [`MonteCarloEngine`].
#[derive(Clone, Debug, Default)]
pub struct MonteCarloEngineConfig {
  pub simulation: SimulationConfig,
  /// `None` disables the heuristic commentary.
  pub insights: Option<InsightThresholds>,
}

/// Everything one request produces.
#[derive(Clone, Debug)]
pub struct SimulationReport {
  pub key_data: KeyData,
  pub ensemble: SimulationEnsemble,
  pub risk: RiskMetrics,
  pub insights: Option<RiskInsights>,
}

/// All presentation views of a report, ready to serialize.
#[derive(Clone, Debug, Serialize)]
pub struct ReportViews {
  pub key_data: KeyData,
  pub simulation_lines: SimulationLines,
  pub average_path: Series,
  pub asset_prices: Vec<Series>,
  pub asset_cumulative_returns: Vec<Series>,
  pub histogram: HistogramView,
  pub correlation: CorrelationView,
  pub risk: RiskMetrics,
  pub insights: Option<RiskInsights>,
}

/// Single entry point for a simulation request.
#[derive(Clone, Debug, Default)]
pub struct MonteCarloEngine {
  config: MonteCarloEngineConfig,
}

impl MonteCarloEngine {
  /// Construct a new engine with the given configuration.
  pub fn new(config: MonteCarloEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &MonteCarloEngineConfig {
    &self.config
  }

  /// Compose, simulate and summarize, seeding from `config.simulation.seed`.
  pub fn run(&self, statistics: &StatisticsSnapshot, shares: Option<&[u64]>) -> Result<SimulationReport> {
    let composition = PortfolioComposition::new(statistics, shares)?;
    let ensemble = simulate_seeded(statistics, &composition, &self.config.simulation)?;
    self.summarize(statistics, &composition, ensemble)
  }

  /// As [`MonteCarloEngine::run`] with an injected generator.
  pub fn run_with_rng<R: Rng + ?Sized>(
    &self,
    statistics: &StatisticsSnapshot,
    shares: Option<&[u64]>,
    rng: &mut R,
  ) -> Result<SimulationReport> {
    let composition = PortfolioComposition::new(statistics, shares)?;
    let ensemble = simulate(statistics, &composition, &self.config.simulation, rng)?;
    self.summarize(statistics, &composition, ensemble)
  }

  /// Project a report into every presentation view.
  pub fn views(&self, statistics: &StatisticsSnapshot, report: &SimulationReport) -> Result<ReportViews> {
    Ok(ReportViews {
      key_data: report.key_data.clone(),
      simulation_lines: projection::simulation_lines(&report.ensemble),
      average_path: projection::average_path(&report.ensemble),
      asset_prices: projection::asset_average_prices(&report.ensemble),
      asset_cumulative_returns: projection::asset_cumulative_returns(&report.ensemble),
      histogram: projection::histogram(&report.ensemble)?,
      correlation: projection::correlation(statistics),
      risk: report.risk.clone(),
      insights: report.insights.clone(),
    })
  }

  fn summarize(
    &self,
    statistics: &StatisticsSnapshot,
    composition: &PortfolioComposition,
    ensemble: SimulationEnsemble,
  ) -> Result<SimulationReport> {
    let risk = RiskMetrics::from_ensemble(&ensemble)?;
    let insights = self
      .config
      .insights
      .as_ref()
      .map(|thresholds| RiskInsights::annotate(&risk, thresholds));
    debug!(mean_final = risk.mean_final, var_5 = risk.var_5, cvar_5 = risk.cvar_5, "summarized ensemble");

    Ok(SimulationReport {
      key_data: composition.key_data(statistics),
      ensemble,
      risk,
      insights,
    })
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  use super::*;
  use crate::error::EngineError;
  use crate::statistics::Asset;

  fn snapshot() -> StatisticsSnapshot {
    let assets = vec![
      Asset::new("AAPL", 190.0, 0.0009),
      Asset::new("MSFT", 410.0, 0.0007),
      Asset::new("GOOG", 150.0, 0.0006),
    ];
    let cov = array![
      [0.00031, 0.00017, 0.00016],
      [0.00017, 0.00024, 0.00015],
      [0.00016, 0.00015, 0.00033]
    ];
    StatisticsSnapshot::with_derived_correlation(assets, cov).unwrap()
  }

  #[test]
  fn engine_runs_full_pipeline() {
    let engine = MonteCarloEngine::new(MonteCarloEngineConfig {
      simulation: SimulationConfig::new(200, 30).with_seed(42),
      insights: Some(InsightThresholds::default()),
    });
    let snap = snapshot();
    let report = engine.run(&snap, None).unwrap();

    assert_eq!(report.key_data.portfolio_value, 75_000.0);
    assert_eq!(report.risk.num_runs, 200);
    assert!(report.risk.var_5 >= report.risk.cvar_5);
    assert_eq!(report.insights.as_ref().map(|i| i.messages.len()), Some(2));

    let views = engine.views(&snap, &report).unwrap();
    assert_eq!(views.asset_prices.len(), 3);
    assert_eq!(views.simulation_lines.runs.len(), 200);
    let json = serde_json::to_string(&views).unwrap();
    assert!(json.contains("\"var_5\""));
  }

  #[test]
  fn insights_are_optional() {
    let engine = MonteCarloEngine::new(MonteCarloEngineConfig {
      simulation: SimulationConfig::new(50, 10),
      insights: None,
    });
    let report = engine.run_with_rng(&snapshot(), Some(&[1, 2, 3][..]), &mut StdRng::seed_from_u64(9)).unwrap();
    assert!(report.insights.is_none());
  }

  #[test]
  fn single_run_surfaces_undefined_ratio() {
    let engine = MonteCarloEngine::new(MonteCarloEngineConfig {
      simulation: SimulationConfig::new(1, 10),
      insights: None,
    });
    let err = engine.run_with_rng(&snapshot(), None, &mut StdRng::seed_from_u64(1)).unwrap_err();
    assert!(matches!(err, EngineError::UndefinedRiskRatio { .. }));
  }

  #[test]
  fn share_mismatch_is_rejected_before_simulation() {
    let engine = MonteCarloEngine::default();
    let err = engine.run(&snapshot(), Some(&[1, 2][..])).unwrap_err();
    assert_eq!(err, EngineError::length_mismatch("shares", 3, 2));
  }
}
