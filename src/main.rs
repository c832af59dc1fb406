use anyhow::Context;
use anyhow::Result;
use prettytable::Table;
use prettytable::row;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use stochastic_portfolio::SimulationConfig;
use stochastic_portfolio::engine::MonteCarloEngine;
use stochastic_portfolio::engine::MonteCarloEngineConfig;
use stochastic_portfolio::projection;
use stochastic_portfolio::risk::InsightThresholds;
use stochastic_portfolio::statistics::EstimationConfig;
use stochastic_portfolio::statistics::StatisticsSnapshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Demo portfolio: (ticker, starting close, daily drift, daily volatility, market beta)
const DEMO_ASSETS: &[(&str, f64, f64, f64, f64)] = &[
  ("AAPL", 185.0, 0.0007, 0.014, 0.9),
  ("MSFT", 405.0, 0.0006, 0.012, 0.8),
  ("GOOG", 142.0, 0.0005, 0.016, 0.7),
];
const HISTORY_DAYS: usize = 252;

fn main() -> Result<()> {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("stochastic_portfolio=info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let mut simulation = SimulationConfig::from_env();
  if simulation.seed.is_none() {
    simulation.seed = Some(42);
  }

  let tickers: Vec<&str> = DEMO_ASSETS.iter().map(|a| a.0).collect();
  let closes = synthetic_closes(simulation.seed.unwrap_or_default())?;
  let snapshot = StatisticsSnapshot::from_closes(&tickers, &closes, &EstimationConfig::default())
    .context("estimating statistics from demo closes")?;
  info!(assets = snapshot.len(), days = HISTORY_DAYS, "built demo snapshot");

  let engine = MonteCarloEngine::new(MonteCarloEngineConfig {
    simulation,
    insights: Some(InsightThresholds::default()),
  });
  let report = engine.run(&snapshot, None).context("running simulation")?;

  let mut holdings = Table::new();
  holdings.add_row(row!["Asset", "Mean Price", "Mean Return", "Shares", "Value", "Weight"]);
  let key = &report.key_data;
  for i in 0..key.assets.len() {
    holdings.add_row(row![
      key.assets[i],
      format!("${:.2}", key.mean_price_per_asset[i]),
      format!("{:.5}", key.mean_return_per_asset[i]),
      key.shares_per_asset[i],
      format!("${:.2}", key.value_per_asset[i]),
      format!("{:.3}", key.portfolio_weights[i])
    ]);
  }
  holdings.printstd();

  let risk = &report.risk;
  let mut metrics = Table::new();
  metrics.add_row(row!["Metric", "Value"]);
  metrics.add_row(row!["Standard Deviation", format!("${:.2}", risk.std_dev)]);
  metrics.add_row(row!["Mean Final Value", format!("${:.2}", risk.mean_final)]);
  metrics.add_row(row!["Sharpe Ratio", format!("{:.2}", risk.sharpe)]);
  metrics.add_row(row!["VaR (5%)", format!("${:.2}", risk.var_5)]);
  metrics.add_row(row!["CVaR (5%)", format!("${:.2}", risk.cvar_5)]);
  metrics.printstd();

  if let Some(insights) = &report.insights {
    for (i, msg) in insights.messages.iter().enumerate() {
      println!("{}. {}", i + 1, msg);
    }
  }

  let histogram = projection::histogram(&report.ensemble)?;
  let buckets = histogram.buckets(30)?;
  println!("{}", serde_json::to_string_pretty(&buckets)?);

  Ok(())
}

/// One-factor random walk so the demo assets are correlated.
fn synthetic_closes(seed: u64) -> Result<Vec<Vec<f64>>> {
  let mut rng = StdRng::seed_from_u64(seed);
  let market = Normal::new(0.0, 0.01)?;
  let mut closes: Vec<Vec<f64>> = DEMO_ASSETS
    .iter()
    .map(|a| {
      let mut v = Vec::with_capacity(HISTORY_DAYS + 1);
      v.push(a.1);
      v
    })
    .collect();

  for _ in 0..HISTORY_DAYS {
    let m = market.sample(&mut rng);
    for (series, &(_, _, drift, vol, beta)) in closes.iter_mut().zip(DEMO_ASSETS) {
      let idio = Normal::new(0.0, vol)?.sample(&mut rng);
      let last = series[series.len() - 1];
      series.push(last * (1.0 + drift + beta * m + idio));
    }
  }

  Ok(closes)
}
