//! # Stochastic Portfolio
//!
//! Monte Carlo evaluation of multi-asset portfolios: correlated synthetic price
//! paths from historical statistics, reduced to portfolio value trajectories and
//! tail-risk metrics.
//!
//! ## Modules
//!
//! | Module          | Description                                                                  |
//! |-----------------|------------------------------------------------------------------------------|
//! | [`statistics`]  | Immutable snapshot of mean prices, mean returns, covariance and correlation.  |
//! | [`composition`] | Share counts to capital values and normalized weights.                        |
//! | [`linalg`]      | Positive semi-definite Cholesky factorization.                                |
//! | [`simulation`]  | Correlated path simulation, parallel over runs with `rayon`.                  |
//! | [`risk`]        | VaR, CVaR, Sharpe-like ratio and optional heuristic insights.                 |
//! | [`projection`]  | Rendering-agnostic views over a simulation ensemble.                          |
//! | [`engine`]      | One-call orchestration of the above.                                          |
//!
//! ## Example Usage
//!
//! ```rust
//! use ndarray::array;
//! use stochastic_portfolio::engine::MonteCarloEngine;
//! use stochastic_portfolio::statistics::Asset;
//! use stochastic_portfolio::statistics::StatisticsSnapshot;
//!
//! let assets = vec![Asset::new("AAA", 100.0, 0.0005), Asset::new("BBB", 50.0, 0.0003)];
//! let cov = array![[0.0004, 0.0001], [0.0001, 0.0002]];
//! let snapshot = StatisticsSnapshot::with_derived_correlation(assets, cov)?;
//! let report = MonteCarloEngine::default().run(&snapshot, Some(&[10, 20][..]))?;
//! println!("VaR 5%: {}", report.risk.var_5);
//! ```
//!
//! The library never installs a `tracing` subscriber; that is left to the binary
//! or the serving layer.

pub mod composition;
pub mod config;
pub mod engine;
pub mod error;
pub mod linalg;
pub mod projection;
pub mod risk;
pub mod simulation;
pub mod statistics;

pub use composition::KeyData;
pub use composition::PortfolioComposition;
pub use config::SimulationConfig;
pub use engine::MonteCarloEngine;
pub use engine::MonteCarloEngineConfig;
pub use engine::ReportViews;
pub use engine::SimulationReport;
pub use error::EngineError;
pub use error::Result;
pub use risk::InsightThresholds;
pub use risk::RiskInsights;
pub use risk::RiskMetrics;
pub use simulation::SimulationDiagnostic;
pub use simulation::SimulationEnsemble;
pub use simulation::simulate;
pub use simulation::simulate_seeded;
pub use statistics::Asset;
pub use statistics::StatisticsSnapshot;
