//! # Errors
//!
//! $$
//! \Sigma = LL^\top \text{ must exist before any path is drawn}
//! $$
//!
//! Every failure here is a precondition failure detected before (or at the very
//! start of) the simulation loop. Retrying with the same inputs cannot succeed.

use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy of the simulation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
  /// Length or shape disagreement between aligned inputs.
  #[error("shape mismatch in {what}: expected {expected}, got {actual}")]
  ShapeMismatch {
    what: String,
    expected: String,
    actual: String,
  },

  /// The covariance matrix has no (semi-definite) Cholesky factor.
  #[error("covariance matrix is not positive semi-definite: pivot {pivot_index} = {pivot:e}")]
  NonPositiveDefiniteCovariance { pivot_index: usize, pivot: f64 },

  /// Total portfolio value is zero (or not finite), weights are undefined.
  #[error("portfolio weights are undefined: total value is {total}")]
  DegenerateWeights { total: f64 },

  /// Standard deviation of terminal values is zero, the Sharpe-like ratio is undefined.
  #[error("risk ratio is undefined: standard deviation of final values is {std_dev}")]
  UndefinedRiskRatio { std_dev: f64 },

  /// Some terminal values overflowed or are NaN; the ensemble's diagnostics locate them.
  #[error("{count} of {num_runs} final portfolio values are not finite")]
  NonFiniteOutcome { count: usize, num_runs: usize },

  /// Too few return observations to estimate a usable covariance matrix.
  #[error("insufficient observations for {asset}: need at least {required}, got {available}")]
  InsufficientObservations {
    asset: String,
    required: usize,
    available: usize,
  },

  /// Malformed input data.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// Malformed simulation configuration.
  #[error("invalid configuration: {message}")]
  InvalidConfig { message: String },
}

impl EngineError {
  /// Length mismatch of a named vector.
  pub fn length_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
    Self::ShapeMismatch {
      what: what.into(),
      expected: expected.to_string(),
      actual: actual.to_string(),
    }
  }

  /// Shape mismatch of a named matrix.
  pub fn matrix_mismatch(
    what: impl Into<String>,
    expected: (usize, usize),
    actual: (usize, usize),
  ) -> Self {
    Self::ShapeMismatch {
      what: what.into(),
      expected: format!("{}x{}", expected.0, expected.1),
      actual: format!("{}x{}", actual.0, actual.1),
    }
  }

  /// Malformed input with a message.
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }

  /// Malformed configuration with a message.
  pub fn invalid_config(message: impl Into<String>) -> Self {
    Self::InvalidConfig {
      message: message.into(),
    }
  }
}
