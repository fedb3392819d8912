// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for the renormalization pipeline.
//!
//! Callers pattern-match on the failure mode (normalization breakdown,
//! budget exhausted, unstable spectrum, truncation too coarse) instead of
//! parsing strings. Everything except [`UniversalityError::InvalidConfig`]
//! and [`UniversalityError::DataLoad`] is recoverable at the driver level:
//! the affected index is reported and excluded from the aggregate.

use std::fmt;

use thiserror::Error;

/// Which iterative stage gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Damped Newton on `R(c) - c`.
    FixedPoint,
    /// Power iteration on the linearized operator.
    Spectral,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedPoint => write!(f, "fixed-point"),
            Self::Spectral => write!(f, "spectral"),
        }
    }
}

/// Errors arising from renormalization, eigenvalue extraction, or data loading.
#[derive(Debug, Error)]
pub enum UniversalityError {
    /// The critical value η(0) that fixes the rescaling factor is zero,
    /// of the wrong sign, or not finite.
    #[error("ill-posed normalization: critical value η(0) = {value:e} cannot fix the rescaling factor")]
    IllPosedNormalization {
        /// Offending critical value.
        value: f64,
    },

    /// A map was evaluated outside its domain plus slack.
    #[error("domain exceeded: x = {x:e} outside [{lo}, {hi}]")]
    DomainExceeded {
        /// Evaluation point.
        x: f64,
        /// Lower admissible bound (domain minus slack).
        lo: f64,
        /// Upper admissible bound (domain plus slack).
        hi: f64,
    },

    /// An iteration budget ran out, or step halving stalled.
    #[error("{stage} stage did not converge after {iterations} iterations (residual {residual:e}): {reason}")]
    NonConvergence {
        /// Stage that failed.
        stage: Stage,
        /// Iterations completed.
        iterations: usize,
        /// Last residual (infinity norm, or relative eigenvalue change).
        residual: f64,
        /// Short description of the exit path.
        reason: String,
    },

    /// Singular Newton system, unisolated dominant eigenvalue, or a large
    /// eigen-equation residual.
    #[error("numeric instability: {0}")]
    NumericInstability(String),

    /// Raising the truncation order moved δ by more than the stability threshold.
    #[error(
        "truncation insufficient: δ moved from {delta:.12} (N={order}) to {refined_delta:.12} \
         (N={refined_order}), relative change {relative_change:.3e}"
    )]
    TruncationInsufficient {
        /// Configured order.
        order: usize,
        /// Refined order.
        refined_order: usize,
        /// δ at the configured order.
        delta: f64,
        /// δ at the refined order.
        refined_delta: f64,
        /// |δ_N − δ_refined| / |δ_refined|.
        relative_change: f64,
    },

    /// A coefficient vector had the wrong length for the operator.
    #[error("dimension mismatch: expected {expected} coefficients, got {found}")]
    DimensionMismatch {
        /// Operator dimension.
        expected: usize,
        /// Supplied length.
        found: usize,
    },

    /// Rejected configuration (fatal, raised before any computation).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file loading failed (path, underlying IO or parse error).
    #[error("data loading failed: {0}")]
    DataLoad(String),
}

impl UniversalityError {
    /// Whether the driver may report this failure and continue with other indices.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::DataLoad(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, UniversalityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_ill_posed() {
        let err = UniversalityError::IllPosedNormalization { value: 0.0 };
        assert!(err.to_string().starts_with("ill-posed normalization"));
    }

    #[test]
    fn display_non_convergence_names_stage() {
        let err = UniversalityError::NonConvergence {
            stage: Stage::FixedPoint,
            iterations: 50,
            residual: 1e-3,
            reason: "iteration budget exhausted".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fixed-point"));
        assert!(msg.contains("50 iterations"));
    }

    #[test]
    fn display_truncation_reports_orders() {
        let err = UniversalityError::TruncationInsufficient {
            order: 8,
            refined_order: 16,
            delta: -2.8335,
            refined_delta: -2.8336,
            relative_change: 3.5e-5,
        };
        let msg = err.to_string();
        assert!(msg.contains("N=8"));
        assert!(msg.contains("N=16"));
    }

    #[test]
    fn config_errors_are_fatal() {
        assert!(!UniversalityError::InvalidConfig("order".into()).is_recoverable());
        assert!(!UniversalityError::DataLoad("missing".into()).is_recoverable());
        assert!(UniversalityError::NumericInstability("gap".into()).is_recoverable());
        assert!(UniversalityError::IllPosedNormalization { value: 0.0 }.is_recoverable());
    }

    #[test]
    fn error_trait_works() {
        let err = UniversalityError::DataLoad("bad magic".into());
        let dyn_err: &dyn std::error::Error = &err;
        assert_eq!(dyn_err.to_string(), "data loading failed: bad magic");
    }
}
