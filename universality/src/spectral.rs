// SPDX-License-Identifier: AGPL-3.0-only

//! Dominant eigenvalue of the linearized renormalization operator.
//!
//! Power iteration with Rayleigh-quotient estimates, stopped once both the
//! relative change of the estimate and the eigen residual ‖Jv − δv‖ are
//! small. The universal δ is negative, so iterates are sign-normalized on
//! their largest-magnitude component; otherwise successive iterates would
//! alternate and the difference-based gap estimate would be meaningless.
//!
//! The ratio ‖v_{k+1} − v_k‖ / ‖v_k − v_{k−1}‖ tends to |λ₂/λ₁|. When it
//! is close to one the estimate converges slowly and is flagged
//! low-confidence; if the budget runs out in that state the result is
//! rejected as unstable.
//!
//! [`spectrum`] computes the full spectrum through a real Schur
//! decomposition and serves as an independent cross-check.

use nalgebra::{Complex, DVector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, Stage, UniversalityError};
use crate::linearize::Jacobian;
use crate::space::CoefficientVector;
use crate::tolerances::{
    EIGEN_RESIDUAL_LIMIT, EIGEN_TOLERANCE, MAX_POWER_ITERATIONS, SPECTRAL_GAP_WARNING,
};

/// Iterate differences below this are rounding noise and do not update
/// the gap estimate.
const GAP_NOISE_FLOOR: f64 = 1e-11;

/// Dominant eigenpair with diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenResult {
    /// Eigenvalue of largest magnitude (the reported δ).
    pub eigenvalue: f64,
    /// Unit eigenvector, largest component positive.
    pub eigenvector: CoefficientVector,
    /// ‖Jv − δv‖ for the unit eigenvector.
    pub residual: f64,
    /// Power iterations performed.
    pub iterations: usize,
    /// Estimated |λ₂/λ₁|.
    pub gap_ratio: f64,
    /// Set when the gap ratio exceeds the warning threshold.
    pub low_confidence: bool,
}

/// Power-iteration settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSolver {
    /// Relative change of the eigenvalue estimate at convergence.
    pub tolerance: f64,
    /// Iteration budget.
    pub max_iterations: usize,
    /// Gap ratio above which results are flagged.
    pub gap_warning: f64,
    /// Eigen residual limit relative to max(|δ|, 1).
    pub residual_limit: f64,
}

impl Default for SpectralSolver {
    fn default() -> Self {
        Self {
            tolerance: EIGEN_TOLERANCE,
            max_iterations: MAX_POWER_ITERATIONS,
            gap_warning: SPECTRAL_GAP_WARNING,
            residual_limit: EIGEN_RESIDUAL_LIMIT,
        }
    }
}

impl SpectralSolver {
    /// Settings with a custom tolerance and budget.
    #[must_use]
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Self::default()
        }
    }

    /// Eigenvalue of largest magnitude by power iteration.
    ///
    /// # Errors
    ///
    /// - [`UniversalityError::NumericInstability`] if the iterate collapses,
    ///   the eigen residual exceeds its limit, or the budget runs out with an
    ///   unisolated dominant eigenvalue.
    /// - [`UniversalityError::NonConvergence`] if the budget runs out otherwise.
    pub fn dominant_eigenvalue(&self, jacobian: &Jacobian) -> Result<EigenResult> {
        let dim = jacobian.dimension();
        if dim == 0 {
            return Err(UniversalityError::NumericInstability(
                "empty Jacobian".into(),
            ));
        }
        let matrix = jacobian.matrix();
        #[allow(clippy::cast_precision_loss)]
        let mut v = DVector::from_fn(dim, |i, _| 1.0 / (i as f64 + 1.0));
        v.normalize_mut();

        let mut estimate = f64::NAN;
        let mut change = f64::INFINITY;
        let mut residual = f64::INFINITY;
        let mut prev_diff: Option<f64> = None;
        let mut gap_ratio = 0.0;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let w = matrix * &v;
            let rayleigh = v.dot(&w);
            change = (rayleigh - estimate).abs();
            estimate = rayleigh;
            residual = (&w - &v * rayleigh).norm();
            if change <= self.tolerance * rayleigh.abs()
                && residual <= self.residual_limit * rayleigh.abs().max(1.0)
            {
                converged = true;
                break;
            }

            let norm = w.norm();
            if norm == 0.0 || !norm.is_finite() {
                return Err(UniversalityError::NumericInstability(format!(
                    "power iterate collapsed at iteration {iterations}"
                )));
            }
            let mut next = w / norm;
            if next[next.iamax()] < 0.0 {
                next.neg_mut();
            }
            let diff = (&next - &v).norm();
            if let Some(prev) = prev_diff {
                if prev > GAP_NOISE_FLOOR && diff > GAP_NOISE_FLOOR {
                    gap_ratio = diff / prev;
                }
            }
            prev_diff = Some(diff);
            v = next;
        }

        let low_confidence = gap_ratio > self.gap_warning;
        if !converged {
            if low_confidence {
                return Err(UniversalityError::NumericInstability(format!(
                    "dominant eigenvalue not isolated: gap ratio {gap_ratio:.4} after {iterations} iterations"
                )));
            }
            if change <= self.tolerance * estimate.abs() {
                return Err(UniversalityError::NumericInstability(format!(
                    "eigen residual ‖Jv − δv‖ = {residual:.3e} for δ = {estimate:.10} (gap ratio {gap_ratio:.4})"
                )));
            }
            return Err(UniversalityError::NonConvergence {
                stage: Stage::Spectral,
                iterations,
                residual: change / estimate.abs(),
                reason: "eigenvalue estimate still changing".into(),
            });
        }

        if low_confidence {
            warn!(eigenvalue = estimate, gap_ratio, "dominant eigenvalue poorly separated");
        }
        debug!(eigenvalue = estimate, iterations, gap_ratio, residual, "power iteration converged");

        Ok(EigenResult {
            eigenvalue: estimate,
            eigenvector: v.iter().copied().collect(),
            residual,
            iterations,
            gap_ratio,
            low_confidence,
        })
    }
}

/// All eigenvalues, sorted by decreasing modulus.
///
/// # Errors
///
/// [`UniversalityError::NumericInstability`] if the Schur iteration fails.
pub fn spectrum(jacobian: &Jacobian) -> Result<Vec<Complex<f64>>> {
    let schur = nalgebra::linalg::Schur::try_new(jacobian.matrix().clone(), f64::EPSILON, 0)
        .ok_or_else(|| {
            UniversalityError::NumericInstability("Schur decomposition did not converge".into())
        })?;
    let mut eigenvalues: Vec<Complex<f64>> = schur.complex_eigenvalues().iter().copied().collect();
    eigenvalues.sort_by(|a, b| b.norm().total_cmp(&a.norm()));
    Ok(eigenvalues)
}
