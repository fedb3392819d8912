// SPDX-License-Identifier: AGPL-3.0-only

//! Damped Newton iteration for fixed points of a coefficient map.
//!
//! Solves F(c) = R(c) − c = 0 with steps (DR − I) d = −F, accepting the
//! largest λ ∈ {1, 1/2, 1/4, …} for which ‖F(c + λd)‖_∞ strictly
//! decreases. Trial points at which the map itself fails (ill-posed
//! normalization, domain exit) count as "no decrease".
//!
//! Non-convergence is always surfaced as an error: the downstream
//! eigenvalue is only as accurate as the fixed point.

use nalgebra::DVector;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Result, Stage, UniversalityError};
use crate::linearize::Linearizer;
use crate::renormalization::CoefficientMap;
use crate::space::CoefficientVector;
use crate::tolerances::{FIXED_POINT_TOLERANCE, MAX_NEWTON_ITERATIONS, MIN_NEWTON_STEP};

/// Newton stopping rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Residual infinity norm at convergence.
    pub tolerance: f64,
    /// Newton step budget.
    pub max_iterations: usize,
    /// Smallest damping factor tried before giving up.
    pub min_step: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: FIXED_POINT_TOLERANCE,
            max_iterations: MAX_NEWTON_ITERATIONS,
            min_step: MIN_NEWTON_STEP,
        }
    }
}

/// A converged fixed point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedPoint {
    /// Fixed-point coefficients.
    pub coefficients: CoefficientVector,
    /// ‖R(c) − c‖_∞ at `coefficients`.
    pub residual_norm: f64,
    /// Newton steps taken.
    pub iterations: usize,
    /// Residual norm before each step, ending with the final one.
    pub residual_history: Vec<f64>,
}

/// Damped Newton solver bound to one map.
#[derive(Debug)]
pub struct FixedPointSolver<'a, M: ?Sized> {
    map: &'a M,
    linearizer: Linearizer,
    settings: SolverSettings,
}

impl<'a, M> FixedPointSolver<'a, M>
where
    M: CoefficientMap + ?Sized,
{
    /// Solver for `map` with the given settings.
    #[must_use]
    pub fn new(map: &'a M, settings: SolverSettings) -> Self {
        Self {
            map,
            linearizer: Linearizer::default(),
            settings,
        }
    }

    /// Replace the finite-difference linearizer.
    #[must_use]
    pub const fn with_linearizer(mut self, linearizer: Linearizer) -> Self {
        self.linearizer = linearizer;
        self
    }

    fn residual(&self, state: &[f64]) -> Result<(CoefficientVector, f64)> {
        let image = self.map.map(state)?;
        let residual: CoefficientVector = image.iter().zip(state).map(|(r, c)| r - c).collect();
        let norm = residual.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if !norm.is_finite() || residual.iter().any(|v| !v.is_finite()) {
            return Err(UniversalityError::NumericInstability(
                "non-finite fixed-point residual".into(),
            ));
        }
        Ok((residual, norm))
    }

    fn non_convergence(iterations: usize, residual: f64, reason: String) -> UniversalityError {
        UniversalityError::NonConvergence {
            stage: Stage::FixedPoint,
            iterations,
            residual,
            reason,
        }
    }

    /// Iterate from `initial_guess` until the residual is below tolerance.
    ///
    /// # Errors
    ///
    /// - [`UniversalityError::DimensionMismatch`] for a wrong-length guess.
    /// - [`UniversalityError::NonConvergence`] if the guess is rejected by the
    ///   map, the budget runs out, or step halving stalls.
    /// - [`UniversalityError::NumericInstability`] if the Newton system is singular.
    pub fn solve(&self, initial_guess: &[f64]) -> Result<FixedPoint> {
        let dim = self.map.dimension();
        if initial_guess.len() != dim {
            return Err(UniversalityError::DimensionMismatch {
                expected: dim,
                found: initial_guess.len(),
            });
        }
        let mut state = initial_guess.to_vec();
        let (mut residual, mut norm) = match self.residual(&state) {
            Ok(r) => r,
            Err(e) if e.is_recoverable() => {
                return Err(Self::non_convergence(
                    0,
                    f64::INFINITY,
                    format!("initial guess rejected: {e}"),
                ))
            }
            Err(e) => return Err(e),
        };
        let mut history = vec![norm];

        for iteration in 0..self.settings.max_iterations {
            if norm < self.settings.tolerance {
                return Ok(FixedPoint {
                    coefficients: state,
                    residual_norm: norm,
                    iterations: iteration,
                    residual_history: history,
                });
            }
            debug!(iteration, residual = norm, "newton step");

            let jacobian = match self.linearizer.linearize(self.map, &state) {
                Ok(j) => j,
                Err(e) if e.is_recoverable() => {
                    return Err(Self::non_convergence(
                        iteration,
                        norm,
                        format!("linearization failed: {e}"),
                    ))
                }
                Err(e) => return Err(e),
            };
            let mut system = jacobian.into_matrix();
            for i in 0..dim {
                system[(i, i)] -= 1.0;
            }
            let rhs = -DVector::from_vec(residual.clone());
            let step = system.lu().solve(&rhs).ok_or_else(|| {
                UniversalityError::NumericInstability(format!(
                    "singular Newton system at iteration {iteration}"
                ))
            })?;
            if step.iter().any(|d| !d.is_finite()) {
                return Err(UniversalityError::NumericInstability(format!(
                    "non-finite Newton step at iteration {iteration}"
                )));
            }

            let mut lambda = 1.0_f64;
            loop {
                if lambda < self.settings.min_step {
                    return Err(Self::non_convergence(
                        iteration + 1,
                        norm,
                        format!("step halving stalled below λ = {:e}", self.settings.min_step),
                    ));
                }
                let trial: CoefficientVector = state
                    .iter()
                    .zip(step.iter())
                    .map(|(c, d)| lambda.mul_add(*d, *c))
                    .collect();
                match self.residual(&trial) {
                    Ok((r, n)) if n < norm => {
                        state = trial;
                        residual = r;
                        norm = n;
                        break;
                    }
                    Ok((_, n)) => trace!(lambda, residual = n, "no decrease, halving"),
                    Err(e) if e.is_recoverable() => trace!(lambda, error = %e, "trial rejected"),
                    Err(e) => return Err(e),
                }
                lambda *= 0.5;
            }
            history.push(norm);
        }

        if norm < self.settings.tolerance {
            Ok(FixedPoint {
                coefficients: state,
                residual_norm: norm,
                iterations: self.settings.max_iterations,
                residual_history: history,
            })
        } else {
            Err(Self::non_convergence(
                self.settings.max_iterations,
                norm,
                "iteration budget exhausted".into(),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::index::IndexDescriptor;
    use crate::renormalization::{PairSpaces, RenormalizationOperator};

    /// c ↦ (0.5 cos c₀, 0.3 sin c₁ + 0.2): a contraction with a unique fixed point.
    struct Contraction;

    impl CoefficientMap for Contraction {
        fn dimension(&self) -> usize {
            2
        }
        fn map(&self, c: &[f64]) -> Result<CoefficientVector> {
            Ok(vec![0.5 * c[0].cos(), 0.3f64.mul_add(c[1].sin(), 0.2)])
        }
    }

    /// c ↦ c + 1 has no fixed point and a singular Newton system.
    struct Shift;

    impl CoefficientMap for Shift {
        fn dimension(&self) -> usize {
            1
        }
        fn map(&self, c: &[f64]) -> Result<CoefficientVector> {
            Ok(vec![c[0] + 1.0])
        }
    }

    #[test]
    fn contraction_converges() {
        let fp = FixedPointSolver::new(&Contraction, SolverSettings::default())
            .solve(&[3.0, -2.0])
            .expect("converges");
        assert!(fp.residual_norm < FIXED_POINT_TOLERANCE);
        assert!((fp.coefficients[0] - 0.5 * fp.coefficients[0].cos()).abs() < 1e-10);
        assert!(fp.iterations < 10);
        assert_eq!(fp.residual_history.len(), fp.iterations + 1);
        assert!(fp.residual_history.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let settings = SolverSettings {
            max_iterations: 1,
            ..SolverSettings::default()
        };
        let err = FixedPointSolver::new(&Contraction, settings)
            .solve(&[3.0, -2.0])
            .expect_err("one step is not enough");
        assert!(matches!(
            err,
            UniversalityError::NonConvergence {
                stage: Stage::FixedPoint,
                iterations: 1,
                ..
            }
        ));
    }

    #[test]
    fn singular_system_is_unstable() {
        // power-of-two step keeps the difference quotient exactly 1
        let err = FixedPointSolver::new(&Shift, SolverSettings::default())
            .with_linearizer(Linearizer::new(0.5))
            .solve(&[0.0])
            .expect_err("no fixed point");
        assert!(matches!(err, UniversalityError::NumericInstability(_)));
    }

    #[test]
    fn zero_guess_does_not_converge() {
        let spaces = PairSpaces::new(8, 3).expect("spaces");
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        let err = FixedPointSolver::new(&op, SolverSettings::default())
            .solve(&vec![0.0; 16])
            .expect_err("zero pair is ill-posed");
        assert!(matches!(
            err,
            UniversalityError::NonConvergence {
                stage: Stage::FixedPoint,
                iterations: 0,
                ..
            }
        ));
    }

    #[test]
    fn wrong_length_guess() {
        let err = FixedPointSolver::new(&Contraction, SolverSettings::default())
            .solve(&[1.0])
            .expect_err("length 1");
        assert!(matches!(err, UniversalityError::DimensionMismatch { expected: 2, found: 1 }));
    }
}
