// SPDX-License-Identifier: AGPL-3.0-only

//! The renormalization operator on commuting pairs.
//!
//! A pair (ξ, η) is stored as one coefficient vector of length 2N: ξ on
//! [−1, 0], η on [0, 1], both series in t = x^z. With α = 1/η(0) the
//! operator for partial quotient n is
//!
//! ```text
//! ξ'(x) = α · η(x / α)
//! η'(x) = α · (η ∘ … ∘ η ∘ ξ)(x / α)      (n copies of η)
//! ```
//!
//! which keeps ξ'(0) = 1 by construction. α < 0 because the long return
//! moves the critical point to the left; a non-negative or vanishing η(0)
//! is an ill-posed normalization.
//!
//! # Provenance
//!
//! Commuting-pair formalism: Lanford, "Renormalization group methods for
//! circle mappings", in *Statistical Mechanics and Field Theory* (1988);
//! de Faria, "Asymptotic rigidity of scaling ratios for critical circle
//! mappings", Ergod. Th. Dynam. Sys. 19 (1999). For n = 1 the fixed point
//! reproduces the Feigenbaum-Kadanoff-Shenker constants.

use crate::error::{Result, UniversalityError};
use crate::index::{Branch, Combinatorics, IndexDescriptor};
use crate::space::{CoefficientVector, CriticalMap, FunctionSpace};
use crate::tolerances::NORMALIZATION_FLOOR;

/// A smooth map between coefficient vectors of fixed dimension.
///
/// The Newton solver and the Jacobian assembly only need this much; the
/// renormalization operator is the production implementation.
pub trait CoefficientMap {
    /// Length of input and output vectors.
    fn dimension(&self) -> usize;

    /// Apply the map.
    ///
    /// # Errors
    ///
    /// Implementation-defined; recoverable failures signal that `coeffs`
    /// lies outside the region where the map is defined.
    fn map(&self, coeffs: &[f64]) -> Result<CoefficientVector>;
}

/// The two series spaces of a commuting pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSpaces {
    /// ξ on [−1, 0].
    pub xi: FunctionSpace,
    /// η on [0, 1].
    pub eta: FunctionSpace,
}

impl PairSpaces {
    /// Pair spaces of truncation order N and critical exponent z.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] for N = 0 or an even exponent.
    pub fn new(order: usize, exponent: u32) -> Result<Self> {
        Ok(Self {
            xi: FunctionSpace::new(order, -1.0, 0.0, exponent)?,
            eta: FunctionSpace::new(order, 0.0, 1.0, exponent)?,
        })
    }

    /// Truncation order N of each map.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.xi.order()
    }

    /// Length 2N of a pair vector.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        2 * self.xi.order()
    }

    /// Same spaces at another truncation order.
    #[must_use]
    pub const fn with_order(&self, order: usize) -> Self {
        Self {
            xi: self.xi.with_order(order),
            eta: self.eta.with_order(order),
        }
    }

    /// Pad or truncate each half of a pair vector to `order`.
    #[must_use]
    pub fn resize_pair(coeffs: &[f64], order: usize) -> CoefficientVector {
        let half = coeffs.len() / 2;
        let (xi, eta) = coeffs.split_at(half);
        let mut out = FunctionSpace::resize(xi, order);
        out.extend(FunctionSpace::resize(eta, order));
        out
    }
}

/// Two maps (ξ, η) representing successive closest returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CommutingPair {
    /// Short return.
    pub xi: CriticalMap,
    /// Long return.
    pub eta: CriticalMap,
}

impl CommutingPair {
    /// Split a pair vector into its two maps.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DimensionMismatch`] if the length is not 2N.
    pub fn from_vector(spaces: &PairSpaces, coeffs: &[f64]) -> Result<Self> {
        let n = spaces.order();
        if coeffs.len() != 2 * n {
            return Err(UniversalityError::DimensionMismatch {
                expected: 2 * n,
                found: coeffs.len(),
            });
        }
        let (xi, eta) = coeffs.split_at(n);
        Ok(Self {
            xi: CriticalMap::new(spaces.xi, xi.to_vec())?,
            eta: CriticalMap::new(spaces.eta, eta.to_vec())?,
        })
    }

    /// Concatenate ξ and η coefficients.
    #[must_use]
    pub fn to_vector(&self) -> CoefficientVector {
        let mut out = self.xi.coefficients().to_vec();
        out.extend_from_slice(self.eta.coefficients());
        out
    }

    fn branch(&self, branch: Branch) -> &CriticalMap {
        match branch {
            Branch::Xi => &self.xi,
            Branch::Eta => &self.eta,
        }
    }

    /// Apply a composition word pointwise, first letter first.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DomainExceeded`] if an intermediate point leaves
    /// the admissible interval of the next branch.
    pub fn evaluate_word(&self, word: &[Branch], x: f64) -> Result<f64> {
        word.iter().try_fold(x, |y, &b| self.branch(b).eval(y))
    }

    /// Rescaling factor α = 1/η(0).
    ///
    /// # Errors
    ///
    /// [`UniversalityError::IllPosedNormalization`] unless η(0) is finite and
    /// below −[`NORMALIZATION_FLOOR`].
    pub fn scaling_factor(&self) -> Result<f64> {
        let value = self.eta.critical_value()?;
        if !value.is_finite() || value > -NORMALIZATION_FLOOR {
            return Err(UniversalityError::IllPosedNormalization { value });
        }
        Ok(1.0 / value)
    }
}

/// Output of one renormalization step.
#[derive(Debug, Clone, PartialEq)]
pub struct Renormalized {
    /// Renormalized pair vector.
    pub pair: CoefficientVector,
    /// Rescaling factor used.
    pub alpha: f64,
}

/// Renormalization operator for one index.
#[derive(Debug, Clone)]
pub struct RenormalizationOperator {
    spaces: PairSpaces,
    combinatorics: Combinatorics,
}

impl RenormalizationOperator {
    /// Operator with the combinatorics of `index` on `spaces`.
    #[must_use]
    pub fn new(index: &IndexDescriptor, spaces: PairSpaces) -> Self {
        Self {
            spaces,
            combinatorics: index.combinatorics.clone(),
        }
    }

    /// Spaces the operator acts on.
    #[must_use]
    pub const fn spaces(&self) -> &PairSpaces {
        &self.spaces
    }

    /// Renormalize a pair given as a coefficient vector.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::IllPosedNormalization`] if η(0) cannot fix α,
    /// [`UniversalityError::DomainExceeded`] if the compositions leave the
    /// pair's domains, [`UniversalityError::DimensionMismatch`] on a bad length.
    pub fn apply(&self, coeffs: &[f64]) -> Result<Renormalized> {
        let pair = CommutingPair::from_vector(&self.spaces, coeffs)?;
        let (next, alpha) = self.renormalize_pair(&pair)?;
        Ok(Renormalized {
            pair: next.to_vector(),
            alpha,
        })
    }

    /// Renormalize a pair, returning the new pair and α.
    ///
    /// # Errors
    ///
    /// As [`Self::apply`].
    pub fn renormalize_pair(&self, pair: &CommutingPair) -> Result<(CommutingPair, f64)> {
        let alpha = pair.scaling_factor()?;
        let xi = self
            .spaces
            .xi
            .conjugate(alpha, |y| pair.evaluate_word(&self.combinatorics.xi_word, y))?;
        let eta = self
            .spaces
            .eta
            .conjugate(alpha, |y| pair.evaluate_word(&self.combinatorics.eta_word, y))?;
        Ok((CommutingPair { xi, eta }, alpha))
    }
}

impl CoefficientMap for RenormalizationOperator {
    fn dimension(&self) -> usize {
        self.spaces.dimension()
    }

    fn map(&self, coeffs: &[f64]) -> Result<CoefficientVector> {
        self.apply(coeffs).map(|r| r.pair)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::tolerances::EXACT_F64;

    fn cubic_pair(spaces: &PairSpaces) -> CommutingPair {
        let xi = CriticalMap::from_fn(spaces.xi, |x| Ok(1.0 + 0.5 * x * x * x)).expect("xi");
        let eta = CriticalMap::from_fn(spaces.eta, |x| Ok(-0.8 + 1.5 * x * x * x)).expect("eta");
        CommutingPair { xi, eta }
    }

    #[test]
    fn renormalized_xi_is_normalized() {
        let spaces = PairSpaces::new(6, 3).expect("spaces");
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        let out = op
            .apply(&cubic_pair(&spaces).to_vector())
            .expect("well-posed");
        assert!((out.alpha + 1.25).abs() < EXACT_F64);
        let next = CommutingPair::from_vector(&spaces, &out.pair).expect("split");
        assert!((next.xi.critical_value().expect("xi(0)") - 1.0).abs() < EXACT_F64);
    }

    #[test]
    fn golden_step_matches_closed_form() {
        let spaces = PairSpaces::new(8, 3).expect("spaces");
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        let out = op
            .apply(&cubic_pair(&spaces).to_vector())
            .expect("well-posed");
        let next = CommutingPair::from_vector(&spaces, &out.pair).expect("split");
        let alpha = -1.25_f64;
        let xi = |x: f64| 1.0 + 0.5 * x * x * x;
        let eta = |x: f64| -0.8 + 1.5 * x * x * x;
        for x in [0.1, 0.5, 0.9] {
            let expected = alpha * eta(xi(x / alpha));
            let got = next.eta.eval(x).expect("admissible");
            assert!((got - expected).abs() < 1e-12, "x = {x}: {got} vs {expected}");
        }
        let expected = alpha * eta(-0.4 / alpha);
        assert!((next.xi.eval(-0.4).expect("admissible") - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_pair_is_ill_posed() {
        let spaces = PairSpaces::new(6, 3).expect("spaces");
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        assert!(matches!(
            op.apply(&vec![0.0; 12]),
            Err(UniversalityError::IllPosedNormalization { .. })
        ));
    }

    #[test]
    fn positive_critical_value_is_ill_posed() {
        let spaces = PairSpaces::new(4, 3).expect("spaces");
        let mut pair = cubic_pair(&spaces).to_vector();
        // shift η by +1 so η(0) = 0.2 > 0
        pair[4] += 1.0;
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        assert!(matches!(
            op.apply(&pair),
            Err(UniversalityError::IllPosedNormalization { value }) if value > 0.0
        ));
    }

    #[test]
    fn wrong_length_is_rejected() {
        let spaces = PairSpaces::new(4, 3).expect("spaces");
        let op = RenormalizationOperator::new(&IndexDescriptor::golden().expect("golden"), spaces);
        assert!(matches!(
            op.map(&[1.0; 5]),
            Err(UniversalityError::DimensionMismatch { expected: 8, found: 5 })
        ));
        assert_eq!(op.dimension(), 8);
    }

    #[test]
    fn word_evaluation_order() {
        let spaces = PairSpaces::new(6, 3).expect("spaces");
        let pair = cubic_pair(&spaces);
        let y = pair
            .evaluate_word(&[Branch::Xi, Branch::Eta], -0.5)
            .expect("admissible");
        let xi = 1.0 + 0.5 * (-0.125);
        let expected = -0.8 + 1.5 * xi * xi * xi;
        assert!((y - expected).abs() < EXACT_F64);
    }

    #[test]
    fn resize_pair_keeps_halves_aligned() {
        let v = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(PairSpaces::resize_pair(&v, 3), vec![1.0, 2.0, 0.0, 3.0, 4.0, 0.0]);
        assert_eq!(PairSpaces::resize_pair(&v, 1), vec![1.0, 3.0]);
    }
}
