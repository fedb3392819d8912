// SPDX-License-Identifier: AGPL-3.0-only

//! Truncated Chebyshev representation of critical maps.
//!
//! A map with an inflection of odd order z at x = 0 is analytic in
//! t = x^z, so it is stored as a Chebyshev series in t over the image of
//! its x-interval:
//!
//! ```text
//! f(x) = Σ_{k<N} c_k T_k(u),   u = (2 x^z − (t_lo + t_hi)) / (t_hi − t_lo)
//! ```
//!
//! Interpolation samples at the N Chebyshev nodes of the first kind (in t)
//! and applies a DCT-II; evaluation is the Clenshaw recurrence. Composition
//! and rescaling sample the exact pointwise result at the nodes and refit,
//! which re-truncates to N terms.
//!
//! # Provenance
//!
//! Representation in t = x³ follows Mestel, "A computer assisted proof of
//! universality for cubic critical maps of the circle with golden mean
//! rotation number", PhD thesis, Warwick (1985). Clenshaw and DCT
//! interpolation: Trefethen, *Approximation Theory and Approximation
//! Practice* (SIAM, 2013), ch. 3-4.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UniversalityError};
use crate::tolerances::DOMAIN_SLACK;

/// Chebyshev coefficients of one map (length N) or of a commuting pair
/// (length 2N, ξ then η).
pub type CoefficientVector = Vec<f64>;

/// Location of the critical point of every represented map.
pub const CRITICAL_POINT: f64 = 0.0;

/// Truncation order, x-interval and critical exponent of a series space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpace {
    order: usize,
    lo: f64,
    hi: f64,
    exponent: u32,
}

impl FunctionSpace {
    /// Create a space of `order` coefficients on `[lo, hi]` for critical
    /// exponent `exponent`.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] if the order is zero, the
    /// interval is empty or not finite, or the exponent is even.
    pub fn new(order: usize, lo: f64, hi: f64, exponent: u32) -> Result<Self> {
        if order == 0 {
            return Err(UniversalityError::InvalidConfig(
                "truncation order must be positive".into(),
            ));
        }
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(UniversalityError::InvalidConfig(format!(
                "function space interval [{lo}, {hi}] is empty or not finite"
            )));
        }
        if exponent % 2 == 0 {
            return Err(UniversalityError::InvalidConfig(format!(
                "critical exponent must be odd, got {exponent}"
            )));
        }
        Ok(Self {
            order,
            lo,
            hi,
            exponent,
        })
    }

    /// Number of coefficients N.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Declared x-interval.
    #[must_use]
    pub const fn domain(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    /// Critical exponent z.
    #[must_use]
    pub const fn exponent(&self) -> u32 {
        self.exponent
    }

    /// Same interval and exponent, different truncation order.
    #[must_use]
    pub const fn with_order(&self, order: usize) -> Self {
        Self { order, ..*self }
    }

    /// Interval on which evaluation is accepted: the domain widened by
    /// [`DOMAIN_SLACK`] times its width on each side.
    #[must_use]
    pub fn admissible(&self) -> (f64, f64) {
        let slack = DOMAIN_SLACK * (self.hi - self.lo);
        (self.lo - slack, self.hi + slack)
    }

    fn to_t(&self, x: f64) -> f64 {
        match self.exponent {
            1 => x,
            3 => x * x * x,
            z => x.powi(i32::try_from(z).unwrap_or(i32::MAX)),
        }
    }

    fn from_t(&self, t: f64) -> f64 {
        match self.exponent {
            1 => t,
            3 => t.cbrt(),
            z => t.signum() * t.abs().powf(1.0 / f64::from(z)),
        }
    }

    fn t_bounds(&self) -> (f64, f64) {
        (self.to_t(self.lo), self.to_t(self.hi))
    }

    /// Chebyshev variable u ∈ [−1, 1] for a point x of the domain.
    fn to_u(&self, x: f64) -> f64 {
        let (t_lo, t_hi) = self.t_bounds();
        2.0_f64.mul_add(self.to_t(x), -(t_lo + t_hi)) / (t_hi - t_lo)
    }

    fn node_u(&self, j: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let theta = PI * (j as f64 + 0.5) / self.order as f64;
        theta.cos()
    }

    /// Interpolation nodes in x (Chebyshev points of the first kind in t).
    #[must_use]
    pub fn nodes(&self) -> Vec<f64> {
        let (t_lo, t_hi) = self.t_bounds();
        let mid = 0.5 * (t_lo + t_hi);
        let half = 0.5 * (t_hi - t_lo);
        (0..self.order)
            .map(|j| self.from_t(half.mul_add(self.node_u(j), mid)))
            .collect()
    }

    fn check_len(&self, coeffs: &[f64]) -> Result<()> {
        if coeffs.len() == self.order {
            Ok(())
        } else {
            Err(UniversalityError::DimensionMismatch {
                expected: self.order,
                found: coeffs.len(),
            })
        }
    }

    /// Evaluate the series `coeffs` at `x`.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DomainExceeded`] if `x` is NaN or outside
    /// [`Self::admissible`]; [`UniversalityError::DimensionMismatch`] if
    /// `coeffs` does not have N entries.
    pub fn evaluate(&self, coeffs: &[f64], x: f64) -> Result<f64> {
        self.check_len(coeffs)?;
        let (min, max) = self.admissible();
        if !(x >= min && x <= max) {
            return Err(UniversalityError::DomainExceeded { x, lo: min, hi: max });
        }
        Ok(clenshaw(coeffs, self.to_u(x)))
    }

    /// Fit coefficients to values sampled at [`Self::nodes`] (DCT-II).
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DimensionMismatch`] if `values` does not have N entries.
    pub fn fit(&self, values: &[f64]) -> Result<CoefficientVector> {
        self.check_len(values)?;
        #[allow(clippy::cast_precision_loss)]
        let n = self.order as f64;
        Ok((0..self.order)
            .map(|k| {
                let acc: f64 = values
                    .iter()
                    .enumerate()
                    .map(|(j, v)| {
                        #[allow(clippy::cast_precision_loss)]
                        let arg = PI * k as f64 * (j as f64 + 0.5) / n;
                        v * arg.cos()
                    })
                    .sum();
                if k == 0 {
                    acc / n
                } else {
                    2.0 * acc / n
                }
            })
            .collect())
    }

    /// Interpolate a fallible pointwise function at the nodes.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `f`.
    pub fn interpolate<F>(&self, mut f: F) -> Result<CoefficientVector>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let values = self
            .nodes()
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<f64>>>()?;
        self.fit(&values)
    }

    /// `outer ∘ inner`, represented in this space.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DomainExceeded`] if `inner` maps a node outside
    /// the admissible interval of `outer`.
    pub fn compose(&self, outer: &CriticalMap, inner: &CriticalMap) -> Result<CriticalMap> {
        let coeffs = self.interpolate(|x| outer.eval(inner.eval(x)?))?;
        Ok(CriticalMap {
            space: *self,
            coeffs,
        })
    }

    /// Conjugate by the linear scaling: x ↦ factor · map(x / factor).
    ///
    /// # Errors
    ///
    /// [`UniversalityError::IllPosedNormalization`] for a zero or non-finite
    /// factor; [`UniversalityError::DomainExceeded`] if x / factor leaves the
    /// admissible interval of `map`.
    pub fn rescale(&self, map: &CriticalMap, factor: f64) -> Result<CriticalMap> {
        self.conjugate(factor, |y| map.eval(y))
    }

    /// Interpolate x ↦ factor · f(x / factor) for a pointwise map `f`.
    ///
    /// Used when `f` is itself a composition that is only valid on the
    /// rescaled image of this space, so it is never fitted on its own.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::IllPosedNormalization`] for a zero or non-finite
    /// factor; otherwise the first error returned by `f`.
    pub fn conjugate<F>(&self, factor: f64, mut f: F) -> Result<CriticalMap>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        if factor == 0.0 || !factor.is_finite() {
            return Err(UniversalityError::IllPosedNormalization { value: factor });
        }
        let coeffs = self.interpolate(|x| Ok(factor * f(x / factor)?))?;
        Ok(CriticalMap {
            space: *self,
            coeffs,
        })
    }

    /// Pad with zeros or truncate to `order` coefficients.
    #[must_use]
    pub fn resize(coeffs: &[f64], order: usize) -> CoefficientVector {
        let mut out = vec![0.0; order];
        let keep = order.min(coeffs.len());
        out[..keep].copy_from_slice(&coeffs[..keep]);
        out
    }
}

/// Σ c_k T_k(u) by the Clenshaw recurrence.
fn clenshaw(coeffs: &[f64], u: f64) -> f64 {
    let Some((&c0, rest)) = coeffs.split_first() else {
        return 0.0;
    };
    let two_u = 2.0 * u;
    let (mut b1, mut b2) = (0.0, 0.0);
    for &c in rest.iter().rev() {
        let b0 = two_u.mul_add(b1, -b2) + c;
        b2 = b1;
        b1 = b0;
    }
    u.mul_add(b1, c0) - b2
}

/// A truncated series together with the space it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalMap {
    space: FunctionSpace,
    coeffs: CoefficientVector,
}

impl CriticalMap {
    /// Wrap coefficients in their space.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DimensionMismatch`] if the length is not N.
    pub fn new(space: FunctionSpace, coeffs: CoefficientVector) -> Result<Self> {
        space.check_len(&coeffs)?;
        Ok(Self { space, coeffs })
    }

    /// Interpolate `f` in `space`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `f`.
    pub fn from_fn<F>(space: FunctionSpace, f: F) -> Result<Self>
    where
        F: FnMut(f64) -> Result<f64>,
    {
        let coeffs = space.interpolate(f)?;
        Ok(Self { space, coeffs })
    }

    /// Evaluate at `x`.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DomainExceeded`] outside the admissible interval.
    pub fn eval(&self, x: f64) -> Result<f64> {
        self.space.evaluate(&self.coeffs, x)
    }

    /// Value at the critical point.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DomainExceeded`] if the critical point is not
    /// admissible for this space.
    pub fn critical_value(&self) -> Result<f64> {
        self.eval(CRITICAL_POINT)
    }

    /// The space this map lives in.
    #[must_use]
    pub const fn space(&self) -> &FunctionSpace {
        &self.space
    }

    /// Series coefficients.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coeffs
    }

    /// Consume into the coefficient vector.
    #[must_use]
    pub fn into_coefficients(self) -> CoefficientVector {
        self.coeffs
    }

    /// `(x, f(x))` on `count` evenly spaced points of the declared domain.
    ///
    /// # Errors
    ///
    /// Never fails for `count ≥ 2`; the signature mirrors [`Self::eval`].
    pub fn sample(&self, count: usize) -> Result<Vec<(f64, f64)>> {
        let (lo, hi) = self.space.domain();
        let steps = count.max(2) - 1;
        (0..=steps)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let x = lo + (hi - lo) * i as f64 / steps as f64;
                Ok((x, self.eval(x)?))
            })
            .collect()
    }
}
