// SPDX-License-Identifier: AGPL-3.0-only

//! Canonical initial guess for the fixed-point solve.
//!
//! The seed is a renormalized return pair of the critical sine circle map
//!
//! ```text
//! F_Ω(x) = x + Ω − sin(2πx) / (2π)
//! ```
//!
//! (cubic inflection at x = 0) with Ω tuned so that the orbit of the
//! critical point closes after q_L steps with p_L turns, for a deep
//! convergent p_L/q_L of 1/φ_n. At a shallower level K the pair
//!
//! ```text
//! ξ(x) = (F^{q_{K-1}}(s x) − p_{K-1}) / s
//! η(x) = (F^{q_K}(s x) − p_K) / s,        s = F^{q_{K-1}}(0) − p_{K-1}
//! ```
//!
//! is already close to the renormalization fixed point and lies well inside
//! the Newton basin for every supported index.

use tracing::debug;

use crate::error::{Result, UniversalityError};
use crate::index::IndexDescriptor;
use crate::metallic::{convergents, Convergent};
use crate::renormalization::{CommutingPair, PairSpaces};
use crate::space::{CoefficientVector, CriticalMap};
use crate::tolerances::{SEED_BISECTION_ITERATIONS, SEED_PAIR_PERIOD_MAX, SEED_TARGET_PERIOD_MAX};

/// Parameters the seed was built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleMapSeed {
    /// Tuned rotation parameter Ω.
    pub omega: f64,
    /// Pair level K.
    pub level: usize,
    /// Level L used to place Ω.
    pub target_level: usize,
    /// Rescaling s = F^{q_{K-1}}(0) − p_{K-1}.
    pub scale: f64,
}

/// Critical sine circle map lift.
fn circle_map(omega: f64, x: f64) -> f64 {
    use std::f64::consts::TAU;
    x + omega - (TAU * x).sin() / TAU
}

fn iterate(omega: f64, x: f64, steps: u64) -> f64 {
    (0..steps).fold(x, |y, _| circle_map(omega, y))
}

/// Pair level K and target level L for partial quotient n.
fn levels(conv: &[Convergent]) -> (usize, usize) {
    let last_within = |max: u64| {
        conv.iter()
            .rposition(|c| c.q <= max)
            .unwrap_or(0)
    };
    let pair = last_within(SEED_PAIR_PERIOD_MAX).max(1);
    let target = last_within(SEED_TARGET_PERIOD_MAX).max(pair + 2);
    (pair, target)
}

/// Ω ∈ [0, 1] with F_Ω^q(0) = p, by bisection.
///
/// F_0 fixes 0 and F_1 translates the integers by one, so the residual
/// changes sign on [0, 1] for every 0 ≤ p < q.
fn superstable_parameter(target: Convergent) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let p = target.p as f64;
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..SEED_BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if iterate(mid, 0.0, target.q) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Build the canonical seed pair for `index` on `spaces`.
///
/// # Errors
///
/// [`UniversalityError::IllPosedNormalization`] if the scale s vanishes
/// (cannot happen for a correctly tuned Ω); interpolation errors propagate.
pub fn canonical_seed(
    index: &IndexDescriptor,
    spaces: &PairSpaces,
) -> Result<(CoefficientVector, CircleMapSeed)> {
    let n = u64::from(index.n);
    let conv = convergents(n, 64);
    let (level, target_level) = levels(&conv);
    let target = conv.get(target_level).copied().ok_or_else(|| {
        UniversalityError::InvalidConfig(format!(
            "convergent {target_level} of 1/φ_{n} overflows u64"
        ))
    })?;
    let omega = superstable_parameter(target);

    let short = conv[level - 1];
    let long = conv[level];
    #[allow(clippy::cast_precision_loss)]
    let (p_short, p_long) = (short.p as f64, long.p as f64);
    let scale = iterate(omega, 0.0, short.q) - p_short;
    if scale == 0.0 || !scale.is_finite() {
        return Err(UniversalityError::IllPosedNormalization { value: scale });
    }

    let xi = CriticalMap::from_fn(spaces.xi, |x| {
        Ok((iterate(omega, scale * x, short.q) - p_short) / scale)
    })?;
    let eta = CriticalMap::from_fn(spaces.eta, |x| {
        Ok((iterate(omega, scale * x, long.q) - p_long) / scale)
    })?;
    let seed = CircleMapSeed {
        omega,
        level,
        target_level,
        scale,
    };
    debug!(
        n = index.n,
        omega,
        level,
        target_level,
        scale,
        "canonical seed from critical sine map"
    );
    Ok((CommutingPair { xi, eta }.to_vector(), seed))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn golden_levels() {
        let conv = convergents(1, 64);
        let (k, l) = levels(&conv);
        // q_15 = F_16 = 987, q_26 = F_27 = 196418
        assert_eq!(conv[k].q, 987);
        assert_eq!(conv[l].q, 196_418);
    }

    #[test]
    fn large_n_levels_keep_two_level_gap() {
        let conv = convergents(29, 64);
        let (k, l) = levels(&conv);
        assert_eq!((k, l), (2, 4));
        let conv = convergents(199, 64);
        assert_eq!(levels(&conv), (1, 3));
    }

    #[test]
    fn golden_parameter_near_known_value() {
        // Critical golden-mean parameter of the sine family: Ω ≈ 0.6066610635
        let conv = convergents(1, 30);
        let omega = superstable_parameter(conv[20]);
        assert!((omega - 0.606_661_063_5).abs() < 1e-8, "Ω = {omega}");
    }

    #[test]
    fn seed_pair_is_normalized() {
        let spaces = PairSpaces::new(12, 3).expect("spaces");
        let idx = IndexDescriptor::golden().expect("golden");
        let (coeffs, seed) = canonical_seed(&idx, &spaces).expect("seed");
        assert_eq!(coeffs.len(), 24);
        let pair = CommutingPair::from_vector(&spaces, &coeffs).expect("split");
        assert!((pair.xi.critical_value().expect("xi(0)") - 1.0).abs() < 1e-10);
        let alpha = pair.scaling_factor().expect("well-posed");
        // already within a few 1e-4 of the fixed-point α ≈ −1.2886
        assert!((alpha + 1.288_6).abs() < 1e-2, "α = {alpha}");
        assert!(seed.scale.abs() < 0.1);
    }

    #[test]
    fn silver_seed_alpha() {
        let spaces = PairSpaces::new(10, 3).expect("spaces");
        let idx = IndexDescriptor::metallic(2).expect("silver");
        let (coeffs, _) = canonical_seed(&idx, &spaces).expect("seed");
        let pair = CommutingPair::from_vector(&spaces, &coeffs).expect("split");
        let alpha = pair.scaling_factor().expect("well-posed");
        assert!((alpha + 1.586_8).abs() < 2e-2, "α = {alpha}");
    }
}
