// SPDX-License-Identifier: AGPL-3.0-only

//! Metallic-mean arithmetic: φ_n, continued-fraction convergents, Lucas and
//! Fibonacci numbers, and the closed-form identities behind the exceptional
//! family n = L_{2k-1}.
//!
//! The n-th metallic mean φ_n = (n + √(n² + 4)) / 2 has continued fraction
//! [n; n, n, …]. For odd m the Lucas number L_m satisfies
//! φ_{L_m} = φ^m exactly, which is why the indices 1, 4, 11, 29, 76, … are
//! expected to share scaling behavior with the golden mean.
//!
//! # Provenance
//!
//! Binet forms and the quadratic-field classification n² + 4 = 5m² follow
//! Koshy, *Fibonacci and Lucas Numbers with Applications* (Wiley, 2001),
//! ch. 5 and 29. The Catalan expansion of φ_n is the generating-function
//! inversion of φ_n − n = 1/φ_n.

use serde::Serialize;

use crate::tolerances::{IDENTITY_REL_TOLERANCE, NEAR_ZERO_EXPECTED};

/// m-th Lucas number (L₀ = 2, L₁ = 1). `None` on u64 overflow.
#[must_use]
pub fn lucas(m: u32) -> Option<u64> {
    linear_recurrence(2, 1, m)
}

/// m-th Fibonacci number (F₀ = 0, F₁ = 1). `None` on u64 overflow.
#[must_use]
pub fn fibonacci(m: u32) -> Option<u64> {
    linear_recurrence(0, 1, m)
}

fn linear_recurrence(first: u64, second: u64, m: u32) -> Option<u64> {
    let (mut a, mut b) = (first, second);
    for _ in 0..m {
        let next = a.checked_add(b)?;
        a = b;
        b = next;
    }
    Some(a)
}

/// The golden mean φ = (1 + √5) / 2.
#[must_use]
pub fn golden_mean() -> f64 {
    0.5 * (1.0 + 5.0_f64.sqrt())
}

/// The n-th metallic mean φ_n = (n + √(n² + 4)) / 2.
#[must_use]
pub fn metallic_mean(n: f64) -> f64 {
    0.5 * (n + n.mul_add(n, 4.0).sqrt())
}

/// Lucas number via Binet: φ^m + ψ^m with ψ = −1/φ.
#[must_use]
pub fn binet_lucas(m: i32) -> f64 {
    let phi = golden_mean();
    phi.powi(m) + (-1.0 / phi).powi(m)
}

/// Fibonacci number via Binet: (φ^m − ψ^m) / √5.
#[must_use]
pub fn binet_fibonacci(m: i32) -> f64 {
    let phi = golden_mean();
    (phi.powi(m) - (-1.0 / phi).powi(m)) / 5.0_f64.sqrt()
}

/// A continued-fraction convergent p/q of 1/φ_n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Convergent {
    /// Numerator (number of turns).
    pub p: u64,
    /// Denominator (return time).
    pub q: u64,
}

/// First `count` convergents of 1/φ_n = [0; n, n, …].
///
/// p₀/q₀ = 0/1, p₁/q₁ = 1/n, and both sequences obey x_{j+1} = n x_j + x_{j-1}.
/// The list stops early if q would overflow u64.
#[must_use]
pub fn convergents(n: u64, count: usize) -> Vec<Convergent> {
    let mut out = Vec::with_capacity(count);
    let mut prev = Convergent { p: 0, q: 1 };
    let mut curr = Convergent { p: 1, q: n };
    for j in 0..count {
        match j {
            0 => out.push(prev),
            1 => out.push(curr),
            _ => {
                let next = n
                    .checked_mul(curr.q)
                    .and_then(|v| v.checked_add(prev.q))
                    .zip(n.checked_mul(curr.p).and_then(|v| v.checked_add(prev.p)));
                let Some((q, p)) = next else { break };
                prev = curr;
                curr = Convergent { p, q };
                out.push(curr);
            }
        }
    }
    out
}

/// One member of the exceptional family n = L_{2k-1}.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExceptionalMember {
    /// Family parameter k ≥ 1.
    pub k: u32,
    /// Golden exponent 2k − 1.
    pub exponent: u32,
    /// Index n = L_{2k-1}.
    pub index: u64,
    /// φ^{2k-1}, equal to φ_n.
    pub golden_power: f64,
}

/// Exceptional family members for k = 1..=k_max (stops on Lucas overflow).
#[must_use]
pub fn exceptional_family(k_max: u32) -> Vec<ExceptionalMember> {
    let phi = golden_mean();
    (1..=k_max)
        .map_while(|k| {
            let exponent = 2 * k - 1;
            lucas(exponent).map(|index| ExceptionalMember {
                k,
                exponent,
                index,
                golden_power: phi.powi(power_exponent(exponent)),
            })
        })
        .collect()
}

fn power_exponent(exponent: u32) -> i32 {
    i32::try_from(exponent).unwrap_or(i32::MAX)
}

/// Outcome of comparing two closed-form expressions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityCheck {
    /// Human-readable identity.
    pub label: String,
    /// Left-hand side.
    pub lhs: f64,
    /// Right-hand side.
    pub rhs: f64,
    /// |lhs − rhs| / |rhs| (absolute when rhs ≈ 0).
    pub relative_error: f64,
    /// Whether the relative error is within tolerance.
    pub holds: bool,
}

impl IdentityCheck {
    fn new(label: impl Into<String>, lhs: f64, rhs: f64, tolerance: f64) -> Self {
        let abs_err = (lhs - rhs).abs();
        let relative_error = if rhs.abs() > NEAR_ZERO_EXPECTED {
            abs_err / rhs.abs()
        } else {
            abs_err
        };
        Self {
            label: label.into(),
            lhs,
            rhs,
            relative_error,
            holds: relative_error <= tolerance,
        }
    }
}

/// φ_{L_{2k-1}} = φ^{2k-1}. `None` if k = 0 or L_{2k-1} overflows.
#[must_use]
pub fn metallic_power_identity(k: u32) -> Option<IdentityCheck> {
    if k == 0 {
        return None;
    }
    let exponent = 2 * k - 1;
    let index = lucas(exponent)?;
    #[allow(clippy::cast_precision_loss)]
    let lhs = metallic_mean(index as f64);
    let rhs = golden_mean().powi(power_exponent(exponent));
    Some(IdentityCheck::new(
        format!("φ_(L_{exponent}) = φ^{exponent} (n = {index})"),
        lhs,
        rhs,
        IDENTITY_REL_TOLERANCE,
    ))
}

/// If n² + 4 = 5m² for an integer m, return m.
///
/// These are exactly the n for which √(n² + 4) ∈ ℚ(√5), i.e. φ_n lies in the
/// golden field. The solutions are n = L_{2k-1}, m = F_{2k-1}.
#[must_use]
pub fn golden_field_multiplier(n: u64) -> Option<u64> {
    let v = u128::from(n) * u128::from(n) + 4;
    if v % 5 != 0 {
        return None;
    }
    let m2 = v / 5;
    let m = integer_sqrt(m2);
    (m * m == m2).then(|| u64::try_from(m).ok()).flatten()
}

/// The k for which n = L_{2k-1}, if any.
#[must_use]
pub fn exceptional_k(n: u64) -> Option<u32> {
    let m = golden_field_multiplier(n)?;
    (1..=47).find(|&k| fibonacci(2 * k - 1) == Some(m))
}

fn integer_sqrt(v: u128) -> u128 {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut r = (v as f64).sqrt() as u128;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

/// First `count` Catalan numbers C₀, C₁, … (stops on overflow).
#[must_use]
pub fn catalan_numbers(count: usize) -> Vec<u64> {
    let mut out = Vec::with_capacity(count);
    let mut c: u128 = 1;
    for k in 0..count {
        let Ok(value) = u64::try_from(c) else { break };
        out.push(value);
        let k = k as u128;
        c = c * 2 * (2 * k + 1) / (k + 2);
    }
    out
}

/// Large-n expansion φ_n = n + Σ_{k<terms} (−1)^k C_k n^{−(2k+1)}.
#[must_use]
pub fn asymptotic_metallic_mean(n: f64, terms: usize) -> f64 {
    let inv = 1.0 / n;
    let inv2 = inv * inv;
    let mut power = inv;
    let mut sum = n;
    for (k, c) in catalan_numbers(terms).into_iter().enumerate() {
        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
        #[allow(clippy::cast_precision_loss)]
        let c = c as f64;
        sum += sign * c * power;
        power *= inv2;
    }
    sum
}

/// Golden-mean identities from the regular pentagon and fifth roots of unity.
#[must_use]
pub fn pentagonal_identities() -> Vec<IdentityCheck> {
    use std::f64::consts::PI;
    let phi = golden_mean();
    let tol = IDENTITY_REL_TOLERANCE;
    vec![
        IdentityCheck::new("2cos(π/5) = φ", 2.0 * (PI / 5.0).cos(), phi, tol),
        IdentityCheck::new("2cos(2π/5) = 1/φ", 2.0 * (2.0 * PI / 5.0).cos(), 1.0 / phi, tol),
        IdentityCheck::new("φ² = φ + 1", phi * phi, phi + 1.0, tol),
        IdentityCheck::new("1/φ − φ = −1", 1.0 / phi - phi, -1.0, tol),
        IdentityCheck::new(
            "2cos(2π/5) + 2cos(4π/5) = −1",
            2.0 * (2.0 * PI / 5.0).cos() + 2.0 * (4.0 * PI / 5.0).cos(),
            -1.0,
            tol,
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn lucas_and_fibonacci_values() {
        assert_eq!(lucas(0), Some(2));
        assert_eq!(lucas(1), Some(1));
        assert_eq!(lucas(2), Some(3));
        assert_eq!(lucas(3), Some(4));
        assert_eq!(lucas(5), Some(11));
        assert_eq!(fibonacci(0), Some(0));
        assert_eq!(fibonacci(1), Some(1));
        assert_eq!(fibonacci(5), Some(5));
        assert_eq!(fibonacci(7), Some(13));
        assert_eq!(fibonacci(93), None);
    }

    #[test]
    fn binet_matches_recurrence() {
        for m in 0..30_u32 {
            let l = lucas(m).expect("small lucas") as f64;
            let f = fibonacci(m).expect("small fibonacci") as f64;
            let mi = i32::try_from(m).expect("small m");
            assert!((binet_lucas(mi) - l).abs() < 1e-6 * l.max(1.0));
            assert!((binet_fibonacci(mi) - f).abs() < 1e-6 * f.max(1.0));
        }
    }

    #[test]
    fn metallic_means() {
        assert!((metallic_mean(1.0) - golden_mean()).abs() < 1e-15);
        assert!((metallic_mean(2.0) - (1.0 + 2.0_f64.sqrt())).abs() < 1e-15);
        // φ_n − n = 1/φ_n
        for n in 1..20 {
            let n = f64::from(n);
            let phi = metallic_mean(n);
            assert!((phi - n - 1.0 / phi).abs() < 1e-13);
        }
    }

    #[test]
    fn convergents_of_golden_are_fibonacci_ratios() {
        let c = convergents(1, 10);
        assert_eq!(c.len(), 10);
        for (j, conv) in c.iter().enumerate() {
            let j = u32::try_from(j).expect("small");
            assert_eq!(conv.q, fibonacci(j + 1).expect("small"));
            assert_eq!(conv.p, fibonacci(j).expect("small"));
        }
    }

    #[test]
    fn convergents_of_silver() {
        let q: Vec<u64> = convergents(2, 6).iter().map(|c| c.q).collect();
        assert_eq!(q, vec![1, 2, 5, 12, 29, 70]);
        let p: Vec<u64> = convergents(2, 6).iter().map(|c| c.p).collect();
        assert_eq!(p, vec![0, 1, 2, 5, 12, 29]);
    }

    #[test]
    fn convergents_stop_on_overflow() {
        let c = convergents(1 << 40, 10);
        assert!(c.len() < 10);
        assert_eq!(c[1].q, 1 << 40);
    }

    #[test]
    fn exceptional_family_indices() {
        let indices: Vec<u64> = exceptional_family(7).iter().map(|m| m.index).collect();
        assert_eq!(indices, vec![1, 4, 11, 29, 76, 199, 521]);
        let fam = exceptional_family(3);
        assert_eq!(fam[2].exponent, 5);
        assert!((fam[2].golden_power - metallic_mean(11.0)).abs() < 1e-12);
    }

    #[test]
    fn metallic_power_identity_holds() {
        for k in 1..=7 {
            let check = metallic_power_identity(k).expect("small k");
            assert!(check.holds, "{}: rel err {}", check.label, check.relative_error);
        }
        assert!(metallic_power_identity(0).is_none());
    }

    #[test]
    fn quadratic_field_classification() {
        for n in [1, 4, 11, 29, 76, 199, 521] {
            assert!(golden_field_multiplier(n).is_some(), "n = {n}");
        }
        for n in [2, 3, 5, 6, 7, 10, 12, 28, 30] {
            assert!(golden_field_multiplier(n).is_none(), "n = {n}");
        }
        assert_eq!(golden_field_multiplier(11), Some(5));
        assert_eq!(exceptional_k(29), Some(4));
        assert_eq!(exceptional_k(1), Some(1));
        assert_eq!(exceptional_k(2), None);
    }

    #[test]
    fn catalan_prefix() {
        assert_eq!(catalan_numbers(5), vec![1, 1, 2, 5, 14]);
        assert_eq!(catalan_numbers(8)[7], 429);
    }

    #[test]
    fn asymptotic_expansion_large_n() {
        let n = 1000.0;
        let err = (asymptotic_metallic_mean(n, 5) - metallic_mean(n)).abs();
        assert!(err < 1e-10, "err = {err}");
    }

    #[test]
    fn pentagonal_identities_hold() {
        let checks = pentagonal_identities();
        assert_eq!(checks.len(), 5);
        for c in &checks {
            assert!(c.holds, "{} failed: {:e}", c.label, c.relative_error);
        }
    }
}
