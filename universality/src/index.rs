// SPDX-License-Identifier: AGPL-3.0-only

//! Index descriptors: which metallic mean is being solved and how the
//! renormalization operator composes for it.
//!
//! For rotation number 1/φ_n = [0; n, n, …] the first-return
//! renormalization of a commuting pair (ξ, η) keeps the combinatorics
//!
//! ```text
//! ξ' ← η
//! η' ← η ∘ … ∘ η ∘ ξ      (η applied n times after ξ)
//! ```
//!
//! so the descriptor carries the two composition words explicitly and the
//! operator never branches on the numeric value of n.

use serde::Serialize;

use crate::error::{Result, UniversalityError};
use crate::metallic::{golden_mean, lucas, metallic_mean};

/// Largest partial quotient accepted.
///
/// Seed construction bisects on F^{q_L}(0) with q_L ~ n³ for large n; at
/// n = 199 that is already ~8·10⁶ circle-map steps per bisection.
pub const MAX_PARTIAL_QUOTIENT: u32 = 200;

/// One branch of a commuting pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Branch {
    /// The short return ξ.
    Xi,
    /// The long return η.
    Eta,
}

/// Composition words of the renormalization step.
///
/// Words are listed in application order: the first entry acts first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combinatorics {
    /// Word producing the new ξ.
    pub xi_word: Vec<Branch>,
    /// Word producing the new η.
    pub eta_word: Vec<Branch>,
}

impl Combinatorics {
    /// Combinatorics of the constant continued fraction [n, n, …].
    #[must_use]
    pub fn metallic(n: u32) -> Self {
        let mut eta_word = Vec::with_capacity(n as usize + 1);
        eta_word.push(Branch::Xi);
        eta_word.extend(std::iter::repeat(Branch::Eta).take(n as usize));
        Self {
            xi_word: vec![Branch::Eta],
            eta_word,
        }
    }

    /// Composition depth of the long branch.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.eta_word.len()
    }
}

/// Which family an index was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum IndexFamily {
    /// Arbitrary metallic mean φ_n.
    Metallic,
    /// n = L_{2k-1}, for which φ_n = φ^{2k-1}.
    Exceptional {
        /// Family parameter.
        k: u32,
    },
}

/// Immutable description of one index solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDescriptor {
    /// Partial quotient n.
    pub n: u32,
    /// Family the index was requested from.
    pub family: IndexFamily,
    /// Rotation number 1/φ_n.
    pub rotation_number: f64,
    /// Composition words.
    pub combinatorics: Combinatorics,
    /// Expected rescaling exponent ln φ_n / ln φ (exactly 2k − 1 for the
    /// exceptional family).
    pub scaling_exponent: f64,
}

impl IndexDescriptor {
    /// Descriptor for φ_n.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] if n is 0 or above [`MAX_PARTIAL_QUOTIENT`].
    pub fn metallic(n: u32) -> Result<Self> {
        Self::build(n, IndexFamily::Metallic)
    }

    /// Descriptor for n = L_{2k-1}.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] if k is 0 or L_{2k-1} exceeds
    /// [`MAX_PARTIAL_QUOTIENT`].
    pub fn exceptional(k: u32) -> Result<Self> {
        if k == 0 {
            return Err(UniversalityError::InvalidConfig(
                "exceptional family starts at k = 1".into(),
            ));
        }
        let n = lucas(2 * k - 1)
            .and_then(|l| u32::try_from(l).ok())
            .filter(|&l| l <= MAX_PARTIAL_QUOTIENT)
            .ok_or_else(|| {
                UniversalityError::InvalidConfig(format!(
                    "exceptional index for k = {k} exceeds n = {MAX_PARTIAL_QUOTIENT}"
                ))
            })?;
        Self::build(n, IndexFamily::Exceptional { k })
    }

    /// The golden mean, n = 1 = L₁.
    ///
    /// # Errors
    ///
    /// Never fails; kept fallible for symmetry with the other constructors.
    pub fn golden() -> Result<Self> {
        Self::exceptional(1)
    }

    fn build(n: u32, family: IndexFamily) -> Result<Self> {
        if n == 0 || n > MAX_PARTIAL_QUOTIENT {
            return Err(UniversalityError::InvalidConfig(format!(
                "partial quotient must lie in 1..={MAX_PARTIAL_QUOTIENT}, got {n}"
            )));
        }
        let phi_n = metallic_mean(f64::from(n));
        Ok(Self {
            n,
            family,
            rotation_number: 1.0 / phi_n,
            combinatorics: Combinatorics::metallic(n),
            scaling_exponent: phi_n.ln() / golden_mean().ln(),
        })
    }

    /// Family parameter k for exceptional indices.
    #[must_use]
    pub const fn k(&self) -> Option<u32> {
        match self.family {
            IndexFamily::Exceptional { k } => Some(k),
            IndexFamily::Metallic => None,
        }
    }

    /// Short label for logs and tables.
    #[must_use]
    pub fn label(&self) -> String {
        match self.family {
            IndexFamily::Exceptional { k } => format!("n={} (k={k})", self.n),
            IndexFamily::Metallic => format!("n={}", self.n),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn golden_word_is_eta_after_xi() {
        let idx = IndexDescriptor::golden().expect("golden");
        assert_eq!(idx.n, 1);
        assert_eq!(idx.combinatorics.xi_word, vec![Branch::Eta]);
        assert_eq!(idx.combinatorics.eta_word, vec![Branch::Xi, Branch::Eta]);
        assert!((idx.scaling_exponent - 1.0).abs() < 1e-14);
    }

    #[test]
    fn exceptional_k2_is_n4() {
        let idx = IndexDescriptor::exceptional(2).expect("k = 2");
        assert_eq!(idx.n, 4);
        assert_eq!(idx.k(), Some(2));
        assert_eq!(idx.combinatorics.depth(), 5);
        assert!((idx.scaling_exponent - 3.0).abs() < 1e-12);
        assert!((idx.rotation_number - 1.0 / (2.0 + 5.0_f64.sqrt())).abs() < 1e-15);
    }

    #[test]
    fn silver_scaling_exponent_is_irrational() {
        let idx = IndexDescriptor::metallic(2).expect("silver");
        assert_eq!(idx.k(), None);
        assert!((idx.scaling_exponent - 1.831_5).abs() < 1e-3);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(IndexDescriptor::metallic(0).is_err());
        assert!(IndexDescriptor::metallic(MAX_PARTIAL_QUOTIENT + 1).is_err());
        assert!(IndexDescriptor::exceptional(0).is_err());
        // L_13 = 521 > 200
        assert!(IndexDescriptor::exceptional(7).is_err());
        assert_eq!(IndexDescriptor::exceptional(6).expect("k = 6").n, 199);
    }

    #[test]
    fn labels() {
        assert_eq!(IndexDescriptor::exceptional(3).expect("k = 3").label(), "n=11 (k=3)");
        assert_eq!(IndexDescriptor::metallic(2).expect("n = 2").label(), "n=2");
    }
}
