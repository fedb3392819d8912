// SPDX-License-Identifier: AGPL-3.0-only

//! Machine-precision tolerances and thresholds for the closed-form
//! metallic-mean identities.

// ═══════════════════════════════════════════════════════════════════
// Machine-precision tolerances (IEEE 754 f64)
// ═══════════════════════════════════════════════════════════════════

/// Tolerance for operations that should be exact in f64 arithmetic.
///
/// f64 has ~15.9 significant digits; 1e-10 allows 5 digits of accumulated
/// rounding in compositions of exact operations (e.g. LU decompose → solve).
pub const EXACT_F64: f64 = 1e-10;

/// Tolerance for f64 operations with moderate accumulation.
///
/// Used for iterative algorithms where O(n) rounding steps accumulate.
/// 1e-8 allows ~7 digits of precision after iteration.
pub const ITERATIVE_F64: f64 = 1e-8;

/// Denominator guard for relative comparisons.
///
/// Below this magnitude an expected value is treated as zero and the
/// comparison falls back to absolute error.
pub const NEAR_ZERO_EXPECTED: f64 = 1e-14;

// ═══════════════════════════════════════════════════════════════════
// Function-space round trips
// ═══════════════════════════════════════════════════════════════════

/// `rescale(rescale(c, α), 1/α)` against `c`, infinity norm.
///
/// Two interpolations at Chebyshev nodes of a map that the first rescale
/// reproduces exactly on the nodes; error is DCT rounding, ~N ε.
pub const RESCALE_ROUND_TRIP: f64 = 1e-12;

/// `compose(compose(a, b), c)` against `compose(a, compose(b, c))`.
///
/// Each compose re-truncates to N terms, so the two groupings differ by the
/// aliasing error of the intermediate fit. For the smooth test maps at
/// N = 16 the observed gap is ~1e-9; 1e-6 leaves margin.
pub const ASSOCIATIVITY_TOLERANCE: f64 = 1e-6;

// ═══════════════════════════════════════════════════════════════════
// Algebraic identities
// ═══════════════════════════════════════════════════════════════════

/// Relative tolerance for closed-form golden-mean identities.
///
/// φ^{2k-1} grows to ~1e9 at k = 23; powi accumulates ~k ulps, far inside 1e-12.
pub const IDENTITY_REL_TOLERANCE: f64 = 1e-12;
