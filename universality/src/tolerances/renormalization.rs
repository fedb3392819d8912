// SPDX-License-Identifier: AGPL-3.0-only

//! Thresholds for the renormalization pipeline: function-space domain
//! checks, damped Newton, finite differences, power iteration, truncation
//! stability and the conjecture comparison.

// ═══════════════════════════════════════════════════════════════════
// Function space
// ═══════════════════════════════════════════════════════════════════

/// Default Chebyshev truncation order N per map (pair dimension 2N).
///
/// Between N = 16 and N = 24 δ moves by ~1e-10 relative for the golden
/// mean, ~5e-9 for n = 4 and 3.5e-7 for n = 29.
pub const DEFAULT_TRUNCATION_ORDER: usize = 24;

/// Smallest admissible truncation order.
pub const MIN_TRUNCATION_ORDER: usize = 4;

/// Largest admissible truncation order.
///
/// Jacobian assembly is O(N³); beyond 256 the dense Newton system dominates
/// and the fit is already at machine precision for every supported index.
pub const MAX_TRUNCATION_ORDER: usize = 256;

/// Critical exponent of the cubic inflection point.
pub const DEFAULT_CRITICAL_EXPONENT: u32 = 3;

/// Admissible overshoot outside a map's domain, as a fraction of its width.
///
/// Iterating η n times near the origin visits slightly negative points;
/// the Chebyshev series in t = x³ stays accurate a short way past the
/// interval. Anything farther is reported as a domain violation.
pub const DOMAIN_SLACK: f64 = 0.5;

/// Smallest |η(0)| accepted by the normalization α = 1/η(0).
pub const NORMALIZATION_FLOOR: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// Damped Newton
// ═══════════════════════════════════════════════════════════════════

/// Fixed-point residual ‖R(c) − c‖_∞ at convergence.
pub const FIXED_POINT_TOLERANCE: f64 = 1e-10;

/// Newton iteration budget.
///
/// From the canonical seed every default index converges in 2-6 steps;
/// 50 is generous without hiding a stuck solve.
pub const MAX_NEWTON_ITERATIONS: usize = 50;

/// Smallest damping factor before backtracking declares failure (2⁻²⁰).
pub const MIN_NEWTON_STEP: f64 = 9.5367431640625e-7;

/// Initial central-difference step scale, ε^{1/3} for f64.
///
/// Balances O(h²) truncation against O(ε/h) cancellation for a map with
/// O(1) derivatives; the extrapolation tableau refines it from there.
pub const FINITE_DIFFERENCE_SCALE: f64 = 6.055_454_452_393_343e-6;

/// Step ratio between successive tableau rows.
///
/// A power of two keeps c ± h exactly representable relative to c ± 2h.
pub const STEP_CONTRACTION: f64 = 2.0;

/// Largest number of step sizes per Jacobian column.
///
/// Six rows reach h₀/32, below which the cancellation error of the n = 29
/// operator overtakes the remaining bias; the tableau usually stops at
/// three or four.
pub const EXTRAPOLATION_DEPTH: usize = 6;

// ═══════════════════════════════════════════════════════════════════
// Power iteration
// ═══════════════════════════════════════════════════════════════════

/// Relative change of the Rayleigh quotient at convergence.
pub const EIGEN_TOLERANCE: f64 = 1e-12;

/// Power iteration budget.
///
/// Golden mean: |λ₂/λ₁| ≈ 0.76, so 1e-12 needs ~100 iterations.
pub const MAX_POWER_ITERATIONS: usize = 2000;

/// Gap ratio |λ₂/λ₁| above which the eigenvalue is flagged low-confidence.
///
/// At 0.95 reaching 1e-12 already takes ~540 iterations and rounding in
/// the iterate differences starts to dominate.
pub const SPECTRAL_GAP_WARNING: f64 = 0.95;

/// Eigen-equation residual ‖Jv − δv‖ limit, relative to max(|δ|, 1).
///
/// Observed residuals are ~1e-13; 1e-6 flags only a broken iteration.
pub const EIGEN_RESIDUAL_LIMIT: f64 = 1e-6;

// ═══════════════════════════════════════════════════════════════════
// Truncation and comparison
// ═══════════════════════════════════════════════════════════════════

/// Order increment used by the truncation-stability check.
pub const TRUNCATION_CHECK_STEP: usize = 8;

/// Largest relative change of δ tolerated when N grows by the check step.
pub const TRUNCATION_STABILITY: f64 = 1e-6;

/// Relative tolerance of the δ_{L_{2k-1}} = δ^{2k-1} comparison.
pub const CONJECTURE_REL_TOLERANCE: f64 = 1e-6;

/// Relative agreement with published golden-mean δ and α.
///
/// Literature values carry 10+ digits; at N = 24 the computed δ agrees to
/// ~1e-10, so 1e-7 leaves room for coarser configured orders down to N = 16.
pub const LITERATURE_DELTA_REL_TOLERANCE: f64 = 1e-7;

/// Relative agreement with δ and α baselines from control runs.
///
/// Control values are quoted to 10 significant digits; n = 29 moves by
/// 3.5e-7 between N = 16 and N = 24.
pub const CONTROL_BASELINE_REL_TOLERANCE: f64 = 1e-6;

// ═══════════════════════════════════════════════════════════════════
// Seed construction
// ═══════════════════════════════════════════════════════════════════

/// Largest return time q_K used for the seed pair.
pub const SEED_PAIR_PERIOD_MAX: u64 = 1_000;

/// Largest return time q_L used to place the seed parameter Ω.
///
/// Deeper levels put Ω closer to the true rotation number; 2·10⁵ keeps the
/// bisection under a second.
pub const SEED_TARGET_PERIOD_MAX: u64 = 200_000;

/// Bisection steps for the seed parameter Ω ∈ [0, 1].
pub const SEED_BISECTION_ITERATIONS: usize = 64;
