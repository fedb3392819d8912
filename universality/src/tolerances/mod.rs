// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized numerical tolerances with justification.
//!
//! Every threshold used by the solvers, the pipeline driver and the
//! validation binary is defined here with its origin and rationale. No
//! ad-hoc magic numbers in the numeric code.
//!
//! # Tolerance categories
//!
//! | Category | Basis | Example |
//! |----------|-------|---------|
//! | Machine precision | IEEE 754 f64 | 1e-10 for exact arithmetic |
//! | Numerical method | Algorithm convergence | 1e-10 fixed-point residual |
//! | Discretization | Chebyshev truncation | 1e-6 relative δ stability |
//! | Literature | Published digits | golden-mean δ to 1e-7 |
//!
//! Reference values themselves live in [`crate::provenance`].

/// Machine-precision and algebraic-identity tolerances.
pub mod core;
/// Function space, Newton, power iteration and pipeline thresholds.
pub mod renormalization;

pub use core::{
    ASSOCIATIVITY_TOLERANCE, EXACT_F64, IDENTITY_REL_TOLERANCE, ITERATIVE_F64,
    NEAR_ZERO_EXPECTED, RESCALE_ROUND_TRIP,
};

pub use renormalization::{
    CONJECTURE_REL_TOLERANCE, CONTROL_BASELINE_REL_TOLERANCE, DEFAULT_CRITICAL_EXPONENT,
    DEFAULT_TRUNCATION_ORDER, DOMAIN_SLACK, EIGEN_RESIDUAL_LIMIT, EIGEN_TOLERANCE,
    EXTRAPOLATION_DEPTH, FINITE_DIFFERENCE_SCALE, FIXED_POINT_TOLERANCE, LITERATURE_DELTA_REL_TOLERANCE,
    MAX_NEWTON_ITERATIONS, MAX_POWER_ITERATIONS, MAX_TRUNCATION_ORDER, MIN_NEWTON_STEP,
    MIN_TRUNCATION_ORDER, NORMALIZATION_FLOOR, SEED_BISECTION_ITERATIONS, SEED_PAIR_PERIOD_MAX,
    SEED_TARGET_PERIOD_MAX, SPECTRAL_GAP_WARNING, STEP_CONTRACTION, TRUNCATION_CHECK_STEP, TRUNCATION_STABILITY,
};
