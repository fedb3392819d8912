// SPDX-License-Identifier: AGPL-3.0-only

//! Metallic-mean universality: renormalization fixed points and δ
//!
//! Computes, for cubic critical circle maps at rotation number 1/φ_n
//! (φ_n the n-th metallic mean), the fixed point of the commuting-pair
//! renormalization operator and the dominant eigenvalue δ_n of its
//! linearization, then compares the exceptional family n = L_{2k−1}
//! against powers of the golden-mean δ.
//!
//! ## Numerical core
//!   - `space` — truncated Chebyshev series in t = x^z, Clenshaw evaluation
//!   - `renormalization` — commuting pairs and the operator R
//!   - `solver` — damped Newton on R(c) − c
//!   - `linearize` — central-difference Jacobian
//!   - `spectral` — power iteration with gap diagnostics, full spectrum
//!
//! ## Driver and ambient modules
//!   - `index`, `metallic`, `seed` — combinatorics, closed forms, sine-map seeds
//!   - `pipeline` — per-index solve, parallel dispatch, conjecture table
//!   - `config`, `tolerances`, `provenance` — settings, thresholds, baselines
//!   - `data`, `discovery`, `figures` — reference files, data root, plot data
//!   - `validation` — pass/fail harness for `--verify-all`
//!
//! ## Binary
//!   - `metallic_universality` — `--verify-all`, `--generate-figures`, `--run-tests`

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod data;
pub mod discovery;
pub mod error;
pub mod figures;
pub mod index;
pub mod linearize;
pub mod metallic;
pub mod pipeline;
pub mod provenance;
pub mod renormalization;
pub mod seed;
pub mod solver;
pub mod space;
pub mod spectral;
pub mod tolerances;
pub mod validation;
