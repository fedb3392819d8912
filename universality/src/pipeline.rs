// SPDX-License-Identifier: AGPL-3.0-only

//! Pipeline driver: seed → fixed point → Jacobian → δ, per index.
//!
//! Indices are independent and run on the rayon pool; each worker owns its
//! coefficient vectors and Jacobian. A recoverable failure of one index is
//! recorded in its [`IndexOutcome`] and excluded from the conjecture
//! comparison; it never aborts the other indices. Configuration errors are
//! fatal and surface from [`run_all`] before any computation starts.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::PipelineConfig;
use crate::data::ReferenceCoefficients;
use crate::error::{Result, UniversalityError};
use crate::index::IndexDescriptor;
use crate::linearize::Linearizer;
use crate::renormalization::{CommutingPair, PairSpaces, RenormalizationOperator};
use crate::seed::canonical_seed;
use crate::solver::{FixedPoint, FixedPointSolver};
use crate::space::CoefficientVector;
use crate::spectral::EigenResult;
use crate::tolerances::{MAX_TRUNCATION_ORDER, MIN_TRUNCATION_ORDER};

/// Where the Newton iteration started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SeedSource {
    /// Renormalized sine circle map.
    Canonical {
        /// Tuned rotation parameter Ω.
        omega: f64,
        /// Pair level K.
        level: usize,
        /// Level L used to place Ω.
        target_level: usize,
        /// Partial quotient of a related-index reference tried first whose
        /// solve failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        rejected_reference: Option<u32>,
    },
    /// Reference coefficient file, resized from its stored order.
    Reference {
        /// Order stored in the file.
        order: usize,
        /// Partial quotient the reference was solved for.
        partial_quotient: u32,
    },
    /// Fixed point of the same index at another order.
    Resized {
        /// Order the guess was taken from.
        from_order: usize,
    },
}

/// Successful solve of one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    /// Index solved.
    pub index: IndexDescriptor,
    /// Truncation order N.
    pub order: usize,
    /// Critical exponent z.
    pub exponent: u32,
    /// Origin of the initial guess.
    pub seed: SeedSource,
    /// Converged fixed point.
    pub fixed_point: FixedPoint,
    /// Rescaling factor α = 1/η(0) at the fixed point.
    pub alpha: f64,
    /// Dominant eigenpair of the linearization.
    pub eigen: EigenResult,
    /// δ at N + step when the truncation check ran.
    pub refined_delta: Option<f64>,
}

impl IndexReport {
    /// The universal constant δ_n.
    #[must_use]
    pub const fn delta(&self) -> f64 {
        self.eigen.eigenvalue
    }

    /// Spaces the fixed point lives in.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] if order or exponent are invalid,
    /// which cannot happen for a report produced by this module.
    pub fn spaces(&self) -> Result<PairSpaces> {
        PairSpaces::new(self.order, self.exponent)
    }

    /// The fixed-point pair as maps.
    ///
    /// # Errors
    ///
    /// As [`Self::spaces`].
    pub fn pair(&self) -> Result<CommutingPair> {
        CommutingPair::from_vector(&self.spaces()?, &self.fixed_point.coefficients)
    }

    /// Fixed-point coefficients for a reference file.
    ///
    /// # Errors
    ///
    /// Never fails for a converged report; see [`ReferenceCoefficients::new`].
    pub fn reference(&self) -> Result<ReferenceCoefficients> {
        ReferenceCoefficients::new(
            self.index.n,
            self.exponent,
            self.fixed_point.coefficients.clone(),
        )
    }
}

/// Flat per-index result row for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    /// Partial quotient n.
    pub index: u32,
    /// Exceptional family parameter, if any.
    pub k: Option<u32>,
    /// δ_n.
    pub delta: Option<f64>,
    /// α_n.
    pub alpha: Option<f64>,
    /// Fixed-point residual (infinity norm).
    pub residual_norm: Option<f64>,
    /// Eigen residual ‖Jv − δv‖.
    pub eigen_residual: Option<f64>,
    /// Whether the whole chain succeeded.
    pub converged: bool,
    /// Poorly separated dominant eigenvalue.
    pub low_confidence: bool,
    /// Truncation order N.
    pub order: usize,
    /// Newton steps.
    pub newton_iterations: Option<usize>,
    /// Power iterations.
    pub power_iterations: Option<usize>,
    /// δ at the refined order, when checked.
    pub refined_delta: Option<f64>,
    /// Failure message for unconverged indices.
    pub error: Option<String>,
}

/// Result of one index inside [`run_all`].
#[derive(Debug)]
pub struct IndexOutcome {
    /// Index attempted.
    pub index: IndexDescriptor,
    /// Report or recorded failure.
    pub result: Result<IndexReport>,
}

impl IndexOutcome {
    /// Flat record at configured order `order`.
    #[must_use]
    pub fn record(&self, order: usize) -> IndexRecord {
        match &self.result {
            Ok(r) => IndexRecord {
                index: r.index.n,
                k: r.index.k(),
                delta: Some(r.delta()),
                alpha: Some(r.alpha),
                residual_norm: Some(r.fixed_point.residual_norm),
                eigen_residual: Some(r.eigen.residual),
                converged: true,
                low_confidence: r.eigen.low_confidence,
                order: r.order,
                newton_iterations: Some(r.fixed_point.iterations),
                power_iterations: Some(r.eigen.iterations),
                refined_delta: r.refined_delta,
                error: None,
            },
            Err(e) => IndexRecord {
                index: self.index.n,
                k: self.index.k(),
                delta: None,
                alpha: None,
                residual_norm: None,
                eigen_residual: None,
                converged: false,
                low_confidence: false,
                order,
                newton_iterations: None,
                power_iterations: None,
                refined_delta: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// All outcomes of one pipeline run, in configuration order.
#[derive(Debug)]
pub struct PipelineRun {
    /// Configured truncation order.
    pub order: usize,
    /// One outcome per configured index.
    pub outcomes: Vec<IndexOutcome>,
}

impl PipelineRun {
    /// Successful reports.
    pub fn reports(&self) -> impl Iterator<Item = &IndexReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Failed indices with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&IndexDescriptor, &UniversalityError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.index, e)))
    }

    /// True when every index converged.
    #[must_use]
    pub fn all_converged(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Flat records for JSON output.
    #[must_use]
    pub fn records(&self) -> Vec<IndexRecord> {
        self.outcomes.iter().map(|o| o.record(self.order)).collect()
    }

    /// Report of the golden-mean base case, if it was solved.
    #[must_use]
    pub fn base(&self) -> Option<&IndexReport> {
        self.reports().find(|r| r.index.n == 1)
    }

    /// Conjecture rows against the golden base case; `None` if the base
    /// case is missing or failed.
    #[must_use]
    pub fn conjecture_table(&self) -> Option<Vec<ConjectureRow>> {
        let base = self.base()?;
        let members: Vec<&IndexReport> = self.reports().collect();
        Some(conjecture_table(base, &members))
    }
}

/// One row of the δ_{L_{2k−1}} versus δ_base^{2k−1} comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConjectureRow {
    /// Family parameter.
    pub k: u32,
    /// Partial quotient L_{2k−1}.
    pub n: u32,
    /// Computed δ_n.
    pub delta: f64,
    /// δ_base^{2k−1}.
    pub expected: f64,
    /// |δ_n − expected| / |expected|.
    pub relative_error: f64,
}

impl ConjectureRow {
    /// Whether the row agrees within `tolerance`.
    #[must_use]
    pub fn within(&self, tolerance: f64) -> bool {
        self.relative_error <= tolerance
    }
}

/// Compare exceptional members (k ≥ 2) with powers of the base δ.
///
/// Members outside the exceptional family are skipped; rows are sorted by k.
#[must_use]
pub fn conjecture_table(base: &IndexReport, members: &[&IndexReport]) -> Vec<ConjectureRow> {
    let base_delta = base.delta();
    let mut rows: Vec<ConjectureRow> = members
        .iter()
        .filter_map(|r| r.index.k().filter(|&k| k >= 2).map(|k| (k, *r)))
        .map(|(k, r)| {
            #[allow(clippy::cast_possible_wrap)]
            let expected = base_delta.powi((2 * k - 1) as i32);
            ConjectureRow {
                k,
                n: r.index.n,
                delta: r.delta(),
                expected,
                relative_error: ((r.delta() - expected) / expected).abs(),
            }
        })
        .collect();
    rows.sort_by_key(|row| row.k);
    rows
}

fn canonical_guess(
    index: &IndexDescriptor,
    spaces: &PairSpaces,
    rejected_reference: Option<u32>,
) -> Result<(CoefficientVector, SeedSource)> {
    let (guess, seed) = canonical_seed(index, spaces)?;
    Ok((
        guess,
        SeedSource::Canonical {
            omega: seed.omega,
            level: seed.level,
            target_level: seed.target_level,
            rejected_reference,
        },
    ))
}

/// Solve from `reference`. A reference of a related index is only a guess:
/// if that solve fails recoverably, retry from the canonical seed.
fn solve_from_reference(
    config: &PipelineConfig,
    index: &IndexDescriptor,
    spaces: PairSpaces,
    reference: &ReferenceCoefficients,
    guess: &[f64],
) -> Result<IndexReport> {
    let seed = SeedSource::Reference {
        order: reference.order(),
        partial_quotient: reference.partial_quotient,
    };
    debug!(
        from_n = reference.partial_quotient,
        from_order = reference.order(),
        "warm start from reference coefficients"
    );
    match solve_at(config, index, spaces, guess, seed) {
        Err(e) if e.is_recoverable() && !reference.is_for(index) => {
            warn!(
                from_n = reference.partial_quotient,
                error = %e,
                "related-index warm start failed, using canonical seed"
            );
            let (guess, seed) = canonical_guess(index, &spaces, Some(reference.partial_quotient))?;
            solve_at(config, index, spaces, &guess, seed)
        }
        result => result,
    }
}

/// Fixed point and δ at one order, no truncation check.
fn solve_at(
    config: &PipelineConfig,
    index: &IndexDescriptor,
    spaces: PairSpaces,
    guess: &[f64],
    seed: SeedSource,
) -> Result<IndexReport> {
    let operator = RenormalizationOperator::new(index, spaces);
    let fixed_point = FixedPointSolver::new(&operator, config.solver_settings()).solve(guess)?;
    let alpha = operator.apply(&fixed_point.coefficients)?.alpha;
    info!(
        order = spaces.order(),
        alpha,
        residual = fixed_point.residual_norm,
        iterations = fixed_point.iterations,
        "fixed point converged"
    );
    let jacobian = Linearizer::default().linearize(&operator, &fixed_point.coefficients)?;
    let eigen = config.spectral_solver().dominant_eigenvalue(&jacobian)?;
    info!(
        order = spaces.order(),
        delta = eigen.eigenvalue,
        gap_ratio = eigen.gap_ratio,
        "dominant eigenvalue"
    );
    Ok(IndexReport {
        index: index.clone(),
        order: spaces.order(),
        exponent: spaces.xi.exponent(),
        seed,
        fixed_point,
        alpha,
        eigen,
        refined_delta: None,
    })
}

/// Solve one index: seed, fixed point, linearization, dominant eigenvalue,
/// and the optional truncation check at N + step.
///
/// `warm_start` is used if its critical exponent matches. A reference for
/// the same partial quotient is authoritative; one for a related index is
/// tried first and replaced by the canonical seed if its solve fails.
///
/// # Errors
///
/// Any stage error propagates; [`UniversalityError::TruncationInsufficient`]
/// if δ moves by more than the configured threshold at the refined order.
pub fn solve_index(
    config: &PipelineConfig,
    index: &IndexDescriptor,
    warm_start: Option<&ReferenceCoefficients>,
) -> Result<IndexReport> {
    let span = info_span!("index", n = index.n);
    let _enter = span.enter();

    let spaces = config.spaces()?;
    let warm = warm_start.and_then(|r| r.warm_start(&spaces).map(|guess| (r, guess)));
    let mut report = match warm {
        Some((reference, guess)) => {
            solve_from_reference(config, index, spaces, reference, &guess)?
        }
        None => {
            let (guess, seed) = canonical_guess(index, &spaces, None)?;
            solve_at(config, index, spaces, &guess, seed)?
        }
    };

    if let Some(step) = config.truncation_step {
        let refined_order = report.order + step;
        let refined_guess =
            PairSpaces::resize_pair(&report.fixed_point.coefficients, refined_order);
        let refined = solve_at(
            config,
            index,
            spaces.with_order(refined_order),
            &refined_guess,
            SeedSource::Resized {
                from_order: report.order,
            },
        )?;
        let relative_change = ((report.delta() - refined.delta()) / refined.delta()).abs();
        if relative_change > config.truncation_threshold {
            return Err(UniversalityError::TruncationInsufficient {
                order: report.order,
                refined_order,
                delta: report.delta(),
                refined_delta: refined.delta(),
                relative_change,
            });
        }
        debug!(refined_order, relative_change, "truncation stable");
        report.refined_delta = Some(refined.delta());
    }
    Ok(report)
}

/// Validate `config`, then solve every configured index in parallel.
///
/// # Errors
///
/// Only fatal configuration errors; per-index failures are recorded in the
/// returned [`PipelineRun`].
pub fn run_all(
    config: &PipelineConfig,
    warm_start: Option<&ReferenceCoefficients>,
) -> Result<PipelineRun> {
    config.validate()?;
    let descriptors = config.descriptors()?;
    info!(
        indices = descriptors.len(),
        order = config.order,
        exponent = config.exponent,
        "starting renormalization pipeline"
    );
    let outcomes: Vec<IndexOutcome> = descriptors
        .into_par_iter()
        .map(|index| {
            let result = solve_index(config, &index, warm_start);
            if let Err(e) = &result {
                warn!(index = %index.label(), error = %e, "index failed");
            }
            IndexOutcome { index, result }
        })
        .collect();
    Ok(PipelineRun {
        order: config.order,
        outcomes,
    })
}

/// δ, α and residual at one order of a truncation study.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TruncationPoint {
    /// Truncation order N.
    pub order: usize,
    /// δ_n at this order.
    pub delta: f64,
    /// α_n at this order.
    pub alpha: f64,
    /// Fixed-point residual.
    pub residual_norm: f64,
}

/// δ as a function of the truncation order, warm-starting each order from
/// the previous fixed point. The truncation check of `config` is not applied.
///
/// # Errors
///
/// [`UniversalityError::InvalidConfig`] for an empty list or an order out of
/// range; the first stage failure at any order propagates.
pub fn truncation_study(
    config: &PipelineConfig,
    index: &IndexDescriptor,
    orders: &[usize],
) -> Result<Vec<TruncationPoint>> {
    if orders.is_empty() {
        return Err(UniversalityError::InvalidConfig(
            "truncation study needs at least one order".into(),
        ));
    }
    if let Some(bad) = orders
        .iter()
        .find(|o| !(MIN_TRUNCATION_ORDER..=MAX_TRUNCATION_ORDER).contains(*o))
    {
        return Err(UniversalityError::InvalidConfig(format!(
            "truncation study order {bad} outside {MIN_TRUNCATION_ORDER}..={MAX_TRUNCATION_ORDER}"
        )));
    }
    let span = info_span!("truncation_study", n = index.n);
    let _enter = span.enter();

    let base_spaces = config.spaces()?;
    let mut previous: Option<IndexReport> = None;
    let mut points = Vec::with_capacity(orders.len());
    for &order in orders {
        let spaces = base_spaces.with_order(order);
        let (guess, seed) = match &previous {
            Some(p) => (
                PairSpaces::resize_pair(&p.fixed_point.coefficients, order),
                SeedSource::Resized {
                    from_order: p.order,
                },
            ),
            None => canonical_guess(index, &spaces, None)?,
        };
        let report = solve_at(config, index, spaces, &guess, seed)?;
        points.push(TruncationPoint {
            order,
            delta: report.delta(),
            alpha: report.alpha,
            residual_norm: report.fixed_point.residual_norm,
        });
        previous = Some(report);
    }
    Ok(points)
}
