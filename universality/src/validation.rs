// SPDX-License-Identifier: AGPL-3.0-only

//! Validation harness for the `--verify-all` run.
//!
//! Every check compares an observed value against a documented expected
//! value and tolerance, prints one ✓/✗ line, and the run exits 0 only if
//! every check passed. Domain helpers turn identity checks, index reports
//! and conjecture rows into checks with consistent labels.

use std::fmt::Write as _;
use std::process;

use crate::metallic::IdentityCheck;
use crate::pipeline::{ConjectureRow, IndexReport};
use crate::provenance::{alpha_baseline, delta_baseline};
use crate::tolerances::{
    CONTROL_BASELINE_REL_TOLERANCE, EIGEN_RESIDUAL_LIMIT, LITERATURE_DELTA_REL_TOLERANCE,
    NEAR_ZERO_EXPECTED,
};

/// A single validation check with result tracking.
#[derive(Debug, Clone)]
pub struct Check {
    /// Human-readable label
    pub label: String,
    /// Whether this check passed
    pub passed: bool,
    /// Observed value
    pub observed: f64,
    /// Expected value
    pub expected: f64,
    /// Tolerance used
    pub tolerance: f64,
    /// How the tolerance was applied
    pub mode: ToleranceMode,
}

/// How a tolerance threshold is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToleranceMode {
    /// |observed - expected| < tolerance
    Absolute,
    /// |observed - expected| / |expected| < tolerance
    Relative,
    /// observed < threshold
    UpperBound,
    /// observed > threshold
    LowerBound,
    /// pass/fail flag
    Flag,
}

impl std::fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absolute => write!(f, "abs"),
            Self::Relative => write!(f, "rel"),
            Self::UpperBound => write!(f, "<"),
            Self::LowerBound => write!(f, ">"),
            Self::Flag => write!(f, "flag"),
        }
    }
}

/// Accumulates validation checks and produces a summary with exit code.
#[derive(Debug, Default)]
#[must_use]
pub struct ValidationHarness {
    /// Name of the validation run
    pub name: String,
    /// All checks performed
    pub checks: Vec<Check>,
}

impl ValidationHarness {
    /// Create a new harness for a named validation run.
    #[must_use = "validation harness must be used to run checks"]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            checks: Vec::new(),
        }
    }

    fn push(
        &mut self,
        label: &str,
        passed: bool,
        observed: f64,
        expected: f64,
        tolerance: f64,
        mode: ToleranceMode,
    ) {
        self.checks.push(Check {
            label: label.to_string(),
            passed,
            observed,
            expected,
            tolerance,
            mode,
        });
    }

    /// Add an absolute tolerance check: |observed - expected| < tolerance
    pub fn check_abs(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = (observed - expected).abs() < tolerance;
        self.push(
            label,
            passed,
            observed,
            expected,
            tolerance,
            ToleranceMode::Absolute,
        );
    }

    /// Add a relative tolerance check: |observed - expected| / |expected| < tolerance
    ///
    /// Falls back to an absolute check when `expected` is near zero.
    pub fn check_rel(&mut self, label: &str, observed: f64, expected: f64, tolerance: f64) {
        let passed = if expected.abs() > NEAR_ZERO_EXPECTED {
            ((observed - expected) / expected).abs() < tolerance
        } else {
            observed.abs() < tolerance
        };
        self.push(
            label,
            passed,
            observed,
            expected,
            tolerance,
            ToleranceMode::Relative,
        );
    }

    /// Add an upper-bound check: observed < threshold
    pub fn check_upper(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed < threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::UpperBound,
        );
    }

    /// Add a lower-bound check: observed > threshold
    pub fn check_lower(&mut self, label: &str, observed: f64, threshold: f64) {
        self.push(
            label,
            observed > threshold,
            observed,
            threshold,
            threshold,
            ToleranceMode::LowerBound,
        );
    }

    /// Add a boolean pass/fail check.
    pub fn check_bool(&mut self, label: &str, passed: bool) {
        self.push(
            label,
            passed,
            f64::from(u8::from(passed)),
            1.0,
            0.0,
            ToleranceMode::Flag,
        );
    }

    /// Record a closed-form identity.
    pub fn check_identity(&mut self, identity: &IdentityCheck, tolerance: f64) {
        self.check_rel(&identity.label, identity.lhs, identity.rhs, tolerance);
    }

    /// Residual bounds of one solved index, plus δ and α against any
    /// recorded baseline for its partial quotient.
    pub fn check_index_report(&mut self, report: &IndexReport, fixed_point_tolerance: f64) {
        let label = report.index.label();
        self.check_upper(
            &format!("{label} fixed-point residual"),
            report.fixed_point.residual_norm,
            fixed_point_tolerance,
        );
        self.check_upper(
            &format!("{label} eigen residual"),
            report.eigen.residual,
            EIGEN_RESIDUAL_LIMIT * report.delta().abs().max(1.0),
        );
        self.check_bool(
            &format!("{label} dominant eigenvalue isolated"),
            !report.eigen.low_confidence,
        );
        let tolerance = if report.index.n == 1 {
            LITERATURE_DELTA_REL_TOLERANCE
        } else {
            CONTROL_BASELINE_REL_TOLERANCE
        };
        if let Some(baseline) = delta_baseline(report.index.n) {
            self.check_rel(&format!("{label} δ"), report.delta(), baseline.value, tolerance);
        }
        if let Some(baseline) = alpha_baseline(report.index.n) {
            self.check_rel(&format!("{label} α"), report.alpha, baseline.value, tolerance);
        }
    }

    /// Record a conjecture row as a relative check.
    pub fn check_conjecture_row(&mut self, row: &ConjectureRow, tolerance: f64) {
        self.check_rel(
            &format!("δ_{} = δ_1^{}", row.n, 2 * row.k - 1),
            row.delta,
            row.expected,
            tolerance,
        );
    }

    /// Number of checks that passed.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Total number of checks.
    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Whether all checks passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Labels of failed checks.
    #[must_use]
    pub fn failed_labels(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
            .collect()
    }

    /// Summary block: header line plus one line per check.
    #[must_use]
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "═══ {} validation: {}/{} checks passed ═══",
            self.name,
            self.passed_count(),
            self.total_count()
        );
        for check in &self.checks {
            let icon = if check.passed { "✓" } else { "✗" };
            let _ = writeln!(
                s,
                "  {icon} {}: observed={:.6e}, expected={:.6e}, tol={:.2e} ({})",
                check.label, check.observed, check.expected, check.tolerance, check.mode
            );
        }
        s
    }

    /// Print summary and exit with appropriate code.
    ///
    /// Exit 0 if all checks pass, exit 1 if any fails.
    pub fn finish(&self) -> ! {
        println!();
        print!("{}", self.format_summary());
        if self.all_passed() {
            println!("ALL CHECKS PASSED");
            process::exit(0);
        } else {
            println!("FAILED CHECKS: {}", self.failed_labels().join(", "));
            process::exit(1);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::metallic::{metallic_power_identity, pentagonal_identities};
    use crate::tolerances::IDENTITY_REL_TOLERANCE;

    #[test]
    fn harness_tracks_pass_fail() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("exact", 1.0, 1.0, 1e-10);
        h.check_abs("close", 1.0001, 1.0, 1e-3);
        h.check_abs("far", 2.0, 1.0, 1e-3);
        assert_eq!(h.passed_count(), 2);
        assert_eq!(h.total_count(), 3);
        assert!(!h.all_passed());
        assert_eq!(h.failed_labels(), vec!["far"]);
    }

    #[test]
    fn harness_all_pass() {
        let mut h = ValidationHarness::new("test");
        h.check_abs("a", 1.0, 1.0, 1e-10);
        h.check_upper("b", 0.5, 1.0);
        h.check_lower("c", 2.0, 1.0);
        h.check_bool("d", true);
        assert!(h.all_passed());
    }

    #[test]
    fn relative_check_handles_zero() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("near_zero", 1e-15, 0.0, 1e-10);
        assert!(h.checks[0].passed);
    }

    #[test]
    fn relative_check_negative_eigenvalues() {
        let mut h = ValidationHarness::new("test");
        h.check_rel("δ close", -2.833_610_656, -2.833_610_655_891, 1e-7);
        h.check_rel("δ sign flipped", 2.833_610_656, -2.833_610_655_891, 1e-7);
        assert!(h.checks[0].passed);
        assert!(!h.checks[1].passed);
    }

    #[test]
    fn identities_become_checks() {
        let mut h = ValidationHarness::new("identities");
        for k in 1..=4 {
            h.check_identity(
                &metallic_power_identity(k).expect("k ≤ 4"),
                IDENTITY_REL_TOLERANCE,
            );
        }
        for id in pentagonal_identities() {
            h.check_identity(&id, IDENTITY_REL_TOLERANCE);
        }
        assert_eq!(h.total_count(), 9);
        assert!(h.all_passed(), "{}", h.format_summary());
    }

    #[test]
    fn conjecture_row_check() {
        let row = ConjectureRow {
            k: 2,
            n: 4,
            delta: -24.62,
            expected: -22.752,
            relative_error: 0.082,
        };
        let mut h = ValidationHarness::new("conjecture");
        h.check_conjecture_row(&row, 1e-6);
        assert!(!h.all_passed());
        assert!(h.checks[0].label.contains("δ_4"));
    }

    #[test]
    fn summary_format() {
        let mut h = ValidationHarness::new("summary");
        h.check_abs("ok", 1.0, 1.0, 1e-10);
        h.check_bool("bad", false);
        let s = h.format_summary();
        assert!(s.starts_with("═══ summary validation: 1/2 checks passed ═══"));
        assert!(s.contains("✓ ok"));
        assert!(s.contains("✗ bad"));
        assert!(s.contains("(flag)"));
    }
}
