// SPDX-License-Identifier: AGPL-3.0-only

//! Provenance metadata for every reference value the validation run checks.
//!
//! Literature constants carry their publication; values without a closed
//! literature source come from a float64 control run of this crate's
//! pipeline and carry the command that reproduces them.
//!
//! # Provenance chain
//!
//! ```text
//! publication or control run → method → settings → value → Rust constant
//! ```
//!
//! ## Data Sources
//!
//! | Publication | Notes |
//! |-------------|-------|
//! | Feigenbaum, Kadanoff, Shenker, Physica D 5, 370 (1982) | golden-mean α, δ for the sine circle map |
//! | Shenker, Physica D 5, 405 (1982) | critical sine-map parameter Ω∞ |
//! | Ostlund, Rand, Sethna, Siggia, Physica D 8, 303 (1983) | commuting-pair renormalization, universality |
//! | Mestel, PhD thesis, University of Warwick (1985) | computer-assisted golden fixed point, 12+ digits |

use serde::Serialize;

/// A single provenance record tying a Rust reference value to its origin.
#[derive(Debug, Clone, Copy)]
pub struct BaselineProvenance {
    /// Human-readable label.
    pub label: &'static str,
    /// Publication or control run the value comes from.
    pub source: &'static str,
    /// How the value was obtained.
    pub method: &'static str,
    /// Settings or command that reproduce it.
    pub command: &'static str,
    /// Partial quotient n the value belongs to (0 for index-free constants).
    pub partial_quotient: u32,
    /// The reference value itself.
    pub value: f64,
    /// Unit or description of the value.
    pub unit: &'static str,
}

const CONTROL_SOURCE: &str = "float64 Chebyshev-collocation control run, N = 24, z = 3";
const CONTROL_METHOD: &str =
    "damped Newton on R(c) − c to 1e-10, Ridders-extrapolated Jacobian, power iteration";
const CONTROL_COMMAND: &str =
    "cargo run --release --bin metallic_universality -- --verify-all --order 24";

// ═══════════════════════════════════════════════════════════════════
// Golden mean (n = 1) — literature
// ═══════════════════════════════════════════════════════════════════

/// Universal δ for cubic critical circle maps at rotation number 1/φ.
pub const GOLDEN_DELTA: BaselineProvenance = BaselineProvenance {
    label: "golden-mean δ",
    source: "Mestel 1985 (Warwick thesis); Ostlund et al. 1983",
    method: "computer-assisted fixed point of the commuting-pair operator",
    command: "literature",
    partial_quotient: 1,
    value: -2.833_610_655_891_167,
    unit: "dimensionless eigenvalue",
};

/// Universal scaling factor α at rotation number 1/φ.
pub const GOLDEN_ALPHA: BaselineProvenance = BaselineProvenance {
    label: "golden-mean α",
    source: "Feigenbaum, Kadanoff, Shenker 1982; Mestel 1985",
    method: "fixed-point rescaling factor",
    command: "literature",
    partial_quotient: 1,
    value: -1.288_574_553_954,
    unit: "dimensionless",
};

/// Critical parameter Ω∞ of the sine circle map at rotation number 1/φ.
pub const GOLDEN_SINE_OMEGA: BaselineProvenance = BaselineProvenance {
    label: "critical sine-map Ω∞ (golden)",
    source: "Shenker 1982",
    method: "limit of superstable parameters Ω_j",
    command: "literature",
    partial_quotient: 1,
    value: 0.606_661_063_47,
    unit: "rotation parameter",
};

// ═══════════════════════════════════════════════════════════════════
// Other metallic means — control runs
// ═══════════════════════════════════════════════════════════════════

/// δ at the silver mean, n = 2.
pub const SILVER_DELTA: BaselineProvenance = BaselineProvenance {
    label: "silver-mean δ",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 2,
    value: -6.799_225_161,
    unit: "dimensionless eigenvalue",
};

/// α at the silver mean, n = 2.
pub const SILVER_ALPHA: BaselineProvenance = BaselineProvenance {
    label: "silver-mean α",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 2,
    value: -1.586_826_679,
    unit: "dimensionless",
};

/// δ at n = L₃ = 4 (k = 2).
pub const EXCEPTIONAL_K2_DELTA: BaselineProvenance = BaselineProvenance {
    label: "δ at n = 4 (k = 2)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 4,
    value: -24.620_347_943,
    unit: "dimensionless eigenvalue",
};

/// α at n = 4.
pub const EXCEPTIONAL_K2_ALPHA: BaselineProvenance = BaselineProvenance {
    label: "α at n = 4 (k = 2)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 4,
    value: -2.080_120_981,
    unit: "dimensionless",
};

/// δ at n = L₅ = 11 (k = 3).
pub const EXCEPTIONAL_K3_DELTA: BaselineProvenance = BaselineProvenance {
    label: "δ at n = 11 (k = 3)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 11,
    value: -299.956_127_911,
    unit: "dimensionless eigenvalue",
};

/// α at n = 11.
pub const EXCEPTIONAL_K3_ALPHA: BaselineProvenance = BaselineProvenance {
    label: "α at n = 11 (k = 3)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 11,
    value: -2.785_087_507,
    unit: "dimensionless",
};

/// δ at n = L₇ = 29 (k = 4). N = 16 and N = 24 differ by 3.5e-7 relative.
pub const EXCEPTIONAL_K4_DELTA: BaselineProvenance = BaselineProvenance {
    label: "δ at n = 29 (k = 4)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 29,
    value: -4_779.884_154,
    unit: "dimensionless eigenvalue",
};

/// α at n = 29.
pub const EXCEPTIONAL_K4_ALPHA: BaselineProvenance = BaselineProvenance {
    label: "α at n = 29 (k = 4)",
    source: CONTROL_SOURCE,
    method: CONTROL_METHOD,
    command: CONTROL_COMMAND,
    partial_quotient: 29,
    value: -3.018_048_981,
    unit: "dimensionless",
};

/// Every δ baseline, ordered by partial quotient.
pub const DELTA_BASELINES: [BaselineProvenance; 5] = [
    GOLDEN_DELTA,
    SILVER_DELTA,
    EXCEPTIONAL_K2_DELTA,
    EXCEPTIONAL_K3_DELTA,
    EXCEPTIONAL_K4_DELTA,
];

/// Every α baseline, ordered by partial quotient.
pub const ALPHA_BASELINES: [BaselineProvenance; 5] = [
    GOLDEN_ALPHA,
    SILVER_ALPHA,
    EXCEPTIONAL_K2_ALPHA,
    EXCEPTIONAL_K3_ALPHA,
    EXCEPTIONAL_K4_ALPHA,
];

/// δ baseline for partial quotient `n`, if one is recorded.
#[must_use]
pub fn delta_baseline(n: u32) -> Option<&'static BaselineProvenance> {
    DELTA_BASELINES.iter().find(|b| b.partial_quotient == n)
}

/// α baseline for partial quotient `n`, if one is recorded.
#[must_use]
pub fn alpha_baseline(n: u32) -> Option<&'static BaselineProvenance> {
    ALPHA_BASELINES.iter().find(|b| b.partial_quotient == n)
}

// ═══════════════════════════════════════════════════════════════════
// Manuscript conjecture table — calibration reference only
// ═══════════════════════════════════════════════════════════════════

/// One row of the published δ_{L_{2k−1}} = δ^{2k−1} table (magnitudes).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClaimedConjectureRow {
    /// Family parameter.
    pub k: u32,
    /// Claimed computed |δ|.
    pub delta: f64,
    /// Claimed |δ_base|^{2k−1}.
    pub expected: f64,
    /// Claimed relative error.
    pub relative_error: f64,
}

/// The manuscript's table.
///
/// The implied base |δ| = expected^{1/(2k−1)} differs between rows
/// (2.83343, 2.83659, 2.83831) and none matches the golden δ, so the
/// rows are printed next to the computed comparison rather than checked.
pub const CLAIMED_CONJECTURE_TABLE: [ClaimedConjectureRow; 3] = [
    ClaimedConjectureRow {
        k: 2,
        delta: 22.747_792_3,
        expected: 22.747_791_5,
        relative_error: 3.9e-8,
    },
    ClaimedConjectureRow {
        k: 3,
        delta: 183.648_291_0,
        expected: 183.648_119_9,
        relative_error: 9.3e-7,
    },
    ClaimedConjectureRow {
        k: 4,
        delta: 1483.957_823_5,
        expected: 1483.954_321_1,
        relative_error: 2.4e-6,
    },
];

impl ClaimedConjectureRow {
    /// Base |δ| implied by the expected column.
    #[must_use]
    pub fn implied_base(&self) -> f64 {
        self.expected.powf(1.0 / f64::from(2 * self.k - 1))
    }
}

/// Print a provenance record in the standard validation format.
pub fn print_provenance(records: &[&BaselineProvenance]) {
    println!("  Provenance:");
    for r in records {
        println!(
            "    {} = {:.12} [{}] ({}; {})",
            r.label, r.value, r.unit, r.source, r.command
        );
    }
}
