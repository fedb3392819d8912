// SPDX-License-Identifier: AGPL-3.0-only

//! Runtime configuration of the renormalization pipeline.
//!
//! Every field defaults to the documented constant in
//! [`crate::tolerances`], so a config file only names what it overrides:
//!
//! ```json
//! {
//!   "order": 32,
//!   "indices": [
//!     { "family": "exceptional", "k": 1 },
//!     { "family": "exceptional", "k": 2 },
//!     { "family": "metallic", "n": 2 }
//!   ],
//!   "truncation_step": 8
//! }
//! ```
//!
//! [`PipelineConfig::validate`] runs before any computation; every error it
//! reports is fatal ([`UniversalityError::InvalidConfig`]).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UniversalityError};
use crate::index::IndexDescriptor;
use crate::renormalization::PairSpaces;
use crate::solver::SolverSettings;
use crate::spectral::SpectralSolver;
use crate::tolerances::{
    DEFAULT_CRITICAL_EXPONENT, DEFAULT_TRUNCATION_ORDER, EIGEN_TOLERANCE, FIXED_POINT_TOLERANCE,
    MAX_NEWTON_ITERATIONS, MAX_POWER_ITERATIONS, MAX_TRUNCATION_ORDER, MIN_TRUNCATION_ORDER,
    TRUNCATION_STABILITY,
};

/// Exceptional family members solved when no index set is given.
pub const DEFAULT_K_MAX: u32 = 4;

/// One requested index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum IndexSpec {
    /// Any partial quotient n.
    Metallic {
        /// Partial quotient.
        n: u32,
    },
    /// n = L_{2k-1}.
    Exceptional {
        /// Family parameter.
        k: u32,
    },
}

impl IndexSpec {
    /// Build the descriptor.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] for an unsupported index.
    pub fn descriptor(self) -> Result<IndexDescriptor> {
        match self {
            Self::Metallic { n } => IndexDescriptor::metallic(n),
            Self::Exceptional { k } => IndexDescriptor::exceptional(k),
        }
    }
}

/// Exceptional members k = 1..=`k_max`.
#[must_use]
pub fn exceptional_indices(k_max: u32) -> Vec<IndexSpec> {
    (1..=k_max).map(|k| IndexSpec::Exceptional { k }).collect()
}

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Truncation order N of each map.
    pub order: usize,
    /// Critical exponent z (odd, ≥ 3).
    pub exponent: u32,
    /// Fixed-point residual tolerance (infinity norm).
    pub fixed_point_tolerance: f64,
    /// Newton step budget.
    pub max_newton_iterations: usize,
    /// Relative eigenvalue tolerance.
    pub eigen_tolerance: f64,
    /// Power-iteration budget.
    pub max_power_iterations: usize,
    /// Indices to solve.
    pub indices: Vec<IndexSpec>,
    /// If set, re-solve at N + step and compare δ.
    pub truncation_step: Option<usize>,
    /// Largest accepted relative change of δ between N and N + step.
    pub truncation_threshold: f64,
    /// Reference coefficient file used as warm start.
    pub warm_start: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_TRUNCATION_ORDER,
            exponent: DEFAULT_CRITICAL_EXPONENT,
            fixed_point_tolerance: FIXED_POINT_TOLERANCE,
            max_newton_iterations: MAX_NEWTON_ITERATIONS,
            eigen_tolerance: EIGEN_TOLERANCE,
            max_power_iterations: MAX_POWER_ITERATIONS,
            indices: exceptional_indices(DEFAULT_K_MAX),
            truncation_step: None,
            truncation_threshold: TRUNCATION_STABILITY,
            warm_start: None,
        }
    }
}

fn invalid(field: &str, msg: impl std::fmt::Display) -> UniversalityError {
    UniversalityError::InvalidConfig(format!("{field}: {msg}"))
}

fn positive_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive and finite, got {value}")))
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::DataLoad`] if the file cannot be read,
    /// [`UniversalityError::InvalidConfig`] if it does not parse or validate.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| UniversalityError::DataLoad(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] on malformed JSON or invalid values.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text).map_err(|e| invalid("(json)", e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every field; the first violation is returned.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_TRUNCATION_ORDER..=MAX_TRUNCATION_ORDER).contains(&self.order) {
            return Err(invalid(
                "order",
                format!(
                    "must lie in {MIN_TRUNCATION_ORDER}..={MAX_TRUNCATION_ORDER}, got {}",
                    self.order
                ),
            ));
        }
        if self.exponent < 3 || self.exponent % 2 == 0 {
            return Err(invalid(
                "exponent",
                format!("critical exponent must be odd and at least 3, got {}", self.exponent),
            ));
        }
        positive_finite("fixed_point_tolerance", self.fixed_point_tolerance)?;
        positive_finite("eigen_tolerance", self.eigen_tolerance)?;
        positive_finite("truncation_threshold", self.truncation_threshold)?;
        if self.max_newton_iterations == 0 {
            return Err(invalid("max_newton_iterations", "must be > 0"));
        }
        if self.max_power_iterations == 0 {
            return Err(invalid("max_power_iterations", "must be > 0"));
        }
        if self.indices.is_empty() {
            return Err(invalid("indices", "at least one index is required"));
        }
        for spec in &self.indices {
            spec.descriptor()?;
        }
        if let Some(step) = self.truncation_step {
            if step == 0 {
                return Err(invalid("truncation_step", "must be > 0"));
            }
            if self.order + step > MAX_TRUNCATION_ORDER {
                return Err(invalid(
                    "truncation_step",
                    format!(
                        "refined order {} exceeds {MAX_TRUNCATION_ORDER}",
                        self.order + step
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Descriptors for the configured indices, in order.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] for an unsupported index.
    pub fn descriptors(&self) -> Result<Vec<IndexDescriptor>> {
        self.indices.iter().map(|s| s.descriptor()).collect()
    }

    /// Pair spaces at the configured order.
    ///
    /// # Errors
    ///
    /// [`UniversalityError::InvalidConfig`] for an invalid order or exponent.
    pub fn spaces(&self) -> Result<PairSpaces> {
        PairSpaces::new(self.order, self.exponent)
    }

    /// Newton settings.
    #[must_use]
    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            tolerance: self.fixed_point_tolerance,
            max_iterations: self.max_newton_iterations,
            ..SolverSettings::default()
        }
    }

    /// Power-iteration settings.
    #[must_use]
    pub fn spectral_solver(&self) -> SpectralSolver {
        SpectralSolver::new(self.eigen_tolerance, self.max_power_iterations)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().expect("defaults validate");
        let ns: Vec<u32> = cfg.descriptors().expect("indices").iter().map(|d| d.n).collect();
        assert_eq!(ns, vec![1, 4, 11, 29]);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{
                "order": 16,
                "indices": [{"family": "metallic", "n": 2}, {"family": "exceptional", "k": 2}]
            }"#,
        )
        .expect("valid");
        assert_eq!(cfg.order, 16);
        assert_eq!(cfg.exponent, DEFAULT_CRITICAL_EXPONENT);
        assert_eq!(
            cfg.indices,
            vec![IndexSpec::Metallic { n: 2 }, IndexSpec::Exceptional { k: 2 }]
        );
        assert!(cfg.truncation_step.is_none());
    }

    #[test]
    fn rejects_bad_order() {
        for order in [0, MIN_TRUNCATION_ORDER - 1, MAX_TRUNCATION_ORDER + 1] {
            let cfg = PipelineConfig {
                order,
                ..PipelineConfig::default()
            };
            let err = cfg.validate().expect_err("order out of range");
            assert!(err.to_string().contains("order"));
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        let cfg = PipelineConfig {
            fixed_point_tolerance: 0.0,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig {
            eigen_tolerance: -1e-8,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig {
            truncation_threshold: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_and_unsupported_indices() {
        let cfg = PipelineConfig {
            indices: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = PipelineConfig {
            indices: vec![IndexSpec::Exceptional { k: 0 }],
            ..PipelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_even_exponent_and_zero_budgets() {
        for cfg in [
            PipelineConfig {
                exponent: 2,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                exponent: 1,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                max_newton_iterations: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                max_power_iterations: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                truncation_step: Some(0),
                ..PipelineConfig::default()
            },
            PipelineConfig {
                order: MAX_TRUNCATION_ORDER,
                truncation_step: Some(1),
                ..PipelineConfig::default()
            },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn rejects_unknown_fields_and_bad_json() {
        assert!(PipelineConfig::from_json_str(r#"{"ordr": 8}"#).is_err());
        assert!(PipelineConfig::from_json_str("{").is_err());
        assert!(PipelineConfig::from_json_str(r#"{"indices": [{"family": "bronze"}]}"#).is_err());
    }

    #[test]
    fn json_file_round_trip() {
        let path = std::env::temp_dir().join("metallic_universality_config_test.json");
        let cfg = PipelineConfig {
            order: 12,
            indices: exceptional_indices(2),
            truncation_step: Some(4),
            ..PipelineConfig::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&cfg).expect("serialize"))
            .expect("write");
        let loaded = PipelineConfig::from_json_file(&path).expect("load");
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn settings_follow_config() {
        let cfg = PipelineConfig {
            fixed_point_tolerance: 1e-9,
            max_newton_iterations: 7,
            eigen_tolerance: 1e-10,
            max_power_iterations: 99,
            ..PipelineConfig::default()
        };
        let s = cfg.solver_settings();
        assert_eq!((s.tolerance, s.max_iterations), (1e-9, 7));
        let p = cfg.spectral_solver();
        assert_eq!((p.tolerance, p.max_iterations), (1e-10, 99));
    }
}
