// SPDX-License-Identifier: AGPL-3.0-only

//! Figure data export for `--generate-figures`.
//!
//! Only the numbers behind the plots are produced, as JSON: fixed-point
//! pair curves, Newton residual histories, the leading spectrum of the
//! linearization, the conjecture comparison and truncation studies.
//! Rendering is left to external tooling.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::data::save_json;
use crate::error::Result;
use crate::linearize::Linearizer;
use crate::pipeline::{ConjectureRow, IndexReport, PipelineRun, TruncationPoint};
use crate::provenance::{ClaimedConjectureRow, CLAIMED_CONJECTURE_TABLE};
use crate::renormalization::RenormalizationOperator;
use crate::spectral::spectrum;

/// Points per curve in pair plots.
pub const CURVE_SAMPLES: usize = 201;

/// Leading eigenvalues kept in the spectrum plot.
pub const SPECTRUM_LEADING: usize = 16;

/// One complex eigenvalue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumPoint {
    /// Real part.
    pub re: f64,
    /// Imaginary part.
    pub im: f64,
    /// Modulus.
    pub modulus: f64,
}

/// Plot data for one solved index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexFigures {
    /// Partial quotient n.
    pub index: u32,
    /// Display label.
    pub label: String,
    /// Truncation order N.
    pub order: usize,
    /// δ_n.
    pub delta: f64,
    /// α_n.
    pub alpha: f64,
    /// (x, ξ(x)) on [-1, 0].
    pub xi: Vec<(f64, f64)>,
    /// (x, η(x)) on [0, 1].
    pub eta: Vec<(f64, f64)>,
    /// Newton residual per iteration.
    pub residual_history: Vec<f64>,
    /// Leading eigenvalues of the linearization, by decreasing modulus.
    pub spectrum: Vec<SpectrumPoint>,
}

impl IndexFigures {
    /// Sample the fixed-point pair and re-linearize for the spectrum.
    ///
    /// # Errors
    ///
    /// Map evaluation, linearization or Schur decomposition errors.
    pub fn from_report(report: &IndexReport, samples: usize) -> Result<Self> {
        let spaces = report.spaces()?;
        let pair = report.pair()?;
        let operator = RenormalizationOperator::new(&report.index, spaces);
        let jacobian =
            Linearizer::default().linearize(&operator, &report.fixed_point.coefficients)?;
        let spectrum = spectrum(&jacobian)?
            .into_iter()
            .take(SPECTRUM_LEADING)
            .map(|z| SpectrumPoint {
                re: z.re,
                im: z.im,
                modulus: z.norm(),
            })
            .collect();
        Ok(Self {
            index: report.index.n,
            label: report.index.label(),
            order: report.order,
            delta: report.delta(),
            alpha: report.alpha,
            xi: pair.xi.sample(samples)?,
            eta: pair.eta.sample(samples)?,
            residual_history: report.fixed_point.residual_history.clone(),
            spectrum,
        })
    }
}

/// Computed conjecture rows next to the manuscript's table.
#[derive(Debug, Clone, Serialize)]
pub struct ConjectureFigure {
    /// Base δ (golden mean).
    pub base_delta: f64,
    /// Rows from this run.
    pub computed: Vec<ConjectureRow>,
    /// Manuscript rows.
    pub claimed: Vec<ClaimedConjectureRow>,
}

/// Truncation study of one index.
#[derive(Debug, Clone, Serialize)]
pub struct TruncationFigure {
    /// Partial quotient n.
    pub index: u32,
    /// δ, α and residual per order.
    pub points: Vec<TruncationPoint>,
    /// |δ_{N_i} − δ_{N_{i−1}}| for consecutive orders.
    pub successive_differences: Vec<f64>,
}

impl TruncationFigure {
    /// Wrap study points and compute successive δ differences.
    #[must_use]
    pub fn new(index: u32, points: Vec<TruncationPoint>) -> Self {
        let successive_differences = points
            .windows(2)
            .map(|w| (w[1].delta - w[0].delta).abs())
            .collect();
        Self {
            index,
            points,
            successive_differences,
        }
    }
}

/// File name of the per-index figure data.
#[must_use]
pub fn index_figure_name(n: u32) -> String {
    format!("index_n{n}.json")
}

/// Write per-index figure data and, when the base index converged, the
/// conjecture comparison. Returns the written paths.
///
/// # Errors
///
/// Any figure construction or write error.
pub fn write_run_figures(run: &PipelineRun, dir: &Path, samples: usize) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for report in run.reports() {
        let figures = IndexFigures::from_report(report, samples)?;
        let path = dir.join(index_figure_name(report.index.n));
        save_json(&path, &figures)?;
        written.push(path);
    }
    if let (Some(base), Some(computed)) = (run.base(), run.conjecture_table()) {
        let figure = ConjectureFigure {
            base_delta: base.delta(),
            computed,
            claimed: CLAIMED_CONJECTURE_TABLE.to_vec(),
        };
        let path = dir.join("conjecture.json");
        save_json(&path, &figure)?;
        written.push(path);
    }
    info!(files = written.len(), dir = %dir.display(), "figure data written");
    Ok(written)
}

/// Write a truncation study as `truncation_n{n}.json`.
///
/// # Errors
///
/// Write errors.
pub fn write_truncation_figure(figure: &TruncationFigure, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("truncation_n{}.json", figure.index));
    save_json(&path, figure)?;
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{IndexSpec, PipelineConfig};
    use crate::pipeline::run_all;

    #[test]
    fn successive_differences() {
        let point = |order, delta| TruncationPoint {
            order,
            delta,
            alpha: -1.29,
            residual_norm: 1e-12,
        };
        let figure = TruncationFigure::new(
            1,
            vec![point(8, -2.8335), point(12, -2.8336), point(16, -2.83361)],
        );
        assert_eq!(figure.successive_differences.len(), 2);
        assert!(figure.successive_differences[1] < figure.successive_differences[0]);
    }

    #[test]
    fn golden_figure_data() {
        let config = PipelineConfig {
            order: 10,
            indices: vec![IndexSpec::Exceptional { k: 1 }],
            ..PipelineConfig::default()
        };
        let run = run_all(&config, None).expect("valid config");
        let report = run.reports().next().expect("golden converged");
        let figures = IndexFigures::from_report(report, 11).expect("figures");
        assert_eq!(figures.xi.len(), 11);
        assert_eq!(figures.eta.len(), 11);
        assert!((figures.xi[10].1 - 1.0).abs() < 1e-12, "ξ(0) = 1");
        assert!(figures.spectrum.len() <= SPECTRUM_LEADING);
        assert!((figures.spectrum[0].modulus - report.delta().abs()).abs() < 1e-6);
        assert!(!figures.residual_history.is_empty());

        let dir = std::env::temp_dir().join("metallic_universality_figures");
        let written = write_run_figures(&run, &dir, 11).expect("write");
        assert!(written.iter().any(|p| p.ends_with("index_n1.json")));
        assert!(written.iter().any(|p| p.ends_with("conjecture.json")));
        assert!(written.iter().all(|p| p.is_file()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
