// SPDX-License-Identifier: AGPL-3.0-only

//! `metallic_universality` — fixed points, δ_n and the exceptional-family
//! comparison for metallic-mean critical circle maps.
//!
//! # Modes
//!
//! | Flag | Action |
//! |------|--------|
//! | `--verify-all` (default) | identities, per-index solve, baselines, conjecture table |
//! | `--generate-figures` | figure data (JSON) for every index plus a golden truncation study |
//! | `--run-tests` | `cargo test --release` in this crate |
//!
//! # Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0    | every check passed |
//! | 1    | an index failed to converge or a tolerance check failed |
//! | 2    | invalid configuration or unreadable input |
//!
//! `--generate-figures --verify-all` shares one pipeline run between the two
//! modes; a failed figure step or truncation study counts as a failed check.
//!
//! The conjecture rows δ_{L_{2k−1}} vs δ^{2k−1} are reported with their
//! relative errors; they only affect the exit code with `--strict-conjecture`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin metallic_universality -- --verify-all --k-max 3
//! cargo run --release --bin metallic_universality -- --generate-figures --output out/
//! cargo run --release --bin metallic_universality -- --config run.json --save-reference
//! ```

use std::path::PathBuf;
use std::process::{self, Command};
use std::time::Instant;

use clap::Parser;
use tracing::{info, warn};

use metallic_universality::config::{exceptional_indices, PipelineConfig, DEFAULT_K_MAX};
use metallic_universality::data::{
    read_reference, save_json, write_reference, ReferenceCoefficients,
};
use metallic_universality::discovery::{paths, DataRoot};
use metallic_universality::error::UniversalityError;
use metallic_universality::figures::{
    write_run_figures, write_truncation_figure, TruncationFigure, CURVE_SAMPLES,
};
use metallic_universality::index::IndexDescriptor;
use metallic_universality::metallic::{
    asymptotic_metallic_mean, binet_fibonacci, binet_lucas, exceptional_family, fibonacci,
    golden_field_multiplier, lucas, metallic_mean, metallic_power_identity, pentagonal_identities,
};
use metallic_universality::pipeline::{run_all, truncation_study, PipelineRun};
use metallic_universality::provenance::{
    print_provenance, CLAIMED_CONJECTURE_TABLE, GOLDEN_ALPHA, GOLDEN_DELTA,
};
use metallic_universality::tolerances::{
    CONJECTURE_REL_TOLERANCE, EXACT_F64, IDENTITY_REL_TOLERANCE, ITERATIVE_F64,
    MAX_TRUNCATION_ORDER,
};
use metallic_universality::validation::ValidationHarness;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// Arguments for the `metallic_universality` binary.
#[derive(Parser, Debug)]
#[command(
    name = "metallic_universality",
    version,
    about = "Renormalization fixed points and universal δ for metallic-mean circle maps",
    long_about = None,
)]
struct Args {
    /// Run identities, the pipeline and all tolerance checks (default mode).
    #[arg(long, default_value_t = false)]
    verify_all: bool,

    /// Write figure data (JSON) under `<output>/figures/`.
    #[arg(long, default_value_t = false)]
    generate_figures: bool,

    /// Run the crate's test suite through cargo.
    #[arg(long, default_value_t = false)]
    run_tests: bool,

    /// JSON pipeline configuration; command-line values override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Truncation order N of each map.
    #[arg(long)]
    order: Option<usize>,

    /// Solve the exceptional family k = 1..=K instead of the configured indices.
    #[arg(long)]
    k_max: Option<u32>,

    /// Reference coefficient file used as warm start.
    #[arg(long)]
    warm_start: Option<PathBuf>,

    /// Write converged fixed points to `<output>/reference/`.
    #[arg(long, default_value_t = false)]
    save_reference: bool,

    /// Data root for results, figures and references (default: discovered).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fail the run when a conjecture row exceeds its tolerance.
    #[arg(long, default_value_t = false)]
    strict_conjecture: bool,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(
            args.log_level
                .parse::<tracing_subscriber::filter::LevelFilter>()
                .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .with_target(false)
        .init();

    if args.run_tests {
        process::exit(run_tests());
    }

    let config = load_config(&args).unwrap_or_else(|e| fatal(&e));
    let warm_start = load_warm_start(&config).unwrap_or_else(|e| fatal(&e));
    let root = DataRoot::resolve(args.output.as_deref()).unwrap_or_else(|e| fatal(&e));
    info!(root = %root.path().display(), source = ?root.source(), "data root");
    let verify = args.verifies();

    print_banner(match (verify, args.generate_figures) {
        (true, true) => "Metallic-mean universality: verify + figures",
        (true, false) => "Metallic-mean universality: verify all",
        _ => "Metallic-mean universality: figure data",
    });
    print_config(&config);

    // one pipeline run feeds both modes
    let t0 = Instant::now();
    let run = run_all(&config, warm_start.as_ref()).unwrap_or_else(|e| fatal(&e));
    println!("  Pipeline wall time: {:.1}s\n", t0.elapsed().as_secs_f64());

    let figures_ok = args
        .generate_figures
        .then(|| generate_figures(&config, &run, &root))
        .transpose()
        .unwrap_or_else(|e| fatal(&e));
    if args.save_reference {
        save_references(&run, &root);
    }

    if verify {
        verify_all(&run, &config, &root, &args, figures_ok);
    }
    process::exit(exit_code(run.all_converged(), figures_ok));
}

impl Args {
    /// Verification runs unless only figure data was requested.
    const fn verifies(&self) -> bool {
        self.verify_all || !self.generate_figures
    }
}

/// Exit status outside verification mode: 1 if an index failed or the
/// figure data was incomplete.
fn exit_code(all_converged: bool, figures_ok: Option<bool>) -> i32 {
    i32::from(!(all_converged && figures_ok.unwrap_or(true)))
}

fn fatal(err: &UniversalityError) -> ! {
    eprintln!("  ERROR: {err}");
    process::exit(2);
}

fn load_config(args: &Args) -> Result<PipelineConfig, UniversalityError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(order) = args.order {
        config.order = order;
    }
    if let Some(k_max) = args.k_max {
        config.indices = exceptional_indices(k_max);
    }
    if let Some(path) = &args.warm_start {
        config.warm_start = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn load_warm_start(
    config: &PipelineConfig,
) -> Result<Option<ReferenceCoefficients>, UniversalityError> {
    config
        .warm_start
        .as_deref()
        .map(|path| {
            let reference = read_reference(path)?;
            info!(
                path = %path.display(),
                n = reference.partial_quotient,
                order = reference.order(),
                "loaded warm start"
            );
            Ok(reference)
        })
        .transpose()
}

fn print_banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  {title:<60}║");
    println!("║  Commuting-pair renormalization, cubic critical circle maps  ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_config(config: &PipelineConfig) {
    let labels: Vec<String> = config
        .descriptors()
        .map(|d| d.iter().map(IndexDescriptor::label).collect())
        .unwrap_or_default();
    println!("  Order N:          {}", config.order);
    println!("  Exponent z:       {}", config.exponent);
    println!(
        "  Newton tol/max:   {:.1e} / {}",
        config.fixed_point_tolerance, config.max_newton_iterations
    );
    println!(
        "  Eigen tol/max:    {:.1e} / {}",
        config.eigen_tolerance, config.max_power_iterations
    );
    println!("  Indices:          {}", labels.join(", "));
    if let Some(step) = config.truncation_step {
        println!(
            "  Truncation check: N + {step}, threshold {:.1e}",
            config.truncation_threshold
        );
    }
    println!();
}

// ---------------------------------------------------------------------------
// --verify-all
// ---------------------------------------------------------------------------

fn verify_all(
    run: &PipelineRun,
    config: &PipelineConfig,
    root: &DataRoot,
    args: &Args,
    figures_ok: Option<bool>,
) -> ! {
    let mut harness = ValidationHarness::new("metallic_universality");
    let k_max = args.k_max.unwrap_or(DEFAULT_K_MAX);

    check_identities(&mut harness, k_max);
    check_indices(&mut harness, run, config);
    check_conjecture(&mut harness, run, args.strict_conjecture);
    if let Some(ok) = figures_ok {
        harness.check_bool("figure data and truncation study written", ok);
    }

    if let Err(e) = save_results(run, root) {
        warn!(error = %e, "results not saved");
    }

    harness.finish();
}

/// Terms of the large-n expansion of φ_n; 7e-10 relative at n = 4.
const ASYMPTOTIC_TERMS: usize = 10;

fn check_identities(harness: &mut ValidationHarness, k_max: u32) {
    println!("[1] Algebraic identities");

    for k in 1..=k_max {
        if let Some(identity) = metallic_power_identity(k) {
            harness.check_identity(&identity, IDENTITY_REL_TOLERANCE);
        }
    }
    for identity in pentagonal_identities() {
        harness.check_identity(&identity, IDENTITY_REL_TOLERANCE);
    }

    for member in exceptional_family(k_max) {
        harness.check_bool(
            &format!("{}² + 4 = 5·F_{}²", member.index, member.exponent),
            golden_field_multiplier(member.index)
                .is_some_and(|m| Some(m) == fibonacci(member.exponent)),
        );
        if let Ok(descriptor) = IndexDescriptor::exceptional(member.k) {
            harness.check_abs(
                &format!("ln φ_{} / ln φ = {}", descriptor.n, member.exponent),
                descriptor.scaling_exponent,
                f64::from(member.exponent),
                EXACT_F64,
            );
        }
        // the expansion diverges at n = 1
        if member.index >= 4 {
            #[allow(clippy::cast_precision_loss)]
            let n = member.index as f64;
            harness.check_rel(
                &format!("asymptotic φ_{} ({ASYMPTOTIC_TERMS} terms)", member.index),
                asymptotic_metallic_mean(n, ASYMPTOTIC_TERMS),
                metallic_mean(n),
                ITERATIVE_F64,
            );
        }
    }

    for m in 0..=2 * k_max {
        let (Some(l), Some(f), Ok(mi)) = (lucas(m), fibonacci(m), i32::try_from(m)) else {
            break;
        };
        #[allow(clippy::cast_precision_loss)]
        {
            let (l, f) = (l as f64, f as f64);
            harness.check_rel(&format!("Binet L_{m}"), binet_lucas(mi), l, IDENTITY_REL_TOLERANCE);
            harness.check_rel(
                &format!("Binet F_{m}"),
                binet_fibonacci(mi),
                f,
                IDENTITY_REL_TOLERANCE,
            );
        }
    }
    println!(
        "  {} identity checks, {} passed\n",
        harness.total_count(),
        harness.passed_count()
    );
}

fn check_indices(harness: &mut ValidationHarness, run: &PipelineRun, config: &PipelineConfig) {
    println!("[2] Fixed points and dominant eigenvalues (N = {})", run.order);
    println!(
        "  {:<14} {:>20} {:>16} {:>10} {:>10} {:>6}",
        "index", "δ", "α", "residual", "gap", "iters"
    );
    for outcome in &run.outcomes {
        match &outcome.result {
            Ok(report) => {
                println!(
                    "  {:<14} {:>20.12} {:>16.10} {:>10.2e} {:>10.4} {:>6}",
                    report.index.label(),
                    report.delta(),
                    report.alpha,
                    report.fixed_point.residual_norm,
                    report.eigen.gap_ratio,
                    report.fixed_point.iterations
                );
                harness.check_index_report(report, config.fixed_point_tolerance);
            }
            Err(e) => {
                println!("  {:<14} FAILED: {e}", outcome.index.label());
                harness.check_bool(&format!("{} converged", outcome.index.label()), false);
            }
        }
    }
    if run.base().is_some() {
        print_provenance(&[&GOLDEN_DELTA, &GOLDEN_ALPHA]);
    }
    println!();
}

fn check_conjecture(harness: &mut ValidationHarness, run: &PipelineRun, strict: bool) {
    println!("[3] δ_(L_(2k−1)) versus δ^(2k−1)");
    let Some(rows) = run.conjecture_table() else {
        println!("  golden-mean base case unavailable; comparison skipped\n");
        return;
    };
    println!(
        "  {:>3} {:>5} {:>20} {:>20} {:>12} {:>12}",
        "k", "n", "δ_n", "δ^(2k−1)", "rel. error", "claimed"
    );
    for row in &rows {
        let claimed = CLAIMED_CONJECTURE_TABLE
            .iter()
            .find(|c| c.k == row.k)
            .map_or_else(|| "-".to_string(), |c| format!("{:.1e}", c.relative_error));
        println!(
            "  {:>3} {:>5} {:>20.10} {:>20.10} {:>12.3e} {:>12}",
            row.k, row.n, row.delta, row.expected, row.relative_error, claimed
        );
        if strict {
            harness.check_conjecture_row(row, CONJECTURE_REL_TOLERANCE);
        }
    }
    if !strict {
        let within = rows
            .iter()
            .filter(|r| r.within(CONJECTURE_REL_TOLERANCE))
            .count();
        println!(
            "  {within}/{} rows within {CONJECTURE_REL_TOLERANCE:.0e} (informational; \
             --strict-conjecture to enforce)",
            rows.len()
        );
    }
    println!();
}

fn save_results(run: &PipelineRun, root: &DataRoot) -> Result<(), UniversalityError> {
    let dir = root.subdir(paths::RESULTS)?;
    let path = dir.join(format!("records_N{}.json", run.order));
    let payload = serde_json::json!({
        "order": run.order,
        "records": run.records(),
        "conjecture": run.conjecture_table(),
    });
    save_json(&path, &payload)?;
    println!("  Results saved to: {}", path.display());
    Ok(())
}

fn save_references(run: &PipelineRun, root: &DataRoot) {
    if let Err(e) = root.subdir(paths::REFERENCE) {
        warn!(error = %e, "reference directory unavailable");
        return;
    }
    for report in run.reports() {
        let path = root.reference_path(report.index.n, report.order);
        match report
            .reference()
            .and_then(|reference| write_reference(&path, &reference))
        {
            Ok(()) => println!("  Reference saved to: {}", path.display()),
            Err(e) => warn!(index = %report.index.label(), error = %e, "reference not saved"),
        }
    }
}

// ---------------------------------------------------------------------------
// --generate-figures
// ---------------------------------------------------------------------------

/// Orders of the golden-mean truncation study.
const TRUNCATION_STUDY_ORDERS: [usize; 5] = [8, 12, 16, 20, 24];

/// Write figure data for `run` plus a golden-mean truncation study.
/// Returns whether every index converged and the study succeeded.
fn generate_figures(
    config: &PipelineConfig,
    run: &PipelineRun,
    root: &DataRoot,
) -> Result<bool, UniversalityError> {
    println!("[F] Figure data");
    let dir = root.subdir(paths::FIGURES)?;
    for (index, e) in run.failures() {
        println!("  {:<14} FAILED: {e}", index.label());
    }
    let written = write_run_figures(run, &dir, CURVE_SAMPLES)?;

    let golden = IndexDescriptor::golden()?;
    let orders: Vec<usize> = TRUNCATION_STUDY_ORDERS
        .iter()
        .copied()
        .chain(std::iter::once(config.order))
        .filter(|&o| o <= MAX_TRUNCATION_ORDER)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut study_ok = true;
    match truncation_study(config, &golden, &orders) {
        Ok(points) => {
            let study = TruncationFigure::new(golden.n, points);
            println!("  Golden-mean truncation study");
            for (i, point) in study.points.iter().enumerate() {
                print!("  N = {:>3}  δ = {:.12}", point.order, point.delta);
                match i.checked_sub(1).and_then(|j| study.successive_differences.get(j)) {
                    Some(d) => println!("  |Δδ| = {d:.3e}"),
                    None => println!(),
                }
            }
            let path = write_truncation_figure(&study, &dir)?;
            println!("  Figure data: {}", path.display());
        }
        Err(e) => {
            warn!(error = %e, "truncation study failed");
            println!("  Golden-mean truncation study FAILED: {e}");
            study_ok = false;
        }
    }

    for path in &written {
        println!("  Figure data: {}", path.display());
    }
    println!();
    Ok(run.all_converged() && study_ok)
}

// ---------------------------------------------------------------------------
// --run-tests
// ---------------------------------------------------------------------------

fn run_tests() -> i32 {
    print_banner("Metallic-mean universality: test suite");
    let t0 = Instant::now();
    let status = Command::new("cargo")
        .args(["test", "--release"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .status();
    match status {
        Ok(status) if status.success() => {
            println!("\n  ALL TESTS PASSED ({:.1}s)", t0.elapsed().as_secs_f64());
            0
        }
        Ok(status) => {
            println!("\n  TESTS FAILED ({status})");
            1
        }
        Err(e) => {
            eprintln!("  ERROR: could not run cargo: {e}");
            2
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(flags: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("metallic_universality").chain(flags.iter().copied()))
            .unwrap_or_else(|e| panic!("{flags:?}: {e}"))
    }

    #[test]
    fn modes_from_flags() {
        assert!(parse(&[]).verifies());
        assert!(parse(&["--verify-all"]).verifies());
        assert!(!parse(&["--generate-figures"]).verifies());
        let both = parse(&["--generate-figures", "--verify-all"]);
        assert!(both.verifies() && both.generate_figures);
    }

    #[test]
    fn figure_failure_sets_exit_code() {
        assert_eq!(exit_code(true, None), 0);
        assert_eq!(exit_code(true, Some(true)), 0);
        assert_eq!(exit_code(true, Some(false)), 1);
        assert_eq!(exit_code(false, Some(true)), 1);
    }
}
