// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests: reference files, configuration files, discovery and
//! provenance working together.

use std::path::PathBuf;

use metallic_universality::config::{IndexSpec, PipelineConfig};
use metallic_universality::data::{read_reference, write_reference};
use metallic_universality::discovery::{paths, DataRoot};
use metallic_universality::index::IndexDescriptor;
use metallic_universality::pipeline::{solve_index, SeedSource};
use metallic_universality::provenance::{self, CLAIMED_CONJECTURE_TABLE, GOLDEN_DELTA};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("metallic_universality_it_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join(paths::REFERENCE)).expect("create scratch root");
    dir
}

#[test]
fn saved_fixed_point_warm_starts_a_higher_order() {
    let root = scratch("warm_start");
    let golden = IndexDescriptor::golden().expect("golden");

    let coarse = PipelineConfig {
        order: 12,
        indices: vec![IndexSpec::Exceptional { k: 1 }],
        ..PipelineConfig::default()
    };
    let cold = solve_index(&coarse, &golden, None).expect("N = 12 converges");
    let data = DataRoot::at(&root).expect("scratch root");
    let path = data.reference_path(golden.n, cold.order);
    write_reference(&path, &cold.reference().expect("reference")).expect("write");

    let located = data.find_reference(1, 12).expect("reference on disk");
    let reference = read_reference(&located).expect("read back");
    assert_eq!(reference.order(), 12);
    assert_eq!(reference.coefficients, cold.fixed_point.coefficients);

    let json = serde_json::json!({
        "order": 16,
        "indices": [{ "family": "exceptional", "k": 1 }],
        "warm_start": located,
    });
    let fine = PipelineConfig::from_json_str(&json.to_string()).expect("config");
    assert_eq!(fine.warm_start.as_deref(), Some(located.as_path()));

    let warm = solve_index(&fine, &golden, Some(&reference)).expect("N = 16 converges");
    assert_eq!(
        warm.seed,
        SeedSource::Reference {
            order: 12,
            partial_quotient: 1
        }
    );
    assert!(warm.fixed_point.iterations <= cold.fixed_point.iterations);
    assert!(((warm.delta() - GOLDEN_DELTA.value) / GOLDEN_DELTA.value).abs() < 1e-7);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn config_file_round_trip() {
    let root = scratch("config");
    let cfg = PipelineConfig {
        order: 20,
        indices: vec![IndexSpec::Metallic { n: 3 }, IndexSpec::Exceptional { k: 2 }],
        truncation_step: Some(4),
        ..PipelineConfig::default()
    };
    let path = root.join("run.json");
    std::fs::write(&path, serde_json::to_string_pretty(&cfg).expect("serialize")).expect("write");
    let loaded = PipelineConfig::from_json_file(&path).expect("load");
    assert_eq!(loaded, cfg);
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_config_file_is_fatal() {
    let err = PipelineConfig::from_json_file(&PathBuf::from("/nonexistent/metallic.json"))
        .expect_err("missing file");
    assert!(!err.is_recoverable());
}

#[test]
fn every_default_index_has_a_delta_baseline() {
    for desc in PipelineConfig::default().descriptors().expect("defaults") {
        let baseline = provenance::delta_baseline(desc.n).expect("baseline recorded");
        assert!(baseline.value < 0.0, "{} must be negative", baseline.label);
    }
}

#[test]
fn claimed_table_covers_default_family() {
    let ks: Vec<u32> = CLAIMED_CONJECTURE_TABLE.iter().map(|row| row.k).collect();
    assert_eq!(ks, vec![2, 3, 4]);
    for row in &CLAIMED_CONJECTURE_TABLE {
        let implied = (row.delta - row.expected).abs() / row.expected;
        // published errors are rounded to two digits
        assert!((implied - row.relative_error).abs() < 0.15 * row.relative_error);
    }
}
