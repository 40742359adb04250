//! Configuration files, presets and the command-line binary.

mod common;

use std::path::Path;
use std::process::Command;

use res_storage_sim::config::{RunConfig, RunMode};
use res_storage_sim::profiles::SyntheticSource;
use res_storage_sim::sim::sizing::Target;
use res_storage_sim::storage::StorageTechnology;

#[test]
fn shipped_config_files_parse_and_validate() {
    for name in ["configs/baseline.toml", "configs/dispatch_phs.toml"] {
        let cfg = RunConfig::from_toml_file(Path::new(name))
            .unwrap_or_else(|e| panic!("{name} should parse: {e}"));
        let errors = cfg.validate();
        assert!(errors.is_empty(), "{name} should be valid: {errors:?}");
    }
}

#[test]
fn dispatch_config_declares_scenarios_and_fleet() {
    let cfg = RunConfig::from_toml_file(Path::new("configs/dispatch_phs.toml")).expect("parses");
    assert_eq!(cfg.simulation.mode, RunMode::Dispatch);
    assert_eq!(cfg.simulation.target, Target::Curtailment);
    assert!(cfg.phs_enabled());
    assert_eq!(
        cfg.simulation.storage_technologies,
        vec![StorageTechnology::Battery, StorageTechnology::Phs]
    );

    let source = SyntheticSource::new(&cfg.demo);
    let scenarios = source.scenarios();
    assert_eq!(scenarios.len(), 3);
    assert_eq!(scenarios[2].year, Some(2032));
    assert!(!scenarios[2].applies_to(2030));
    assert_eq!(source.fleet().capacity_for("wind_heavy"), Some(1_200.0));
}

#[test]
fn every_preset_is_valid() {
    for name in RunConfig::PRESETS {
        let cfg = RunConfig::from_preset(name).expect("known preset");
        assert!(cfg.validate().is_empty(), "preset {name} invalid");
        assert!(cfg.storage_registry().is_ok());
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let err = RunConfig::from_toml_str("[simulation]\nthreshold = 80.0\n").expect_err("rejected");
    assert!(err.to_string().contains("toml"));
}

#[test]
fn binary_writes_summary_and_hourly_files() {
    let out = common::scratch_dir("cli-out");
    let output = Command::new(env!("CARGO_BIN_EXE_res-storage-sim"))
        .args(["--preset", "baseline", "--mode", "dispatch", "--hourly", "--sequential"])
        .arg("--out-dir")
        .arg(&out)
        .output()
        .expect("binary should run");

    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("--- Scenario s01 (2030, dispatch mode) ---"));

    let summary = out.join("summary_dispatch_demand_2030.csv");
    let mut rdr = csv::Reader::from_path(&summary).expect("summary exists");
    assert_eq!(rdr.records().count(), 3);
    for id in ["s01", "s02", "s03"] {
        assert!(out.join(format!("hourly_dispatch_{id}_2030.csv")).exists());
    }

    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn binary_runs_demo_inputs() {
    let out = common::scratch_dir("cli-demo");
    let output = Command::new(env!("CARGO_BIN_EXE_res-storage-sim"))
        .args(["--preset", "baseline", "--mode", "dispatch", "--demo", "--sequential"])
        .arg("--out-dir")
        .arg(&out)
        .output()
        .expect("binary should run");

    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.join("summary_dispatch_demand_2030.csv").exists());

    let _ = std::fs::remove_dir_all(&out);
}

#[test]
fn binary_rejects_demo_with_data_dir() {
    let output = Command::new(env!("CARGO_BIN_EXE_res-storage-sim"))
        .args(["--demo", "--data-dir", "data"])
        .output()
        .expect("binary should run");
    assert!(!output.status.success());
}

#[test]
fn binary_rejects_conflicting_sources() {
    let output = Command::new(env!("CARGO_BIN_EXE_res-storage-sim"))
        .args(["--preset", "baseline", "--config", "configs/baseline.toml"])
        .output()
        .expect("binary should run");
    assert!(!output.status.success());
}
