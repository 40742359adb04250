//! End-to-end runs of the scenario runner over CSV and synthetic inputs.

mod common;

use std::fs::File;
use std::io::Write;
use std::path::Path;

use res_storage_sim::config::{DemoConfig, RunConfig, RunMode};
use res_storage_sim::io::export::{export_hour_records, export_summary, summary_file_name};
use res_storage_sim::io::import::{CsvSeriesSource, TIMESTAMP_FORMAT, read_series};
use res_storage_sim::profiles::SyntheticSource;
use res_storage_sim::runner::{FleetState, ScenarioOutcome, ScenarioRunner};
use res_storage_sim::sim::series::HourlySeries;
use res_storage_sim::sim::sizing::Target;

fn lossless_config(mode: RunMode, years: Vec<i32>) -> RunConfig {
    let mut cfg = RunConfig::baseline();
    cfg.simulation.mode = mode;
    cfg.simulation.years = years;
    cfg.simulation.hv_to_lv_losses_pct = 0.0;
    cfg
}

fn write_series(path: &Path, series: &HourlySeries) {
    let mut wtr = csv::Writer::from_path(path).expect("create series file");
    wtr.write_record(["timestamp", "value"]).expect("header");
    for (ts, value) in series.iter() {
        wtr.write_record([ts.format(TIMESTAMP_FORMAT).to_string(), value.to_string()])
            .expect("row");
    }
    wtr.flush().expect("flush");
}

#[test]
fn sizing_run_reports_sorted_outcomes_and_skips_dark_scenarios() {
    let cfg = lossless_config(RunMode::Sizing, vec![2023]);
    let source = common::DayNightSource { demand_mw: 100.0 };
    let runner = ScenarioRunner::new(&cfg, &source).expect("valid config");
    let scenarios = vec![
        common::scenario("s2", &[("solar", 200.0)]),
        common::scenario("dark", &[("solar", 0.0), ("hydro", 0.0)]),
        common::scenario("s1", &[("solar", 200.0), ("wind", 0.0)]),
    ];
    let reports = runner.run(&scenarios, FleetState::default());

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    let ids: Vec<&str> = report.outcomes.iter().map(ScenarioOutcome::scenario_id).collect();
    assert_eq!(ids, vec!["dark", "s1", "s2"]);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);

    for result in report.results() {
        assert!((result.metrics.res_penetration_pct - 80.0).abs() <= 1.0);
        assert!(result.baseline.is_some());
        assert!(result.trials >= 2);
        assert_eq!(result.target, Target::Demand);
    }
}

#[test]
fn dispatch_run_carries_degraded_fleet_across_years() {
    let cfg = lossless_config(RunMode::Dispatch, vec![2023, 2025]);
    let source = common::DayNightSource { demand_mw: 100.0 };
    let runner = ScenarioRunner::new(&cfg, &source).expect("valid config");
    let scenarios = vec![common::scenario("s1", &[("solar", 200.0)])];
    let fleet = FleetState::new([("s1".to_string(), 1_000.0)].into_iter().collect());
    let reports = runner.run(&scenarios, fleet);

    let first = reports[0].results().next().expect("year one completed");
    let second = reports[1].results().next().expect("year two completed");
    assert_eq!(first.battery_capacity_mwh, 1_000.0);
    assert!(first.battery_cycles > 300.0);
    assert!(first.degraded_battery_capacity_mwh < 1_000.0);
    assert_eq!(second.battery_capacity_mwh, first.degraded_battery_capacity_mwh);
    assert!(first.termination.is_none());
}

#[test]
fn csv_inputs_run_end_to_end() {
    let dir = common::scratch_dir("csv-inputs");
    let year = 2023;
    std::fs::create_dir_all(dir.join("generation").join(year.to_string())).expect("mkdir");

    write_series(
        &dir.join(format!("demand_{year}.csv")),
        &HourlySeries::constant(year, 100.0, true).expect("valid"),
    );
    write_series(
        &dir.join("generation").join(year.to_string()).join("s1_solar.csv"),
        &common::day_night_series(year, 200.0, 0.0),
    );
    write_series(
        &dir.join("generation").join(year.to_string()).join("s1_hydro.csv"),
        &HourlySeries::constant(year, 10.0, true).expect("valid"),
    );
    let mut f = File::create(dir.join("scenarios.csv")).expect("scenarios");
    writeln!(f, "scenario_id,solar,hydro\ns1,200,10").expect("write");
    let mut f = File::create(dir.join("storage_capacities.csv")).expect("capacities");
    writeln!(f, "scenario_id,battery_capacity_mwh\ns1,500").expect("write");

    let source = CsvSeriesSource::new(&dir);
    let scenarios = source.scenarios().expect("scenarios load");
    let fleet = source.storage_capacities().expect("capacities load");
    let cfg = lossless_config(RunMode::Dispatch, vec![year]);
    let runner = ScenarioRunner::new(&cfg, &source)
        .expect("valid config")
        .with_hourly(true);
    let reports = runner.run(&scenarios, fleet);

    let run = reports[0].outcomes[0].completed().expect("completed");
    assert_eq!(run.records.len(), 8760);
    assert!(run.records.iter().all(|r| r.hydro == 10.0 && r.demand == 90.0));
    assert_eq!(run.result.capacities_mw.get("hydro"), Some(&10.0));

    let summary = dir.join(summary_file_name(RunMode::Dispatch, Target::Demand, year));
    export_summary(reports[0].results(), &summary).expect("summary written");
    let mut rdr = csv::Reader::from_path(&summary).expect("summary readable");
    let headers = rdr.headers().expect("header").clone();
    assert!(headers.iter().any(|h| h == "solar_mw"));
    assert_eq!(rdr.records().count(), 1);

    let hourly = dir.join("hourly.csv");
    export_hour_records(&run.records, &hourly).expect("hourly written");
    let mut rdr = csv::Reader::from_path(&hourly).expect("hourly readable");
    assert_eq!(rdr.records().count(), 8760);

    let demand = read_series(File::open(dir.join("demand_2023.csv")).expect("open"))
        .expect("demand parses");
    assert_eq!(demand.len(), 8760);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_file_fails_only_that_scenario() {
    let dir = common::scratch_dir("missing-input");
    write_series(
        &dir.join("demand_2023.csv"),
        &HourlySeries::constant(2023, 100.0, true).expect("valid"),
    );
    let source = CsvSeriesSource::new(&dir);
    let cfg = lossless_config(RunMode::Sizing, vec![2023]);
    let runner = ScenarioRunner::new(&cfg, &source).expect("valid config");
    let reports = runner.run(
        &[common::scenario("ghost", &[("wind", 10.0)])],
        FleetState::default(),
    );
    assert_eq!(reports[0].failed(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn synthetic_sizing_run_completes_without_failures() {
    let mut cfg = RunConfig::baseline();
    cfg.simulation.parallel = true;
    let source = SyntheticSource::new(&DemoConfig::default());
    let runner = ScenarioRunner::new(&cfg, &source).expect("valid config");
    let reports = runner.run(&source.scenarios(), source.fleet());

    let report = &reports[0];
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.failed(), 0);
    for result in report.results() {
        assert!(result.metrics.res_penetration_pct.is_finite());
        assert!(result.metrics.capacity_mwh >= 0.0);
        assert!(result.total_res_generation_mwh > 0.0);
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let source = SyntheticSource::new(&DemoConfig::default());
    let mut cfg = RunConfig::baseline();
    cfg.simulation.mode = RunMode::Dispatch;

    cfg.simulation.parallel = true;
    let parallel = ScenarioRunner::new(&cfg, &source)
        .expect("valid config")
        .run(&source.scenarios(), source.fleet());
    cfg.simulation.parallel = false;
    let sequential = ScenarioRunner::new(&cfg, &source)
        .expect("valid config")
        .run(&source.scenarios(), source.fleet());

    let a: Vec<_> = parallel[0].results().map(|r| r.metrics.clone()).collect();
    let b: Vec<_> = sequential[0].results().map(|r| r.metrics.clone()).collect();
    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
}
