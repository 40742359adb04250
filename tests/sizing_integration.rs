//! Integration tests for the secant capacity sizing search.

mod common;

use res_storage_sim::error::SimError;
use res_storage_sim::sim::engine::{DispatchInputs, HourlyDispatchSimulator};
use res_storage_sim::sim::secant::{Reading, SecantSettings, Termination, solve};
use res_storage_sim::sim::series::HourlySeries;
use res_storage_sim::sim::sizing::{CapacitySizingSearch, SizingSettings, Target};

fn settings(target: Target, threshold_pct: f64) -> SizingSettings {
    SizingSettings {
        target,
        threshold_pct,
        offset_pct: 1.0,
        bootstrap_step_mwh: 0.001,
        max_trials: 100,
    }
}

/// Demand of 100 MW against 200 MW of generation for half of each day.
fn with_day_night_simulator<T>(f: impl FnOnce(&HourlyDispatchSimulator<'_>) -> T) -> T {
    let demand = HourlySeries::constant(2023, 100.0, true).expect("valid");
    let generation = common::day_night_series(2023, 200.0, 0.0);
    let inputs = DispatchInputs {
        demand: &demand,
        hydro: None,
        generation: &generation,
        installed_res_capacity_mw: 200.0,
    };
    let sim = HourlyDispatchSimulator::new(inputs, common::lossless_grid(), None).expect("aligned");
    f(&sim)
}

#[test]
fn demand_target_converges_within_offset() {
    let registry = common::battery_registry();
    let out = with_day_night_simulator(|sim| {
        CapacitySizingSearch::new(sim, &registry, settings(Target::Demand, 80.0))
            .run()
            .expect("search runs")
    });

    assert!(matches!(
        out.termination,
        Termination::Converged | Termination::ConditionMet
    ));
    let accepted = out.accepted();
    assert!((accepted.res_penetration_pct - 80.0).abs() <= 1.0);
    assert!(accepted.capacity_mwh > 800.0 && accepted.capacity_mwh < 1_000.0);
    assert!((out.baseline().res_penetration_pct - 50.0).abs() < 1e-6);
    assert_eq!(out.baseline().capacity_mwh, 0.0);
    assert_eq!(out.records.len(), 8760);
}

#[test]
fn curtailment_target_converges_within_offset() {
    let registry = common::battery_registry();
    let out = with_day_night_simulator(|sim| {
        CapacitySizingSearch::new(sim, &registry, settings(Target::Curtailment, 20.0))
            .run()
            .expect("search runs")
    });

    let accepted = out.accepted();
    assert!((accepted.curtailment_pct - 20.0).abs() <= 1.0);
    assert!((out.baseline().curtailment_pct - 50.0).abs() < 1e-6);
    assert!(accepted.capacity_mwh > 700.0 && accepted.capacity_mwh < 900.0);
}

#[test]
fn trial_limit_keeps_last_trial() {
    let registry = common::battery_registry();
    let mut s = settings(Target::Demand, 80.0);
    s.max_trials = 2;
    let out = with_day_night_simulator(|sim| {
        CapacitySizingSearch::new(sim, &registry, s).run().expect("search runs")
    });

    assert_eq!(out.termination, Termination::TrialLimit);
    assert_eq!(out.trials.len(), 2);
    assert!((out.accepted().capacity_mwh - 0.001).abs() < 1e-12);
    assert_eq!(out.records.len(), 8760);
}

#[test]
fn records_belong_to_accepted_capacity() {
    let registry = common::battery_registry();
    with_day_night_simulator(|sim| {
        let out = CapacitySizingSearch::new(sim, &registry, settings(Target::Demand, 80.0))
            .run()
            .expect("search runs");
        let limits = registry.bess_limits(out.accepted().capacity_mwh).expect("battery");
        let replay = sim.simulate(&limits).expect("runs");
        assert_eq!(replay, out.records);
    });
}

#[test]
fn flat_metric_stalls_and_keeps_previous_trial() {
    let secant = SecantSettings {
        target: 80.0,
        tolerance: 1.0,
        bootstrap_step: 0.001,
        max_trials: 100,
    };
    let out = solve(
        &secant,
        0.0,
        |x| Ok((x, 40.0)),
        |p: &(f64, f64)| Reading {
            x: p.0,
            metric: p.1,
            keep_going: true,
        },
    )
    .expect("solves");

    assert_eq!(out.termination, Termination::Stalled);
    assert_eq!(out.trials.len(), 1);
    assert_eq!(out.accepted(), Some(&(0.0, 40.0)));
    assert_eq!(out.discarded, Some((0.001, 40.0)));
}

#[test]
fn decreasing_metric_projects_negative_capacity() {
    let secant = SecantSettings {
        target: 80.0,
        tolerance: 1.0,
        bootstrap_step: 1.0,
        max_trials: 100,
    };
    let err = solve(
        &secant,
        0.0,
        |x| Ok((x, 50.0 - x)),
        |p: &(f64, f64)| Reading {
            x: p.0,
            metric: p.1,
            keep_going: true,
        },
    )
    .expect_err("negative projection");

    assert!(matches!(
        err,
        SimError::NegativeCapacityProjection { trial: 1, .. }
    ));
}
