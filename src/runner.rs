//! Scenario orchestration: sizing or fixed-capacity dispatch per scenario,
//! failure isolation, parallel fan-out and cross-year fleet state.

use std::collections::BTreeMap;
use std::fmt;

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::config::{RunConfig, RunMode};
use crate::error::{Result, SimError};
use crate::scenario::{Scenario, ScenarioInputs, SeriesSource};
use crate::sim::engine::HourlyDispatchSimulator;
use crate::sim::kpi::TrialPoint;
use crate::sim::secant::Termination;
use crate::sim::sizing::{CapacitySizingSearch, Target};
use crate::sim::types::HourRecord;
use crate::storage::StorageSpecRegistry;

/// Summary of one scenario-year.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub year: i32,
    pub mode: RunMode,
    pub target: Target,
    pub capacities_mw: BTreeMap<String, f64>,
    pub total_res_generation_mwh: f64,
    pub total_demand_mwh: f64,
    pub battery_capacity_mwh: f64,
    pub battery_power_mw: f64,
    /// Fixed PHS capacity when PHS is part of the fleet.
    pub phs_capacity_mwh: Option<f64>,
    /// Metrics at the sized (or given) capacity.
    pub metrics: TrialPoint,
    /// Metrics without storage, sizing mode only.
    pub baseline: Option<TrialPoint>,
    pub battery_cycles: f64,
    /// Capacity after this year's cycling, next year's starting capacity.
    pub degraded_battery_capacity_mwh: f64,
    /// Why the sizing search stopped, sizing mode only.
    pub termination: Option<Termination>,
    /// Number of retained sizing trials (1 in dispatch mode).
    pub trials: usize,
}

impl ScenarioResult {
    pub fn total_res_generation_twh(&self) -> f64 {
        self.total_res_generation_mwh / 1e6
    }

    pub fn total_demand_twh(&self) -> f64 {
        self.total_demand_mwh / 1e6
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "--- Scenario {} ({}, {} mode) ---",
            self.scenario_id, self.year, self.mode
        )?;
        let capacities: Vec<String> = self
            .capacities_mw
            .iter()
            .map(|(tech, mw)| format!("{tech}={mw:.1} MW"))
            .collect();
        writeln!(f, "Installed:             {}", capacities.join(", "))?;
        writeln!(
            f,
            "RES / demand:          {:.3} / {:.3} TWh",
            self.total_res_generation_twh(),
            self.total_demand_twh()
        )?;
        if let Some(base) = &self.baseline {
            writeln!(
                f,
                "Without storage:       penetration {:.3}%, curtailment {:.3}%",
                base.res_penetration_pct, base.curtailment_pct
            )?;
        }
        writeln!(f, "{}", self.metrics)?;
        if let Some(phs) = self.phs_capacity_mwh {
            writeln!(f, "PHS:                   {phs:.1} MWh")?;
        }
        write!(
            f,
            "Cycles / degraded:     {:.2} / {:.3} MWh",
            self.battery_cycles, self.degraded_battery_capacity_mwh
        )?;
        if let Some(termination) = self.termination {
            write!(f, "\nSearch:                {termination} after {} trials", self.trials)?;
        }
        Ok(())
    }
}

/// A completed scenario with its hour records (empty unless requested).
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub result: ScenarioResult,
    pub records: Vec<HourRecord>,
}

/// Per-scenario outcome; failures never abort the batch.
#[derive(Debug)]
pub enum ScenarioOutcome {
    Completed(Box<ScenarioRun>),
    /// Infeasible before any trial.
    Skipped { scenario_id: String, reason: String },
    Failed { scenario_id: String, error: SimError },
}

impl ScenarioOutcome {
    pub fn scenario_id(&self) -> &str {
        match self {
            Self::Completed(run) => run.result.scenario_id.as_str(),
            Self::Skipped { scenario_id, .. } | Self::Failed { scenario_id, .. } => {
                scenario_id.as_str()
            }
        }
    }

    pub fn completed(&self) -> Option<&ScenarioRun> {
        match self {
            Self::Completed(run) => Some(run),
            _ => None,
        }
    }
}

/// Outcomes of every scenario of one year, sorted by scenario id.
#[derive(Debug)]
pub struct YearReport {
    pub year: i32,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl YearReport {
    pub fn results(&self) -> impl Iterator<Item = &ScenarioResult> + '_ {
        self.outcomes
            .iter()
            .filter_map(|o| o.completed().map(|run| &run.result))
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScenarioOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScenarioOutcome::Failed { .. }))
            .count()
    }
}

/// Battery capacity per scenario id, carried from one dispatch year to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetState {
    capacities_mwh: BTreeMap<String, f64>,
}

impl FleetState {
    pub fn new(capacities_mwh: BTreeMap<String, f64>) -> Self {
        Self { capacities_mwh }
    }

    pub fn capacity_for(&self, scenario_id: &str) -> Option<f64> {
        self.capacities_mwh.get(scenario_id).copied()
    }

    pub fn len(&self) -> usize {
        self.capacities_mwh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacities_mwh.is_empty()
    }

    /// Next year's fleet: completed scenarios start from their degraded
    /// capacity, the others keep their current one.
    pub fn advance(&self, report: &YearReport) -> Self {
        let mut next = self.clone();
        for result in report.results() {
            next.capacities_mwh.insert(
                result.scenario_id.clone(),
                result.degraded_battery_capacity_mwh,
            );
        }
        next
    }
}

/// Drives sizing or dispatch over scenarios and years.
pub struct ScenarioRunner<'a, S: SeriesSource + ?Sized> {
    config: &'a RunConfig,
    registry: StorageSpecRegistry,
    source: &'a S,
    keep_hourly: bool,
}

impl<'a, S: SeriesSource + ?Sized> ScenarioRunner<'a, S> {
    /// Creates a runner after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] listing every validation failure.
    pub fn new(config: &'a RunConfig, source: &'a S) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            let joined: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(SimError::Configuration(joined.join("; ")));
        }
        Ok(Self {
            config,
            registry: config.storage_registry()?,
            source,
            keep_hourly: false,
        })
    }

    /// Keep each completed scenario's hour records.
    pub fn with_hourly(mut self, keep: bool) -> Self {
        self.keep_hourly = keep;
        self
    }

    pub fn registry(&self) -> &StorageSpecRegistry {
        &self.registry
    }

    fn simulator<'i>(&self, inputs: &'i ScenarioInputs) -> Result<HourlyDispatchSimulator<'i>> {
        let phs = if self.config.phs_enabled() {
            Some(self.registry.phs_limits()?)
        } else {
            None
        };
        HourlyDispatchSimulator::new(inputs.dispatch_inputs(), self.config.grid(), phs)
    }

    fn result(
        &self,
        inputs: &ScenarioInputs,
        scenario: &Scenario,
        metrics: TrialPoint,
        baseline: Option<TrialPoint>,
        termination: Option<Termination>,
        trials: usize,
    ) -> Result<ScenarioResult> {
        let battery = self.registry.battery()?;
        let capacity = metrics.capacity_mwh;
        let cycles = battery.cycles(capacity, metrics.battery_throughput_mwh);
        Ok(ScenarioResult {
            scenario_id: scenario.id.clone(),
            year: inputs.year,
            mode: self.config.simulation.mode,
            target: self.config.simulation.target,
            capacities_mw: scenario.capacities_mw.clone(),
            total_res_generation_mwh: inputs.total_res_generation_mwh,
            total_demand_mwh: inputs.total_demand_mwh,
            battery_capacity_mwh: capacity,
            battery_power_mw: metrics.power_capacity_mw,
            phs_capacity_mwh: self
                .config
                .phs_enabled()
                .then_some(self.config.phs.capacity_mwh),
            battery_cycles: cycles,
            degraded_battery_capacity_mwh: battery.degraded_capacity(capacity, cycles),
            metrics,
            baseline,
            termination,
            trials,
        })
    }

    /// Sizes the battery of one scenario-year.
    ///
    /// # Errors
    ///
    /// [`SimError::InfeasibleScenario`] before any trial when the target is
    /// out of reach; search and input errors otherwise.
    pub fn size_scenario(&self, year: i32, scenario: &Scenario) -> Result<ScenarioRun> {
        let inputs = ScenarioInputs::load(self.source, year, scenario)?;
        let settings = self.config.sizing_settings();
        inputs.check_feasible(settings.target, settings.threshold_pct)?;

        let simulator = self.simulator(&inputs)?;
        let outcome = CapacitySizingSearch::new(&simulator, &self.registry, settings).run()?;
        let baseline = outcome.baseline().clone();
        let accepted = outcome.accepted().clone();
        let trials = outcome.trials.len();
        let result = self.result(
            &inputs,
            scenario,
            accepted,
            Some(baseline),
            Some(outcome.termination),
            trials,
        )?;
        Ok(ScenarioRun {
            result,
            records: if self.keep_hourly { outcome.records } else { Vec::new() },
        })
    }

    /// Dispatches one scenario-year at a fixed battery capacity.
    ///
    /// # Errors
    ///
    /// Input errors and undefined metrics.
    pub fn dispatch_scenario(
        &self,
        year: i32,
        scenario: &Scenario,
        capacity_mwh: f64,
    ) -> Result<ScenarioRun> {
        let inputs = ScenarioInputs::load(self.source, year, scenario)?;
        let simulator = self.simulator(&inputs)?;
        let limits = self.registry.bess_limits(capacity_mwh)?;
        let records = simulator.simulate(&limits)?;
        let metrics = TrialPoint::from_records(capacity_mwh, limits.p_discharge_max, &records)?;
        let result = self.result(&inputs, scenario, metrics, None, None, 1)?;
        Ok(ScenarioRun {
            result,
            records: if self.keep_hourly { records } else { Vec::new() },
        })
    }

    fn evaluate(&self, year: i32, scenario: &Scenario, fleet: &FleetState) -> ScenarioOutcome {
        info!(scenario = %scenario.id, year, mode = %self.config.simulation.mode, "scenario started");
        let run = match self.config.simulation.mode {
            RunMode::Sizing => self.size_scenario(year, scenario),
            RunMode::Dispatch => match fleet.capacity_for(&scenario.id) {
                Some(capacity) => self.dispatch_scenario(year, scenario, capacity),
                None => Err(SimError::Configuration(format!(
                    "no battery capacity given for scenario {}",
                    scenario.id
                ))),
            },
        };
        match run {
            Ok(run) => {
                info!(
                    scenario = %scenario.id,
                    year,
                    capacity_mwh = run.result.battery_capacity_mwh,
                    penetration_pct = run.result.metrics.res_penetration_pct,
                    curtailment_pct = run.result.metrics.curtailment_pct,
                    "scenario finished"
                );
                ScenarioOutcome::Completed(Box::new(run))
            }
            Err(e) if e.is_infeasible() => {
                warn!(scenario = %scenario.id, year, "skipped: {e}");
                ScenarioOutcome::Skipped {
                    scenario_id: scenario.id.clone(),
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!(scenario = %scenario.id, year, "failed: {e}");
                ScenarioOutcome::Failed {
                    scenario_id: scenario.id.clone(),
                    error: e,
                }
            }
        }
    }

    /// Runs every scenario applying to `year`. Dispatch mode reads
    /// capacities from `fleet`; sizing mode ignores it.
    pub fn run_year(&self, year: i32, scenarios: &[Scenario], fleet: &FleetState) -> YearReport {
        let applicable: Vec<&Scenario> = scenarios.iter().filter(|s| s.applies_to(year)).collect();
        let mut outcomes: Vec<ScenarioOutcome> = if self.config.simulation.parallel {
            applicable
                .par_iter()
                .map(|s| self.evaluate(year, s, fleet))
                .collect()
        } else {
            applicable
                .iter()
                .map(|s| self.evaluate(year, s, fleet))
                .collect()
        };
        outcomes.sort_by(|a, b| a.scenario_id().cmp(b.scenario_id()));

        let report = YearReport { year, outcomes };
        info!(
            year,
            completed = report.results().count(),
            skipped = report.skipped(),
            failed = report.failed(),
            "year finished"
        );
        report
    }

    /// Runs every configured year. In dispatch mode each year's degraded
    /// capacities become the next year's fleet.
    pub fn run(&self, scenarios: &[Scenario], initial_fleet: FleetState) -> Vec<YearReport> {
        let mut fleet = initial_fleet;
        let mut reports = Vec::with_capacity(self.config.simulation.years.len());
        for &year in &self.config.simulation.years {
            let report = self.run_year(year, scenarios, &fleet);
            if self.config.simulation.mode == RunMode::Dispatch {
                fleet = fleet.advance(&report);
            }
            reports.push(report);
        }
        reports
    }
}
