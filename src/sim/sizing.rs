//! Battery capacity sizing against a penetration or curtailment target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SimError};
use crate::storage::StorageSpecRegistry;

use super::engine::HourlyDispatchSimulator;
use super::kpi::TrialPoint;
use super::secant::{Reading, SecantSettings, Termination, solve};
use super::store::DispatchStateStore;
use super::types::HourRecord;

/// Metric the sizing search aims at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Raise RES penetration of demand up to the threshold.
    #[default]
    Demand,
    /// Bring curtailment down to the threshold.
    Curtailment,
}

impl Target {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Demand => "demand",
            Self::Curtailment => "curtailment",
        }
    }

    /// The metric this target tracks on a trial.
    pub fn metric(self, point: &TrialPoint) -> f64 {
        match self {
            Self::Demand => point.res_penetration_pct,
            Self::Curtailment => point.curtailment_pct,
        }
    }

    /// Whether adding storage can still move the metric toward `threshold`.
    pub fn keep_going(self, point: &TrialPoint, threshold: f64) -> bool {
        match self {
            Self::Demand => point.res_penetration_pct < threshold && point.curtailment_pct > 0.0,
            Self::Curtailment => {
                point.curtailment_pct > threshold && point.res_penetration_pct < 100.0
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demand" | "penetration" => Ok(Self::Demand),
            "curtailment" => Ok(Self::Curtailment),
            other => Err(SimError::Configuration(format!(
                "unknown target \"{other}\" (expected \"demand\" or \"curtailment\")"
            ))),
        }
    }
}

/// Search parameters shared by every scenario of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingSettings {
    pub target: Target,
    pub threshold_pct: f64,
    pub offset_pct: f64,
    pub bootstrap_step_mwh: f64,
    pub max_trials: usize,
}

/// Result of one sizing search.
#[derive(Debug, Clone)]
pub struct SizingOutcome {
    /// Retained trials in order; the first is the zero-capacity baseline.
    pub trials: Vec<TrialPoint>,
    pub termination: Termination,
    /// Hour records of the accepted trial.
    pub records: Vec<HourRecord>,
}

impl SizingOutcome {
    /// Metrics without any storage (trial 0).
    pub fn baseline(&self) -> &TrialPoint {
        &self.trials[0]
    }

    pub fn accepted(&self) -> &TrialPoint {
        &self.trials[self.trials.len() - 1]
    }
}

/// Secant search for the battery capacity that meets a [`Target`].
pub struct CapacitySizingSearch<'a> {
    simulator: &'a HourlyDispatchSimulator<'a>,
    registry: &'a StorageSpecRegistry,
    settings: SizingSettings,
}

impl<'a> CapacitySizingSearch<'a> {
    pub fn new(
        simulator: &'a HourlyDispatchSimulator<'a>,
        registry: &'a StorageSpecRegistry,
        settings: SizingSettings,
    ) -> Self {
        Self {
            simulator,
            registry,
            settings,
        }
    }

    /// Runs one dispatch pass at `capacity` into `store` and aggregates it.
    fn trial(&self, capacity: f64, store: &mut DispatchStateStore) -> Result<TrialPoint> {
        let limits = self.registry.bess_limits(capacity)?;
        self.simulator.run(&limits, store)?;
        TrialPoint::from_records(capacity, limits.p_discharge_max, store.records())
    }

    /// Runs the search starting from zero capacity.
    ///
    /// # Errors
    ///
    /// Missing battery spec, undefined metrics and negative secant
    /// projections abort the search.
    pub fn run(&self) -> Result<SizingOutcome> {
        let target = self.settings.target;
        let threshold = self.settings.threshold_pct;
        let secant = SecantSettings {
            target: threshold,
            tolerance: self.settings.offset_pct,
            bootstrap_step: self.settings.bootstrap_step_mwh,
            max_trials: self.settings.max_trials,
        };

        let mut store = DispatchStateStore::with_capacity(self.simulator.inputs().demand.len());
        let outcome = solve(
            &secant,
            0.0,
            |capacity| {
                let point = self.trial(capacity, &mut store)?;
                debug!(
                    capacity_mwh = point.capacity_mwh,
                    penetration_pct = point.res_penetration_pct,
                    curtailment_pct = point.curtailment_pct,
                    "sizing trial"
                );
                Ok(point)
            },
            |point| Reading {
                x: point.capacity_mwh,
                metric: target.metric(point),
                keep_going: target.keep_going(point, threshold),
            },
        )?;

        let accepted_capacity = match outcome.termination {
            Termination::Stalled => {
                let stalled = outcome.discarded.as_ref().map(|p| p.capacity_mwh);
                warn!(
                    ?stalled,
                    metric = target.as_str(),
                    "sizing search stalled, keeping previous trial"
                );
                outcome.accepted().map(|p| p.capacity_mwh)
            }
            Termination::TrialLimit => {
                warn!(
                    max_trials = self.settings.max_trials,
                    "sizing search hit the trial limit"
                );
                None
            }
            Termination::Converged | Termination::ConditionMet => None,
        };

        // The store holds the last evaluated trial; replay when it was discarded.
        if let Some(capacity) = accepted_capacity {
            let limits = self.registry.bess_limits(capacity)?;
            self.simulator.run(&limits, &mut store)?;
        }

        Ok(SizingOutcome {
            trials: outcome.trials,
            termination: outcome.termination,
            records: store.into_records(),
        })
    }
}
