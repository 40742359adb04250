//! Scenarios, the input-series seam and per-scenario input preparation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimError};
use crate::sim::engine::DispatchInputs;
use crate::sim::series::HourlySeries;
use crate::sim::sizing::Target;

/// Technology name whose generation is served directly against demand.
pub const HYDRO: &str = "hydro";

/// One installed-capacity combination of RES technologies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    /// Restricts the scenario to one simulated year; `None` applies to all.
    pub year: Option<i32>,
    /// Installed capacity per technology (MW).
    pub capacities_mw: BTreeMap<String, f64>,
}

impl Scenario {
    pub fn new(id: impl Into<String>, capacities_mw: BTreeMap<String, f64>) -> Self {
        Self {
            id: id.into(),
            year: None,
            capacities_mw,
        }
    }

    pub fn applies_to(&self, year: i32) -> bool {
        self.year.is_none_or(|y| y == year)
    }

    /// Non-hydro technologies with a positive installed capacity.
    pub fn storable_technologies(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.capacities_mw
            .iter()
            .filter(|(tech, mw)| tech.as_str() != HYDRO && **mw > 0.0)
            .map(|(tech, mw)| (tech.as_str(), *mw))
    }

    /// Installed non-hydro capacity, the basis of the interconnection cap (MW).
    pub fn installed_res_capacity_mw(&self) -> f64 {
        self.storable_technologies().map(|(_, mw)| mw).sum()
    }

    pub fn hydro_capacity_mw(&self) -> f64 {
        self.capacities_mw.get(HYDRO).copied().unwrap_or(0.0)
    }
}

/// Provider of hourly demand and per-technology generation series.
///
/// Implementations must return series aligned hour-for-hour with the
/// demand series of the same year.
pub trait SeriesSource: Sync {
    /// Hourly gross demand for `year` (MWh).
    fn demand(&self, year: i32) -> Result<HourlySeries>;

    /// Hourly generation of `technology` at the scenario's installed capacity (MWh).
    fn generation(&self, year: i32, scenario: &Scenario, technology: &str) -> Result<HourlySeries>;
}

/// Prepared dispatch inputs of one scenario-year.
#[derive(Debug, Clone)]
pub struct ScenarioInputs {
    pub scenario_id: String,
    pub year: i32,
    /// Demand left after hydro, floored at zero.
    pub residual_demand: HourlySeries,
    /// Hydro actually served against demand; `None` without hydro.
    pub hydro_served: Option<HourlySeries>,
    /// Sum of every non-hydro technology's generation.
    pub storable_generation: HourlySeries,
    pub installed_res_capacity_mw: f64,
    /// Gross demand over the whole input year (MWh).
    pub total_demand_mwh: f64,
    /// Potential RES generation including all hydro (MWh).
    pub total_res_generation_mwh: f64,
}

impl ScenarioInputs {
    /// Loads and aggregates a scenario's series for `year`.
    ///
    /// # Errors
    ///
    /// Propagates source errors and returns [`SimError::Series`] when a
    /// generation series is not aligned with demand.
    pub fn load<S: SeriesSource + ?Sized>(source: &S, year: i32, scenario: &Scenario) -> Result<Self> {
        let demand = source.demand(year)?;

        let mut storable = demand.zeros_like();
        for (tech, _) in scenario.storable_technologies() {
            let series = source.generation(year, scenario, tech)?;
            demand.check_aligned(&series, &format!("{tech} generation"))?;
            storable = storable.plus(&series)?;
        }

        let (residual_demand, hydro_served, hydro_total) = if scenario.hydro_capacity_mw() > 0.0 {
            let hydro = source.generation(year, scenario, HYDRO)?;
            demand.check_aligned(&hydro, "hydro generation")?;
            let served: Vec<f64> = demand
                .values()
                .iter()
                .zip(hydro.values())
                .map(|(d, h)| h.min(*d).max(0.0))
                .collect();
            let residual: Vec<f64> = demand
                .values()
                .iter()
                .zip(&served)
                .map(|(d, s)| (d - s).max(0.0))
                .collect();
            (
                HourlySeries::new(demand.timestamps().to_vec(), residual)?,
                Some(HourlySeries::new(demand.timestamps().to_vec(), served)?),
                hydro.total(),
            )
        } else {
            (demand.clone(), None, 0.0)
        };

        let inputs = Self {
            scenario_id: scenario.id.clone(),
            year,
            total_demand_mwh: demand.total(),
            total_res_generation_mwh: storable.total() + hydro_total,
            residual_demand,
            hydro_served,
            storable_generation: storable,
            installed_res_capacity_mw: scenario.installed_res_capacity_mw(),
        };
        debug!(
            scenario = %inputs.scenario_id,
            year,
            demand_twh = inputs.total_demand_mwh / 1e6,
            res_twh = inputs.total_res_generation_mwh / 1e6,
            "scenario inputs loaded"
        );
        Ok(inputs)
    }

    pub fn dispatch_inputs(&self) -> DispatchInputs<'_> {
        DispatchInputs {
            demand: &self.residual_demand,
            hydro: self.hydro_served.as_ref(),
            generation: &self.storable_generation,
            installed_res_capacity_mw: self.installed_res_capacity_mw,
        }
    }

    /// Rejects scenarios no amount of storage can bring to the threshold.
    ///
    /// # Errors
    ///
    /// [`SimError::InfeasibleScenario`] when there is no storable generation,
    /// when total RES falls short of the demand threshold, or when the
    /// generation in excess of demand already exceeds the curtailment threshold.
    pub fn check_feasible(&self, target: Target, threshold_pct: f64) -> Result<()> {
        let storable = self.storable_generation.total();
        if storable <= 0.0 {
            return Err(SimError::InfeasibleScenario {
                reason: format!("scenario {} has no storable RES generation", self.scenario_id),
            });
        }
        match target {
            Target::Demand => {
                let needed = self.total_demand_mwh * threshold_pct / 100.0;
                if self.total_res_generation_mwh < needed {
                    return Err(SimError::InfeasibleScenario {
                        reason: format!(
                            "RES generation {:.3} TWh cannot cover {threshold_pct}% of demand ({:.3} TWh)",
                            self.total_res_generation_mwh / 1e6,
                            needed / 1e6
                        ),
                    });
                }
            }
            Target::Curtailment => {
                let unavoidable_pct =
                    (storable - self.residual_demand.total()) / storable * 100.0;
                if unavoidable_pct > threshold_pct {
                    return Err(SimError::InfeasibleScenario {
                        reason: format!(
                            "{unavoidable_pct:.2}% of generation exceeds annual demand, above the {threshold_pct}% curtailment threshold"
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
