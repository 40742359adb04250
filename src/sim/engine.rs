//! Hourly dispatch engine: interconnection cap, surplus charging, deficit
//! discharging and the leap-day carry-over.

use tracing::{debug, trace};

use crate::error::{Result, SimError};
use crate::storage::{BessLimits, PhsLimits};

use super::series::{HourlySeries, is_leap_day};
use super::store::DispatchStateStore;
use super::types::{ChargeState, GridParams, HourRecord};

/// Aligned hourly inputs for one scenario-year.
#[derive(Debug, Clone, Copy)]
pub struct DispatchInputs<'a> {
    /// Residual demand after hydro (MWh).
    pub demand: &'a HourlySeries,
    /// Hydro served directly against demand, credited to penetration.
    pub hydro: Option<&'a HourlySeries>,
    /// Storable RES generation (MWh).
    pub generation: &'a HourlySeries,
    /// Installed non-hydro RES capacity used for the interconnection cap (MW).
    pub installed_res_capacity_mw: f64,
}

/// Limits of one storage unit, shared by the battery and PHS paths.
#[derive(Debug, Clone, Copy)]
struct Unit {
    capacity: f64,
    p_charge_max: f64,
    p_discharge_max: f64,
    min_level: f64,
    efficiency: f64,
}

impl From<&BessLimits> for Unit {
    fn from(l: &BessLimits) -> Self {
        Self {
            capacity: l.capacity,
            p_charge_max: l.p_charge_max,
            p_discharge_max: l.p_discharge_max,
            min_level: l.min_discharge_level,
            efficiency: l.efficiency,
        }
    }
}

impl From<&PhsLimits> for Unit {
    fn from(l: &PhsLimits) -> Self {
        Self {
            capacity: l.capacity,
            p_charge_max: l.p_charge_max,
            p_discharge_max: l.p_discharge_max,
            min_level: l.min_discharge_level,
            efficiency: l.efficiency,
        }
    }
}

impl Unit {
    /// Stores up to `energy`, limited by headroom and charge power. Returns
    /// the energy stored.
    fn charge(&self, soc: &mut f64, energy: f64) -> f64 {
        let headroom = (self.capacity - *soc).max(0.0);
        let charged = energy.min(headroom).min(self.p_charge_max).max(0.0);
        *soc += charged;
        charged
    }

    /// Delivers up to `need` after round-trip and grid losses. Returns
    /// `(delivered, drawn from SOC)`.
    fn discharge(&self, soc: &mut f64, need: f64, loss_factor: f64) -> (f64, f64) {
        let available = (*soc - self.min_level).max(0.0);
        let deliverable = available * self.efficiency * loss_factor;
        let delivered = need.min(deliverable).min(self.p_discharge_max).max(0.0);
        if delivered <= 0.0 {
            return (0.0, 0.0);
        }
        let drawn = (delivered / (self.efficiency * loss_factor)).min(available);
        *soc -= drawn;
        (delivered, drawn)
    }
}

/// Deterministic hour-by-hour dispatch of one battery (and optionally one
/// PHS unit) against a scenario-year.
///
/// The simulator is stateless between passes; all hourly state lives in the
/// [`DispatchStateStore`] handed to [`HourlyDispatchSimulator::run`].
#[derive(Debug, Clone)]
pub struct HourlyDispatchSimulator<'a> {
    inputs: DispatchInputs<'a>,
    grid: GridParams,
    phs: Option<PhsLimits>,
}

impl<'a> HourlyDispatchSimulator<'a> {
    /// Creates a simulator over aligned inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Series`] when generation or hydro hours differ
    /// from the demand hours.
    pub fn new(inputs: DispatchInputs<'a>, grid: GridParams, phs: Option<PhsLimits>) -> Result<Self> {
        inputs.demand.check_aligned(inputs.generation, "storable generation")?;
        if let Some(hydro) = inputs.hydro {
            inputs.demand.check_aligned(hydro, "hydro generation")?;
        }
        Ok(Self { inputs, grid, phs })
    }

    pub fn inputs(&self) -> &DispatchInputs<'a> {
        &self.inputs
    }

    pub fn grid(&self) -> &GridParams {
        &self.grid
    }

    pub fn phs(&self) -> Option<&PhsLimits> {
        self.phs.as_ref()
    }

    /// Computes hour `t` from the previous hour's record.
    ///
    /// # Arguments
    ///
    /// * `t` - Hour index into the input series
    /// * `prev` - Record of hour `t - 1`, `None` for the first hour
    /// * `battery` - Battery limits for the current trial capacity
    pub fn step(&self, t: usize, prev: Option<&HourRecord>, battery: &BessLimits) -> HourRecord {
        let timestamp = self.inputs.demand.timestamps()[t];
        let demand = self.inputs.demand.values()[t];
        let generation = self.inputs.generation.values()[t];
        let hydro = self.inputs.hydro.map_or(0.0, |h| h.values()[t]);
        let mut rec = HourRecord::new(timestamp, demand, hydro, generation);

        let k = self.grid.loss_factor();
        let cap = self
            .grid
            .interconnection_cap_mw(self.inputs.installed_res_capacity_mw);

        // Generation above the cap never reaches demand directly.
        let (eligible, mut to_store) = if generation > cap {
            (cap * k, generation - cap)
        } else {
            (generation * k, 0.0)
        };
        rec.eligible_generation = eligible;

        let bat = Unit::from(battery);
        let phs = self.phs.as_ref().map(Unit::from);
        let prev_soc = prev.map_or(bat.min_level, |p| p.battery_soc);
        let prev_phs_soc = match (&phs, prev) {
            (Some(_), Some(p)) => p.phs_soc,
            (Some(u), None) => u.min_level,
            (None, _) => 0.0,
        };
        let mut soc = prev_soc;
        let mut phs_soc = prev_phs_soc;
        let mut drawn = 0.0;
        let mut phs_drawn = 0.0;

        if eligible >= demand {
            rec.res_penetration += demand;
            if eligible > demand {
                to_store += (eligible - demand) / k;
            }
        } else {
            let missing = demand - eligible;
            let (delivered, from_soc) = bat.discharge(&mut soc, missing, k);
            rec.battery_discharge = delivered;
            drawn = from_soc;

            let mut shortage = missing - delivered;
            if let Some(unit) = &phs {
                if shortage > 0.0 {
                    let (delivered, from_soc) = unit.discharge(&mut phs_soc, shortage, k);
                    rec.phs_discharge = delivered;
                    phs_drawn = from_soc;
                    shortage -= delivered;
                }
            }
            rec.res_penetration += eligible + rec.battery_discharge + rec.phs_discharge;
            rec.energy_shortage = shortage.max(0.0);
        }

        // Battery first, PHS takes what the battery cannot, the rest is curtailed.
        rec.battery_charge = bat.charge(&mut soc, to_store);
        let mut unstored = to_store - rec.battery_charge;
        if let Some(unit) = &phs {
            rec.phs_charge = unit.charge(&mut phs_soc, unstored);
            unstored -= rec.phs_charge;
        }
        rec.curtailment = unstored.max(0.0);

        rec.battery_soc = soc.clamp(bat.min_level.min(bat.capacity), bat.capacity.max(0.0));
        rec.battery_stored_energy = rec.battery_charge - drawn;
        rec.battery_throughput = rec.battery_charge + drawn;
        rec.battery_charge_state = ChargeState::from_delta(rec.battery_stored_energy);
        // Only a continued charge or discharge extends the run; idle hours restart it.
        rec.periods_since_state_change = match prev {
            Some(p)
                if rec.battery_charge_state != ChargeState::Idle
                    && p.battery_charge_state == rec.battery_charge_state =>
            {
                p.periods_since_state_change + 1
            }
            _ => 1,
        };

        rec.phs_soc = phs_soc;
        rec.phs_stored_energy = rec.phs_charge - phs_drawn;
        rec.phs_charge_state = ChargeState::from_delta(rec.phs_stored_energy);

        rec.modified_demand = demand + rec.battery_charge + rec.phs_charge
            - rec.battery_discharge
            - rec.phs_discharge;
        rec
    }

    /// Runs one full pass into `store`, which is reset first. Feb 29 hours
    /// repeat the record 24 hours earlier and are dropped once the pass ends,
    /// so a full-year input always leaves 8760 records.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Series`] when a leap-day hour has no record 24
    /// hours before it.
    pub fn run(&self, battery: &BessLimits, store: &mut DispatchStateStore) -> Result<()> {
        store.reset();
        let timestamps = self.inputs.demand.timestamps();
        for (t, ts) in timestamps.iter().enumerate() {
            let record = if is_leap_day(ts) {
                let source = t.checked_sub(24).and_then(|j| store.get(j)).ok_or_else(|| {
                    SimError::Series(format!("leap-day hour {ts} has no record 24 hours earlier"))
                })?;
                trace!(%ts, "leap-day hour repeats previous day");
                source.restamped(*ts)
            } else {
                self.step(t, store.previous(t), battery)
            };
            store.push(record);
        }
        store.drop_leap_days();
        debug!(
            capacity_mwh = battery.capacity,
            hours = store.len(),
            "dispatch pass complete"
        );
        Ok(())
    }

    /// Convenience pass with a fresh store.
    pub fn simulate(&self, battery: &BessLimits) -> Result<Vec<HourRecord>> {
        let mut store = DispatchStateStore::with_capacity(self.inputs.demand.len());
        self.run(battery, &mut store)?;
        Ok(store.into_records())
    }
}
