//! Core dispatch types: grid parameters, charge state and the per-hour record.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Battery or PHS activity in one hour, derived from the sign of its net
/// stored-energy delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeState {
    Charging,
    Discharging,
    #[default]
    Idle,
}

impl ChargeState {
    pub fn from_delta(delta_mwh: f64) -> Self {
        if delta_mwh > 0.0 {
            Self::Charging
        } else if delta_mwh < 0.0 {
            Self::Discharging
        } else {
            Self::Idle
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Charging => "charging",
            Self::Discharging => "discharging",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interconnection parameters shared by every scenario of a run.
///
/// # Examples
///
/// ```
/// use res_storage_sim::sim::types::GridParams;
///
/// let grid = GridParams::new(50.0, 2.0);
/// assert_eq!(grid.interconnection_cap_mw(300.0), 150.0);
/// assert!((grid.loss_factor() - 0.98).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    /// Instantaneously deliverable share of installed RES capacity (%).
    pub net_billing_pct: f64,
    /// High to low voltage conversion losses (%).
    pub hv_to_lv_losses_pct: f64,
}

impl GridParams {
    pub fn new(net_billing_pct: f64, hv_to_lv_losses_pct: f64) -> Self {
        Self {
            net_billing_pct,
            hv_to_lv_losses_pct,
        }
    }

    /// Fraction of energy surviving the HV to LV conversion.
    pub fn loss_factor(&self) -> f64 {
        1.0 - self.hv_to_lv_losses_pct / 100.0
    }

    pub fn interconnection_cap_mw(&self, installed_res_capacity_mw: f64) -> f64 {
        self.net_billing_pct / 100.0 * installed_res_capacity_mw
    }
}

/// Full state of one simulated hour. Energies are MWh for the hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourRecord {
    pub timestamp: NaiveDateTime,
    /// Residual demand after hydro, before storage.
    pub demand: f64,
    /// Hydro generation served directly against demand.
    pub hydro: f64,
    /// Storable RES generation.
    pub generation: f64,
    /// Generation deliverable to demand after the interconnection cap and losses.
    pub eligible_generation: f64,

    /// Energy charged into the battery.
    pub battery_charge: f64,
    /// Energy delivered to demand by the battery.
    pub battery_discharge: f64,
    pub battery_soc: f64,
    /// Net change of battery SOC in this hour.
    pub battery_stored_energy: f64,
    /// Energy crossing the battery terminals (charge plus drawn), always >= 0.
    pub battery_throughput: f64,
    pub battery_charge_state: ChargeState,
    pub periods_since_state_change: u32,

    pub phs_charge: f64,
    pub phs_discharge: f64,
    pub phs_soc: f64,
    pub phs_stored_energy: f64,
    pub phs_charge_state: ChargeState,

    /// Demand met by hydro, RES and storage.
    pub res_penetration: f64,
    pub curtailment: f64,
    pub energy_shortage: f64,
    /// Residual demand after storage effects (charging adds, discharging removes).
    pub modified_demand: f64,
}

impl HourRecord {
    /// A record with the hour's inputs filled in and no storage activity.
    pub fn new(timestamp: NaiveDateTime, demand: f64, hydro: f64, generation: f64) -> Self {
        Self {
            timestamp,
            demand,
            hydro,
            generation,
            eligible_generation: 0.0,
            battery_charge: 0.0,
            battery_discharge: 0.0,
            battery_soc: 0.0,
            battery_stored_energy: 0.0,
            battery_throughput: 0.0,
            battery_charge_state: ChargeState::Idle,
            periods_since_state_change: 1,
            phs_charge: 0.0,
            phs_discharge: 0.0,
            phs_soc: 0.0,
            phs_stored_energy: 0.0,
            phs_charge_state: ChargeState::Idle,
            res_penetration: hydro,
            curtailment: 0.0,
            energy_shortage: 0.0,
            modified_demand: demand,
        }
    }

    /// Copy of `self` stamped with another hour.
    pub fn restamped(&self, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// `true` when eligible generation covered demand in this hour.
    pub fn is_surplus(&self) -> bool {
        self.eligible_generation >= self.demand
    }
}

impl fmt::Display for HourRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | demand={:>9.2} gen={:>9.2} eligible={:>9.2} | \
             bat(+{:.2}/-{:.2}, SoC={:.2}, {} x{}) phs(+{:.2}/-{:.2}, SoC={:.2}) | \
             pen={:.2} curt={:.2} short={:.2}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.demand,
            self.generation,
            self.eligible_generation,
            self.battery_charge,
            self.battery_discharge,
            self.battery_soc,
            self.battery_charge_state,
            self.periods_since_state_change,
            self.phs_charge,
            self.phs_discharge,
            self.phs_soc,
            self.res_penetration,
            self.curtailment,
            self.energy_shortage,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("valid")
    }

    #[test]
    fn charge_state_follows_sign() {
        assert_eq!(ChargeState::from_delta(0.5), ChargeState::Charging);
        assert_eq!(ChargeState::from_delta(-0.5), ChargeState::Discharging);
        assert_eq!(ChargeState::from_delta(0.0), ChargeState::Idle);
    }

    #[test]
    fn new_record_carries_inputs() {
        let r = HourRecord::new(ts(), 80.0, 20.0, 150.0);
        assert_eq!(r.modified_demand, 80.0);
        assert_eq!(r.res_penetration, 20.0);
        assert_eq!(r.periods_since_state_change, 1);
        assert_eq!(r.battery_charge_state, ChargeState::Idle);
    }

    #[test]
    fn zero_losses_keep_full_factor() {
        let grid = GridParams::new(100.0, 0.0);
        assert_eq!(grid.loss_factor(), 1.0);
        assert_eq!(grid.interconnection_cap_mw(200.0), 200.0);
    }

    #[test]
    fn display_does_not_panic() {
        let s = format!("{}", HourRecord::new(ts(), 1.0, 0.0, 2.0));
        assert!(s.contains("2030-06-01 12:00"));
    }
}
