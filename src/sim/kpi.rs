//! Post-hoc metrics computed from a trial's hour records.

use std::fmt;

use crate::error::{Result, SimError};

use super::types::HourRecord;

/// Aggregate metrics of one dispatch pass at a given battery capacity.
///
/// Computed post-hoc from the returned records so leap-day hours never
/// count twice.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPoint {
    /// Battery energy capacity of the trial (MWh).
    pub capacity_mwh: f64,
    /// Battery discharge power (MW).
    pub power_capacity_mw: f64,
    /// Demand met by RES, hydro and storage, as % of gross demand.
    pub res_penetration_pct: f64,
    /// Curtailed energy as % of storable generation.
    pub curtailment_pct: f64,
    pub curtailment_mwh: f64,
    pub max_hourly_curtailment_mwh: f64,
    pub res_penetration_mwh: f64,
    /// Annual unmet demand (MWh).
    pub energy_shortage_mwh: f64,
    /// Largest unmet demand in a single hour (MW).
    pub peak_shortage_mw: f64,
    pub battery_throughput_mwh: f64,
    pub max_periods_until_state_change: u32,
    /// Storable generation over the retained hours (MWh).
    pub total_generation_mwh: f64,
    /// Gross demand (residual plus hydro served) over the retained hours (MWh).
    pub total_demand_mwh: f64,
}

impl TrialPoint {
    /// Aggregates a pass into a trial point.
    ///
    /// # Errors
    ///
    /// [`SimError::DivisionUndefined`] when total demand or total storable
    /// generation is zero.
    pub fn from_records(
        capacity_mwh: f64,
        power_capacity_mw: f64,
        records: &[HourRecord],
    ) -> Result<Self> {
        let mut penetration = 0.0;
        let mut demand = 0.0;
        let mut generation = 0.0;
        let mut curtailment = 0.0;
        let mut shortage = 0.0;
        let mut max_curtailment = 0.0_f64;
        let mut peak_shortage = 0.0_f64;
        let mut throughput = 0.0;
        let mut max_periods = 0_u32;

        for r in records {
            penetration += r.res_penetration;
            demand += r.demand + r.hydro;
            generation += r.generation;
            curtailment += r.curtailment;
            shortage += r.energy_shortage;
            max_curtailment = max_curtailment.max(r.curtailment);
            peak_shortage = peak_shortage.max(r.energy_shortage);
            throughput += r.battery_throughput;
            max_periods = max_periods.max(r.periods_since_state_change);
        }

        if demand <= 0.0 {
            return Err(SimError::DivisionUndefined {
                metric: "res_penetration_pct",
            });
        }
        if generation <= 0.0 {
            return Err(SimError::DivisionUndefined {
                metric: "curtailment_pct",
            });
        }

        Ok(Self {
            capacity_mwh,
            power_capacity_mw,
            res_penetration_pct: 100.0 * penetration / demand,
            curtailment_pct: 100.0 * curtailment / generation,
            curtailment_mwh: curtailment,
            max_hourly_curtailment_mwh: max_curtailment,
            res_penetration_mwh: penetration,
            energy_shortage_mwh: shortage,
            peak_shortage_mw: peak_shortage,
            battery_throughput_mwh: throughput,
            max_periods_until_state_change: max_periods,
            total_generation_mwh: generation,
            total_demand_mwh: demand,
        })
    }
}

impl fmt::Display for TrialPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Battery:               {:.3} MWh / {:.3} MW",
            self.capacity_mwh, self.power_capacity_mw
        )?;
        writeln!(f, "RES penetration:       {:.3}%", self.res_penetration_pct)?;
        writeln!(
            f,
            "Curtailment:           {:.3}% ({:.1} MWh)",
            self.curtailment_pct, self.curtailment_mwh
        )?;
        writeln!(
            f,
            "Energy shortage:       {:.1} MWh (peak {:.2} MW)",
            self.energy_shortage_mwh, self.peak_shortage_mw
        )?;
        writeln!(f, "Battery throughput:    {:.1} MWh", self.battery_throughput_mwh)?;
        write!(
            f,
            "Longest battery state: {} h",
            self.max_periods_until_state_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::series::year_timestamps;

    fn record(demand: f64, hydro: f64, generation: f64, pen: f64, curt: f64) -> HourRecord {
        let ts = year_timestamps(2023, true).expect("valid")[0];
        let mut r = HourRecord::new(ts, demand, hydro, generation);
        r.res_penetration = pen;
        r.curtailment = curt;
        r
    }

    #[test]
    fn percentages_use_gross_demand_and_storable_generation() {
        let records = vec![
            record(80.0, 20.0, 150.0, 100.0, 50.0),
            record(100.0, 0.0, 50.0, 50.0, 0.0),
        ];
        let point = TrialPoint::from_records(0.0, 0.0, &records).expect("defined");
        assert!((point.res_penetration_pct - 75.0).abs() < 1e-9);
        assert!((point.curtailment_pct - 25.0).abs() < 1e-9);
        assert_eq!(point.total_demand_mwh, 200.0);
        assert_eq!(point.res_penetration_mwh, 150.0);
        assert_eq!(point.max_hourly_curtailment_mwh, 50.0);
    }

    #[test]
    fn zero_generation_is_undefined() {
        let records = vec![record(10.0, 0.0, 0.0, 0.0, 0.0)];
        let err = TrialPoint::from_records(0.0, 0.0, &records).expect_err("undefined");
        assert!(matches!(
            err,
            SimError::DivisionUndefined {
                metric: "curtailment_pct"
            }
        ));
    }

    #[test]
    fn zero_demand_is_undefined() {
        let err = TrialPoint::from_records(0.0, 0.0, &[]).expect_err("undefined");
        assert!(matches!(err, SimError::DivisionUndefined { .. }));
    }

    #[test]
    fn max_periods_tracked() {
        let mut records = vec![record(1.0, 0.0, 1.0, 1.0, 0.0); 3];
        records[1].periods_since_state_change = 7;
        let point = TrialPoint::from_records(0.0, 0.0, &records).expect("defined");
        assert_eq!(point.max_periods_until_state_change, 7);
    }
}
