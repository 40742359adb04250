//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Timelike;
use res_storage_sim::error::Result;
use res_storage_sim::scenario::{Scenario, SeriesSource};
use res_storage_sim::sim::series::{HourlySeries, year_timestamps};
use res_storage_sim::sim::types::GridParams;
use res_storage_sim::storage::{BatterySpec, PhsSpec, StorageAssetSpec, StorageSpecRegistry};

/// Battery-only registry with default battery parameters.
pub fn battery_registry() -> StorageSpecRegistry {
    StorageSpecRegistry::new([StorageAssetSpec::Battery(BatterySpec::default())])
        .expect("default battery spec is valid")
}

/// Battery plus default PHS.
pub fn battery_phs_registry() -> StorageSpecRegistry {
    StorageSpecRegistry::new([
        StorageAssetSpec::Battery(BatterySpec::default()),
        StorageAssetSpec::Phs(PhsSpec::default()),
    ])
    .expect("default specs are valid")
}

/// Full net billing, no losses.
pub fn lossless_grid() -> GridParams {
    GridParams::new(100.0, 0.0)
}

/// `day_mw` from 00:00 to 11:59 and `night_mw` for the rest of each day.
pub fn day_night_series(year: i32, day_mw: f64, night_mw: f64) -> HourlySeries {
    let timestamps = year_timestamps(year, true).expect("valid year");
    let values = timestamps
        .iter()
        .map(|ts| if ts.hour() < 12 { day_mw } else { night_mw })
        .collect();
    HourlySeries::new(timestamps, values).expect("aligned")
}

pub fn scenario(id: &str, capacities: &[(&str, f64)]) -> Scenario {
    let capacities_mw: BTreeMap<String, f64> = capacities
        .iter()
        .map(|(tech, mw)| ((*tech).to_string(), *mw))
        .collect();
    Scenario::new(id, capacities_mw)
}

/// Constant demand; solar produces its capacity for the first half of each
/// day, every other technology produces its capacity around the clock.
pub struct DayNightSource {
    pub demand_mw: f64,
}

impl SeriesSource for DayNightSource {
    fn demand(&self, year: i32) -> Result<HourlySeries> {
        HourlySeries::constant(year, self.demand_mw, true)
    }

    fn generation(&self, year: i32, scenario: &Scenario, technology: &str) -> Result<HourlySeries> {
        let mw = scenario.capacities_mw.get(technology).copied().unwrap_or(0.0);
        if technology == "solar" {
            Ok(day_night_series(year, mw, 0.0))
        } else {
            HourlySeries::constant(year, mw, true)
        }
    }
}

/// Fresh directory under the system temp dir, removed first if present.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("res-storage-sim-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
