//! Per-technology storage parameters and the operating limits derived from them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Storage technologies the dispatch policy knows how to operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageTechnology {
    Battery,
    Phs,
}

impl StorageTechnology {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Battery => "battery",
            Self::Phs => "phs",
        }
    }
}

impl fmt::Display for StorageTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageTechnology {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "battery" | "bess" => Ok(Self::Battery),
            "phs" => Ok(Self::Phs),
            other => Err(SimError::Configuration(format!(
                "unknown storage technology \"{other}\" (expected \"battery\" or \"phs\")"
            ))),
        }
    }
}

/// Battery energy storage parameters. The energy capacity itself is sized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatterySpec {
    /// Energy to power ratio (h).
    pub duration_h: f64,
    /// Charge power as a percentage of energy capacity.
    pub charging_rate_pct: f64,
    pub depth_of_discharge_pct: f64,
    pub round_trip_efficiency_pct: f64,
    /// Capacity lost per equivalent full cycle (%).
    pub degradation_rate_per_cycle_pct: f64,
}

impl Default for BatterySpec {
    fn default() -> Self {
        Self {
            duration_h: 4.0,
            charging_rate_pct: 25.0,
            depth_of_discharge_pct: 90.0,
            round_trip_efficiency_pct: 90.0,
            degradation_rate_per_cycle_pct: 0.005,
        }
    }
}

impl BatterySpec {
    /// Equivalent full cycles for a year's throughput: one cycle is one
    /// charge plus one discharge of the whole capacity.
    ///
    /// ```
    /// use res_storage_sim::storage::BatterySpec;
    ///
    /// let spec = BatterySpec::default();
    /// assert_eq!(spec.cycles(100.0, 1000.0), 5.0);
    /// assert_eq!(spec.cycles(0.0, 0.0), 0.0);
    /// ```
    pub fn cycles(&self, capacity_mwh: f64, throughput_mwh: f64) -> f64 {
        if capacity_mwh > 0.0 {
            throughput_mwh / (2.0 * capacity_mwh)
        } else {
            0.0
        }
    }

    /// Capacity left after `cycles` equivalent full cycles, floored at zero.
    pub fn degraded_capacity(&self, capacity_mwh: f64, cycles: f64) -> f64 {
        (capacity_mwh * (1.0 - cycles * self.degradation_rate_per_cycle_pct / 100.0)).max(0.0)
    }
}

/// Pumped-hydro storage parameters. PHS capacity is a fixed input, never searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhsSpec {
    pub capacity_mwh: f64,
    pub pmax_charge_mw: f64,
    pub duration_h: f64,
    pub depth_of_discharge_pct: f64,
    pub round_trip_efficiency_pct: f64,
}

impl Default for PhsSpec {
    fn default() -> Self {
        Self {
            capacity_mwh: 2_000.0,
            pmax_charge_mw: 250.0,
            duration_h: 8.0,
            depth_of_discharge_pct: 95.0,
            round_trip_efficiency_pct: 75.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageAssetSpec {
    Battery(BatterySpec),
    Phs(PhsSpec),
}

impl StorageAssetSpec {
    pub fn technology(&self) -> StorageTechnology {
        match self {
            Self::Battery(_) => StorageTechnology::Battery,
            Self::Phs(_) => StorageTechnology::Phs,
        }
    }

    /// Checks the percentage and duration invariants.
    pub fn validate(&self) -> Result<()> {
        let tech = self.technology();
        let (duration_h, pcts): (f64, Vec<(&str, f64)>) = match self {
            Self::Battery(b) => (
                b.duration_h,
                vec![
                    ("charging_rate_pct", b.charging_rate_pct),
                    ("depth_of_discharge_pct", b.depth_of_discharge_pct),
                    ("round_trip_efficiency_pct", b.round_trip_efficiency_pct),
                    (
                        "degradation_rate_per_cycle_pct",
                        b.degradation_rate_per_cycle_pct,
                    ),
                ],
            ),
            Self::Phs(p) => {
                if !(p.capacity_mwh >= 0.0) || !(p.pmax_charge_mw >= 0.0) {
                    return Err(SimError::Configuration(
                        "phs capacity_mwh and pmax_charge_mw must be >= 0".to_string(),
                    ));
                }
                (
                    p.duration_h,
                    vec![
                        ("depth_of_discharge_pct", p.depth_of_discharge_pct),
                        ("round_trip_efficiency_pct", p.round_trip_efficiency_pct),
                    ],
                )
            }
        };

        if !(duration_h > 0.0) {
            return Err(SimError::Configuration(format!(
                "{tech}.duration_h must be > 0, got {duration_h}"
            )));
        }
        for (field, value) in pcts {
            if !(0.0..=100.0).contains(&value) {
                return Err(SimError::Configuration(format!(
                    "{tech}.{field} must be in [0, 100], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Battery operating limits for one trial capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BessLimits {
    pub capacity: f64,
    pub p_charge_max: f64,
    pub p_discharge_max: f64,
    pub min_discharge_level: f64,
    /// Round-trip efficiency as a fraction.
    pub efficiency: f64,
}

/// PHS operating limits; the capacity comes from the spec.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhsLimits {
    pub capacity: f64,
    pub p_charge_max: f64,
    pub p_discharge_max: f64,
    pub min_discharge_level: f64,
    pub efficiency: f64,
}

fn mismatched(technology: StorageTechnology) -> SimError {
    SimError::Configuration(format!("spec stored under \"{technology}\" is of another technology"))
}

/// Immutable set of storage specs loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct StorageSpecRegistry {
    specs: BTreeMap<StorageTechnology, StorageAssetSpec>,
}

impl StorageSpecRegistry {
    /// Builds a registry, validating every spec. A later spec for the same
    /// technology replaces an earlier one.
    pub fn new(specs: impl IntoIterator<Item = StorageAssetSpec>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for spec in specs {
            spec.validate()?;
            map.insert(spec.technology(), spec);
        }
        Ok(Self { specs: map })
    }

    pub fn spec_for(&self, technology: StorageTechnology) -> Result<&StorageAssetSpec> {
        self.specs.get(&technology).ok_or_else(|| {
            SimError::Configuration(format!("no spec loaded for storage technology \"{technology}\""))
        })
    }

    pub fn contains(&self, technology: StorageTechnology) -> bool {
        self.specs.contains_key(&technology)
    }

    pub fn battery(&self) -> Result<&BatterySpec> {
        let StorageAssetSpec::Battery(spec) = self.spec_for(StorageTechnology::Battery)? else {
            return Err(mismatched(StorageTechnology::Battery));
        };
        Ok(spec)
    }

    pub fn phs(&self) -> Result<&PhsSpec> {
        let StorageAssetSpec::Phs(spec) = self.spec_for(StorageTechnology::Phs)? else {
            return Err(mismatched(StorageTechnology::Phs));
        };
        Ok(spec)
    }

    /// Derives battery limits for a trial capacity (MWh).
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] when no battery spec is loaded or the
    /// capacity is negative or not finite.
    pub fn bess_limits(&self, capacity: f64) -> Result<BessLimits> {
        if !(capacity.is_finite() && capacity >= 0.0) {
            return Err(SimError::Configuration(format!(
                "battery capacity must be a finite value >= 0, got {capacity}"
            )));
        }
        let spec = self.battery()?;
        Ok(BessLimits {
            capacity,
            p_charge_max: capacity * spec.charging_rate_pct / 100.0,
            p_discharge_max: capacity / spec.duration_h,
            min_discharge_level: capacity * (100.0 - spec.depth_of_discharge_pct) / 100.0,
            efficiency: spec.round_trip_efficiency_pct / 100.0,
        })
    }

    /// Derives PHS limits from the fixed PHS capacity.
    pub fn phs_limits(&self) -> Result<PhsLimits> {
        let spec = self.phs()?;
        let capacity = spec.capacity_mwh;
        Ok(PhsLimits {
            capacity,
            p_charge_max: spec.pmax_charge_mw,
            p_discharge_max: capacity / spec.duration_h,
            min_discharge_level: capacity * (100.0 - spec.depth_of_discharge_pct) / 100.0,
            efficiency: spec.round_trip_efficiency_pct / 100.0,
        })
    }
}
