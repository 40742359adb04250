//! TOML-based run configuration and preset definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, SimError};
use crate::sim::sizing::{SizingSettings, Target};
use crate::sim::types::GridParams;
use crate::storage::{BatterySpec, PhsSpec, StorageAssetSpec, StorageSpecRegistry, StorageTechnology};

/// Top-level run configuration parsed from TOML.
///
/// All fields have defaults matching the baseline preset. Load from TOML
/// with [`RunConfig::from_toml_file`] or use [`RunConfig::baseline`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Mode, target and grid parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Battery parameters; the energy capacity itself is sized.
    #[serde(default)]
    pub battery: BatterySpec,
    /// Pumped-hydro parameters, used when `phs` is listed in
    /// `simulation.storage_technologies`.
    #[serde(default)]
    pub phs: PhsSpec,
    /// Synthetic input generator used by `--demo`.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Whether storage is sized or dispatched at a given capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Sizing,
    Dispatch,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sizing => "sizing",
            Self::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sizing" => Ok(Self::Sizing),
            "dispatch" => Ok(Self::Dispatch),
            other => Err(SimError::Configuration(format!(
                "unknown mode \"{other}\" (expected \"sizing\" or \"dispatch\")"
            ))),
        }
    }
}

/// Mode, target and grid parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub mode: RunMode,
    pub target: Target,
    /// Penetration or curtailment level to reach (%).
    pub target_threshold_pct: f64,
    /// Accepted distance from the threshold (percentage points).
    pub target_offset_pct: f64,
    /// Instantaneously deliverable share of installed RES capacity (%).
    pub net_billing_percentage_pct: f64,
    pub hv_to_lv_losses_pct: f64,
    /// Storage technologies in the fleet; `battery` is mandatory.
    pub storage_technologies: Vec<StorageTechnology>,
    /// Simulated years, ascending.
    pub years: Vec<i32>,
    /// Upper bound on sizing trials per scenario.
    pub max_trials: usize,
    /// Capacity step between trial 0 and trial 1 (MWh).
    pub bootstrap_step_mwh: f64,
    /// Run the scenarios of a year on the rayon pool.
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Sizing,
            target: Target::Demand,
            target_threshold_pct: 80.0,
            target_offset_pct: 1.0,
            net_billing_percentage_pct: 100.0,
            hv_to_lv_losses_pct: 2.0,
            storage_technologies: vec![StorageTechnology::Battery],
            years: vec![2030],
            max_trials: 100,
            bootstrap_step_mwh: 0.001,
            parallel: true,
        }
    }
}

/// Synthetic input generator parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Master random seed.
    pub seed: u64,
    pub demand: DemandProfileConfig,
    pub solar: SolarProfileConfig,
    pub wind: WindProfileConfig,
    /// Flat hydro output as a fraction of installed capacity.
    pub hydro_capacity_factor: f64,
    /// Whether generated years include Feb 29 (8784 hours in leap years).
    pub keep_leap_day: bool,
    pub scenarios: Vec<DemoScenario>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            demand: DemandProfileConfig::default(),
            solar: SolarProfileConfig::default(),
            wind: WindProfileConfig::default(),
            hydro_capacity_factor: 0.4,
            keep_leap_day: true,
            scenarios: vec![
                DemoScenario::new("s01", &[("solar", 1_200.0), ("wind", 800.0), ("hydro", 100.0)], 1_500.0),
                DemoScenario::new("s02", &[("solar", 600.0), ("wind", 400.0), ("hydro", 50.0)], 500.0),
                DemoScenario::new("s03", &[("solar", 2_000.0), ("wind", 1_500.0), ("hydro", 100.0)], 3_000.0),
            ],
        }
    }
}

/// Hourly demand shape: base plus daily and seasonal sinusoids plus noise.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandProfileConfig {
    pub base_mw: f64,
    pub daily_amp_mw: f64,
    pub seasonal_amp_mw: f64,
    /// Hour of the daily peak (0-23).
    pub peak_hour: u32,
    pub noise_std_mw: f64,
}

impl Default for DemandProfileConfig {
    fn default() -> Self {
        Self {
            base_mw: 400.0,
            daily_amp_mw: 80.0,
            seasonal_amp_mw: 60.0,
            peak_hour: 19,
            noise_std_mw: 10.0,
        }
    }
}

/// Per-unit solar shape with an AR(1) cloud multiplier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarProfileConfig {
    /// Sunrise hour (inclusive).
    pub sunrise_hour: u32,
    /// Sunset hour (exclusive).
    pub sunset_hour: u32,
    /// AR(1) correlation coefficient (0.0-1.0).
    pub alpha: f64,
    pub cloud_noise_std: f64,
    /// Relative summer/winter swing of the daily peak (0.0-1.0).
    pub seasonal_swing: f64,
}

impl Default for SolarProfileConfig {
    fn default() -> Self {
        Self {
            sunrise_hour: 6,
            sunset_hour: 20,
            alpha: 0.9,
            cloud_noise_std: 0.2,
            seasonal_swing: 0.3,
        }
    }
}

/// AR(1) wind capacity factor.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindProfileConfig {
    pub mean_capacity_factor: f64,
    pub alpha: f64,
    pub noise_std: f64,
}

impl Default for WindProfileConfig {
    fn default() -> Self {
        Self {
            mean_capacity_factor: 0.32,
            alpha: 0.95,
            noise_std: 0.08,
        }
    }
}

/// One installed-capacity combination for the synthetic source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DemoScenario {
    pub id: String,
    /// Installed capacity per technology (MW), e.g. `{ solar = 300.0 }`.
    pub capacities_mw: BTreeMap<String, f64>,
    /// Starting battery capacity for dispatch mode (MWh).
    #[serde(default)]
    pub battery_capacity_mwh: f64,
    /// Restricts the scenario to one simulated year.
    #[serde(default)]
    pub year: Option<i32>,
}

impl DemoScenario {
    pub fn new(id: &str, capacities: &[(&str, f64)], battery_capacity_mwh: f64) -> Self {
        Self {
            id: id.to_string(),
            capacities_mw: capacities
                .iter()
                .map(|(tech, mw)| ((*tech).to_string(), *mw))
                .collect(),
            battery_capacity_mwh,
            year: None,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.max_trials"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        SimError::Configuration(format!("{}: {}", e.field, e.message))
    }
}

fn check_pct(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=100.0).contains(&value) {
        errors.push(ConfigError::new(
            field,
            format!("must be in [0, 100], got {value}"),
        ));
    }
}

impl RunConfig {
    /// Battery-only fleet, demand target at 80 %.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Battery plus a fixed pumped-hydro unit.
    pub fn battery_phs() -> Self {
        Self {
            simulation: SimulationConfig {
                storage_technologies: vec![StorageTechnology::Battery, StorageTechnology::Phs],
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Curtailment target at 10 % with a tighter interconnection.
    pub fn curtailment() -> Self {
        Self {
            simulation: SimulationConfig {
                target: Target::Curtailment,
                target_threshold_pct: 10.0,
                net_billing_percentage_pct: 70.0,
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "battery_phs", "curtailment"];

    /// Loads a configuration from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> std::result::Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "battery_phs" => Ok(Self::battery_phs()),
            "curtailment" => Ok(Self::curtailment()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("config", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    pub fn phs_enabled(&self) -> bool {
        self.simulation
            .storage_technologies
            .contains(&StorageTechnology::Phs)
    }

    pub fn grid(&self) -> GridParams {
        GridParams::new(
            self.simulation.net_billing_percentage_pct,
            self.simulation.hv_to_lv_losses_pct,
        )
    }

    pub fn sizing_settings(&self) -> SizingSettings {
        let s = &self.simulation;
        SizingSettings {
            target: s.target,
            threshold_pct: s.target_threshold_pct,
            offset_pct: s.target_offset_pct,
            bootstrap_step_mwh: s.bootstrap_step_mwh,
            max_trials: s.max_trials,
        }
    }

    /// Builds the spec registry for the configured technologies.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Configuration`] when a spec violates its invariants.
    pub fn storage_registry(&self) -> Result<StorageSpecRegistry> {
        let specs = self
            .simulation
            .storage_technologies
            .iter()
            .map(|tech| match tech {
                StorageTechnology::Battery => StorageAssetSpec::Battery(self.battery.clone()),
                StorageTechnology::Phs => StorageAssetSpec::Phs(self.phs.clone()),
            });
        StorageSpecRegistry::new(specs)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        check_pct(&mut errors, "simulation.target_threshold_pct", s.target_threshold_pct);
        check_pct(
            &mut errors,
            "simulation.net_billing_percentage_pct",
            s.net_billing_percentage_pct,
        );
        check_pct(&mut errors, "simulation.hv_to_lv_losses_pct", s.hv_to_lv_losses_pct);
        if s.hv_to_lv_losses_pct >= 100.0 {
            errors.push(ConfigError::new(
                "simulation.hv_to_lv_losses_pct",
                "must be < 100",
            ));
        }
        if !(s.target_offset_pct >= 0.0) {
            errors.push(ConfigError::new("simulation.target_offset_pct", "must be >= 0"));
        }
        if s.max_trials < 2 {
            errors.push(ConfigError::new("simulation.max_trials", "must be >= 2"));
        }
        if !(s.bootstrap_step_mwh > 0.0) {
            errors.push(ConfigError::new("simulation.bootstrap_step_mwh", "must be > 0"));
        }
        if !s.storage_technologies.contains(&StorageTechnology::Battery) {
            errors.push(ConfigError::new(
                "simulation.storage_technologies",
                "must include \"battery\"",
            ));
        }
        if s.years.is_empty() {
            errors.push(ConfigError::new("simulation.years", "must not be empty"));
        } else if s.years.windows(2).any(|w| w[1] <= w[0]) {
            errors.push(ConfigError::new("simulation.years", "must be strictly ascending"));
        }

        let b = &self.battery;
        if !(b.duration_h > 0.0) {
            errors.push(ConfigError::new("battery.duration_h", "must be > 0"));
        }
        check_pct(&mut errors, "battery.charging_rate_pct", b.charging_rate_pct);
        check_pct(&mut errors, "battery.depth_of_discharge_pct", b.depth_of_discharge_pct);
        check_pct(
            &mut errors,
            "battery.round_trip_efficiency_pct",
            b.round_trip_efficiency_pct,
        );
        if b.round_trip_efficiency_pct == 0.0 {
            errors.push(ConfigError::new("battery.round_trip_efficiency_pct", "must be > 0"));
        }
        check_pct(
            &mut errors,
            "battery.degradation_rate_per_cycle_pct",
            b.degradation_rate_per_cycle_pct,
        );

        if self.phs_enabled() {
            let p = &self.phs;
            if !(p.capacity_mwh >= 0.0) {
                errors.push(ConfigError::new("phs.capacity_mwh", "must be >= 0"));
            }
            if !(p.pmax_charge_mw >= 0.0) {
                errors.push(ConfigError::new("phs.pmax_charge_mw", "must be >= 0"));
            }
            if !(p.duration_h > 0.0) {
                errors.push(ConfigError::new("phs.duration_h", "must be > 0"));
            }
            check_pct(&mut errors, "phs.depth_of_discharge_pct", p.depth_of_discharge_pct);
            check_pct(
                &mut errors,
                "phs.round_trip_efficiency_pct",
                p.round_trip_efficiency_pct,
            );
            if p.round_trip_efficiency_pct == 0.0 {
                errors.push(ConfigError::new("phs.round_trip_efficiency_pct", "must be > 0"));
            }
        }

        let d = &self.demo;
        if d.solar.sunrise_hour >= d.solar.sunset_hour || d.solar.sunset_hour > 24 {
            errors.push(ConfigError::new(
                "demo.solar.sunrise_hour",
                "must be < demo.solar.sunset_hour <= 24",
            ));
        }
        if !(0.0..=1.0).contains(&d.solar.alpha) {
            errors.push(ConfigError::new("demo.solar.alpha", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&d.wind.alpha) {
            errors.push(ConfigError::new("demo.wind.alpha", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&d.hydro_capacity_factor) {
            errors.push(ConfigError::new(
                "demo.hydro_capacity_factor",
                "must be in [0.0, 1.0]",
            ));
        }
        if d.demand.peak_hour > 23 {
            errors.push(ConfigError::new("demo.demand.peak_hour", "must be in 0..=23"));
        }
        let mut ids = BTreeSet::new();
        for (i, sc) in d.scenarios.iter().enumerate() {
            if !ids.insert(sc.id.as_str()) {
                errors.push(ConfigError::new(
                    format!("demo.scenarios[{i}].id"),
                    format!("duplicate scenario id \"{}\"", sc.id),
                ));
            }
            if sc.capacities_mw.values().any(|mw| !(*mw >= 0.0)) {
                errors.push(ConfigError::new(
                    format!("demo.scenarios[{i}].capacities_mw"),
                    "capacities must be >= 0",
                ));
            }
            if !(sc.battery_capacity_mwh >= 0.0) {
                errors.push(ConfigError::new(
                    format!("demo.scenarios[{i}].battery_capacity_mwh"),
                    "must be >= 0",
                ));
            }
        }

        errors
    }
}
