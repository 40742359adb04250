//! Seeded synthetic series source for demo runs and tests.

use tracing::debug;

use super::demand::DemandProfile;
use super::solar::SolarProfile;
use super::types::{Profile, stream_seed};
use super::wind::WindProfile;
use crate::config::DemoConfig;
use crate::error::{Result, SimError};
use crate::runner::FleetState;
use crate::scenario::{HYDRO, Scenario, SeriesSource};
use crate::sim::series::{HourlySeries, year_timestamps};

/// Generates demand and per-technology generation from the demo profile
/// parameters.
///
/// Every series is a pure function of (seed, year, technology): the same
/// technology yields the same per-unit shape in every scenario, scaled by
/// the scenario's installed capacity.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: DemoConfig,
}

impl SyntheticSource {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Per-unit (1 MW) hourly output of `technology` for `year`.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] for technologies without a profile.
    pub fn unit_profile(&self, year: i32, technology: &str) -> Result<HourlySeries> {
        let seed = stream_seed(self.config.seed, year, technology);
        match technology {
            "solar" => self.sample(year, SolarProfile::new(&self.config.solar, seed)),
            "wind" => self.sample(year, WindProfile::new(&self.config.wind, seed)),
            HYDRO => HourlySeries::constant(
                year,
                self.config.hydro_capacity_factor,
                self.config.keep_leap_day,
            ),
            other => Err(SimError::Configuration(format!(
                "no synthetic profile for technology \"{other}\""
            ))),
        }
    }

    fn sample(&self, year: i32, mut profile: impl Profile) -> Result<HourlySeries> {
        let timestamps = year_timestamps(year, self.config.keep_leap_day)?;
        let values = timestamps.iter().map(|ts| profile.value_at(ts)).collect();
        debug!(year, profile = profile.profile_type(), "synthetic series generated");
        HourlySeries::new(timestamps, values)
    }

    /// Scenarios declared in the demo configuration.
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.config
            .scenarios
            .iter()
            .map(|s| Scenario {
                id: s.id.clone(),
                year: s.year,
                capacities_mw: s.capacities_mw.clone(),
            })
            .collect()
    }

    /// Battery capacities declared in the demo configuration.
    pub fn fleet(&self) -> FleetState {
        FleetState::new(
            self.config
                .scenarios
                .iter()
                .map(|s| (s.id.clone(), s.battery_capacity_mwh))
                .collect(),
        )
    }
}

impl SeriesSource for SyntheticSource {
    fn demand(&self, year: i32) -> Result<HourlySeries> {
        let seed = stream_seed(self.config.seed, year, "demand");
        self.sample(year, DemandProfile::new(&self.config.demand, seed))
    }

    fn generation(&self, year: i32, scenario: &Scenario, technology: &str) -> Result<HourlySeries> {
        let mw = scenario.capacities_mw.get(technology).copied().unwrap_or(0.0);
        Ok(self.unit_profile(year, technology)?.map(|v| v * mw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::series::{HOURS_PER_LEAP_YEAR, HOURS_PER_YEAR};

    #[test]
    fn generation_scales_with_capacity() {
        let source = SyntheticSource::new(&DemoConfig::default());
        let scenarios = source.scenarios();
        let small = &scenarios[1];
        let large = &scenarios[0];
        let a = source.generation(2030, small, "solar").expect("solar");
        let b = source.generation(2030, large, "solar").expect("solar");
        let ratio = large.capacities_mw["solar"] / small.capacities_mw["solar"];
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x * ratio - y).abs() < 1e-9);
        }
    }

    #[test]
    fn series_are_deterministic() {
        let source = SyntheticSource::new(&DemoConfig::default());
        assert_eq!(
            source.demand(2030).expect("demand").values(),
            source.demand(2030).expect("demand").values()
        );
        assert_ne!(
            source.demand(2030).expect("demand").values(),
            source.demand(2031).expect("demand").values()
        );
    }

    #[test]
    fn leap_year_length_follows_config() {
        let mut cfg = DemoConfig::default();
        let source = SyntheticSource::new(&cfg);
        assert_eq!(source.demand(2028).expect("demand").len(), HOURS_PER_LEAP_YEAR);
        cfg.keep_leap_day = false;
        let source = SyntheticSource::new(&cfg);
        assert_eq!(source.demand(2028).expect("demand").len(), HOURS_PER_YEAR);
    }

    #[test]
    fn unknown_technology_rejected() {
        let source = SyntheticSource::new(&DemoConfig::default());
        assert!(source.unit_profile(2030, "geothermal").is_err());
    }

    #[test]
    fn fleet_matches_scenarios() {
        let cfg = DemoConfig::default();
        let source = SyntheticSource::new(&cfg);
        let fleet = source.fleet();
        assert_eq!(fleet.len(), cfg.scenarios.len());
        assert_eq!(fleet.capacity_for("s01"), Some(1500.0));
    }
}
