//! Synthetic hourly demand: daily and seasonal sinusoids plus noise.

use chrono::NaiveDateTime;
use rand::{SeedableRng, rngs::StdRng};

use super::types::{Profile, gaussian_noise, mid_hour, year_fraction};
use crate::config::DemandProfileConfig;

/// Hourly demand in MWh, never negative.
///
/// The daily component peaks at `peak_hour`; the seasonal component peaks
/// in mid-January.
#[derive(Debug, Clone)]
pub struct DemandProfile {
    pub base_mw: f64,
    pub daily_amp_mw: f64,
    pub seasonal_amp_mw: f64,
    pub peak_hour: f64,
    pub noise_std_mw: f64,
    rng: StdRng,
}

impl DemandProfile {
    pub fn new(config: &DemandProfileConfig, seed: u64) -> Self {
        Self {
            base_mw: config.base_mw,
            daily_amp_mw: config.daily_amp_mw,
            seasonal_amp_mw: config.seasonal_amp_mw,
            peak_hour: f64::from(config.peak_hour),
            noise_std_mw: config.noise_std_mw.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Profile for DemandProfile {
    fn value_at(&mut self, ts: &NaiveDateTime) -> f64 {
        use std::f64::consts::TAU;

        let daily = (TAU * (mid_hour(ts) - self.peak_hour) / 24.0).cos();
        let seasonal = (TAU * (year_fraction(ts) - 15.0 / 365.0)).cos();
        let noise = gaussian_noise(&mut self.rng, self.noise_std_mw);
        let mw = self.base_mw + self.daily_amp_mw * daily + self.seasonal_amp_mw * seasonal + noise;
        mw.max(0.0)
    }

    fn profile_type(&self) -> &'static str {
        "demand"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::series::year_timestamps;

    fn quiet() -> DemandProfileConfig {
        DemandProfileConfig {
            noise_std_mw: 0.0,
            ..DemandProfileConfig::default()
        }
    }

    #[test]
    fn peak_hour_beats_night() {
        let hours = year_timestamps(2030, true).expect("valid");
        let mut p = DemandProfile::new(&quiet(), 1);
        let night = p.value_at(&hours[3]);
        let peak = p.value_at(&hours[19]);
        assert!(peak > night);
    }

    #[test]
    fn winter_beats_summer() {
        let hours = year_timestamps(2030, true).expect("valid");
        let mut p = DemandProfile::new(&quiet(), 1);
        let january = p.value_at(&hours[14 * 24 + 12]);
        let july = p.value_at(&hours[196 * 24 + 12]);
        assert!(january > july);
    }

    #[test]
    fn never_negative() {
        let cfg = DemandProfileConfig {
            base_mw: 1.0,
            noise_std_mw: 50.0,
            ..DemandProfileConfig::default()
        };
        let mut p = DemandProfile::new(&cfg, 3);
        for ts in year_timestamps(2030, true).expect("valid") {
            assert!(p.value_at(&ts) >= 0.0);
        }
    }
}
