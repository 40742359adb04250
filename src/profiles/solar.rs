//! Per-unit solar PV output with an AR(1) cloud multiplier.
//!
//! A clear-sky shape (half-sine between sunrise and sunset, scaled by a
//! seasonal factor peaking at the summer solstice) is multiplied by a
//! mean-reverting cloud multiplier:
//!
//! ```text
//! m_t = alpha * m_{t-1} + (1 - alpha) * (1 + eps_t)
//! ```
//!
//! clamped to [`MULTIPLIER_MIN`, `MULTIPLIER_MAX`]. The result is a
//! capacity factor in [0, 1].

use chrono::NaiveDateTime;
use rand::{SeedableRng, rngs::StdRng};

use super::types::{Profile, gaussian_noise, mid_hour, year_fraction};
use crate::config::SolarProfileConfig;

pub const MULTIPLIER_MIN: f64 = 0.2;
pub const MULTIPLIER_MAX: f64 = 1.2;

#[derive(Debug, Clone)]
pub struct SolarProfile {
    pub sunrise_hour: f64,
    pub sunset_hour: f64,
    pub alpha: f64,
    pub cloud_noise_std: f64,
    pub seasonal_swing: f64,
    multiplier: f64,
    rng: StdRng,
}

impl SolarProfile {
    pub fn new(config: &SolarProfileConfig, seed: u64) -> Self {
        Self {
            sunrise_hour: f64::from(config.sunrise_hour),
            sunset_hour: f64::from(config.sunset_hour),
            alpha: config.alpha.clamp(0.0, 1.0),
            cloud_noise_std: config.cloud_noise_std.max(0.0),
            seasonal_swing: config.seasonal_swing.clamp(0.0, 1.0),
            multiplier: 1.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Clear-sky capacity factor in [0, 1].
    pub fn clear_sky(&self, ts: &NaiveDateTime) -> f64 {
        use std::f64::consts::{PI, TAU};

        let h = mid_hour(ts);
        if h <= self.sunrise_hour || h >= self.sunset_hour {
            return 0.0;
        }
        let daylight = (PI * (h - self.sunrise_hour) / (self.sunset_hour - self.sunrise_hour)).sin();
        let season = 1.0 + self.seasonal_swing * (TAU * (year_fraction(ts) - 171.0 / 365.0)).cos();
        daylight * season / (1.0 + self.seasonal_swing)
    }

    fn update_multiplier(&mut self) {
        let eps = gaussian_noise(&mut self.rng, self.cloud_noise_std);
        self.multiplier = (self.alpha * self.multiplier + (1.0 - self.alpha) * (1.0 + eps))
            .clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
    }
}

impl Profile for SolarProfile {
    fn value_at(&mut self, ts: &NaiveDateTime) -> f64 {
        // The multiplier evolves through the night too.
        self.update_multiplier();
        (self.clear_sky(ts) * self.multiplier).clamp(0.0, 1.0)
    }

    fn profile_type(&self) -> &'static str {
        "solar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::series::year_timestamps;

    #[test]
    fn zero_at_night() {
        let hours = year_timestamps(2030, true).expect("valid");
        let mut pv = SolarProfile::new(&SolarProfileConfig::default(), 42);
        for ts in hours.iter().take(48) {
            let v = pv.value_at(ts);
            let h = mid_hour(ts);
            if h < 6.0 || h > 20.0 {
                assert_eq!(v, 0.0, "non-zero output at {ts}");
            }
        }
    }

    #[test]
    fn stays_within_unit_range() {
        let cfg = SolarProfileConfig {
            cloud_noise_std: 2.0,
            ..SolarProfileConfig::default()
        };
        let mut pv = SolarProfile::new(&cfg, 9);
        for ts in year_timestamps(2030, true).expect("valid") {
            let v = pv.value_at(&ts);
            assert!((0.0..=1.0).contains(&v), "{v} out of range");
            assert!((MULTIPLIER_MIN..=MULTIPLIER_MAX).contains(&pv.multiplier));
        }
    }

    #[test]
    fn summer_noon_beats_winter_noon() {
        let hours = year_timestamps(2030, true).expect("valid");
        let pv = SolarProfile::new(&SolarProfileConfig::default(), 1);
        assert!(pv.clear_sky(&hours[171 * 24 + 12]) > pv.clear_sky(&hours[12]));
    }

    #[test]
    fn same_seed_same_output() {
        let hours = year_timestamps(2030, true).expect("valid");
        let mut a = SolarProfile::new(&SolarProfileConfig::default(), 5);
        let mut b = SolarProfile::new(&SolarProfileConfig::default(), 5);
        for ts in hours.iter().take(200) {
            assert_eq!(a.value_at(ts), b.value_at(ts));
        }
    }
}
