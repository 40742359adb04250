//! Per-unit wind output as a mean-reverting AR(1) capacity factor.

use chrono::NaiveDateTime;
use rand::{SeedableRng, rngs::StdRng};

use super::types::{Profile, gaussian_noise};
use crate::config::WindProfileConfig;

#[derive(Debug, Clone)]
pub struct WindProfile {
    pub mean_capacity_factor: f64,
    pub alpha: f64,
    pub noise_std: f64,
    state: f64,
    rng: StdRng,
}

impl WindProfile {
    pub fn new(config: &WindProfileConfig, seed: u64) -> Self {
        let mean = config.mean_capacity_factor.clamp(0.0, 1.0);
        Self {
            mean_capacity_factor: mean,
            alpha: config.alpha.clamp(0.0, 1.0),
            noise_std: config.noise_std.max(0.0),
            state: mean,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Profile for WindProfile {
    fn value_at(&mut self, _ts: &NaiveDateTime) -> f64 {
        let eps = gaussian_noise(&mut self.rng, self.noise_std);
        self.state = (self.alpha * self.state + (1.0 - self.alpha) * self.mean_capacity_factor + eps)
            .clamp(0.0, 1.0);
        self.state
    }

    fn profile_type(&self) -> &'static str {
        "wind"
    }
}
