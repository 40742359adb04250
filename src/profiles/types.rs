//! Common trait and helpers for synthetic hourly profiles.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand::{Rng, rngs::StdRng};

/// An hourly profile generator. Calls must be made in hour order; random
/// state advances on every call.
pub trait Profile {
    /// Value for the hour starting at `ts`.
    fn value_at(&mut self, ts: &NaiveDateTime) -> f64;

    /// Returns a human-readable profile name.
    fn profile_type(&self) -> &'static str;
}

/// Gaussian noise via the Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and the given
/// standard deviation; 0 when `std_dev <= 0`.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Fractional hour of day at the middle of the hour starting at `ts`.
pub fn mid_hour(ts: &NaiveDateTime) -> f64 {
    ts.hour() as f64 + 0.5
}

/// Position in the year in [0, 1), by day of year.
pub fn year_fraction(ts: &NaiveDateTime) -> f64 {
    ts.ordinal0() as f64 / 365.0
}

/// Stable seed for one (year, stream) pair, so a stream never depends on
/// which scenarios are run or in what order.
pub fn stream_seed(seed: u64, year: i32, stream: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in stream.bytes().chain(year.to_le_bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    seed ^ hash
}
