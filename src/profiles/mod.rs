//! Synthetic hourly profiles for demand and RES generation.

pub mod demand;
pub mod solar;
pub mod synthetic;
pub mod types;
pub mod wind;

pub use synthetic::SyntheticSource;
pub use types::{Profile, gaussian_noise};
