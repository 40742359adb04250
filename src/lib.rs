//! Hourly storage dispatch and battery capacity sizing for renewable
//! (RES) generation scenarios.
//!
//! A scenario's generation is dispatched hour by hour against residual
//! demand through a battery and, optionally, pumped hydro storage (PHS).
//! A secant search sizes the battery so that RES penetration of demand,
//! or curtailment of generation, reaches a target threshold.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod profiles;
pub mod runner;
pub mod scenario;
/// Dispatch engine, metrics and capacity search.
pub mod sim;
pub mod storage;

pub use config::{RunConfig, RunMode};
pub use error::{Result, SimError};
pub use runner::{FleetState, ScenarioOutcome, ScenarioResult, ScenarioRunner, YearReport};
pub use scenario::{Scenario, SeriesSource};
pub use sim::sizing::Target;
