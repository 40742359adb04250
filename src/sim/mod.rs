pub mod engine;
pub mod kpi;
/// Secant root finding shared by both sizing targets.
pub mod secant;
/// Hourly series and calendar helpers.
pub mod series;
pub mod sizing;
pub mod store;
pub mod types;
