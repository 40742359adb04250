//! CSV input: hourly series, scenario tables and dispatch capacities.
//!
//! Directory layout read by [`CsvSeriesSource`]:
//!
//! ```text
//! <root>/demand_<year>.csv
//! <root>/generation/<year>/<scenario>_<technology>.csv
//! <root>/scenarios.csv
//! <root>/storage_capacities.csv
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::runner::FleetState;
use crate::scenario::{Scenario, SeriesSource};
use crate::sim::series::HourlySeries;

/// Timestamp format of every series file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct SeriesRow {
    timestamp: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct CapacityRow {
    scenario_id: String,
    battery_capacity_mwh: f64,
}

fn open(path: &Path) -> Result<File> {
    File::open(path)
        .map_err(|e| SimError::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))
}

/// Reads a `timestamp,value` series from any reader.
///
/// # Errors
///
/// Malformed rows, unparsable timestamps or non-increasing hours.
pub fn read_series(reader: impl Read) -> Result<HourlySeries> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    for row in rdr.deserialize() {
        let row: SeriesRow = row?;
        timestamps.push(NaiveDateTime::parse_from_str(row.timestamp.trim(), TIMESTAMP_FORMAT)?);
        values.push(row.value);
    }
    HourlySeries::new(timestamps, values)
}

/// Reads the scenario table: `scenario_id`, optional `year`, then one
/// installed-capacity column (MW) per technology.
///
/// # Errors
///
/// Missing `scenario_id` column or unparsable numbers.
pub fn read_scenarios(reader: impl Read) -> Result<Vec<Scenario>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_col = headers
        .iter()
        .position(|h| h.trim() == "scenario_id")
        .ok_or_else(|| SimError::Configuration("scenarios table has no scenario_id column".into()))?;
    let year_col = headers.iter().position(|h| h.trim() == "year");

    let mut scenarios = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let id = record.get(id_col).unwrap_or_default().trim().to_string();
        let year = match year_col.and_then(|c| record.get(c)).map(str::trim) {
            Some(y) if !y.is_empty() => Some(y.parse::<i32>().map_err(|e| {
                SimError::Configuration(format!("scenario {id}: invalid year \"{y}\": {e}"))
            })?),
            _ => None,
        };

        let mut capacities = BTreeMap::new();
        for (col, header) in headers.iter().enumerate() {
            if col == id_col || Some(col) == year_col {
                continue;
            }
            let raw = record.get(col).unwrap_or_default().trim();
            let mw = if raw.is_empty() {
                0.0
            } else {
                raw.parse::<f64>().map_err(|e| {
                    SimError::Configuration(format!(
                        "scenario {id}: invalid capacity for {header} \"{raw}\": {e}"
                    ))
                })?
            };
            capacities.insert(header.trim().to_ascii_lowercase(), mw);
        }

        scenarios.push(Scenario {
            id,
            year,
            capacities_mw: capacities,
        });
    }
    Ok(scenarios)
}

/// Reads `scenario_id,battery_capacity_mwh` rows into a fleet.
///
/// # Errors
///
/// Malformed rows, or a capacity that is negative or not finite.
pub fn read_storage_capacities(reader: impl Read) -> Result<FleetState> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut capacities = BTreeMap::new();
    for row in rdr.deserialize() {
        let row: CapacityRow = row?;
        if !(row.battery_capacity_mwh.is_finite() && row.battery_capacity_mwh >= 0.0) {
            return Err(SimError::Configuration(format!(
                "scenario \"{}\": battery capacity must be a finite value >= 0, got {}",
                row.scenario_id, row.battery_capacity_mwh
            )));
        }
        capacities.insert(row.scenario_id, row.battery_capacity_mwh);
    }
    Ok(FleetState::new(capacities))
}

/// Series source backed by a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvSeriesSource {
    root: PathBuf,
}

impl CsvSeriesSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn demand_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("demand_{year}.csv"))
    }

    pub fn generation_path(&self, year: i32, scenario_id: &str, technology: &str) -> PathBuf {
        self.root
            .join("generation")
            .join(year.to_string())
            .join(format!("{scenario_id}_{technology}.csv"))
    }

    /// # Errors
    ///
    /// Missing or malformed `scenarios.csv`.
    pub fn scenarios(&self) -> Result<Vec<Scenario>> {
        read_scenarios(open(&self.root.join("scenarios.csv"))?)
    }

    /// # Errors
    ///
    /// Missing or malformed `storage_capacities.csv`.
    pub fn storage_capacities(&self) -> Result<FleetState> {
        read_storage_capacities(open(&self.root.join("storage_capacities.csv"))?)
    }

    fn read(&self, path: &Path) -> Result<HourlySeries> {
        debug!(path = %path.display(), "reading series");
        read_series(open(path)?).map_err(|e| match e {
            SimError::Series(msg) => SimError::Series(format!("{}: {msg}", path.display())),
            other => other,
        })
    }
}

impl SeriesSource for CsvSeriesSource {
    fn demand(&self, year: i32) -> Result<HourlySeries> {
        self.read(&self.demand_path(year))
    }

    fn generation(&self, year: i32, scenario: &Scenario, technology: &str) -> Result<HourlySeries> {
        self.read(&self.generation_path(year, &scenario.id, technology))
    }
}
