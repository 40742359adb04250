//! CSV export for hour records and scenario summaries.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::config::RunMode;
use crate::runner::ScenarioResult;
use crate::sim::sizing::Target;
use crate::sim::types::HourRecord;

/// Column header for per-hour dispatch records.
const HOURLY_HEADER: &str = "timestamp,demand_mwh,hydro_mwh,generation_mwh,eligible_generation_mwh,\
                             battery_charge_mwh,battery_discharge_mwh,battery_soc_mwh,\
                             battery_stored_energy_mwh,battery_throughput_mwh,battery_charge_state,\
                             periods_since_state_change,phs_charge_mwh,phs_discharge_mwh,phs_soc_mwh,\
                             phs_stored_energy_mwh,phs_charge_state,res_penetration_mwh,\
                             curtailment_mwh,energy_shortage_mwh,modified_demand_mwh";

/// Fixed leading columns of the scenario summary; one `<technology>_mw`
/// column per installed technology follows `year`.
const SUMMARY_LEAD: &str = "scenario_id,year";

const SUMMARY_TAIL: &str = "total_res_generation_twh,total_demand_twh,battery_capacity_mwh,\
                            battery_power_mw,phs_capacity_mwh,res_penetration_pct,\
                            res_penetration_mwh,curtailment_pct,curtailment_twh,\
                            max_hourly_curtailment_mwh,annual_missing_energy_twh,\
                            peak_missing_energy_mw,max_periods_until_state_change,\
                            battery_throughput_mwh,battery_cycles,degraded_battery_capacity_mwh,\
                            baseline_res_penetration_pct,baseline_curtailment_pct,\
                            baseline_curtailment_twh,baseline_missing_energy_twh,\
                            baseline_peak_missing_energy_mw,termination,trials";

fn header_fields(header: &str) -> impl Iterator<Item = &str> {
    header.split(',').map(str::trim)
}

/// File name of the summary table for one (mode, target, year).
///
/// ```
/// use res_storage_sim::config::RunMode;
/// use res_storage_sim::io::export::summary_file_name;
/// use res_storage_sim::sim::sizing::Target;
///
/// assert_eq!(
///     summary_file_name(RunMode::Sizing, Target::Demand, 2030),
///     "summary_sizing_demand_2030.csv"
/// );
/// ```
pub fn summary_file_name(mode: RunMode, target: Target, year: i32) -> String {
    format!("summary_{mode}_{target}_{year}.csv")
}

/// File name of one scenario's hour records.
pub fn hourly_file_name(mode: RunMode, scenario_id: &str, year: i32) -> String {
    format!("hourly_{mode}_{scenario_id}_{year}.csv")
}

/// Exports hour records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_hour_records(records: &[HourRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_hour_records(records, io::BufWriter::new(file))
}

/// Writes hour records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_hour_records(records: &[HourRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(header_fields(HOURLY_HEADER))?;

    for r in records {
        wtr.write_record(&[
            r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.4}", r.demand),
            format!("{:.4}", r.hydro),
            format!("{:.4}", r.generation),
            format!("{:.4}", r.eligible_generation),
            format!("{:.4}", r.battery_charge),
            format!("{:.4}", r.battery_discharge),
            format!("{:.4}", r.battery_soc),
            format!("{:.4}", r.battery_stored_energy),
            format!("{:.4}", r.battery_throughput),
            r.battery_charge_state.to_string(),
            r.periods_since_state_change.to_string(),
            format!("{:.4}", r.phs_charge),
            format!("{:.4}", r.phs_discharge),
            format!("{:.4}", r.phs_soc),
            format!("{:.4}", r.phs_stored_energy),
            r.phs_charge_state.to_string(),
            format!("{:.4}", r.res_penetration),
            format!("{:.4}", r.curtailment),
            format!("{:.4}", r.energy_shortage),
            format!("{:.4}", r.modified_demand),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports scenario summaries to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_summary<'a>(
    results: impl IntoIterator<Item = &'a ScenarioResult>,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_summary(results, io::BufWriter::new(file))
}

/// Writes one summary row per scenario. Technology columns are the sorted
/// union of every scenario's technologies; absent ones are written as 0.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_summary<'a>(
    results: impl IntoIterator<Item = &'a ScenarioResult>,
    writer: impl Write,
) -> io::Result<()> {
    let results: Vec<&ScenarioResult> = results.into_iter().collect();
    let technologies: BTreeSet<&str> = results
        .iter()
        .flat_map(|r| r.capacities_mw.keys().map(String::as_str))
        .collect();

    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    let header: Vec<String> = header_fields(SUMMARY_LEAD)
        .map(str::to_string)
        .chain(technologies.iter().map(|t| format!("{t}_mw")))
        .chain(header_fields(SUMMARY_TAIL).map(str::to_string))
        .collect();
    wtr.write_record(&header)?;

    let opt = |v: Option<f64>, digits: usize| v.map_or(String::new(), |x| format!("{x:.digits$}"));

    for r in results {
        let m = &r.metrics;
        let base = r.baseline.as_ref();
        let mut row = vec![r.scenario_id.clone(), r.year.to_string()];
        row.extend(
            technologies
                .iter()
                .map(|t| format!("{:.3}", r.capacities_mw.get(*t).copied().unwrap_or(0.0))),
        );
        row.extend([
            format!("{:.6}", r.total_res_generation_twh()),
            format!("{:.6}", r.total_demand_twh()),
            format!("{:.6}", r.battery_capacity_mwh),
            format!("{:.6}", r.battery_power_mw),
            opt(r.phs_capacity_mwh, 3),
            format!("{:.6}", m.res_penetration_pct),
            format!("{:.4}", m.res_penetration_mwh),
            format!("{:.6}", m.curtailment_pct),
            format!("{:.6}", m.curtailment_mwh / 1e6),
            format!("{:.4}", m.max_hourly_curtailment_mwh),
            format!("{:.6}", m.energy_shortage_mwh / 1e6),
            format!("{:.4}", m.peak_shortage_mw),
            m.max_periods_until_state_change.to_string(),
            format!("{:.4}", m.battery_throughput_mwh),
            format!("{:.6}", r.battery_cycles),
            format!("{:.6}", r.degraded_battery_capacity_mwh),
            opt(base.map(|b| b.res_penetration_pct), 6),
            opt(base.map(|b| b.curtailment_pct), 6),
            opt(base.map(|b| b.curtailment_mwh / 1e6), 6),
            opt(base.map(|b| b.energy_shortage_mwh / 1e6), 6),
            opt(base.map(|b| b.peak_shortage_mw), 4),
            r.termination.map_or(String::new(), |t| t.to_string()),
            r.trials.to_string(),
        ]);
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
