//! res-storage-sim entry point: CLI wiring, source selection and CSV output.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use res_storage_sim::cli::{Cli, InputSource};
use res_storage_sim::config::{RunConfig, RunMode};
use res_storage_sim::io::export::{
    export_hour_records, export_summary, hourly_file_name, summary_file_name,
};
use res_storage_sim::io::import::CsvSeriesSource;
use res_storage_sim::logging::init_logging;
use res_storage_sim::profiles::SyntheticSource;
use res_storage_sim::runner::{FleetState, ScenarioOutcome, ScenarioRunner, YearReport};
use res_storage_sim::scenario::{Scenario, SeriesSource};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose).context("failed to initialise logging")?;

    let config = cli.load_config()?;
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("invalid configuration ({} errors)", errors.len());
    }

    let reports = match cli.input_source() {
        InputSource::Csv(dir) => {
            let source = CsvSeriesSource::new(dir);
            let scenarios = source.scenarios()?;
            let fleet = if config.simulation.mode == RunMode::Dispatch {
                source.storage_capacities()?
            } else {
                FleetState::default()
            };
            info!(data_dir = %dir.display(), scenarios = scenarios.len(), "loaded CSV inputs");
            run_all(&config, &source, &scenarios, fleet, cli.hourly)?
        }
        InputSource::Synthetic => {
            let source = SyntheticSource::new(&config.demo);
            let scenarios = source.scenarios();
            info!(seed = config.demo.seed, scenarios = scenarios.len(), "using synthetic profiles");
            run_all(&config, &source, &scenarios, source.fleet(), cli.hourly)?
        }
    };

    write_outputs(&config, &reports, &cli.out_dir, cli.hourly)?;

    let failed: usize = reports.iter().map(YearReport::failed).sum();
    if failed > 0 {
        bail!("{failed} scenario-year(s) failed");
    }
    Ok(())
}

fn run_all<S: SeriesSource>(
    config: &RunConfig,
    source: &S,
    scenarios: &[Scenario],
    fleet: FleetState,
    hourly: bool,
) -> Result<Vec<YearReport>> {
    let runner = ScenarioRunner::new(config, source)?.with_hourly(hourly);
    Ok(runner.run(scenarios, fleet))
}

fn write_outputs(config: &RunConfig, reports: &[YearReport], out_dir: &Path, hourly: bool) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;
    let mode = config.simulation.mode;

    for report in reports {
        for outcome in &report.outcomes {
            match outcome {
                ScenarioOutcome::Completed(run) => println!("{}", run.result),
                ScenarioOutcome::Skipped { scenario_id, reason } => {
                    println!("{scenario_id} ({}): skipped, {reason}", report.year)
                }
                ScenarioOutcome::Failed { scenario_id, error } => {
                    println!("{scenario_id} ({}): failed, {error}", report.year)
                }
            }
        }

        let path = out_dir.join(summary_file_name(mode, config.simulation.target, report.year));
        export_summary(report.results(), &path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "summary written");

        if hourly {
            for run in report.outcomes.iter().filter_map(ScenarioOutcome::completed) {
                let path = out_dir.join(hourly_file_name(mode, &run.result.scenario_id, report.year));
                export_hour_records(&run.records, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
    }
    Ok(())
}
