//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{ConfigError, RunConfig, RunMode};
use crate::sim::sizing::Target;

#[derive(Debug, Parser)]
#[command(name = "res-storage-sim", version)]
#[command(about = "Hourly RES storage dispatch and capacity sizing")]
#[command(
    long_about = "Simulates hourly battery and pumped-hydro dispatch against RES generation \
    and demand, and sizes battery capacity to reach a penetration or curtailment target.\n\
    \nInput comes from a data directory of CSV files (--data-dir) or from seeded synthetic \
    profiles (--demo, also used when no data directory is given).\n\
    \nExamples:\n  \
    res-storage-sim --preset baseline\n  \
    res-storage-sim --config run.toml --data-dir data --hourly\n  \
    res-storage-sim --preset curtailment --mode dispatch --years 2030,2031"
)]
pub struct Cli {
    /// TOML run configuration
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in configuration preset (baseline, battery_phs, curtailment)
    #[arg(long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Directory of input CSV files
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Use seeded synthetic profiles (the default without --data-dir)
    #[arg(long, conflicts_with = "data_dir")]
    pub demo: bool,

    /// Output directory for summary and hourly CSV files
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Also write per-hour records of every completed scenario
    #[arg(long)]
    pub hourly: bool,

    /// Override the run mode (sizing, dispatch)
    #[arg(long)]
    pub mode: Option<RunMode>,

    /// Override the sizing target (demand, curtailment)
    #[arg(long)]
    pub target: Option<Target>,

    /// Override the target threshold (%)
    #[arg(long, value_name = "PCT")]
    pub threshold: Option<f64>,

    /// Override the simulated years, comma separated
    #[arg(long, value_name = "YEARS", value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Override the synthetic profile seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Evaluate scenarios one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Debug-level logging for this crate
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where scenario series come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource<'a> {
    Csv(&'a Path),
    Synthetic,
}

impl Cli {
    /// Input selected by `--demo` / `--data-dir`; synthetic when neither is given.
    pub fn input_source(&self) -> InputSource<'_> {
        match &self.data_dir {
            Some(dir) if !self.demo => InputSource::Csv(dir),
            _ => InputSource::Synthetic,
        }
    }

    /// Loads the configuration file, the named preset, or the baseline.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed files and unknown presets.
    pub fn load_config(&self) -> Result<RunConfig, ConfigError> {
        let mut config = if let Some(path) = &self.config {
            RunConfig::from_toml_file(path)?
        } else if let Some(name) = &self.preset {
            RunConfig::from_preset(name)?
        } else {
            RunConfig::baseline()
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Applies command-line overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut RunConfig) {
        let sim = &mut config.simulation;
        if let Some(mode) = self.mode {
            sim.mode = mode;
        }
        if let Some(target) = self.target {
            sim.target = target;
        }
        if let Some(threshold) = self.threshold {
            sim.target_threshold_pct = threshold;
        }
        if !self.years.is_empty() {
            sim.years = self.years.clone();
        }
        if self.sequential {
            sim.parallel = false;
        }
        if let Some(seed) = self.seed {
            config.demo.seed = seed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("res-storage-sim").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]).expect("parses");
        assert!(cli.config.is_none());
        assert!(cli.preset.is_none());
        assert_eq!(cli.out_dir, PathBuf::from("out"));
        assert!(!cli.hourly);
        assert!(cli.years.is_empty());
    }

    #[test]
    fn config_and_preset_conflict() {
        assert!(parse(&["--config", "a.toml", "--preset", "baseline"]).is_err());
    }

    #[test]
    fn demo_and_data_dir_conflict() {
        assert!(parse(&["--demo", "--data-dir", "data"]).is_err());
        assert!(parse(&["--demo"]).expect("parses").demo);
    }

    #[test]
    fn input_source_follows_flags() {
        let demo = parse(&["--demo"]).expect("parses");
        assert_eq!(demo.input_source(), InputSource::Synthetic);

        let csv = parse(&["--data-dir", "data"]).expect("parses");
        assert_eq!(csv.input_source(), InputSource::Csv(Path::new("data")));

        assert_eq!(parse(&[]).expect("parses").input_source(), InputSource::Synthetic);
    }

    #[test]
    fn mode_and_target_parse() {
        let cli = parse(&["--mode", "dispatch", "--target", "curtailment"]).expect("parses");
        assert_eq!(cli.mode, Some(RunMode::Dispatch));
        assert_eq!(cli.target, Some(Target::Curtailment));
        assert!(parse(&["--mode", "replay"]).is_err());
    }

    #[test]
    fn overrides_apply() {
        let cli = parse(&[
            "--preset",
            "curtailment",
            "--years",
            "2030,2031",
            "--threshold",
            "15",
            "--sequential",
            "--seed",
            "7",
        ])
        .expect("parses");
        let config = cli.load_config().expect("preset");
        assert_eq!(config.simulation.years, vec![2030, 2031]);
        assert_eq!(config.simulation.target_threshold_pct, 15.0);
        assert!(!config.simulation.parallel);
        assert_eq!(config.demo.seed, 7);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let cli = parse(&["--preset", "nope"]).expect("parses");
        assert!(cli.load_config().is_err());
    }
}
