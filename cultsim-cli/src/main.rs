mod output;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use cultsim_game::constants::{DEFAULT_MAX_DAYS, DEFAULT_TRIALS};
use cultsim_game::{
    BatchOptions, BatchReport, DayAdjust, NoAdjust, Scenario, SimConfig, entropy_seed,
    list_scenarios, parse_assignment, run_batch, run_trial,
};
use output::{OutputTarget, write_console_report, write_json_report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Coloured summary and histograms
    Console,
    /// Machine-readable report
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cultsim", version)]
#[command(about = "Monte Carlo simulator for brand-attachment removal regimens")]
struct Args {
    /// Number of trials to run
    #[arg(default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Day cap for each trial
    #[arg(long, default_value_t = DEFAULT_MAX_DAYS)]
    max_days: u32,

    /// Batch seed (random when omitted; printed with the report)
    #[arg(long)]
    seed: Option<u64>,

    /// Named scenario preset (see --list-scenarios)
    #[arg(long)]
    scenario: Option<String>,

    /// JSON configuration file; missing keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override a configuration field, e.g. --set pill_cooldown=4 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include the first trial's day-by-day narration
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    let scenario = resolve_scenario(args.scenario.as_deref())?;
    let config = build_config(&args, scenario)?;
    let seed = args.seed.unwrap_or_else(entropy_seed);
    let options = BatchOptions::seeded(seed).with_max_days(args.max_days);
    let hook: &dyn DayAdjust = match &scenario {
        Some(scenario) => scenario,
        None => &NoAdjust,
    };

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }

    let start_time = Instant::now();
    let records =
        run_batch(args.trials, &config, hook, options).context("invalid simulation config")?;
    log::info!(
        "simulated {} trials in {:?}",
        records.len(),
        start_time.elapsed()
    );

    let mut report = BatchReport::from_records(&records, seed, args.max_days);
    if let Some(scenario) = scenario {
        report = report.with_scenario(scenario.name());
    }
    let narration = if args.verbose && args.trials > 0 {
        Some(run_trial(0, &config, hook, options.with_logs(true))?.log)
    } else {
        None
    };

    let mut output_target = OutputTarget::new(args.output.clone())?;
    if output_target.is_file() {
        colored::control::set_override(false);
    }
    match args.report {
        ReportFormat::Json => {
            write_json_report(output_target.writer(), &report, narration.as_deref())?;
        }
        ReportFormat::Console => write_console_report(
            output_target.writer(),
            &report,
            narration.as_deref(),
            start_time.elapsed(),
        )?,
    }
    output_target.flush()?;
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "Cultsim removal simulator".bright_cyan().bold());
    println!("{}", "=========================".cyan());
}

fn resolve_scenario(name: Option<&str>) -> Result<Option<Scenario>> {
    let Some(name) = name else {
        return Ok(None);
    };
    match Scenario::find(name) {
        Some(scenario) => Ok(Some(scenario)),
        None => bail!("unknown scenario `{name}` (see --list-scenarios)"),
    }
}

/// Defaults or `--config`, then the scenario overlay, then `--set` overrides.
fn build_config(args: &Args, scenario: Option<Scenario>) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            SimConfig::from_json_str(&text)
                .with_context(|| format!("invalid config in {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(scenario) = scenario {
        scenario.prepare(&mut config);
    }
    let overrides = args
        .overrides
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>, _>>()?;
    if overrides.is_empty() {
        config.validate()?;
        return Ok(config);
    }
    config
        .with_overrides(overrides)
        .context("invalid --set override")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cultsim_game::AlchemyMode;

    fn base_args() -> Args {
        Args {
            trials: 10,
            max_days: DEFAULT_MAX_DAYS,
            seed: Some(1),
            scenario: None,
            config: None,
            overrides: Vec::new(),
            list_scenarios: false,
            report: ReportFormat::Json,
            output: None,
            verbose: false,
        }
    }

    fn temp_file(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "cultsim-main-{label}-{}",
            std::process::id()
        ))
    }

    #[test]
    fn parses_positional_trials_and_flags() {
        let args = Args::try_parse_from([
            "cultsim",
            "250",
            "--seed",
            "7",
            "--set",
            "pill_cooldown=4",
            "--set",
            "failure_insurance=2",
            "--report",
            "json",
        ])
        .unwrap();
        assert_eq!(args.trials, 250);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.overrides.len(), 2);
        assert_eq!(args.report, ReportFormat::Json);
        assert_eq!(args.max_days, 200);
    }

    #[test]
    fn defaults_to_thousand_trials() {
        let args = Args::try_parse_from(["cultsim"]).unwrap();
        assert_eq!(args.trials, 1_000);
        assert_eq!(args.report, ReportFormat::Console);
        assert!(args.seed.is_none());
    }

    #[test]
    fn unknown_scenario_is_an_error() {
        assert!(resolve_scenario(Some("pill-cooldown-9")).is_err());
        assert_eq!(
            resolve_scenario(Some("odds")).unwrap(),
            Some(Scenario::Odds)
        );
        assert_eq!(resolve_scenario(None).unwrap(), None);
    }

    #[test]
    fn overrides_apply_after_scenario_overlay() {
        let args = Args {
            overrides: vec!["pill_overflow=10%".to_string()],
            ..base_args()
        };
        let config = build_config(&args, Some(Scenario::MinorAlchemy)).unwrap();
        assert_eq!(config.alchemy, AlchemyMode::Minor);
        assert_eq!(config.pill_overflow.to_string(), "10%");
    }

    #[test]
    fn config_file_is_loaded_and_validated() {
        let path = temp_file("config.json");
        std::fs::write(&path, r#"{ "pill_cooldown": 5 }"#).unwrap();
        let args = Args {
            config: Some(path.clone()),
            ..base_args()
        };
        assert_eq!(build_config(&args, None).unwrap().pill_cooldown, 5);

        std::fs::write(&path, r#"{ "pill_cooldown": 0 }"#).unwrap();
        assert!(build_config(&args, None).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn malformed_set_is_rejected() {
        let args = Args {
            overrides: vec!["pill_cooldown".to_string()],
            ..base_args()
        };
        assert!(build_config(&args, None).is_err());
    }

    #[test]
    fn list_scenarios_writes_every_name() {
        let path = temp_file("list.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(path.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Available scenarios:"));
        assert!(content.contains("rp-first"));
        let _ = std::fs::remove_file(path);
    }
}
