use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Duration;

use cultsim_game::BatchReport;

/// Where the report goes: stdout or a file named by `--output`.
pub enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

pub fn write_console_report(
    out: &mut dyn Write,
    report: &BatchReport,
    narration: Option<&[String]>,
    elapsed: Duration,
) -> Result<()> {
    if let Some(lines) = narration {
        writeln!(out, "{}", "First trial".bright_yellow().bold())?;
        for line in lines {
            writeln!(out, "  {line}")?;
        }
        writeln!(out)?;
    }

    let scenario = report.scenario.as_deref().unwrap_or("baseline");
    writeln!(
        out,
        "Scenario: {}  Seed: {}  Trials: {}  Max days: {}",
        scenario.bold(),
        report.seed,
        report.trials,
        report.max_days
    )?;
    let headline = if report.successes >= report.failures {
        report.headline().green()
    } else {
        report.headline().red()
    };
    writeln!(out, "{}", headline.bold())?;
    writeln!(
        out,
        "Endings: {} cleared, {} destabilized, {} day cap",
        report.endings.cleared, report.endings.destabilized, report.endings.day_cap
    )?;

    for section in &report.sections {
        writeln!(out, "{}", format!("{}:", section.title).bright_cyan())?;
        write!(out, "{}", section.render_body())?;
    }
    writeln!(out)?;
    writeln!(out, "Total time: {elapsed:?}")?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_trial_log: Option<&'a [String]>,
}

pub fn write_json_report(
    out: &mut dyn Write,
    report: &BatchReport,
    narration: Option<&[String]>,
) -> Result<()> {
    let document = JsonReport {
        report,
        first_trial_log: narration,
    };
    let json = serde_json::to_string_pretty(&document)?;
    writeln!(out, "{json}")?;
    Ok(())
}
