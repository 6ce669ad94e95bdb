use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::probe::{Outcome, ProbeReport};

/// Whole-run document emitted in JSON mode.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub target_version: String,
    pub total_targets: usize,
    pub workers: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reports: Vec<ProbeReport>,
}

pub struct OutputWriter {
    format: OutputFormat,
    file: Option<PathBuf>,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, file: Option<PathBuf>) -> Self {
        Self { format, file }
    }

    /// Whether reports should be printed as they arrive. Human mode on
    /// stdout streams; JSON and file output are written in one pass at the
    /// end so the document stays well-formed.
    pub fn live(&self) -> bool {
        self.format == OutputFormat::Human && self.file.is_none()
    }

    pub fn write(&self, summary: &ScanSummary) -> Result<()> {
        let output = match self.format {
            OutputFormat::Human => {
                if self.live() {
                    format!("\n{} all probes complete\n", "[*]".cyan().bold())
                } else {
                    self.format_human(summary)
                }
            }
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(summary)?;
                json.push('\n');
                json
            }
        };

        match &self.file {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = BufWriter::new(file);
                writer.write_all(output.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{output}");
                io::stdout().flush()?;
            }
        }

        Ok(())
    }

    fn format_human(&self, summary: &ScanSummary) -> String {
        let mut output = String::new();
        for report in &summary.reports {
            output.push_str(&report_line(report));
            output.push('\n');
        }
        output.push_str(&format!(
            "\n{} all probes complete\n",
            "[*]".cyan().bold()
        ));
        output
    }
}

/// One human-readable line per processed descriptor, colored by category:
/// green for a matched target, yellow for auth walls, red for failures.
pub fn report_line(report: &ProbeReport) -> String {
    let endpoint = report.endpoint();
    match &report.outcome {
        Outcome::MatchedTarget { .. } => format!(
            "{} {} -> {}",
            "[+]".green().bold(),
            endpoint.bold(),
            report.outcome.to_string().green()
        ),
        Outcome::OtherVersion { .. } => {
            format!("{} {} -> {}", "[i]".cyan(), endpoint, report.outcome)
        }
        Outcome::AuthRequired => format!(
            "{} {} -> {}",
            "[-]".yellow(),
            endpoint,
            report.outcome.to_string().yellow()
        ),
        Outcome::Unreachable { .. } | Outcome::UnexpectedError { .. } => format!(
            "{} {} -> {}",
            "[-]".red(),
            endpoint,
            report.outcome.to_string().red()
        ),
    }
}
