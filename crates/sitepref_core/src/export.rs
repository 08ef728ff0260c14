use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::analysis::AggregateReport;
use crate::config::ReportConfig;
use crate::spreadsheet::save_spreadsheet;
use crate::table::{Row, tabulate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Csv,
    Xls,
    Json,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [Self::Csv, Self::Xls, Self::Json];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xls => "xls",
            Self::Json => "json",
        }
    }

    pub fn file_name(self, report_name: &str) -> String {
        format!("report-{report_name}.{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteFailure {
    pub format: ReportFormat,
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
}

impl WriteSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Write the CSV, spreadsheet and JSON reports into `output_dir`.
///
/// Each writer runs independently. Failures are logged and collected; files
/// that were already written stay in place.
pub fn write_reports(
    output_dir: &Path,
    report_name: &str,
    report: &AggregateReport,
    config: &ReportConfig,
) -> WriteSummary {
    let mut summary = WriteSummary::default();
    if let Err(err) = fs::create_dir_all(output_dir) {
        error!("failed to create {}: {err}", output_dir.display());
    }

    let rows = tabulate(report);
    for format in ReportFormat::ALL {
        let path = output_dir.join(format.file_name(report_name));
        let result = match format {
            ReportFormat::Csv => save_csv(&path, &rows),
            ReportFormat::Xls => save_spreadsheet(&path, &rows, config),
            ReportFormat::Json => save_json(&path, report),
        };
        match result {
            Ok(()) => {
                info!("wrote {}", path.display());
                summary.written.push(path);
            }
            Err(err) => {
                error!("failed to write {} report: {err:#}", format.as_str());
                summary.failures.push(WriteFailure {
                    format,
                    path,
                    message: format!("{err:#}"),
                });
            }
        }
    }
    summary
}

pub fn save_csv(path: &Path, rows: &[Row]) -> Result<()> {
    fs::write(path, render_csv(rows)).with_context(|| format!("failed to write {}", path.display()))
}

pub fn save_json(path: &Path, report: &AggregateReport) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))
}

/// Comma-delimited, `\n`-terminated CSV; fields are quoted only when needed.
pub fn render_csv(rows: &[Row]) -> String {
    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .map(|field| escape_csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
