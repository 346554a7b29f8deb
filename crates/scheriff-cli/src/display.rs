//! Display formatting for CLI output
//!
//! Results go to stdout, either as one line per result grouped by file or as
//! a single JSON document. Input errors go to stderr.

use console::style;
use scheriff_core::gvk::join_non_empty;
use scheriff_core::{RunOutcome, Severity, ValidationResult};
use serde::Serialize;

use crate::error::Result;

/// Machine-readable run report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub valid: bool,
    pub exit_code: u8,
    pub results: Vec<&'a ValidationResult>,
}

impl<'a> JsonReport<'a> {
    pub fn new(outcome: &'a RunOutcome, exit_code: u8) -> Self {
        Self {
            valid: outcome.is_success(),
            exit_code,
            results: outcome.results().collect(),
        }
    }
}

fn styled_severity(severity: Severity) -> String {
    match severity {
        Severity::Ok => style(severity).green().to_string(),
        Severity::Warning => style(severity).yellow().to_string(),
        Severity::Error => style(severity).red().to_string(),
    }
}

/// `  - <SEVERITY>, <namespace/name> (<kind>): <message>`
pub fn format_result(result: &ValidationResult) -> String {
    format!(
        "  - {}, {} ({}): {}",
        styled_severity(result.severity),
        join_non_empty("/", [result.namespace.as_str(), result.name.as_str()]),
        result.kind,
        result.message
    )
}

pub fn format_summary(outcome: &RunOutcome) -> String {
    let counts = outcome.counts();

    if outcome.is_success() {
        if counts.warning > 0 {
            format!(
                "{} Validation passed with {} warning(s), {} valid",
                style("⚠").yellow().bold(),
                counts.warning,
                counts.ok
            )
        } else {
            format!(
                "{} Validation passed: {} valid",
                style("✓").green().bold(),
                counts.ok
            )
        }
    } else {
        format!(
            "{} Validation failed: {} error(s), {} warning(s), {} valid",
            style("✗").red().bold(),
            counts.error,
            counts.warning,
            counts.ok
        )
    }
}

/// Text report grouped by file
pub fn print_text(outcome: &RunOutcome) {
    for report in &outcome.files {
        println!("Validating manifests in {}", report.file);
        for result in &report.results {
            println!("{}", format_result(result));
        }
    }

    for error in &outcome.input_errors {
        eprintln!("{} {}", style("✗").red(), error);
    }

    if outcome.fatal.is_none() {
        println!();
        println!("{}", format_summary(outcome));
    }
}

pub fn print_json(outcome: &RunOutcome, exit_code: u8) -> Result<()> {
    let report = JsonReport::new(outcome, exit_code);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
