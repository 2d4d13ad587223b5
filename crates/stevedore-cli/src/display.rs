//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Run reports with one line per unit
//! - Status reports with per-chart readiness

use console::{StyledObject, style};
use std::time::Duration;
use stevedore_core::InstallStatus;
use stevedore_kube::{RunReport, StatusReport, UnitResult};

/// Human-readable duration: `850ms`, `12.4s`, `3m04s`
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

pub fn styled_status(status: InstallStatus) -> StyledObject<String> {
    let text = status.to_string();
    match status {
        InstallStatus::Ready => style(text).green(),
        InstallStatus::NotReady => style(text).yellow(),
        InstallStatus::NotInstalled => style(text).dim(),
    }
}

fn result_icon(result: &UnitResult) -> StyledObject<&'static str> {
    match result {
        UnitResult::Succeeded => style("✓").green(),
        UnitResult::Failed { .. } => style("✗").red(),
        UnitResult::Blocked { .. } => style("⊘").yellow(),
        UnitResult::Cancelled => style("-").dim(),
    }
}

/// One line per unit, then a summary
pub fn print_run_report(report: &RunReport) {
    for outcome in &report.outcomes {
        let detail = match &outcome.result {
            UnitResult::Succeeded => String::new(),
            other => format!(" - {}", other),
        };
        println!(
            "  {} {} {}{} {}",
            result_icon(&outcome.result),
            style(&outcome.unit.name).cyan(),
            style(format!("({})", outcome.unit.kind)).dim(),
            detail,
            style(format_duration(outcome.duration)).dim()
        );
        if !outcome.unmet_dependencies.is_empty() {
            println!(
                "    {} installed before {} became ready",
                style("⚠").yellow(),
                outcome.unmet_dependencies.join(", ")
            );
        }
    }

    let failed = report.failures().count();
    println!();
    if report.cancelled {
        println!(
            "{} {} of {} cancelled after {}",
            style("-").dim().bold(),
            report.operation,
            style(&report.manifest).cyan(),
            format_duration(report.duration)
        );
    } else if failed == 0 {
        println!(
            "{} {} of {} completed in {}",
            style("✓").green().bold(),
            report.operation,
            style(&report.manifest).cyan(),
            format_duration(report.duration)
        );
    } else {
        println!(
            "{} {} of {} finished with {} failed unit(s) in {}",
            style("✗").red().bold(),
            report.operation,
            style(&report.manifest).cyan(),
            style(failed).red(),
            format_duration(report.duration)
        );
    }
}

pub fn print_status_report(report: &StatusReport) {
    println!("{}", style("MANIFEST").bold().underlined());
    println!("  Name:       {}", style(&report.manifest).cyan());
    println!("  Status:     {}", styled_status(report.status));

    if report.charts.is_empty() {
        return;
    }

    println!("\n{}", style("CHARTS").bold().underlined());
    let width = report.charts.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for chart in &report.charts {
        println!(
            "  {:<width$}  {}/{}  {}",
            chart.name,
            style(&chart.namespace).yellow(),
            chart.release_name,
            styled_status(chart.status),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(12_400)), "12.4s");
        assert_eq!(format_duration(Duration::from_secs(184)), "3m04s");
    }
}
