//! Install command - deploy every unit of a manifest in dependency order

use console::style;
use stevedore_kube::{GatePolicy, RunReport};
use tokio_util::sync::CancellationToken;

use super::{GlobalArgs, Session};
use crate::config::Config;
use crate::display;
use crate::error::{CliError, Result};

/// Run the install command
pub async fn run(
    args: &GlobalArgs,
    config: &Config,
    ignore_dependency_timeouts: bool,
    no_wait: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let gate_policy = if ignore_dependency_timeouts {
        GatePolicy::Proceed
    } else {
        GatePolicy::Block
    };
    let session = Session::open(args, config, config.orchestrator_config(gate_policy, !no_wait), cancel).await?;

    let order = session.manifest.install_order()?;
    println!(
        "{} Installing manifest {} ({} units)",
        style("→").blue().bold(),
        style(session.manifest.name()).cyan(),
        style(order.len()).yellow()
    );

    let report = session
        .orchestrator
        .install(&session.manifest, &session.ctx)
        .await?;
    display::print_run_report(&report);
    into_result(report)
}

/// Map a finished run onto the command result
pub(crate) fn into_result(report: RunReport) -> Result<()> {
    if report.cancelled {
        return Err(CliError::Cancelled {
            operation: report.operation.to_string(),
            manifest: report.manifest,
        });
    }
    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::RunFailed {
            operation: report.operation.to_string(),
            manifest: report.manifest,
            failed,
        });
    }
    Ok(())
}
