//! Uninstall command - remove every unit of a manifest in reverse order

use console::style;
use stevedore_kube::GatePolicy;
use tokio_util::sync::CancellationToken;

use super::install::into_result;
use super::{GlobalArgs, Session};
use crate::config::Config;
use crate::display;
use crate::error::Result;

/// Run the uninstall command
pub async fn run(args: &GlobalArgs, config: &Config, cancel: CancellationToken) -> Result<()> {
    let session = Session::open(
        args,
        config,
        config.orchestrator_config(GatePolicy::Block, false),
        cancel,
    )
    .await?;

    println!(
        "{} Uninstalling manifest {}",
        style("→").blue().bold(),
        style(session.manifest.name()).cyan()
    );

    let report = session
        .orchestrator
        .uninstall(&session.manifest, &session.ctx)
        .await?;
    display::print_run_report(&report);
    into_result(report)
}
