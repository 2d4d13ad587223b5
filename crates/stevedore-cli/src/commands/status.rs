//! Status command - aggregate readiness of a manifest's charts

use stevedore_kube::GatePolicy;
use tokio_util::sync::CancellationToken;

use super::{GlobalArgs, Session};
use crate::OutputFormat;
use crate::config::Config;
use crate::display;
use crate::error::Result;

/// Run the status command
pub async fn run(
    args: &GlobalArgs,
    config: &Config,
    output: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    let session = Session::open(
        args,
        config,
        config.orchestrator_config(GatePolicy::Block, false),
        cancel,
    )
    .await?;

    let report = session
        .orchestrator
        .status(&session.manifest, &session.ctx)
        .await?;

    match output {
        OutputFormat::Table => display::print_status_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}
