//! Stevedore CLI - install Helm charts, packages and manifests in dependency order

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;

use commands::GlobalArgs;
use config::Config;
use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author = "Stevedore Contributors")]
#[command(version)]
#[command(about = "Install Helm charts, packages and manifests in dependency order", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Manifest document to load
    #[arg(short, long, global = true, default_value = "manifest.yaml")]
    manifest: PathBuf,

    /// Template overrides (key=value[,key=value])
    #[arg(long = "set", global = true)]
    set: Vec<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long = "verbosity", global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ~/.stevedore.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reject unknown references and dependency cycles
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install every unit of the manifest in dependency order
    Install {
        /// Install units even when their dependencies never became ready
        #[arg(long)]
        ignore_dependency_timeouts: bool,

        /// Do not wait for each chart to become ready after installing it
        #[arg(long)]
        no_wait: bool,
    },

    /// Uninstall every unit of the manifest in reverse order
    #[command(alias = "delete")]
    Uninstall,

    /// Show the aggregate readiness of the manifest's charts
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Print the resolved install order without contacting a cluster
    Plan {
        /// Show the uninstall order instead
        #[arg(long)]
        reverse: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let args = GlobalArgs {
        kubeconfig: cli.kubeconfig,
        context: cli.context,
        manifest: cli.manifest,
        set: cli.set,
        strict: cli.strict,
    };

    let config = Config::load(cli.config.as_deref())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::internal(format!("cannot start async runtime: {}", e)))?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        let cancel_on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after the current step");
                cancel_on_signal.cancel();
            }
        });

        match cli.command {
            Commands::Install {
                ignore_dependency_timeouts,
                no_wait,
            } => {
                commands::install::run(&args, &config, ignore_dependency_timeouts, no_wait, cancel)
                    .await
            }
            Commands::Uninstall => commands::uninstall::run(&args, &config, cancel).await,
            Commands::Status { output } => {
                commands::status::run(&args, &config, output, cancel).await
            }
            Commands::Plan { reverse, output } => commands::plan::run(&args, reverse, output),
        }
    })
}
