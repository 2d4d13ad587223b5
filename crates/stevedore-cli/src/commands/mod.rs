//! CLI commands
//!
//! Every command loads the manifest the same way. Only the cluster-facing
//! ones build an orchestrator.

pub mod install;
pub mod plan;
pub mod status;
pub mod uninstall;

use std::path::PathBuf;
use std::sync::Arc;
use stevedore_core::{GlobalContext, ResolveOptions, SystemContext, parse_overrides};
use stevedore_engine::{DescriptorLoader, Engine};
use stevedore_kube::{HelmCliBackend, KubeInspector, Manifest, Orchestrator, OrchestratorConfig};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::Result;

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub manifest: PathBuf,
    pub set: Vec<String>,
    pub strict: bool,
}

impl GlobalArgs {
    fn resolve_options(&self) -> ResolveOptions {
        if self.strict {
            ResolveOptions::strict()
        } else {
            ResolveOptions::default()
        }
    }

    /// Process-wide context, flags taking precedence over the config file
    pub fn global_context(&self, config: &Config) -> GlobalContext {
        GlobalContext {
            kubeconfig: self.kubeconfig.clone().or_else(|| config.kubeconfig.clone()),
            kube_context: self.context.clone().or_else(|| config.context.clone()),
            manifest_path: self.manifest.clone(),
            overrides: parse_overrides(&self.set),
        }
    }
}

/// Render, parse and validate the manifest, then read its values files
pub fn load_manifest(args: &GlobalArgs) -> Result<Manifest> {
    let overrides = parse_overrides(&args.set);
    let loader = DescriptorLoader::new(Engine::builder().strict(true).build());
    let loaded = loader.load(&args.manifest, &overrides)?;
    Ok(Manifest::load(loaded.descriptor, &args.resolve_options())?)
}

/// Everything a cluster-facing command needs
pub struct Session {
    pub manifest: Manifest,
    pub ctx: SystemContext,
    pub orchestrator: Orchestrator<HelmCliBackend, KubeInspector>,
    // removed on drop
    _work_dir: tempfile::TempDir,
}

impl Session {
    pub async fn open(
        args: &GlobalArgs,
        config: &Config,
        orchestrator_config: OrchestratorConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let manifest = load_manifest(args)?;
        let global = Arc::new(args.global_context(config));

        let inspector =
            KubeInspector::connect(global.kubeconfig.as_deref(), global.kube_context.as_deref())
                .await?;
        let backend = HelmCliBackend::new(config.helm_binary());

        let work_dir = tempfile::Builder::new().prefix("stevedore-").tempdir()?;
        tracing::debug!(path = %work_dir.path().display(), "created scratch directory");
        let ctx = SystemContext::new(manifest.name(), work_dir.path(), global);

        let orchestrator = Orchestrator::new(backend, inspector)
            .with_config(orchestrator_config)
            .with_cancellation(cancel);

        Ok(Self {
            manifest,
            ctx,
            orchestrator,
            _work_dir: work_dir,
        })
    }
}
