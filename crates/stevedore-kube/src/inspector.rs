//! Cluster resource inspection
//!
//! The inspector answers one question: which workloads in a namespace belong
//! to a release. Readiness is then judged by [`ReleaseResources::status`].

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::Path;

use crate::error::{KubeError, Result};
use crate::resources::{ReleaseResources, belongs_to_release};

/// Lists the workloads owned by a release
#[async_trait]
pub trait ClusterInspector: Send + Sync {
    async fn list_workloads_for_release(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> Result<ReleaseResources>;
}

/// Inspector backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeInspector {
    client: Client,
}

impl KubeInspector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using an explicit kubeconfig and/or context
    ///
    /// Without either, the usual inference applies (`$KUBECONFIG`,
    /// `~/.kube/config`, in-cluster service account).
    pub async fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Self> {
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            ..Default::default()
        };

        let config = match kubeconfig {
            Some(path) => {
                let raw = Kubeconfig::read_from(path).map_err(|e| {
                    KubeError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                kube::Config::from_custom_kubeconfig(raw, &options)
                    .await
                    .map_err(|e| KubeError::Config(e.to_string()))?
            }
            None if context.is_some() => kube::Config::from_kubeconfig(&options)
                .await
                .map_err(|e| KubeError::Config(e.to_string()))?,
            None => kube::Config::infer()
                .await
                .map_err(|e| KubeError::Config(e.to_string()))?,
        };

        tracing::debug!(cluster = %config.cluster_url, "connecting to cluster");
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn owned<K>(&self, namespace: &str, release_name: &str) -> Result<Vec<K>>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter(|item| belongs_to_release(item.meta().labels.as_ref(), release_name))
            .collect())
    }
}

#[async_trait]
impl ClusterInspector for KubeInspector {
    async fn list_workloads_for_release(
        &self,
        release_name: &str,
        namespace: &str,
    ) -> Result<ReleaseResources> {
        let mut rr = ReleaseResources::new(release_name);
        rr.deployments = self.owned::<Deployment>(namespace, release_name).await?;
        rr.stateful_sets = self.owned::<StatefulSet>(namespace, release_name).await?;
        rr.daemon_sets = self.owned::<DaemonSet>(namespace, release_name).await?;
        rr.jobs = self.owned::<Job>(namespace, release_name).await?;

        tracing::debug!(
            release = %release_name,
            namespace = %namespace,
            workloads = rr.len(),
            "listed release workloads"
        );
        Ok(rr)
    }
}
