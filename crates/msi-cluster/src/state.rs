use crate::api_client::ApiClient;
use crate::error::{ClusterError, ClusterErrorKind, Result};
use msi_sampler::{AsyncTimeoutSampler, SampleError, SamplerConfig};
use msi_sanity::{is_node_ready, NodeView, PodView, StorageClassLookup};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Point-in-time snapshot of the cluster, in the shape the sanity gate reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterState {
    pub nodes: Vec<NodeView>,
    pub pods: Vec<PodView>,
    pub storage_classes: BTreeSet<String>,
}

impl ClusterState {
    pub async fn fetch(client: &ApiClient) -> Result<Self> {
        let nodes = fetch_nodes(client).await?;
        let pods: Vec<PodView> = client.list_pods().await?.iter().map(PodView::from).collect();
        let storage_classes: BTreeSet<String> =
            client.list_storage_class_names().await?.into_iter().collect();

        info!(
            nodes = nodes.len(),
            pods = pods.len(),
            storage_classes = storage_classes.len(),
            "Fetched cluster state"
        );

        Ok(Self {
            nodes,
            pods,
            storage_classes,
        })
    }
}

impl StorageClassLookup for ClusterState {
    fn storage_class_exists(&self, name: &str) -> bool {
        self.storage_classes.contains(name)
    }
}

async fn fetch_nodes(client: &ApiClient) -> Result<Vec<NodeView>> {
    Ok(client.list_nodes().await?.iter().map(NodeView::from).collect())
}

/// Wait until the cluster reports at least one node and every node is Ready
///
/// Transport errors are retried until the deadline.
pub async fn wait_for_nodes_ready(
    client: &ApiClient,
    config: SamplerConfig,
) -> std::result::Result<Vec<NodeView>, SampleError<ClusterError>> {
    AsyncTimeoutSampler::new(config, || fetch_nodes(client))
        .suppress_kinds([ClusterErrorKind::Transport])
        .wait_until(|nodes| {
            let not_ready: Vec<&str> = nodes
                .iter()
                .filter(|n| !is_node_ready(n))
                .map(|n| n.name.as_str())
                .collect();
            debug!(total = nodes.len(), ?not_ready, "Node readiness");
            !nodes.is_empty() && not_ready.is_empty()
        })
        .await
}
