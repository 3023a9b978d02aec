use crate::error::{SanityFailure, SanityFailureKind};
use crate::resources::{
    is_node_ready, is_node_schedulable, node_has_healthy_conditions, pod_is_failed_or_pending,
    NodeView, PodView, StorageClassLookup,
};
use tracing::debug;

/// Cluster state a sanity run looks at
pub struct SanityInput<'a> {
    pub nodes: &'a [NodeView],
    pub pods: &'a [PodView],
    pub storage: &'a dyn StorageClassLookup,
    /// Storage classes that must exist; empty skips the storage check
    pub required_storage_classes: &'a [String],
}

/// One sanity predicate over cluster state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityCheck {
    NodesSchedulable,
    NodesReady,
    NodesHealthy,
    PodsRunning,
    StorageClasses,
}

impl SanityCheck {
    /// All checks, in the order failures are reported
    pub const ALL: [SanityCheck; 5] = [
        SanityCheck::NodesSchedulable,
        SanityCheck::NodesReady,
        SanityCheck::NodesHealthy,
        SanityCheck::PodsRunning,
        SanityCheck::StorageClasses,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SanityCheck::NodesSchedulable => "nodes-schedulable",
            SanityCheck::NodesReady => "nodes-ready",
            SanityCheck::NodesHealthy => "nodes-healthy",
            SanityCheck::PodsRunning => "pods-running",
            SanityCheck::StorageClasses => "storage-classes",
        }
    }

    pub fn run(&self, input: &SanityInput<'_>) -> Result<(), SanityFailure> {
        debug!(check = self.name(), "Running sanity check");
        match self {
            SanityCheck::NodesSchedulable => check_nodes_schedulable(input.nodes),
            SanityCheck::NodesReady => check_nodes_ready(input.nodes),
            SanityCheck::NodesHealthy => check_nodes_healthy(input.nodes),
            SanityCheck::PodsRunning => check_pods(input.pods),
            SanityCheck::StorageClasses => {
                check_storage_classes(input.storage, input.required_storage_classes)
            }
        }
    }
}

fn fail(kind: SanityFailureKind, prefix: &str, offenders: Vec<String>) -> Result<(), SanityFailure> {
    if offenders.is_empty() {
        return Ok(());
    }
    let message = format!("{}: {}", prefix, offenders.join(", "));
    Err(SanityFailure::new(kind, message, offenders))
}

pub fn check_nodes_schedulable(nodes: &[NodeView]) -> Result<(), SanityFailure> {
    let offenders = nodes
        .iter()
        .filter(|n| !is_node_schedulable(n))
        .map(|n| n.name.clone())
        .collect();
    fail(SanityFailureKind::NodeUnschedulable, "Unschedulable nodes", offenders)
}

pub fn check_nodes_ready(nodes: &[NodeView]) -> Result<(), SanityFailure> {
    let offenders = nodes
        .iter()
        .filter(|n| !is_node_ready(n))
        .map(|n| n.name.clone())
        .collect();
    fail(SanityFailureKind::NodeNotReady, "Nodes not ready", offenders)
}

pub fn check_nodes_healthy(nodes: &[NodeView]) -> Result<(), SanityFailure> {
    let unhealthy: Vec<&NodeView> = nodes
        .iter()
        .filter(|n| !node_has_healthy_conditions(n))
        .collect();
    if unhealthy.is_empty() {
        return Ok(());
    }

    let details = unhealthy
        .iter()
        .map(|n| format!("{} ({})", n.name, n.unhealthy_conditions.join(", ")))
        .collect::<Vec<_>>()
        .join("; ");
    Err(SanityFailure::new(
        SanityFailureKind::NodesUnhealthyCondition,
        format!("Nodes not in healthy condition: {}", details),
        unhealthy.iter().map(|n| n.name.clone()).collect(),
    ))
}

pub fn check_pods(pods: &[PodView]) -> Result<(), SanityFailure> {
    let bad: Vec<&PodView> = pods.iter().filter(|p| pod_is_failed_or_pending(p)).collect();
    if bad.is_empty() {
        return Ok(());
    }

    let details = bad
        .iter()
        .map(|p| format!("{} ({})", p.key(), p.phase))
        .collect::<Vec<_>>()
        .join(", ");
    Err(SanityFailure::new(
        SanityFailureKind::PodsFailedOrPending,
        format!("Failed or pending pods: {}", details),
        bad.iter().map(|p| p.key()).collect(),
    ))
}

pub fn check_storage_classes(
    storage: &dyn StorageClassLookup,
    required: &[String],
) -> Result<(), SanityFailure> {
    let missing = required
        .iter()
        .filter(|name| !storage.storage_class_exists(name))
        .cloned()
        .collect();
    fail(
        SanityFailureKind::StorageClassMissing,
        "Missing storage classes",
        missing,
    )
}
