use k8s_openapi::api::core::v1::{Node, NodeCondition, Pod};
use std::collections::{BTreeSet, HashSet};

/// Node conditions that must not be `True` on a healthy node
pub const PRESSURE_CONDITIONS: [&str; 4] = [
    "MemoryPressure",
    "DiskPressure",
    "PIDPressure",
    "NetworkUnavailable",
];

/// The parts of a Node the sanity gate looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub name: String,
    pub ready: bool,
    pub schedulable: bool,
    /// Conditions in an unhealthy state, e.g. `Ready=False` or `DiskPressure`
    pub unhealthy_conditions: Vec<String>,
}

impl NodeView {
    /// A ready, schedulable node with no bad conditions
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: true,
            schedulable: true,
            unhealthy_conditions: Vec::new(),
        }
    }
}

fn find_condition<'a>(conditions: &'a [NodeCondition], type_: &str) -> Option<&'a NodeCondition> {
    conditions.iter().find(|c| c.type_ == type_)
}

impl From<&Node> for NodeView {
    fn from(node: &Node) -> Self {
        let name = node
            .metadata
            .name
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        let conditions: &[NodeCondition] = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_deref())
            .unwrap_or(&[]);

        let ready_status = find_condition(conditions, "Ready").map(|c| c.status.as_str());
        let ready = ready_status == Some("True");

        let mut unhealthy_conditions = Vec::new();
        if !ready {
            unhealthy_conditions.push(format!("Ready={}", ready_status.unwrap_or("Missing")));
        }
        for pressure in PRESSURE_CONDITIONS {
            if find_condition(conditions, pressure).is_some_and(|c| c.status == "True") {
                unhealthy_conditions.push(pressure.to_string());
            }
        }

        let schedulable = !node
            .spec
            .as_ref()
            .and_then(|s| s.unschedulable)
            .unwrap_or(false);

        Self {
            name,
            ready,
            schedulable,
            unhealthy_conditions,
        }
    }
}

/// The parts of a Pod the sanity gate looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodView {
    pub namespace: String,
    pub name: String,
    /// Pod phase; `Unknown` when the status has none
    pub phase: String,
}

impl PodView {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            phase: phase.into(),
        }
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl From<&Pod> for PodView {
    fn from(pod: &Pod) -> Self {
        Self {
            namespace: pod
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            name: pod
                .metadata
                .name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            phase: pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
        }
    }
}

pub fn is_node_ready(node: &NodeView) -> bool {
    node.ready
}

pub fn is_node_schedulable(node: &NodeView) -> bool {
    node.schedulable
}

pub fn node_has_healthy_conditions(node: &NodeView) -> bool {
    node.unhealthy_conditions.is_empty()
}

pub fn pod_is_failed_or_pending(pod: &PodView) -> bool {
    matches!(pod.phase.as_str(), "Failed" | "Pending")
}

/// Answers whether a storage class is present on the cluster
pub trait StorageClassLookup {
    fn storage_class_exists(&self, name: &str) -> bool;
}

impl StorageClassLookup for HashSet<String> {
    fn storage_class_exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl StorageClassLookup for BTreeSet<String> {
    fn storage_class_exists(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl StorageClassLookup for [String] {
    fn storage_class_exists(&self, name: &str) -> bool {
        self.iter().any(|s| s == name)
    }
}
