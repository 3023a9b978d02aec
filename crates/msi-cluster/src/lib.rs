// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

//! msi-cluster - Read-only access to the cluster under test
//!
//! This crate provides:
//! - `ApiClient`, a narrow Kubernetes API client (nodes, pods, storage classes,
//!   OpenShift cluster versions and operators)
//! - `ClusterState`, a snapshot in the shape the sanity gate consumes
//! - Waits composed on the sampler: nodes ready, cluster upgrade completed
//! - Resource collection for failed waits

pub mod api_client;
pub mod collect;
pub mod error;
pub mod state;
pub mod upgrade;

// Re-export primary types
pub use api_client::ApiClient;
pub use collect::ResourceCollector;
pub use error::{ClusterError, ClusterErrorKind, Result};
pub use state::{wait_for_nodes_ready, ClusterState};
pub use upgrade::{
    upgrade_completed, upgrade_sampler_config, wait_for_upgrade, ClusterVersion, UpgradePolicy,
    UPGRADE_POLL_INTERVAL, UPGRADE_SCHEDULE_DELTA, UPGRADE_TIMEOUT,
};
