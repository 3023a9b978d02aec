// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

//! msi-sanity - Cluster sanity gate for integration test sessions
//!
//! This crate provides:
//! - Narrow node and pod views built from Kubernetes objects
//! - The individual sanity checks (schedulable, ready, healthy, pods, storage)
//! - `SanityController`, which either re-raises a failure or aborts the session
//! - The abort primitive: exit report persistence, JUnit property, termination

pub mod checks;
pub mod controller;
pub mod error;
pub mod host;
pub mod report;
pub mod resources;

// Re-export primary types
pub use checks::{SanityCheck, SanityInput};
pub use controller::{SanityConfig, SanityController, SanityState, SanitySummary};
pub use error::{Result, SanityError, SanityFailure, SanityFailureKind};
pub use host::{
    exit_session, ProcessHost, PropertyRecorder, RecordingHost, SessionHost, SuiteProperties,
};
pub use report::ExitReport;
pub use resources::{
    is_node_ready, is_node_schedulable, node_has_healthy_conditions, pod_is_failed_or_pending,
    NodeView, PodView, StorageClassLookup,
};
