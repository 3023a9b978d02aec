use crate::report::ExitReport;
use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which sanity check tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanityFailureKind {
    NodeNotReady,
    NodeUnschedulable,
    NodesUnhealthyCondition,
    PodsFailedOrPending,
    StorageClassMissing,
}

impl fmt::Display for SanityFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanityFailureKind::NodeNotReady => write!(f, "node-not-ready"),
            SanityFailureKind::NodeUnschedulable => write!(f, "node-unschedulable"),
            SanityFailureKind::NodesUnhealthyCondition => write!(f, "nodes-unhealthy-condition"),
            SanityFailureKind::PodsFailedOrPending => write!(f, "pods-failed-or-pending"),
            SanityFailureKind::StorageClassMissing => write!(f, "storage-class-missing"),
        }
    }
}

/// A failed sanity check with the resources that failed it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SanityFailure {
    pub kind: SanityFailureKind,
    pub message: String,
    /// Identifiers of the offending nodes, pods or storage classes
    pub offenders: Vec<String>,
}

impl SanityFailure {
    pub fn new(kind: SanityFailureKind, message: impl Into<String>, offenders: Vec<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offenders,
        }
    }
}

impl Diagnostic for SanityFailure {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("msi::sanity::{}", self.kind)))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.kind {
            SanityFailureKind::NodeNotReady => {
                "Check kubelet status on the listed nodes: oc describe node <name>"
            }
            SanityFailureKind::NodeUnschedulable => {
                "The listed nodes are cordoned. Uncordon them or wait for maintenance to finish"
            }
            SanityFailureKind::NodesUnhealthyCondition => {
                "The listed nodes report pressure or network conditions. Inspect node conditions"
            }
            SanityFailureKind::PodsFailedOrPending => {
                "Inspect the listed pods with oc describe pod -n <namespace> <name>"
            }
            SanityFailureKind::StorageClassMissing => {
                "Create the storage classes or pass the ones the cluster provides with --storage-classes"
            }
        };
        Some(Box::new(help))
    }
}

/// Error type for the sanity gate
#[derive(Error, Debug, Diagnostic)]
pub enum SanityError {
    /// Sanity failed and the session continues; only the caller's test fails
    #[error("Cluster sanity failed: {failure}")]
    #[diagnostic(code(msi::sanity::failed))]
    Failed {
        #[diagnostic_source]
        failure: SanityFailure,
        /// Failures of the checks after the first failing one
        #[related]
        others: Vec<SanityFailure>,
    },

    /// Sanity failed and the session host was asked to terminate
    #[error("Session aborted with exit code {}: {}", report.exit_code, report.message)]
    #[diagnostic(
        code(msi::sanity::aborted),
        help("The failure reason was written under the exit errors directory")
    )]
    Aborted {
        #[allow(unused)]
        report: ExitReport,
        #[allow(unused)]
        artifact: Option<PathBuf>,
    },

    /// Writing the abort reason failed
    #[error("Failed to write exit report {}", path.display())]
    #[diagnostic(
        code(msi::sanity::artifact_write_failed),
        help("Verify the collector directory is writable")
    )]
    Artifact {
        #[allow(unused)]
        path: PathBuf,
        #[source]
        #[allow(unused)]
        source: std::io::Error,
    },
}

/// Result type alias for sanity operations
pub type Result<T> = std::result::Result<T, SanityError>;

impl SanityError {
    /// The first failing check, if this error carries one
    pub fn failure(&self) -> Option<&SanityFailure> {
        match self {
            SanityError::Failed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}
