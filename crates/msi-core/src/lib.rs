//! msi-core - Shared types for the managed services integration harness
//!
//! This crate provides:
//! - The harness error type with miette diagnostics
//! - `HarnessConfig`, the explicit session configuration
//! - Constants shared by the sanity gate and the runner

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{HarnessConfig, LogCollectorConfig, SanityGateConfig};
pub use error::{HarnessError, Result};

/// Exit code used when a session is aborted by a sanity gate.
///
/// Distinct from the exit codes a test runner uses for ordinary failures.
pub const DEFAULT_ABORT_EXIT_CODE: i32 = 99;

/// Subdirectory of the collector directory holding session abort reasons
pub const EXIT_ERRORS_DIR: &str = "session_exit_errors";

/// File the cluster sanity gate writes its failure message to
pub const CLUSTER_SANITY_FAILURE_FILE: &str = "cluster_sanity_failure.txt";

/// JUnit test-suite property carrying the abort exit code
pub const EXIT_CODE_PROPERTY: &str = "exit_code";
