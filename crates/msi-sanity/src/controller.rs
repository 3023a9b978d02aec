use crate::checks::{SanityCheck, SanityInput};
use crate::error::{Result, SanityError, SanityFailure};
use crate::host::{exit_session, PropertyRecorder, SessionHost};
use crate::report::ExitReport;
use crate::resources::{NodeView, PodView, StorageClassLookup};
use msi_core::{HarnessConfig, CLUSTER_SANITY_FAILURE_FILE, DEFAULT_ABORT_EXIT_CODE};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Configuration for one sanity run
#[derive(Debug, Clone)]
pub struct SanityConfig {
    /// Abort the session on failure instead of returning the error
    pub exit_on_failure: bool,
    pub exit_code: i32,
    /// Collector directory; the report goes to its exit errors subdirectory
    pub artifacts_dir: PathBuf,
    pub required_storage_classes: Vec<String>,
    pub report_file_name: String,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            exit_on_failure: true,
            exit_code: DEFAULT_ABORT_EXIT_CODE,
            artifacts_dir: PathBuf::from("tests-collected-info"),
            required_storage_classes: Vec::new(),
            report_file_name: CLUSTER_SANITY_FAILURE_FILE.to_string(),
        }
    }
}

impl SanityConfig {
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            exit_on_failure: config.sanity.exit_on_failure,
            exit_code: config.sanity.exit_code,
            artifacts_dir: config.log_collector.base_dir.clone(),
            required_storage_classes: config.storage_classes.clone(),
            ..Default::default()
        }
    }
}

/// Where a sanity run ended up
///
/// `Checking` only lasts for the duration of [`SanityController::run`]. Callers
/// see the terminal state through [`SanitySummary::state`] or [`SanityError::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityState {
    Checking,
    Passed,
    FailedAbort,
    FailedContinue,
}

/// Result of a passing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitySummary {
    pub state: SanityState,
    pub nodes_checked: usize,
    pub pods_checked: usize,
    pub checks_run: usize,
}

/// Runs the sanity checks once and applies the failure policy
///
/// `run` consumes the controller, so each instance decides exactly once.
pub struct SanityController<'a> {
    config: SanityConfig,
    host: &'a dyn SessionHost,
    recorder: Option<&'a dyn PropertyRecorder>,
}

impl<'a> SanityController<'a> {
    pub fn new(config: SanityConfig, host: &'a dyn SessionHost) -> Self {
        Self {
            config,
            host,
            recorder: None,
        }
    }

    /// Record `exit_code` on this recorder when aborting
    pub fn with_recorder(mut self, recorder: &'a dyn PropertyRecorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    fn checks(&self) -> Vec<SanityCheck> {
        SanityCheck::ALL
            .into_iter()
            .filter(|c| {
                *c != SanityCheck::StorageClasses || !self.config.required_storage_classes.is_empty()
            })
            .collect()
    }

    /// Run every check against the given cluster state
    ///
    /// All checks run; the first failing one in check order is the one
    /// reported. On failure the session is either aborted (report written,
    /// `exit_code` recorded, host asked to terminate) or the failure is
    /// returned to the caller untouched.
    pub fn run(
        self,
        nodes: &[NodeView],
        pods: &[PodView],
        storage: &dyn StorageClassLookup,
    ) -> Result<SanitySummary> {
        info!(
            nodes = nodes.len(),
            pods = pods.len(),
            exit_on_failure = self.config.exit_on_failure,
            "Running cluster sanity"
        );

        let input = SanityInput {
            nodes,
            pods,
            storage,
            required_storage_classes: &self.config.required_storage_classes,
        };

        let checks = self.checks();
        let mut failures: Vec<SanityFailure> = checks
            .iter()
            .filter_map(|check| check.run(&input).err())
            .collect();

        if failures.is_empty() {
            info!("Cluster sanity passed");
            return Ok(SanitySummary {
                state: SanityState::Passed,
                nodes_checked: nodes.len(),
                pods_checked: pods.len(),
                checks_run: checks.len(),
            });
        }

        let failure = failures.remove(0);
        for other in &failures {
            warn!(kind = %other.kind, "Additional sanity failure: {}", other.message);
        }

        if !self.config.exit_on_failure {
            error!(kind = %failure.kind, "Cluster sanity failed: {}", failure.message);
            return Err(SanityError::Failed {
                failure,
                others: failures,
            });
        }

        let report = ExitReport::new(failure.message.clone(), self.config.exit_code)
            .with_file(self.config.report_file_name.clone());
        let artifact = exit_session(
            self.host,
            &report,
            &self.config.artifacts_dir,
            self.recorder,
        )?;

        Err(SanityError::Aborted { report, artifact })
    }
}

impl SanityError {
    /// Terminal state of the sanity run that produced this error
    pub fn state(&self) -> SanityState {
        match self {
            SanityError::Failed { .. } => SanityState::FailedContinue,
            SanityError::Aborted { .. } | SanityError::Artifact { .. } => SanityState::FailedAbort,
        }
    }
}
