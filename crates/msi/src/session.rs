use crate::junit;
use msi_sanity::SuiteProperties;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const SEPARATOR_WIDTH: usize = 120;

/// `val` centered in a line of dashes
pub fn separator(val: &str) -> String {
    let side = SEPARATOR_WIDTH.saturating_sub(val.chars().count() + 2) / 2;
    let dashes = "-".repeat(side);
    format!("{dashes} {val} {dashes}")
}

fn phase_separator(phase: Phase) -> String {
    separator(&phase.to_string().to_uppercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Call,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Call => write!(f, "call"),
            Phase::Teardown => write!(f, "teardown"),
        }
    }
}

/// Why a test case did not pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFailure {
    Skip(String),
    /// Setup broke before the check ran
    Setup(String),
    /// The check itself failed
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Skipped(String),
    Failed(String),
    Error { phase: Phase, message: String },
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Skipped(_) => "SKIPPED",
            Outcome::Failed(_) => "FAILED",
            Outcome::Error { .. } => "ERROR",
        }
    }
}

impl From<CaseFailure> for Outcome {
    fn from(failure: CaseFailure) -> Self {
        match failure {
            CaseFailure::Skip(reason) => Outcome::Skipped(reason),
            CaseFailure::Setup(message) => Outcome::Error {
                phase: Phase::Setup,
                message,
            },
            CaseFailure::Fail(message) => Outcome::Failed(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub error: usize,
}

impl Tally {
    fn add(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Error { .. } => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.skipped + self.failed + self.error
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.error == 0
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} skipped, {} failed, {} error",
            self.passed, self.skipped, self.failed, self.error
        )
    }
}

/// One run of the harness: its test cases and suite properties
///
/// Clones share state, so an exit hook can conclude the session from wherever
/// termination is requested.
#[derive(Debug, Clone)]
pub struct Session {
    suite: String,
    started: Instant,
    cases: Arc<Mutex<Vec<TestCase>>>,
    properties: SuiteProperties,
}

impl Session {
    pub fn new(suite: impl Into<String>, properties: SuiteProperties) -> Self {
        Self {
            suite: suite.into(),
            started: Instant::now(),
            cases: Arc::new(Mutex::new(Vec::new())),
            properties,
        }
    }

    pub fn properties(&self) -> &SuiteProperties {
        &self.properties
    }

    /// Run one case: `setup` then `call` with whatever setup produced
    ///
    /// A setup failure skips `call` and records an error.
    pub async fn run_case<S, SetupFut, Call, CallFut>(
        &self,
        name: &str,
        setup: SetupFut,
        call: Call,
    ) -> Outcome
    where
        SetupFut: Future<Output = Result<S, CaseFailure>>,
        Call: FnOnce(S) -> CallFut,
        CallFut: Future<Output = Result<(), CaseFailure>>,
    {
        info!("\n{}", separator(name));
        info!("{}", phase_separator(Phase::Setup));
        let start = Instant::now();

        let result = match setup.await {
            Ok(fixture) => {
                info!("{}", phase_separator(Phase::Call));
                call(fixture).await
            }
            Err(failure) => Err(failure),
        };

        info!("{}", phase_separator(Phase::Teardown));
        let outcome = match result {
            Ok(()) => Outcome::Passed,
            Err(failure) => Outcome::from(failure),
        };

        self.record(TestCase {
            name: name.to_string(),
            outcome: outcome.clone(),
            duration: start.elapsed(),
        });
        outcome
    }

    fn record(&self, case: TestCase) {
        match &case.outcome {
            Outcome::Error { phase, message } => {
                info!("\nTEST: {} STATUS: [{}] ERROR", case.name, phase);
                warn!("{}", message);
            }
            Outcome::Failed(message) => {
                info!("\nTEST: {} STATUS: FAILED", case.name);
                warn!("{}", message);
            }
            other => info!("\nTEST: {} STATUS: {}", case.name, other.status()),
        }
        self.cases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(case);
    }

    pub fn cases(&self) -> Vec<TestCase> {
        self.cases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for case in self.cases.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            tally.add(&case.outcome);
        }
        tally
    }

    /// Exit status the session ends with when nothing aborted it
    pub fn exit_status(&self) -> i32 {
        if self.tally().is_success() {
            0
        } else {
            1
        }
    }

    /// Log the summary line and write the JUnit report, if one was requested
    pub fn conclude(&self, exit_status: i32, junit_path: Option<&Path>) -> Tally {
        let tally = self.tally();
        info!(
            tests = tally.total(),
            "{}",
            separator(&format!("{}, exit status {}", tally, exit_status))
        );

        if let Some(path) = junit_path {
            let xml = junit::render(
                &self.suite,
                self.started.elapsed(),
                &self.properties.entries(),
                &self.cases(),
            );
            match junit::write(path, &xml) {
                Ok(()) => info!(path = %path.display(), "Wrote JUnit report"),
                Err(e) => warn!("Failed to write JUnit report: {}", e),
            }
        }
        tally
    }
}
