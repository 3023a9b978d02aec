use crate::error::{Result, SanityError};
use crate::report::ExitReport;
use msi_core::EXIT_CODE_PROPERTY;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// The test session the gate runs inside
pub trait SessionHost: Send + Sync {
    /// End the whole session with `exit_code`.
    ///
    /// The process host never returns. Hosts that do return leave it to the
    /// caller to stop running tests.
    fn terminate(&self, exit_code: i32, message: &str);
}

/// Attaches key/value properties to the current test-suite report
pub trait PropertyRecorder: Send + Sync {
    fn record(&self, name: &str, value: &str);
}

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

/// Host that exits the process
///
/// Exit hooks run first, in registration order, so the runner can flush its
/// reports the way a test framework runs its session-finish hooks.
#[derive(Default)]
pub struct ProcessHost {
    hooks: Vec<ExitHook>,
}

impl ProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_exit(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }
}

impl SessionHost for ProcessHost {
    fn terminate(&self, exit_code: i32, message: &str) {
        error!(exit_code, "Exiting test session: {}", message);
        for hook in &self.hooks {
            hook(exit_code);
        }
        std::process::exit(exit_code);
    }
}

/// Host that only remembers termination requests
///
/// Used where one failing cluster must not stop the rest of a run, and in tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingHost {
    terminations: Arc<Mutex<Vec<(i32, String)>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminations(&self) -> Vec<(i32, String)> {
        self.terminations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn terminated(&self) -> bool {
        !self.terminations().is_empty()
    }
}

impl SessionHost for RecordingHost {
    fn terminate(&self, exit_code: i32, message: &str) {
        warn!(exit_code, "Session termination requested: {}", message);
        self.terminations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((exit_code, message.to_string()));
    }
}

/// In-memory test-suite properties, rendered into the JUnit report
///
/// Clones share the same properties. Recording an existing name replaces its
/// value and keeps its position.
#[derive(Debug, Default, Clone)]
pub struct SuiteProperties {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl SuiteProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl PropertyRecorder for SuiteProperties {
    fn record(&self, name: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((name.to_string(), value.to_string())),
        }
    }
}

/// Abort the session: write the report, record `exit_code`, terminate
///
/// The report is written before termination is requested. A failed write is
/// logged and does not prevent termination; it is returned only when the host
/// comes back.
pub fn exit_session(
    host: &dyn SessionHost,
    report: &ExitReport,
    base_dir: &Path,
    recorder: Option<&dyn PropertyRecorder>,
) -> Result<Option<PathBuf>> {
    let written = report.persist(base_dir).map_err(|source| {
        let path = report
            .path_under(base_dir)
            .unwrap_or_else(|| base_dir.to_path_buf());
        error!(path = %path.display(), error = %source, "Failed to write exit report");
        SanityError::Artifact { path, source }
    });

    if let Some(recorder) = recorder {
        recorder.record(EXIT_CODE_PROPERTY, &report.exit_code.to_string());
    }

    host.terminate(report.exit_code, &report.message);
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_session_order_of_effects() {
        let dir = tempfile::tempdir().unwrap();
        let host = RecordingHost::new();
        let props = SuiteProperties::new();
        let report = ExitReport::new("Missing storage classes: gp3", 99).with_file("storage.txt");

        let written = exit_session(&host, &report, dir.path(), Some(&props)).unwrap();

        let path = written.unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "Missing storage classes: gp3"
        );
        assert_eq!(props.get("exit_code").as_deref(), Some("99"));
        assert_eq!(
            host.terminations(),
            vec![(99, "Missing storage classes: gp3".to_string())]
        );
    }

    #[test]
    fn test_exit_session_without_file_or_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let host = RecordingHost::new();
        let report = ExitReport::new("stop", 3);

        let written = exit_session(&host, &report, dir.path(), None).unwrap();
        assert!(written.is_none());
        assert_eq!(host.terminations(), vec![(3, "stop".to_string())]);
    }

    #[test]
    fn test_unwritable_dir_still_terminates() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the exit errors directory should go
        let base = dir.path().join("collector");
        std::fs::write(&base, "not a directory").unwrap();

        let host = RecordingHost::new();
        let report = ExitReport::new("reason", 99).with_file("r.txt");
        let err = exit_session(&host, &report, &base, None).unwrap_err();

        assert!(matches!(err, SanityError::Artifact { .. }));
        assert!(host.terminated());
    }

    #[test]
    fn test_properties_replace_in_place() {
        let props = SuiteProperties::new();
        props.record("cluster", "a");
        props.record("exit_code", "99");
        props.record("cluster", "b");

        assert_eq!(
            props.entries(),
            vec![
                ("cluster".to_string(), "b".to_string()),
                ("exit_code".to_string(), "99".to_string()),
            ]
        );
    }
}
