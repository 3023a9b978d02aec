use msi_core::EXIT_ERRORS_DIR;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reason a session was aborted, persisted before the process exits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReport {
    /// File under the exit errors directory; `None` writes nothing
    pub file_name: Option<String>,
    pub message: String,
    pub exit_code: i32,
}

impl ExitReport {
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            file_name: None,
            message: message.into(),
            exit_code,
        }
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Where `persist` writes this report under `base_dir`
    pub fn path_under(&self, base_dir: &Path) -> Option<PathBuf> {
        self.file_name
            .as_ref()
            .map(|name| base_dir.join(EXIT_ERRORS_DIR).join(name))
    }

    /// Write the message to `<base_dir>/session_exit_errors/<file_name>`
    ///
    /// Creates missing directories and overwrites an existing file.
    pub fn persist(&self, base_dir: &Path) -> std::io::Result<Option<PathBuf>> {
        let Some(path) = self.path_under(base_dir) else {
            return Ok(None);
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &self.message)?;

        info!(path = %path.display(), "Wrote session exit report");
        Ok(Some(path))
    }
}
