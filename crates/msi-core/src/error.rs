// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for harness configuration and session setup
#[derive(Error, Debug, Diagnostic)]
pub enum HarnessError {
    /// Config file could not be read
    #[error("Failed to read config file {}", path.display())]
    #[diagnostic(
        code(msi::config_unreadable),
        help("Check that the file exists and is readable, or omit --config to use the built-in defaults")
    )]
    ConfigUnreadable {
        #[allow(unused)]
        path: PathBuf,
        #[source]
        #[allow(unused)]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for `HarnessConfig`
    #[error("Invalid config file {}: {message}", path.display())]
    #[diagnostic(
        code(msi::config_invalid),
        help("The config file must be a YAML mapping. Unknown keys are rejected")
    )]
    ConfigInvalid {
        #[allow(unused)]
        path: PathBuf,
        #[allow(unused)]
        message: String,
    },

    /// A required setting was not provided
    #[error("Missing required setting: {setting}")]
    #[diagnostic(code(msi::missing_setting), help("{suggestion}"))]
    MissingSetting {
        #[allow(unused)]
        setting: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Filesystem operation failed
    #[error("I/O error on {}: {message}", path.display())]
    #[diagnostic(
        code(msi::io_error),
        help("Verify the directory is writable by the current user")
    )]
    Io {
        #[allow(unused)]
        path: PathBuf,
        #[allow(unused)]
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(msi::serialization_error))]
    Serialization {
        #[allow(unused)]
        message: String,
    },
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    pub fn missing_setting(setting: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::MissingSetting {
            setting: setting.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
