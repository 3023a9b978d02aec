// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a sample sequence ended without an accepted value
#[derive(Error, Debug)]
pub enum SampleError<E> {
    /// The deadline passed before the caller accepted a value
    #[error("Timed out after {timeout:?} waiting for {label} ({calls} probe calls)")]
    Timeout {
        label: String,
        timeout: Duration,
        calls: u32,
        /// Last suppressed probe error, kept for diagnostics
        last_error: Option<E>,
    },

    /// The probe failed with an error that is not suppressed
    #[error("Probe for {label} failed: {source}")]
    Probe {
        label: String,
        #[source]
        source: E,
    },

    /// The cancellation token fired
    #[error("Wait for {label} cancelled after {calls} probe calls")]
    Cancelled { label: String, calls: u32 },
}

impl<E> SampleError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Number of probe calls made before the sequence ended, when known
    pub fn calls(&self) -> Option<u32> {
        match self {
            Self::Timeout { calls, .. } | Self::Cancelled { calls, .. } => Some(*calls),
            Self::Probe { .. } => None,
        }
    }

    /// The error that ended (or last delayed) the wait, if the probe produced one
    pub fn probe_error(&self) -> Option<&E> {
        match self {
            Self::Timeout { last_error, .. } => last_error.as_ref(),
            Self::Probe { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }

    /// The probe error that ended the wait, dropping the sampler context
    pub fn into_probe_error(self) -> Option<E> {
        match self {
            Self::Probe { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl<E> Diagnostic for SampleError<E>
where
    E: std::error::Error + 'static,
{
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self {
            Self::Timeout { .. } => "msi::sampler::timeout_expired",
            Self::Probe { .. } => "msi::sampler::probe_failed",
            Self::Cancelled { .. } => "msi::sampler::cancelled",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self {
            Self::Timeout {
                last_error: Some(e),
                ..
            } => format!("Last suppressed probe error: {}", e),
            Self::Timeout { .. } => {
                "The condition never held. Inspect the resource state logged by the caller"
                    .to_string()
            }
            Self::Probe { .. } => {
                "Errors are only retried when their kind is suppressed on the sampler".to_string()
            }
            Self::Cancelled { .. } => return None,
        };
        Some(Box::new(help))
    }
}

/// Rejected sampler configuration
#[derive(Error, Debug, Diagnostic)]
pub enum SamplerConfigError {
    #[error("wait_timeout must be greater than zero")]
    #[diagnostic(
        code(msi::sampler::zero_timeout),
        help("A sampler without a deadline could wait forever. Pass a positive wait_timeout")
    )]
    ZeroTimeout,

    #[error("wait_timeout {timeout:?} exceeds the maximum of {max:?}")]
    #[diagnostic(code(msi::sampler::timeout_too_large))]
    TimeoutTooLarge {
        #[allow(unused)]
        timeout: Duration,
        #[allow(unused)]
        max: Duration,
    },
}
