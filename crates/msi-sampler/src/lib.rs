//! msi-sampler - Timeout-bounded polling of eventually consistent state
//!
//! A sampler calls a probe repeatedly until the caller accepts a value, the
//! probe fails with an error that is not suppressed, or the deadline passes.
//! The sampler has no opinion on success: it only governs cadence and
//! deadline, and hands every probe result to the caller.
//!
//! ```no_run
//! use msi_sampler::{SamplerConfig, TimeoutSampler};
//! use std::time::Duration;
//!
//! # fn cluster_is_ready() -> bool { true }
//! let config = SamplerConfig::new(Duration::from_secs(600))?
//!     .interval(Duration::from_secs(10))
//!     .label("cluster ready");
//!
//! TimeoutSampler::from_fn(config, cluster_is_ready).wait_for_true()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cadence;
pub mod clock;
pub mod config;
pub mod error;
pub mod sampler;
pub mod stream;
pub mod suppress;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SamplerConfig, MAX_WAIT_TIMEOUT};
pub use error::{SampleError, SamplerConfigError};
pub use sampler::TimeoutSampler;
pub use stream::AsyncTimeoutSampler;
pub use suppress::{ErrorKind, Suppression};
