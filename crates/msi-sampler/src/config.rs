use crate::error::SamplerConfigError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest accepted `wait_timeout` (30 days)
pub const MAX_WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cadence and deadline of one wait
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub(crate) wait_timeout: Duration,
    pub(crate) interval: Duration,
    pub(crate) immediate_first_call: bool,
    pub(crate) label: String,
    pub(crate) cancel: Option<CancellationToken>,
}

impl SamplerConfig {
    /// Start a config with the mandatory timeout.
    ///
    /// Defaults: one second interval, first probe call made immediately.
    pub fn new(wait_timeout: Duration) -> Result<Self, SamplerConfigError> {
        if wait_timeout.is_zero() {
            return Err(SamplerConfigError::ZeroTimeout);
        }
        if wait_timeout > MAX_WAIT_TIMEOUT {
            return Err(SamplerConfigError::TimeoutTooLarge {
                timeout: wait_timeout,
                max: MAX_WAIT_TIMEOUT,
            });
        }

        Ok(Self {
            wait_timeout,
            interval: Duration::from_secs(1),
            immediate_first_call: true,
            label: "condition".to_string(),
            cancel: None,
        })
    }

    /// Shorthand for `new(wait).interval(interval)` in whole seconds
    pub fn from_secs(wait_timeout: u64, interval: u64) -> Result<Self, SamplerConfigError> {
        Ok(Self::new(Duration::from_secs(wait_timeout))?.interval(Duration::from_secs(interval)))
    }

    /// Delay between probe calls. Zero still yields between calls.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Whether the first probe call happens before the first delay
    pub fn immediate_first_call(mut self, immediate: bool) -> Self {
        self.immediate_first_call = immediate;
        self
    }

    /// Name of the awaited condition, used in errors and logs
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Stop sampling when `token` is cancelled. Does not move the deadline.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    pub fn get_label(&self) -> &str {
        &self.label
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(matches!(
            SamplerConfig::new(Duration::ZERO),
            Err(SamplerConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_huge_timeout_rejected() {
        assert!(matches!(
            SamplerConfig::new(MAX_WAIT_TIMEOUT + Duration::from_secs(1)),
            Err(SamplerConfigError::TimeoutTooLarge { .. })
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let config = SamplerConfig::from_secs(30, 10).unwrap();
        assert_eq!(config.wait_timeout(), Duration::from_secs(30));
        assert_eq!(config.get_interval(), Duration::from_secs(10));
        assert!(config.immediate_first_call);
        assert_eq!(config.get_label(), "condition");
        assert!(!config.is_cancelled());
    }

    #[test]
    fn test_zero_interval_allowed() {
        let config = SamplerConfig::from_secs(5, 0).unwrap();
        assert!(config.get_interval().is_zero());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancellationToken::new();
        let config = SamplerConfig::from_secs(5, 1).unwrap().cancel_on(token.clone());
        assert!(!config.is_cancelled());
        token.cancel();
        assert!(config.is_cancelled());
    }
}
