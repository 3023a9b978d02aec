use crate::config::SamplerConfig;
use std::time::{Duration, Instant};

/// What the sampler loop does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Call,
    /// Sleep, then ask again. Zero means yield only.
    Wait(Duration),
    Expired,
}

/// Deadline and call pacing shared by the blocking and async samplers
#[derive(Debug)]
pub(crate) struct Cadence {
    deadline: Instant,
    interval: Duration,
    wait_before_call: bool,
    calls: u32,
}

impl Cadence {
    /// Fix the deadline at `start + wait_timeout`; it never moves afterwards
    pub(crate) fn new(start: Instant, config: &SamplerConfig) -> Self {
        Self {
            // wait_timeout is bounded by MAX_WAIT_TIMEOUT
            deadline: start + config.wait_timeout,
            interval: config.interval,
            wait_before_call: !config.immediate_first_call,
            calls: 0,
        }
    }

    pub(crate) fn next_step(&mut self, now: Instant) -> Step {
        if now >= self.deadline {
            return Step::Expired;
        }

        if self.wait_before_call {
            self.wait_before_call = false;
            let remaining = self.deadline.saturating_duration_since(now);
            return Step::Wait(self.interval.min(remaining));
        }

        self.wait_before_call = true;
        self.calls = self.calls.saturating_add(1);
        Step::Call
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cadence(timeout: u64, interval: u64, immediate: bool) -> (Instant, Cadence) {
        let config = SamplerConfig::from_secs(timeout, interval)
            .unwrap()
            .immediate_first_call(immediate);
        let start = Instant::now();
        (start, Cadence::new(start, &config))
    }

    #[test]
    fn test_immediate_first_call() {
        let (start, mut c) = cadence(30, 10, true);
        assert_eq!(c.next_step(start), Step::Call);
        assert_eq!(c.next_step(start), Step::Wait(Duration::from_secs(10)));
        assert_eq!(c.next_step(start + Duration::from_secs(10)), Step::Call);
        assert_eq!(c.calls(), 2);
    }

    #[test]
    fn test_delayed_first_call() {
        let (start, mut c) = cadence(30, 10, false);
        assert_eq!(c.next_step(start), Step::Wait(Duration::from_secs(10)));
        assert_eq!(c.next_step(start + Duration::from_secs(10)), Step::Call);
    }

    #[test]
    fn test_wait_clamped_to_deadline() {
        let (start, mut c) = cadence(5, 10, true);
        assert_eq!(c.next_step(start), Step::Call);
        assert_eq!(c.next_step(start), Step::Wait(Duration::from_secs(5)));
        assert_eq!(c.next_step(start + Duration::from_secs(5)), Step::Expired);
    }

    #[test]
    fn test_expired_is_sticky() {
        let (start, mut c) = cadence(5, 1, true);
        let late = start + Duration::from_secs(6);
        assert_eq!(c.next_step(late), Step::Expired);
        assert_eq!(c.next_step(late), Step::Expired);
        assert_eq!(c.calls(), 0);
    }

    #[test]
    fn test_zero_interval_still_waits_between_calls() {
        let (start, mut c) = cadence(5, 0, true);
        assert_eq!(c.next_step(start), Step::Call);
        assert_eq!(c.next_step(start), Step::Wait(Duration::ZERO));
        assert_eq!(c.next_step(start), Step::Call);
    }

    #[test]
    fn test_call_count_saturates() {
        let (start, mut c) = cadence(5, 0, true);
        c.calls = u32::MAX - 1;
        assert_eq!(c.next_step(start), Step::Call);
        assert_eq!(c.next_step(start), Step::Wait(Duration::ZERO));
        assert_eq!(c.next_step(start), Step::Call);
        assert_eq!(c.calls(), u32::MAX);
    }
}
