use crate::cadence::{Cadence, Step};
use crate::clock::{Clock, SystemClock};
use crate::config::SamplerConfig;
use crate::error::SampleError;
use crate::suppress::{ErrorKind, Suppression};
use std::convert::Infallible;
use tracing::debug;

/// Blocking sampler over a probe
///
/// Iterating yields every probe result as `Ok`. The sequence ends with exactly
/// one `Err`: a timeout once the deadline has passed, a cancellation, or the
/// first probe error that is not suppressed. Suppressed errors are retried on
/// the next interval and are not yielded.
///
/// Probe calls happen in the calling thread, strictly one after another. A
/// probe that blocks past the deadline makes the wait overshoot it.
pub struct TimeoutSampler<F, E, C = SystemClock> {
    probe: F,
    config: SamplerConfig,
    suppression: Suppression<E>,
    cadence: Cadence,
    clock: C,
    last_error: Option<E>,
    finished: bool,
}

impl<F, T, E> TimeoutSampler<F, E, SystemClock>
where
    F: FnMut() -> Result<T, E>,
{
    /// Start sampling now; the deadline is fixed at this point
    pub fn new(config: SamplerConfig, probe: F) -> Self {
        Self::with_clock(config, probe, SystemClock)
    }
}

impl<T> TimeoutSampler<Box<dyn FnMut() -> Result<T, Infallible>>, Infallible, SystemClock> {
    /// Sample an infallible probe, such as a readiness predicate
    pub fn from_fn<G>(config: SamplerConfig, mut probe: G) -> Self
    where
        G: FnMut() -> T + 'static,
    {
        Self::new(config, Box::new(move || Ok(probe())))
    }
}

impl<F, T, E, C> TimeoutSampler<F, E, C>
where
    F: FnMut() -> Result<T, E>,
    C: Clock,
{
    pub fn with_clock(config: SamplerConfig, probe: F, clock: C) -> Self {
        let cadence = Cadence::new(clock.now(), &config);
        debug!(
            label = %config.label,
            timeout = ?config.wait_timeout,
            interval = ?config.interval,
            "Waiting for condition"
        );

        Self {
            probe,
            config,
            suppression: Suppression::none(),
            cadence,
            clock,
            last_error: None,
            finished: false,
        }
    }

    /// Retry instead of failing on probe errors matched by `suppression`
    pub fn suppress(mut self, suppression: Suppression<E>) -> Self {
        self.suppression = suppression;
        self
    }

    /// Retry instead of failing on probe errors for which `pred` is true
    pub fn suppress_if(self, pred: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.suppress(Suppression::when(pred))
    }

    /// Retry on probe errors whose kind is in `kinds`
    pub fn suppress_kinds(self, kinds: impl IntoIterator<Item = E::Kind>) -> Self
    where
        E: ErrorKind,
    {
        self.suppress(Suppression::kinds(kinds))
    }

    /// Number of probe calls made so far
    pub fn calls(&self) -> u32 {
        self.cadence.calls()
    }

    /// Run until the next probe value or the terminal error
    fn step(&mut self) -> Result<T, SampleError<E>> {
        loop {
            if self.config.is_cancelled() {
                return Err(SampleError::Cancelled {
                    label: self.config.label.clone(),
                    calls: self.cadence.calls(),
                });
            }

            match self.cadence.next_step(self.clock.now()) {
                Step::Expired => {
                    return Err(SampleError::Timeout {
                        label: self.config.label.clone(),
                        timeout: self.config.wait_timeout,
                        calls: self.cadence.calls(),
                        last_error: self.last_error.take(),
                    });
                }
                Step::Wait(delay) if delay.is_zero() => std::thread::yield_now(),
                Step::Wait(delay) => self.clock.sleep(delay),
                Step::Call => match (self.probe)() {
                    Ok(value) => return Ok(value),
                    Err(e) if self.suppression.matches(&e) => self.last_error = Some(e),
                    Err(e) => {
                        return Err(SampleError::Probe {
                            label: self.config.label.clone(),
                            source: e,
                        })
                    }
                },
            }
        }
    }

    /// Consume samples until `accept` returns true for one of them
    pub fn wait_until(mut self, mut accept: impl FnMut(&T) -> bool) -> Result<T, SampleError<E>> {
        loop {
            let value = self.step()?;
            if accept(&value) {
                return Ok(value);
            }
        }
    }
}

impl<F, E, C> TimeoutSampler<F, E, C>
where
    F: FnMut() -> Result<bool, E>,
    C: Clock,
{
    /// Wait until the probe returns `true`
    pub fn wait_for_true(self) -> Result<(), SampleError<E>> {
        self.wait_until(|ready| *ready).map(|_| ())
    }
}

impl<F, T, E, C> Iterator for TimeoutSampler<F, E, C>
where
    F: FnMut() -> Result<T, E>,
    C: Clock,
{
    type Item = Result<T, SampleError<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.step();
        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::suppress::ErrorKind;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        NotFound,
        Unauthorized,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("api error: {0:?}")]
    struct ApiError(Kind);

    impl ErrorKind for ApiError {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.0
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// Probe returning the scripted values in order and recording call times
    fn scripted<T: Clone>(
        clock: &ManualClock,
        script: Vec<Result<T, ApiError>>,
    ) -> (impl FnMut() -> Result<T, ApiError>, Rc<RefCell<Vec<Duration>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        let clock = clock.clone();
        let mut script = script.into_iter();
        let probe = move || {
            seen.borrow_mut().push(clock.elapsed());
            script.next().unwrap_or(Err(ApiError(Kind::Unauthorized)))
        };
        (probe, calls)
    }

    #[test]
    fn test_scenario_a_third_call_accepted() {
        let clock = ManualClock::new();
        let (probe, calls) = scripted(&clock, vec![Ok(false), Ok(false), Ok(true)]);

        let config = SamplerConfig::from_secs(30, 10).unwrap();
        let result = TimeoutSampler::with_clock(config, probe, clock.clone()).wait_for_true();

        assert!(result.is_ok());
        assert_eq!(*calls.borrow(), vec![secs(0), secs(10), secs(20)]);
        assert_eq!(clock.elapsed(), secs(20));
    }

    #[test]
    fn test_scenario_b_interval_longer_than_timeout() {
        let clock = ManualClock::new();
        let mut count = 0;
        let probe = || {
            count += 1;
            Ok::<_, ApiError>(false)
        };

        let config = SamplerConfig::from_secs(5, 10).unwrap();
        let err = TimeoutSampler::with_clock(config, probe, clock.clone())
            .wait_for_true()
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.calls(), Some(1));
        assert_eq!(count, 1);
        assert_eq!(clock.elapsed(), secs(5));
    }

    #[test]
    fn test_deadline_respected_with_probe_latency() {
        let clock = ManualClock::new();
        let probe_clock = clock.clone();
        let probe = move || {
            probe_clock.advance(Duration::from_millis(300));
            Ok::<_, ApiError>(false)
        };

        let config = SamplerConfig::from_secs(7, 2).unwrap();
        let err = TimeoutSampler::with_clock(config, probe, clock.clone())
            .wait_for_true()
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(clock.elapsed() >= secs(7));
        assert!(clock.elapsed() <= secs(7) + secs(2) + Duration::from_millis(300));
    }

    #[test]
    fn test_blocking_probe_overshoots_deadline() {
        let clock = ManualClock::new();
        let probe_clock = clock.clone();
        let probe = move || {
            probe_clock.advance(secs(60));
            Ok::<_, ApiError>(false)
        };

        let config = SamplerConfig::from_secs(10, 1).unwrap();
        let err = TimeoutSampler::with_clock(config, probe, clock.clone())
            .wait_for_true()
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.calls(), Some(1));
        assert_eq!(clock.elapsed(), secs(60));
    }

    #[test]
    fn test_suppressed_errors_are_retried() {
        let clock = ManualClock::new();
        let (probe, calls) = scripted(
            &clock,
            vec![
                Err(ApiError(Kind::NotFound)),
                Err(ApiError(Kind::NotFound)),
                Ok(true),
            ],
        );

        let config = SamplerConfig::from_secs(60, 5).unwrap();
        let result = TimeoutSampler::with_clock(config, probe, clock.clone())
            .suppress(Suppression::kinds([Kind::NotFound]))
            .wait_for_true();

        assert!(result.is_ok());
        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(clock.elapsed(), secs(10));
    }

    #[test]
    fn test_unsuppressed_error_propagates_immediately() {
        let clock = ManualClock::new();
        let (probe, calls) = scripted(
            &clock,
            vec![
                Err(ApiError(Kind::NotFound)),
                Err(ApiError(Kind::Unauthorized)),
                Ok(true),
            ],
        );

        let config = SamplerConfig::from_secs(3600, 5).unwrap();
        let err = TimeoutSampler::with_clock(config, probe, clock.clone())
            .suppress_if(|e: &ApiError| e.0 == Kind::NotFound)
            .wait_for_true()
            .unwrap_err();

        match err {
            SampleError::Probe { source, .. } => assert_eq!(source.0, Kind::Unauthorized),
            other => panic!("expected probe error, got {other:?}"),
        }
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(clock.elapsed(), secs(5));
    }

    #[test]
    fn test_timeout_carries_last_suppressed_error() {
        let clock = ManualClock::new();
        let probe = || Err::<bool, _>(ApiError(Kind::NotFound));

        let config = SamplerConfig::from_secs(10, 3).unwrap();
        let err = TimeoutSampler::with_clock(config, probe, clock)
            .suppress_kinds([Kind::NotFound])
            .wait_for_true()
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.calls(), Some(4));
        assert_eq!(err.probe_error().map(|e| e.0), Some(Kind::NotFound));
    }

    #[test]
    fn test_iterator_ends_after_timeout() {
        let clock = ManualClock::new();
        let config = SamplerConfig::from_secs(3, 1).unwrap();
        let sampler = TimeoutSampler::with_clock(config, || Ok::<_, ApiError>(7), clock);

        let items: Vec<_> = sampler.collect();
        assert_eq!(items.len(), 4);
        assert!(items[..3].iter().all(|i| matches!(i, Ok(7))));
        assert!(matches!(items[3], Err(SampleError::Timeout { calls: 3, .. })));
    }

    #[test]
    fn test_consumer_break_with_custom_predicate() {
        let clock = ManualClock::new();
        let mut versions = vec!["4.12.1", "4.12.1", "4.13.0"].into_iter();
        let probe = move || Ok::<_, ApiError>(versions.next().unwrap_or("4.13.0"));

        let config = SamplerConfig::from_secs(60, 10).unwrap();
        let mut sampler = TimeoutSampler::with_clock(config, probe, clock.clone());
        let mut found = None;
        for sample in sampler.by_ref() {
            let version = sample.unwrap();
            if version == "4.13.0" {
                found = Some(version);
                break;
            }
        }

        assert_eq!(found, Some("4.13.0"));
        assert_eq!(sampler.calls(), 3);
        assert_eq!(clock.elapsed(), secs(20));
    }

    #[test]
    fn test_delayed_first_call() {
        let clock = ManualClock::new();
        let (probe, calls) = scripted(&clock, vec![Ok(true)]);

        let config = SamplerConfig::from_secs(30, 10)
            .unwrap()
            .immediate_first_call(false);
        TimeoutSampler::with_clock(config, probe, clock)
            .wait_for_true()
            .unwrap();

        assert_eq!(*calls.borrow(), vec![secs(10)]);
    }

    #[test]
    fn test_zero_interval_terminates() {
        let clock = ManualClock::new();
        let probe_clock = clock.clone();
        let probe = move || {
            probe_clock.advance(Duration::from_millis(1));
            Ok::<_, ApiError>(false)
        };

        let config = SamplerConfig::new(Duration::from_millis(50))
            .unwrap()
            .interval(Duration::ZERO);
        let err = TimeoutSampler::with_clock(config, probe, clock)
            .wait_for_true()
            .unwrap_err();

        assert_eq!(err.calls(), Some(50));
    }

    #[test]
    fn test_cancellation() {
        let token = tokio_util::sync::CancellationToken::new();
        let clock = ManualClock::new();
        let cancel = token.clone();
        let mut count = 0;
        let probe = move || {
            count += 1;
            if count == 2 {
                cancel.cancel();
            }
            Ok::<_, ApiError>(false)
        };

        let config = SamplerConfig::from_secs(600, 1).unwrap().cancel_on(token);
        let err = TimeoutSampler::with_clock(config, probe, clock)
            .wait_for_true()
            .unwrap_err();

        assert!(matches!(err, SampleError::Cancelled { calls: 2, .. }));
    }

    #[test]
    fn test_from_fn_real_clock() {
        let mut ready_after = 2;
        let config = SamplerConfig::new(Duration::from_secs(5))
            .unwrap()
            .interval(Duration::from_millis(10));

        let result = TimeoutSampler::from_fn(config, move || {
            ready_after -= 1;
            ready_after <= 0
        })
        .wait_for_true();

        assert!(result.is_ok());
    }
}
