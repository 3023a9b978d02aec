use crate::cadence::{Cadence, Step};
use crate::config::SamplerConfig;
use crate::error::SampleError;
use crate::suppress::{ErrorKind, Suppression};
use futures_util::stream::{self, Stream};
use std::future::Future;
use tracing::debug;

/// Async counterpart of [`crate::TimeoutSampler`] for probes that await I/O
///
/// Same deadline, interval and suppression rules; sleeps on the tokio timer.
/// Probe futures are awaited one at a time.
pub struct AsyncTimeoutSampler<F, E> {
    probe: F,
    config: SamplerConfig,
    suppression: Suppression<E>,
    cadence: Cadence,
    last_error: Option<E>,
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

impl<F, Fut, T, E> AsyncTimeoutSampler<F, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Start sampling now; the deadline is fixed at this point
    pub fn new(config: SamplerConfig, probe: F) -> Self {
        let cadence = Cadence::new(now(), &config);
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
            last_error: None,
        }
    }

    pub fn suppress(mut self, suppression: Suppression<E>) -> Self {
        self.suppression = suppression;
        self
    }

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

    pub fn calls(&self) -> u32 {
        self.cadence.calls()
    }

    async fn pause(&self, delay: std::time::Duration) {
        if delay.is_zero() {
            tokio::task::yield_now().await;
            return;
        }

        match &self.config.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }

    /// Run until the next probe value or the terminal error
    pub async fn next_sample(&mut self) -> Result<T, SampleError<E>> {
        loop {
            if self.config.is_cancelled() {
                return Err(SampleError::Cancelled {
                    label: self.config.label.clone(),
                    calls: self.cadence.calls(),
                });
            }

            match self.cadence.next_step(now()) {
                Step::Expired => {
                    return Err(SampleError::Timeout {
                        label: self.config.label.clone(),
                        timeout: self.config.wait_timeout,
                        calls: self.cadence.calls(),
                        last_error: self.last_error.take(),
                    });
                }
                Step::Wait(delay) => self.pause(delay).await,
                Step::Call => match (self.probe)().await {
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

    /// Await samples until `accept` returns true for one of them
    pub async fn wait_until(
        mut self,
        mut accept: impl FnMut(&T) -> bool,
    ) -> Result<T, SampleError<E>> {
        loop {
            let value = self.next_sample().await?;
            if accept(&value) {
                return Ok(value);
            }
        }
    }

    /// Turn the sampler into a stream that ends after its first `Err` item
    pub fn into_stream(self) -> impl Stream<Item = Result<T, SampleError<E>>> {
        stream::unfold(Some(self), |state| async move {
            let mut sampler: Self = match state {
                Some(sampler) => sampler,
                None => return None,
            };
            match sampler.next_sample().await {
                Ok(value) => Some((Ok(value), Some(sampler))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl<F, Fut, E> AsyncTimeoutSampler<F, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    /// Wait until the probe resolves to `true`
    pub async fn wait_for_true(self) -> Result<(), SampleError<E>> {
        self.wait_until(|ready| *ready).await.map(|_| ())
    }
}
