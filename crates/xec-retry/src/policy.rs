use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use xec_adapter::{Adapter, OutputSink};
use xec_core::{Command, ExecResult, RetryPolicy, XecError};

/// What the retry predicate and `on_retry` callback observe about an
/// attempt: either a Result (possibly non-zero, when `suppress_throw` is
/// set) or a propagated error.
#[derive(Debug)]
pub enum Observation<'a> {
    Result(&'a ExecResult),
    Error(&'a XecError),
}

type RetryablePredicate = dyn Fn(Observation<'_>) -> bool + Send + Sync;
type OnRetryCallback = dyn Fn(u32, Observation<'_>) + Send + Sync;

/// Bounded retries with exponential backoff and jitter around any adapter
/// call, plus cooperative cancellation and a per-attempt timeout budget
/// (spec §4.7).
pub struct RetryRuntime {
    policy: RetryPolicy,
    is_retryable: Arc<RetryablePredicate>,
    on_retry: Option<Arc<OnRetryCallback>>,
}

impl RetryRuntime {
    /// The default predicate: any non-zero exit code is retryable; any
    /// propagated error is retryable per [`XecError::default_retryable`].
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            is_retryable: Arc::new(|obs| match obs {
                Observation::Result(result) => !result.ok(),
                Observation::Error(err) => err.default_retryable(),
            }),
            on_retry: None,
        }
    }

    pub fn with_is_retryable(
        mut self,
        f: impl Fn(Observation<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_retryable = Arc::new(f);
        self
    }

    pub fn with_on_retry(
        mut self,
        f: impl Fn(u32, Observation<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.on_retry = Some(Arc::new(f));
        self
    }

    /// Total attempts = `1 + max_retries` (spec §4.7).
    pub fn total_attempts(&self) -> u32 {
        1 + self.policy.max_retries
    }

    /// The delay scheduled after a failed attempt `k` (1-indexed), before
    /// jitter: `min(max_delay, initial_delay * backoff_multiplier^(k-1))`.
    pub fn scheduled_delay(&self, attempt: u32) -> Duration {
        let exponent = (attempt.saturating_sub(1)) as i32;
        let scaled = self.policy.initial_delay.as_secs_f64()
            * self.policy.backoff_multiplier.powi(exponent);
        let mut delay = Duration::from_secs_f64(scaled.max(0.0));
        if let Some(cap) = self.policy.max_delay {
            delay = delay.min(cap);
        }
        delay
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.scheduled_delay(attempt);
        if !self.policy.jitter {
            return base;
        }
        let mut rng = rand::rng();
        let factor = rng.random_range(0.75..=1.25);
        Duration::from_secs_f64(base.as_secs_f64() * factor)
    }

    /// Run `command` against `adapter`, retrying on failure per policy,
    /// forwarding stdout/stderr to `sink`, and aborting on `cancel`.
    pub async fn run(
        &self,
        adapter: &dyn Adapter,
        command: &Command,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<ExecResult, XecError> {
        let total = self.total_attempts();
        let mut last_err: Option<XecError> = None;
        let mut last_ok: Option<ExecResult> = None;

        for attempt in 1..=total {
            if cancel.is_cancelled() {
                return Err(XecError::Cancelled);
            }

            debug!(attempt, total, "executing attempt");
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(XecError::Cancelled),
                result = adapter.execute_streaming(command, sink) => result,
            };

            let (_retryable, should_stop) = match &outcome {
                Ok(result) if result.ok() => (false, true),
                Ok(result) => {
                    let retryable = (self.is_retryable)(Observation::Result(result));
                    (retryable, !retryable || attempt == total)
                }
                Err(XecError::Cancelled) => (false, true),
                Err(err) => {
                    let retryable = (self.is_retryable)(Observation::Error(err));
                    (retryable, !retryable || attempt == total)
                }
            };

            match &outcome {
                Ok(result) => last_ok = Some(result.clone()),
                Err(err) => last_err = Some(err.clone()),
            }

            if should_stop {
                return outcome;
            }

            if let Some(cb) = &self.on_retry {
                match &outcome {
                    Ok(result) => cb(attempt, Observation::Result(result)),
                    Err(err) => cb(attempt, Observation::Error(err)),
                }
            }

            let delay = self.jittered_delay(attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(XecError::Cancelled),
            }
        }

        match (last_ok, last_err) {
            (Some(result), _) => Ok(result),
            (None, Some(err)) => Err(err),
            (None, None) => Err(XecError::Internal("retry loop produced no outcome".into())),
        }
    }
}

