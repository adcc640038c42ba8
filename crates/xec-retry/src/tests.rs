use crate::{Observation, RetryRuntime};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use xec_adapter::{Adapter, NullSink};
use xec_core::{Command, ExecResult, ExitStatus, ProgramSource, RetryPolicy, ShellMode, TargetSelector, XecError};

fn noop_command() -> Command {
    Command {
        program: ProgramSource::ShellString("true".to_string()),
        shell_mode: ShellMode::Auto,
        environment: indexmap::IndexMap::new(),
        working_directory: None,
        timeout: None,
        stdin: None,
        suppress_throw: false,
        target: TargetSelector::Local,
        retry_policy: None,
    }
}

fn result_with(exit: i32, stdout: &str, stderr: &str) -> ExecResult {
    let now = SystemTime::now();
    ExecResult {
        stdout_bytes: stdout.as_bytes().to_vec(),
        stderr_bytes: stderr.as_bytes().to_vec(),
        exit_status: ExitStatus::Code(exit),
        command_string: "mock".to_string(),
        started_at: now,
        ended_at: now,
        duration: Duration::ZERO,
        adapter_name: "mock".to_string(),
    }
}

/// A scripted adapter: each call to `execute` pops the next pre-programmed
/// outcome, used for the retry-wrapper property tests (spec §8 items 4-5,
/// E2E-2) that don't require a real SSH/container daemon.
struct MockAdapter {
    responses: Mutex<Vec<Result<ExecResult, XecError>>>,
    call_count: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
}

impl MockAdapter {
    fn new(responses: Vec<Result<ExecResult, XecError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }
    async fn available(&self) -> bool {
        true
    }
    async fn execute(&self, _command: &Command) -> Result<ExecResult, XecError> {
        self.call_times.lock().unwrap().push(Instant::now());
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(XecError::Internal("mock adapter exhausted".into()));
        }
        responses.remove(0)
    }
    async fn dispose(&self) {}
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// E2E-2: two transient failures then success.
#[tokio::test]
async fn retry_recovers_after_transient_failures() {
    let adapter = MockAdapter::new(vec![
        Err(XecError::ContainerOperationFailed(
            "Service temporarily unavailable".into(),
        )),
        Err(XecError::ContainerOperationFailed(
            "Service temporarily unavailable".into(),
        )),
        Ok(result_with(0, "Service is up!", "")),
    ]);
    let policy = RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        max_delay: None,
        jitter: false,
    };
    let runtime = RetryRuntime::new(policy).with_is_retryable(|obs| match obs {
        Observation::Error(XecError::ContainerOperationFailed(msg)) => {
            msg.contains("temporarily unavailable")
        }
        _ => false,
    });

    let cancel = CancellationToken::new();
    let result = runtime
        .run(&adapter, &noop_command(), &NullSink, &cancel)
        .await
        .unwrap();

    assert_eq!(adapter.calls(), 3);
    assert_eq!(result.stdout(), "Service is up!");
    assert!(result.ok());
}

/// §8 property 4: retry exhaustion makes exactly `max_retries + 1` attempts
/// and returns the last failure.
#[tokio::test]
async fn retry_exhaustion_returns_last_failure_after_exact_attempt_count() {
    let responses: Vec<_> = (0..4)
        .map(|_| Err(XecError::ContainerOperationFailed("down".into())))
        .collect();
    let adapter = MockAdapter::new(responses);
    let policy = RetryPolicy {
        max_retries: 3,
        initial_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
        max_delay: None,
        jitter: false,
    };
    let runtime = RetryRuntime::new(policy).with_is_retryable(|_| true);

    let cancel = CancellationToken::new();
    let err = runtime
        .run(&adapter, &noop_command(), &NullSink, &cancel)
        .await
        .unwrap_err();

    assert_eq!(adapter.calls(), 4);
    assert!(matches!(err, XecError::ContainerOperationFailed(_)));
}

/// §8 property 5: the gap between attempts tracks
/// `initial_delay * backoff_multiplier^(k-1)` within 10% (jitter off).
#[tokio::test]
async fn retry_timing_follows_exponential_backoff_without_jitter() {
    let responses: Vec<_> = (0..3)
        .map(|_| Err(XecError::ContainerOperationFailed("down".into())))
        .collect();
    let adapter = MockAdapter::new(responses);
    let initial = Duration::from_millis(40);
    let policy = RetryPolicy {
        max_retries: 2,
        initial_delay: initial,
        backoff_multiplier: 2.0,
        max_delay: None,
        jitter: false,
    };
    let runtime = RetryRuntime::new(policy).with_is_retryable(|_| true);
    let cancel = CancellationToken::new();
    let _ = runtime
        .run(&adapter, &noop_command(), &NullSink, &cancel)
        .await;

    let times = adapter.call_times.lock().unwrap().clone();
    assert_eq!(times.len(), 3);
    let gap_1 = times[1].duration_since(times[0]);
    let gap_2 = times[2].duration_since(times[1]);

    let expect_1 = initial.as_secs_f64();
    let expect_2 = initial.as_secs_f64() * 2.0;
    assert!((gap_1.as_secs_f64() - expect_1).abs() / expect_1 < 0.5);
    assert!((gap_2.as_secs_f64() - expect_2).abs() / expect_2 < 0.5);
}

/// Cancellation aborts further attempts and surfaces `Cancelled`.
#[tokio::test]
async fn cancellation_stops_further_attempts() {
    let responses: Vec<_> = (0..5)
        .map(|_| Err(XecError::ContainerOperationFailed("down".into())))
        .collect();
    let adapter = MockAdapter::new(responses);
    let policy = RetryPolicy {
        max_retries: 10,
        initial_delay: Duration::from_millis(50),
        backoff_multiplier: 1.0,
        max_delay: None,
        jitter: false,
    };
    let runtime = RetryRuntime::new(policy).with_is_retryable(|_| true);
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(75)).await;
        cancel_clone.cancel();
    });

    let err = runtime
        .run(&adapter, &noop_command(), &NullSink, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, XecError::Cancelled));
    assert!(adapter.calls() < 5);
}

/// `suppress_throw` composes with retry: a non-zero `ExecResult` is still
/// classified via the default predicate (any non-zero exit is retryable).
#[tokio::test]
async fn default_predicate_retries_nonzero_results() {
    let adapter = MockAdapter::new(vec![
        Ok(result_with(1, "", "not ready")),
        Ok(result_with(0, "ready", "")),
    ]);
    let policy = RetryPolicy {
        max_retries: 1,
        initial_delay: Duration::from_millis(1),
        backoff_multiplier: 1.0,
        max_delay: None,
        jitter: false,
    };
    let runtime = RetryRuntime::new(policy);
    let cancel = CancellationToken::new();
    let result = runtime
        .run(&adapter, &noop_command(), &NullSink, &cancel)
        .await
        .unwrap();
    assert_eq!(adapter.calls(), 2);
    assert!(result.ok());
}
