//! A scripted adapter for engine-level tests that need to exercise retry
//! and dispatch without a real SSH/container/cluster backend (spec §8
//! items 4-7). Mirrors `xec-retry`'s own `MockAdapter`, one level up: this
//! one gets registered into a [`crate::Engine`] under an arbitrary name and
//! exercised through the full `exec`/`ProcessHandle` path.

use async_trait::async_trait;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use xec_adapter::{Adapter, OutputSink};
use xec_core::{Command, ExecResult, XecError};

pub(crate) struct MockAdapter {
    name: String,
    responses: Mutex<Vec<Result<ExecResult, XecError>>>,
    call_count: AtomicUsize,
    disposed: AtomicUsize,
}

impl MockAdapter {
    pub(crate) fn new(name: impl Into<String>, responses: Vec<Result<ExecResult, XecError>>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
            disposed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn available(&self) -> bool {
        true
    }

    async fn execute(&self, _command: &Command) -> Result<ExecResult, XecError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("mock adapter lock poisoned");
        if responses.is_empty() {
            return Err(XecError::Internal("mock adapter exhausted".into()));
        }
        responses.remove(0)
    }

    async fn execute_streaming(
        &self,
        command: &Command,
        sink: &dyn OutputSink,
    ) -> Result<ExecResult, XecError> {
        let result = self.execute(command).await?;
        sink.on_stdout(&result.stdout_bytes).await;
        sink.on_stderr(&result.stderr_bytes).await;
        Ok(result)
    }

    async fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) fn ok_result(stdout: &str) -> ExecResult {
    use std::time::SystemTime;
    let now = SystemTime::now();
    ExecResult {
        stdout_bytes: stdout.as_bytes().to_vec(),
        stderr_bytes: Vec::new(),
        exit_status: xec_core::ExitStatus::Code(0),
        command_string: "mock".to_string(),
        started_at: now,
        ended_at: now,
        duration: std::time::Duration::ZERO,
        adapter_name: "mock".to_string(),
    }
}
