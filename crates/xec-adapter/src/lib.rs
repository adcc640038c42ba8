//! The adapter contract every backend satisfies (spec §4.2): three required
//! verbs plus optional, dynamically-discoverable capability sub-traits for
//! file transfer and log streaming.

use async_trait::async_trait;
use std::any::Any;
use xec_core::{Command, ExecResult, XecError};

/// A backend implementation of the three-verb execution contract.
///
/// Adapters are polymorphic without inheritance: `Adapter` is a capability
/// set, and backend-specific verbs (file transfer, logs) are discovered via
/// [`Adapter::as_file_transfer`] / [`Adapter::as_log_source`] rather than a
/// deep trait hierarchy (spec §9 "Polymorphism without inheritance").
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Stable name surfaced on every `ExecResult` (e.g. `"local"`, `"ssh"`).
    fn name(&self) -> &str;

    /// Best-effort probe that the backend is reachable: executable on
    /// `PATH`, daemon responsive, host reachable.
    async fn available(&self) -> bool;

    /// Run a command to completion.
    async fn execute(&self, command: &Command) -> Result<ExecResult, XecError>;

    /// Release pooled resources. Idempotent.
    async fn dispose(&self);

    /// Run a command to completion, forwarding stdout/stderr chunks to
    /// `sink` as they arrive (spec §4.3, §4.9 process-handle streaming).
    ///
    /// The default implementation has no real streaming: it runs
    /// [`Adapter::execute`] to completion and then flushes the full
    /// captured buffers to `sink` in one shot. This still satisfies the
    /// contract that "stream consumers attached after termination receive
    /// the full captured output" -- it just never forwards incrementally.
    /// Adapters that can stream (local, SSH) override this.
    async fn execute_streaming(
        &self,
        command: &Command,
        sink: &dyn OutputSink,
    ) -> Result<ExecResult, XecError> {
        let result = self.execute(command).await?;
        if !result.stdout_bytes.is_empty() {
            sink.on_stdout(&result.stdout_bytes).await;
        }
        if !result.stderr_bytes.is_empty() {
            sink.on_stderr(&result.stderr_bytes).await;
        }
        Ok(result)
    }

    /// Capability check: file upload/download, when the backend supports it.
    fn as_file_transfer(&self) -> Option<&dyn FileTransfer> {
        None
    }

    /// Capability check: log retrieval, when the backend supports it.
    fn as_log_source(&self) -> Option<&dyn LogSource> {
        None
    }

    /// Escape hatch for adapter-specific downcasting (e.g. the container
    /// adapter's lifecycle extras: stop/restart/inspect/stats).
    fn as_any(&self) -> &dyn Any;
}

/// File-transfer capability, exposed by the SSH and container adapters
/// (spec §4.4.5, §4.5 "File copy").
#[async_trait]
pub trait FileTransfer: Send + Sync {
    async fn upload(&self, local: &std::path::Path, remote: &str) -> Result<(), XecError>;
    async fn download(&self, remote: &str, local: &std::path::Path) -> Result<(), XecError>;
}

/// Log retrieval/streaming capability (spec §4.5 "Logs / streamLogs /
/// follow").
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub tail: Option<usize>,
    pub since: Option<std::time::SystemTime>,
    pub timestamps: bool,
    pub follow: bool,
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn logs(&self, target: &str, opts: &LogOptions) -> Result<Vec<u8>, XecError>;
}

/// A sink that a [`Adapter::execute_streaming`] caller attaches to observe
/// stdout/stderr incrementally rather than only at termination.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn on_stdout(&self, chunk: &[u8]);
    async fn on_stderr(&self, chunk: &[u8]);
}

/// A sink that discards everything; used when a caller only wants the
/// final `ExecResult` and has no interest in incremental output.
pub struct NullSink;

#[async_trait]
impl OutputSink for NullSink {
    async fn on_stdout(&self, _chunk: &[u8]) {}
    async fn on_stderr(&self, _chunk: &[u8]) {}
}
