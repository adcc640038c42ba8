//! The deferred, composable process handle (spec §4.9): `configurable →
//! dispatched → streaming → terminal`. Awaiting or streaming it triggers
//! dispatch; the result is memoized so every consumer -- however many await
//! it -- observes the identical `ExecResult` (spec §8 property 2).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use xec_adapter::OutputSink;
use xec_core::{ExecResult, ProgramSource, StdinPayload, XecError};
use xec_interp::{AwaitedStdout, Template};

use crate::command::CommandBuilder;
use crate::engine::Engine;
use crate::registry::default_key_for;

/// What a handle still needs to render/build before it can dispatch.
#[derive(Clone)]
pub(crate) enum HandleWork {
    Template { template: Template, raw: bool },
    Argv { program: String, args: Vec<String> },
}

/// A sink a caller attaches via [`ProcessHandle::pipe`] to receive stdout
/// chunks as they arrive (spec §4.9 "pipe(target)").
pub trait PipeSink: Send + Sync {
    fn on_chunk(&self, chunk: &[u8]);
}

/// A plain in-memory sink, handy for tests and simple capture use cases.
#[derive(Default)]
pub struct BufferSink {
    buffer: StdMutex<Vec<u8>>,
}

impl BufferSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().expect("buffer sink poisoned"))
    }
}

impl PipeSink for BufferSink {
    fn on_chunk(&self, chunk: &[u8]) {
        self.buffer.lock().expect("buffer sink poisoned").extend_from_slice(chunk);
    }
}

/// Mutable pre-dispatch state: everything a caller can still change while
/// the handle is `configurable`. Taken (replaced with `None`) the moment
/// dispatch begins, which is what makes post-dispatch configuration a
/// silent no-op rather than a footgun.
struct PreDispatch {
    builder: CommandBuilder,
    work: HandleWork,
    quiet: bool,
    interactive: bool,
    pipes: Vec<Arc<dyn PipeSink>>,
}

type HandleOutcome = Result<ExecResult, XecError>;

struct Shared {
    engine: Engine,
    pre: StdMutex<Option<PreDispatch>>,
    outcome: OnceCell<HandleOutcome>,
    cancel: CancellationToken,
    /// Pipes attached *after* dispatch started flush the captured output
    /// once the handle goes terminal (spec §4.9 "Attaching a pipe target
    /// after termination flushes captured stdout to the target").
    late_pipes: StdMutex<Vec<Arc<dyn PipeSink>>>,
    dispatch_started: AtomicBool,
}

/// The object a [`crate::Engine`]'s `exec`/`exec_raw`/`exec_argv` (and the
/// [`crate::Xec`] façade) return.
#[derive(Clone)]
pub struct ProcessHandle {
    shared: Arc<Shared>,
}

impl ProcessHandle {
    pub(crate) fn new(engine: Engine, builder: CommandBuilder, work: HandleWork) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                pre: StdMutex::new(Some(PreDispatch {
                    builder,
                    work,
                    quiet: false,
                    interactive: false,
                    pipes: Vec::new(),
                })),
                outcome: OnceCell::new(),
                cancel: CancellationToken::new(),
                late_pipes: StdMutex::new(Vec::new()),
                dispatch_started: AtomicBool::new(false),
            }),
        }
    }

    fn with_pre(&self, f: impl FnOnce(&mut PreDispatch)) {
        if let Some(pre) = self.shared.pre.lock().expect("handle pre-dispatch lock poisoned").as_mut() {
            f(pre);
        }
        // Locked: silently ignored, per spec §3.6 "further modifications fail".
    }

    pub fn timeout(self, duration: Duration) -> Self {
        self.with_pre(|pre| pre.builder.timeout = Some(duration));
        self
    }

    pub fn quiet(self) -> Self {
        self.with_pre(|pre| pre.quiet = true);
        self
    }

    pub fn nothrow(self) -> Self {
        self.with_pre(|pre| pre.builder.suppress_throw = true);
        self
    }

    /// Attach ambient stdin to the child (spec §4.9 "interactive()").
    /// TTY allocation is adapter-specific (the container adapter's `-t`
    /// flag comes from the ephemeral spec, not from here) and is left to
    /// the caller to configure on the target; this only wires stdin.
    pub fn interactive(self) -> Self {
        self.with_pre(|pre| {
            pre.interactive = true;
            pre.builder.stdin = Some(StdinPayload::Inherit);
        });
        self
    }

    pub fn cwd(self, path: impl Into<std::path::PathBuf>) -> Self {
        self.with_pre(|pre| pre.builder.working_directory = Some(path.into()));
        self
    }

    pub fn env(self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.with_pre(|pre| pre.builder.environment.extend(vars));
        self
    }

    pub fn shell(self, mode: xec_core::ShellMode) -> Self {
        self.with_pre(|pre| pre.builder.shell_mode = Some(mode));
        self
    }

    pub fn stdin(self, payload: StdinPayload) -> Self {
        self.with_pre(|pre| pre.builder.stdin = Some(payload));
        self
    }

    pub fn retry(self, policy: xec_core::RetryPolicy) -> Self {
        self.with_pre(|pre| pre.builder.retry_policy = Some(policy));
        self
    }

    /// Send stdout into `sink` once captured. Attaching before dispatch
    /// receives chunks live as the adapter streams them; attaching after
    /// termination flushes the already-captured bytes immediately (spec
    /// §4.9).
    pub fn pipe(self, sink: Arc<dyn PipeSink>) -> Self {
        let mut attached_live = false;
        self.with_pre(|pre| {
            pre.pipes.push(Arc::clone(&sink));
            attached_live = true;
        });
        if !attached_live {
            match self.shared.outcome.get() {
                Some(Ok(result)) => sink.on_chunk(&result.stdout_bytes),
                // Dispatch is in flight but not yet terminal: queue it so
                // `flush_late_pipes` (called right after `run` completes)
                // picks it up.
                _ => self
                    .shared
                    .late_pipes
                    .lock()
                    .expect("handle late-pipes lock poisoned")
                    .push(sink),
            }
        }
        self
    }

    /// No-op before dispatch; cancels the in-flight attempt afterwards
    /// (spec §3.6, §4.9 "kill(signal?)").
    pub fn kill(&self) {
        self.shared.cancel.cancel();
    }

    fn is_dispatched(&self) -> bool {
        self.shared.dispatch_started.load(Ordering::SeqCst)
    }

    /// Trigger dispatch if this is the first caller to do so; otherwise
    /// await the in-flight/terminal outcome. Memoized via `OnceCell`: every
    /// clone of this handle shares the same underlying cell (spec §8
    /// property 2, §4.9 "the result is memoized").
    async fn ensure_dispatched(&self) -> HandleOutcome {
        self.shared.dispatch_started.store(true, Ordering::SeqCst);
        let result = self
            .shared
            .outcome
            .get_or_init(|| async { self.run().await })
            .await
            .clone();
        self.flush_late_pipes();
        result
    }

    fn flush_late_pipes(&self) {
        let Some(Ok(result)) = self.shared.outcome.get() else {
            return;
        };
        let pending: Vec<_> = std::mem::take(
            &mut *self.shared.late_pipes.lock().expect("handle late-pipes lock poisoned"),
        );
        for sink in pending {
            sink.on_chunk(&result.stdout_bytes);
        }
    }

    async fn run(&self) -> HandleOutcome {
        let pre = self
            .shared
            .pre
            .lock()
            .expect("handle pre-dispatch lock poisoned")
            .take()
            .expect("dispatch invoked twice on the same handle");

        let program = match pre.work {
            HandleWork::Template { template, raw } => {
                let rendered = if raw {
                    template.render_raw().await?
                } else {
                    template.render().await?
                };
                ProgramSource::ShellString(rendered)
            }
            HandleWork::Argv { program, args } => ProgramSource::Argv { program, args },
        };

        let command = pre.builder.build(self.shared.engine.defaults(), program);
        let adapter_key = default_key_for(&command.target).to_string();
        let adapter = self.shared.engine.registry().resolve(&adapter_key)?;

        let sink = ForwardingSink {
            quiet: pre.quiet,
            pipes: pre.pipes,
        };

        let retry_policy = command.retry_policy.clone().unwrap_or_default();
        let runtime = xec_retry::RetryRuntime::new(retry_policy);
        runtime.run(adapter.as_ref(), &command, &sink, &self.shared.cancel).await
    }

    /// Block until terminal and return the full `ExecResult` (spec §4.9
    /// implied by `text()`/`json()`/`buffer()` all "imply await").
    pub async fn wait(&self) -> Result<ExecResult, XecError> {
        self.ensure_dispatched().await
    }

    pub async fn buffer(&self) -> Result<Vec<u8>, XecError> {
        self.wait().await.map(|r| r.stdout_bytes)
    }

    pub async fn text(&self) -> Result<String, XecError> {
        self.wait().await.map(|r| r.stdout().into_owned())
    }

    pub async fn lines(&self) -> Result<Vec<String>, XecError> {
        let text = self.text().await?;
        Ok(text.lines().map(str::to_string).collect())
    }

    pub async fn json(&self) -> Result<serde_json::Value, XecError> {
        let text = self.text().await?;
        serde_json::from_str(&text).map_err(|e| XecError::Internal(format!("invalid JSON output: {e}")))
    }

    /// Blocks until terminal; `None` when signaled, timed out, or
    /// cancelled (spec §4.9 "exit_code accessor").
    pub async fn exit_code(&self) -> Option<i32> {
        match self.wait().await {
            Ok(result) => result.exit_status.numeric_code(),
            Err(_) => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.is_dispatched()
    }
}

/// Wires whatever the adapter streams (spec §4.2 `execute_streaming`) to
/// the attached pipe targets, and optionally mirrors it to the process's
/// own stdout/stderr unless `quiet()` was set (spec §4.9 "quiet()
/// suppresses forwarding to ambient").
struct ForwardingSink {
    quiet: bool,
    pipes: Vec<Arc<dyn PipeSink>>,
}

#[async_trait]
impl OutputSink for ForwardingSink {
    async fn on_stdout(&self, chunk: &[u8]) {
        if !self.quiet {
            use std::io::Write;
            let _ = std::io::stdout().write_all(chunk);
        }
        for pipe in &self.pipes {
            pipe.on_chunk(chunk);
        }
    }

    async fn on_stderr(&self, chunk: &[u8]) {
        if !self.quiet {
            use std::io::Write;
            let _ = std::io::stderr().write_all(chunk);
        }
    }
}

/// Lets a `ProcessHandle` be interpolated into another template: forced to
/// completion, yielding trimmed stdout (spec §4.1, §9 "Deferred
/// interpolation").
#[async_trait]
impl AwaitedStdout for ProcessHandle {
    async fn await_stdout(&self) -> Result<String, XecError> {
        self.wait().await.map(|r| r.stdout_trimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use xec_interp::Template;

    #[tokio::test]
    async fn local_echo_returns_expected_stdout() {
        let engine = Engine::new();
        let template = Template::new(
            vec!["echo ".to_string(), "".to_string()],
            vec![xec_interp::Value::Str("hello world".to_string())],
        );
        let handle = engine.exec(template);
        let result = handle.wait().await.unwrap();
        assert_eq!(result.stdout(), "hello world\n");
        assert_eq!(result.adapter_name, "local");
        assert!(result.ok());
    }

    #[tokio::test]
    async fn awaiting_twice_returns_identical_result() {
        let engine = Engine::new();
        let handle = engine.exec(Template::literal("echo hi"));
        let a = handle.wait().await.unwrap();
        let b = handle.wait().await.unwrap();
        assert_eq!(a.stdout_bytes, b.stdout_bytes);
        assert_eq!(a.started_at, b.started_at);
    }

    #[tokio::test]
    async fn configuration_after_dispatch_is_a_silent_noop() {
        let engine = Engine::new();
        let handle = engine.exec(Template::literal("echo hi"));
        let _ = handle.wait().await.unwrap();
        // locked: this must not panic or change the already-memoized outcome
        let handle = handle.quiet().nothrow();
        let result = handle.wait().await.unwrap();
        assert_eq!(result.stdout(), "hi\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error_unless_nothrow() {
        let engine = Engine::new();
        let err = engine.exec(Template::literal("exit 3")).wait().await.unwrap_err();
        assert!(matches!(err, XecError::CommandFailed(3)));

        let engine = Engine::new();
        let result = engine
            .exec(Template::literal("exit 3"))
            .nothrow()
            .wait()
            .await
            .unwrap();
        assert_eq!(result.exit_status.numeric_code(), Some(3));
    }

    #[tokio::test]
    async fn deferred_handle_forces_completion_before_outer_render() {
        let engine = Engine::new();
        let inner = engine.exec(Template::literal("echo nested"));
        let inner_arc: Arc<dyn AwaitedStdout> = Arc::new(inner.clone());
        let outer_template = Template::new(
            vec!["echo ".to_string(), "".to_string()],
            vec![xec_interp::Value::Deferred(inner_arc)],
        );
        let outer = engine.exec(outer_template);
        let result = outer.wait().await.unwrap();
        assert_eq!(result.stdout(), "nested\n");
        assert!(inner.is_locked());
    }

    #[tokio::test]
    async fn pipe_sink_receives_captured_stdout() {
        let engine = Engine::new();
        let sink = BufferSink::new();
        let handle = engine.exec(Template::literal("echo piped")).pipe(sink.clone());
        handle.wait().await.unwrap();
        assert_eq!(String::from_utf8(sink.take()).unwrap(), "piped\n");
    }
}
