use crate::shell::resolve_shell;
use async_trait::async_trait;
use std::any::Any;
use std::time::{Duration, Instant, SystemTime};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tracing::{debug, warn};
use xec_adapter::{Adapter, OutputSink};
use xec_core::{Command, ExecResult, ExitStatus, ProgramSource, ShellMode, StdinPayload as Stdin, XecError};

const READ_BUF_SIZE: usize = 4096;
const TERMINATION_GRACE: Duration = Duration::from_millis(500);

/// Spawns a child process on the local host for every `Command` whose
/// `target` is `TargetSelector::Local`.
#[derive(Debug, Clone, Default)]
pub struct LocalAdapter;

impl LocalAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Adapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn available(&self) -> bool {
        true
    }

    async fn execute(&self, command: &Command) -> Result<ExecResult, XecError> {
        self.execute_streaming(command, &xec_adapter::NullSink).await
    }

    async fn execute_streaming(
        &self,
        command: &Command,
        sink: &dyn OutputSink,
    ) -> Result<ExecResult, XecError> {
        let command_string = render_command_string(command);
        let mut tokio_cmd = build_tokio_command(command)?;

        tokio_cmd.stdout(std::process::Stdio::piped());
        tokio_cmd.stderr(std::process::Stdio::piped());
        tokio_cmd.stdin(match command.stdin {
            Some(Stdin::Inherit) => std::process::Stdio::inherit(),
            Some(_) => std::process::Stdio::piped(),
            None => std::process::Stdio::null(),
        });
        tokio_cmd.kill_on_drop(true);

        #[cfg(unix)]
        unsafe {
            tokio_cmd.pre_exec(|| {
                libc::setsid();
                Ok(())
            });
        }

        let started_at = SystemTime::now();
        debug!(command = %command_string, "spawning local process");
        let mut child = tokio_cmd
            .spawn()
            .map_err(|e| XecError::Internal(format!("failed to spawn: {e}")))?;

        if let Some(payload @ (Stdin::Bytes(_) | Stdin::Text(_))) = command.stdin.clone() {
            if let Some(mut stdin) = child.stdin.take() {
                let bytes = payload.into_bytes();
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(&bytes).await {
                        warn!("stdin write error: {e}");
                    }
                    let _ = stdin.shutdown().await;
                });
            }
        }

        let capture = capture_output(&mut child, sink, command.timeout).await?;
        let ended_at = SystemTime::now();

        if capture.timed_out && !command.suppress_throw {
            return Err(XecError::Timeout(
                command.timeout.unwrap_or(Duration::ZERO),
            ));
        }

        let exit_status = if capture.timed_out {
            ExitStatus::None
        } else {
            child_exit_status(&child, capture.status)
        };

        let result = ExecResult {
            stdout_bytes: capture.stdout,
            stderr_bytes: capture.stderr,
            exit_status,
            command_string,
            started_at,
            ended_at,
            duration: ended_at
                .duration_since(started_at)
                .unwrap_or(Duration::ZERO),
            adapter_name: "local".to_string(),
        };

        if !capture.timed_out && !result.ok() && !command.suppress_throw {
            let code = result.exit_status.numeric_code().unwrap_or(1);
            return Err(XecError::CommandFailed(code));
        }

        Ok(result)
    }

    async fn dispose(&self) {}

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn render_command_string(command: &Command) -> String {
    match &command.program {
        ProgramSource::ShellString(s) => s.clone(),
        ProgramSource::Argv { program, args } => {
            let mut parts = vec![program.clone()];
            parts.extend(args.iter().cloned());
            parts.join(" ")
        }
    }
}

fn build_tokio_command(command: &Command) -> Result<tokio::process::Command, XecError> {
    let mut cmd = match (&command.program, &command.shell_mode) {
        (ProgramSource::Argv { program, args }, _) => {
            let mut c = tokio::process::Command::new(program);
            c.args(args);
            c
        }
        (ProgramSource::ShellString(_), ShellMode::Disabled) => {
            return Err(XecError::Internal(
                "shell disabled but program is a shell string".to_string(),
            ));
        }
        (ProgramSource::ShellString(s), ShellMode::Explicit(path)) => {
            let mut c = tokio::process::Command::new(path);
            c.arg("-c").arg(s);
            c
        }
        (ProgramSource::ShellString(s), ShellMode::Auto) => {
            let shell = resolve_shell();
            let mut c = tokio::process::Command::new(shell);
            c.arg("-c").arg(s);
            c
        }
    };

    for (key, value) in &command.environment {
        cmd.env(key, value);
    }
    if let Some(dir) = &command.working_directory {
        cmd.current_dir(dir);
    }

    Ok(cmd)
}

struct CaptureOutcome {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    status: Option<std::process::ExitStatus>,
    timed_out: bool,
}

async fn capture_output(
    child: &mut Child,
    sink: &dyn OutputSink,
    timeout: Option<Duration>,
) -> Result<CaptureOutcome, XecError> {
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| XecError::Internal("missing stdout pipe".to_string()))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| XecError::Internal("missing stderr pipe".to_string()))?;

    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out_chunk = [0u8; READ_BUF_SIZE];
    let mut err_chunk = [0u8; READ_BUF_SIZE];
    let mut stdout_done = false;
    let mut stderr_done = false;
    let deadline = timeout.map(|d| Instant::now() + d);

    let status = loop {
        if stdout_done && stderr_done {
            break child.wait().await.ok();
        }

        let sleep = match deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    terminate_with_grace(child).await;
                    return Ok(CaptureOutcome {
                        stdout: out_buf,
                        stderr: err_buf,
                        status: None,
                        timed_out: true,
                    });
                }
                tokio::time::sleep(remaining)
            }
            None => tokio::time::sleep(Duration::from_secs(3600)),
        };
        tokio::pin!(sleep);

        tokio::select! {
            result = stdout.read(&mut out_chunk), if !stdout_done => {
                match result {
                    Ok(0) => stdout_done = true,
                    Ok(n) => {
                        out_buf.extend_from_slice(&out_chunk[..n]);
                        sink.on_stdout(&out_chunk[..n]).await;
                    }
                    Err(_) => stdout_done = true,
                }
            }
            result = stderr.read(&mut err_chunk), if !stderr_done => {
                match result {
                    Ok(0) => stderr_done = true,
                    Ok(n) => {
                        err_buf.extend_from_slice(&err_chunk[..n]);
                        sink.on_stderr(&err_chunk[..n]).await;
                    }
                    Err(_) => stderr_done = true,
                }
            }
            _ = &mut sleep => {
                if deadline.is_some() {
                    terminate_with_grace(child).await;
                    return Ok(CaptureOutcome {
                        stdout: out_buf,
                        stderr: err_buf,
                        status: None,
                        timed_out: true,
                    });
                }
            }
        }
    };

    Ok(CaptureOutcome {
        stdout: out_buf,
        stderr: err_buf,
        status,
        timed_out: false,
    })
}

/// Send a termination signal, wait up to 500ms, then escalate to a hard
/// kill (spec §4.3, §5 "Cancellation & timeout").
async fn terminate_with_grace(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGTERM);
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    let grace = tokio::time::sleep(TERMINATION_GRACE);
    tokio::pin!(grace);
    tokio::select! {
        _ = child.wait() => {}
        _ = &mut grace => {
            #[cfg(unix)]
            {
                if let Some(pid) = child.id() {
                    unsafe {
                        libc::kill(-(pid as i32), libc::SIGKILL);
                    }
                }
            }
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}

fn child_exit_status(_child: &Child, status: Option<std::process::ExitStatus>) -> ExitStatus {
    match status {
        None => ExitStatus::None,
        Some(status) => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(signal) = status.signal() {
                    return ExitStatus::Signaled(xec_core::signal_name_from_number(signal));
                }
            }
            ExitStatus::Code(status.code().unwrap_or(1))
        }
    }
}
