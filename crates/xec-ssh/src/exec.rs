//! Per-exec path: prelude construction (env + cwd + sudo), channel open,
//! stdin/stdout/stderr streaming, exit-status capture (spec §4.4.2,
//! §4.4.4).

use std::time::{Duration, Instant, SystemTime};

use russh::ChannelMsg;
use tracing::debug;
use xec_adapter::OutputSink;
use xec_core::{Command, ExecResult, ExitStatus, ProgramSource, SshConnectionConfig, XecError};

use crate::connection::SshConnection;

const GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Build the final command string the remote shell receives: environment
/// prelude, then a working-directory prelude, then the user command, all
/// composed under one shell invocation (spec §4.4.2), then optionally
/// rewritten for sudo (spec §4.4.4).
pub(crate) fn build_remote_command(command: &Command, ssh: &SshConnectionConfig) -> String {
    let mut pieces = Vec::new();

    for (key, value) in &command.environment {
        pieces.push(format!("{key}={}", xec_interp::single_quote(value)));
    }

    let user_command = match &command.program {
        ProgramSource::ShellString(s) => s.clone(),
        ProgramSource::Argv { program, args } => {
            let mut parts = vec![xec_interp::single_quote(program)];
            parts.extend(args.iter().map(|a| xec_interp::single_quote(a)));
            parts.join(" ")
        }
    };

    let mut body = user_command;
    if let Some(dir) = &command.working_directory {
        body = format!("cd {} && {body}", xec_interp::single_quote(&dir.to_string_lossy()));
    }

    let env_prelude = pieces.join(" ");
    let with_env = if env_prelude.is_empty() {
        body
    } else {
        format!("{env_prelude} {body}")
    };

    apply_sudo(&with_env, ssh)
}

/// Rewrite the command for sudo (spec §4.4.4). With a password configured,
/// the password is fed on stdin to `sudo -S -p ''`; without one, `sudo -n`
/// is used and a password prompt surfaces as `SudoNoPassword` at exec time.
fn apply_sudo(command: &str, ssh: &SshConnectionConfig) -> String {
    match &ssh.sudo {
        None => command.to_string(),
        Some(sudo) if sudo.password.is_some() => {
            format!("sudo -S -p '' -- sh -c {}", xec_interp::single_quote(command))
        }
        Some(_) => format!("sudo -n -- sh -c {}", xec_interp::single_quote(command)),
    }
}

pub(crate) struct ExecOutcome {
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_status: ExitStatus,
    pub(crate) sudo_password_required: bool,
}

/// Run one exec over a fresh channel on `connection`, forwarding output to
/// `sink` as it arrives and honoring `timeout` (spec §4.4.2, §4.4.6).
/// `sudo_password`, when set, is written ahead of `stdin` as
/// `<password>\n` so it lands on the stdin `sudo -S -p ''` reads from
/// (spec §4.4.4) -- `apply_sudo` only rewrites the command string, it
/// never sees the channel.
pub(crate) async fn run_exec(
    connection: &SshConnection,
    command_string: &str,
    stdin: Option<Vec<u8>>,
    sudo_password: Option<&str>,
    sink: &dyn OutputSink,
    timeout: Option<Duration>,
) -> Result<ExecOutcome, XecError> {
    let mut channel = connection
        .open_channel()
        .await
        .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;

    channel
        .exec(true, command_string)
        .await
        .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;

    let mut input = Vec::new();
    if let Some(password) = sudo_password {
        input.extend_from_slice(password.as_bytes());
        input.push(b'\n');
    }
    if let Some(bytes) = stdin {
        input.extend_from_slice(&bytes);
    }
    if !input.is_empty() {
        channel
            .data(input.as_slice())
            .await
            .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;
    }
    channel
        .eof()
        .await
        .map_err(|e| XecError::SshChannelFailed(e.to_string()))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = ExitStatus::None;
    let mut sudo_password_required = false;
    let deadline = timeout.map(|d| Instant::now() + d);

    loop {
        let next_msg = match deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    debug!("ssh exec timed out, closing channel");
                    let _ = channel.close().await;
                    return Err(XecError::Timeout(timeout.unwrap_or(Duration::ZERO)));
                }
                match tokio::time::timeout(remaining, channel.wait()).await {
                    Ok(msg) => msg,
                    Err(_) => {
                        let _ = channel.close().await;
                        return Err(XecError::Timeout(timeout.unwrap_or(Duration::ZERO)));
                    }
                }
            }
            None => channel.wait().await,
        };

        let Some(msg) = next_msg else {
            break;
        };

        match msg {
            ChannelMsg::Data { data } => {
                stdout.extend_from_slice(&data);
                sink.on_stdout(&data).await;
            }
            ChannelMsg::ExtendedData { data, ext: 1 } => {
                if data.windows(14).any(|w| w == b"password for %") || data.ends_with(b"password: ") {
                    sudo_password_required = true;
                }
                stderr.extend_from_slice(&data);
                sink.on_stderr(&data).await;
            }
            ChannelMsg::ExtendedData { .. } => {}
            ChannelMsg::ExitStatus { exit_status: code } => {
                exit_status = ExitStatus::Code(code as i32);
            }
            ChannelMsg::ExitSignal { signal_name, .. } => {
                exit_status = ExitStatus::Signaled(format!("{signal_name:?}"));
            }
            ChannelMsg::Eof | ChannelMsg::Close => break,
            _ => {}
        }
    }

    Ok(ExecOutcome {
        stdout,
        stderr,
        exit_status,
        sudo_password_required,
    })
}

pub(crate) fn finalize_result(
    outcome: ExecOutcome,
    command_string: String,
    started_at: SystemTime,
) -> ExecResult {
    let ended_at = SystemTime::now();
    ExecResult {
        stdout_bytes: outcome.stdout,
        stderr_bytes: outcome.stderr,
        exit_status: outcome.exit_status,
        command_string,
        started_at,
        ended_at,
        duration: ended_at.duration_since(started_at).unwrap_or(Duration::ZERO),
        adapter_name: "ssh".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use xec_core::{ShellMode, SshCredentials, SudoConfig, TargetSelector};

    fn base_command(s: &str) -> Command {
        Command {
            program: ProgramSource::ShellString(s.to_string()),
            shell_mode: ShellMode::Auto,
            environment: IndexMap::new(),
            working_directory: None,
            timeout: None,
            stdin: None,
            suppress_throw: false,
            target: TargetSelector::Local,
            retry_policy: None,
        }
    }

    fn ssh_config() -> SshConnectionConfig {
        SshConnectionConfig::new("example.com", "root")
    }

    #[test]
    fn plain_command_has_no_prelude() {
        let cmd = base_command("echo hi");
        assert_eq!(build_remote_command(&cmd, &ssh_config()), "echo hi");
    }

    #[test]
    fn working_directory_becomes_cd_prelude() {
        let mut cmd = base_command("pwd");
        cmd.working_directory = Some("/var/app".into());
        let rendered = build_remote_command(&cmd, &ssh_config());
        assert_eq!(rendered, "cd '/var/app' && pwd");
    }

    #[test]
    fn environment_becomes_key_value_prelude() {
        let mut cmd = base_command("env");
        cmd.environment.insert("FOO".to_string(), "bar baz".to_string());
        let rendered = build_remote_command(&cmd, &ssh_config());
        assert_eq!(rendered, "FOO='bar baz' env");
    }

    #[test]
    fn sudo_with_password_feeds_stdin_via_dash_s() {
        let cmd = base_command("whoami");
        let mut ssh = ssh_config();
        ssh.sudo = Some(SudoConfig {
            password: Some("hunter2".to_string()),
        });
        let rendered = build_remote_command(&cmd, &ssh);
        assert!(rendered.starts_with("sudo -S -p ''"));
    }

    #[test]
    fn sudo_without_password_uses_dash_n() {
        let cmd = base_command("whoami");
        let mut ssh = ssh_config();
        ssh.sudo = Some(SudoConfig { password: None });
        let rendered = build_remote_command(&cmd, &ssh);
        assert!(rendered.starts_with("sudo -n"));
    }

    #[test]
    fn env_cwd_and_sudo_compose_in_order() {
        let mut cmd = base_command("whoami");
        cmd.working_directory = Some("/root".into());
        cmd.environment.insert("X".to_string(), "1".to_string());
        let mut ssh = ssh_config();
        ssh.sudo = Some(SudoConfig { password: None });
        ssh.credentials = SshCredentials::default();
        let rendered = build_remote_command(&cmd, &ssh);
        assert!(rendered.starts_with("sudo -n -- sh -c"));
        assert!(rendered.contains("X=1"));
        assert!(rendered.contains("cd '/root'"));
    }
}
