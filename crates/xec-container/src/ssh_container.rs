//! SSH-then-container adapter (spec §4.5.2): executes a container-CLI
//! command on a remote host by composing [`xec_ssh`]'s exec path with the
//! same argv builders the plain container adapter uses, so the two can
//! never disagree on container CLI invocation. Shares the SSH connection
//! pool with [`xec_ssh::SshAdapter`].

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use xec_adapter::{Adapter, OutputSink};
use xec_core::{
    Command, ContainerTarget, ExecResult, ProgramSource, ShellMode, SshConnectionConfig,
    TargetSelector, XecError,
};
use xec_ssh::SshAdapter;

use crate::argv;

const DEFAULT_SHELL: &str = "/bin/sh";

/// Backend for `TargetSelector::SshThenContainer`. Any error raised by the
/// SSH layer (connect/auth/channel) surfaces unchanged, already tagged by
/// its own variant; errors from the container CLI layer appear as a
/// non-zero exit captured in the `ExecResult` or as `CommandFailed`.
pub struct SshContainerAdapter {
    ssh: Arc<SshAdapter>,
}

impl SshContainerAdapter {
    pub fn new() -> Self {
        Self {
            ssh: Arc::new(SshAdapter::new()),
        }
    }

    pub fn with_ssh_adapter(ssh: Arc<SshAdapter>) -> Self {
        Self { ssh }
    }

    fn split_target(command: &Command) -> Result<(&SshConnectionConfig, &ContainerTarget), XecError> {
        match &command.target {
            TargetSelector::SshThenContainer(ssh_cfg, container) => Ok((ssh_cfg, container)),
            _ => Err(XecError::Internal(
                "SshContainerAdapter invoked with a non-ssh-container target".to_string(),
            )),
        }
    }

    fn remote_cli_command(
        ssh_cfg: &SshConnectionConfig,
        binary: &str,
        args: Vec<String>,
    ) -> Command {
        Command {
            program: ProgramSource::Argv {
                program: binary.to_string(),
                args,
            },
            shell_mode: ShellMode::Disabled,
            environment: IndexMap::new(),
            working_directory: None,
            timeout: None,
            stdin: None,
            suppress_throw: false,
            target: TargetSelector::Ssh(ssh_cfg.clone()),
            retry_policy: None,
        }
    }

    fn propagate_intent(mut remote_command: Command, original: &Command) -> Command {
        remote_command.suppress_throw = original.suppress_throw;
        remote_command.timeout = original.timeout;
        remote_command.stdin = original.stdin.clone();
        remote_command
    }
}

impl Default for SshContainerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for SshContainerAdapter {
    fn name(&self) -> &str {
        "ssh+container"
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
        let (ssh_cfg, target) = Self::split_target(command)?;

        let (name, cli, tty, user) = match target {
            ContainerTarget::Existing { name, cli, user, tty } => {
                (name.clone(), cli.clone(), *tty, user.clone())
            }
            ContainerTarget::Ephemeral { image, spec, cli } => {
                let create_name = spec
                    .name
                    .clone()
                    .unwrap_or_else(|| crate::ephemeral::generate_name(if spec.name_prefix.is_empty() {
                        "xec"
                    } else {
                        &spec.name_prefix
                    }));
                let run_args = argv::run_detached_args(&create_name, image, spec);
                let run_command = Self::remote_cli_command(ssh_cfg, &cli.binary, run_args);
                self.ssh.execute(&run_command).await?;
                (create_name, cli.clone(), spec.tty, spec.user.clone())
            }
        };

        let exec_args = argv::exec_args(&name, command, DEFAULT_SHELL, tty, user.as_deref());
        let exec_command = Self::remote_cli_command(ssh_cfg, &cli.binary, exec_args);
        let exec_command = Self::propagate_intent(exec_command, command);
        self.ssh.execute_streaming(&exec_command, sink).await
    }

    async fn dispose(&self) {
        self.ssh.dispose().await;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
