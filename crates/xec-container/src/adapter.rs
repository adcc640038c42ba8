//! The container adapter (spec §4.5): shells out to the external
//! container CLI (`docker`/`podman`) by composing [`xec_process::LocalAdapter`]
//! rather than duplicating process-spawn and signal-handling logic.

use std::any::Any;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::time::timeout;
use tracing::debug;
use xec_adapter::{Adapter, FileTransfer, LogOptions, LogSource, OutputSink};
use xec_core::{
    Command, ContainerCliConfig, ContainerTarget, EphemeralContainerSpec, ExecResult,
    ProgramSource, ShellMode, TargetSelector, XecError,
};
use xec_process::LocalAdapter;

use crate::argv;
use crate::ephemeral::generate_name;

const DEFAULT_SHELL: &str = "/bin/sh";
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn cli_command(cli: &ContainerCliConfig, args: Vec<String>) -> Command {
    Command {
        program: ProgramSource::Argv {
            program: cli.binary.clone(),
            args,
        },
        shell_mode: ShellMode::Disabled,
        environment: IndexMap::new(),
        working_directory: None,
        timeout: None,
        stdin: None,
        suppress_throw: false,
        target: TargetSelector::Local,
        retry_policy: None,
    }
}

/// Backend for `TargetSelector::Container`. Holds no state of its own: an
/// ephemeral container's lifetime is owned by the caller (usually a
/// `ProcessHandle` in `xec-engine`), which is responsible for calling
/// [`ContainerAdapter::remove`] once it is done.
#[derive(Debug, Clone, Default)]
pub struct ContainerAdapter {
    local: LocalAdapter,
}

impl ContainerAdapter {
    pub fn new() -> Self {
        Self {
            local: LocalAdapter::new(),
        }
    }

    fn target(command: &Command) -> Result<&ContainerTarget, XecError> {
        match &command.target {
            TargetSelector::Container(t) => Ok(t),
            _ => Err(XecError::Internal(
                "ContainerAdapter invoked with a non-container target".to_string(),
            )),
        }
    }

    pub async fn run_cli(&self, cli: &ContainerCliConfig, args: Vec<String>) -> Result<ExecResult, XecError> {
        self.local.execute(&cli_command(cli, args)).await
    }

    /// Creates the container for an `Ephemeral` target (`run -d`), waits
    /// for a configured health check if present, and returns the name the
    /// container was created under.
    async fn ensure_started(
        &self,
        cli: &ContainerCliConfig,
        image: &str,
        spec: &EphemeralContainerSpec,
    ) -> Result<String, XecError> {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| generate_name(if spec.name_prefix.is_empty() {
                "xec"
            } else {
                &spec.name_prefix
            }));
        let args = argv::run_detached_args(&name, image, spec);
        debug!(container = %name, image, "starting ephemeral container");
        self.run_cli(cli, args).await?;

        if let Some(health) = &spec.health_check {
            self.wait_healthy(cli, &name, health.timeout).await?;
        }
        Ok(name)
    }

    async fn wait_healthy(
        &self,
        cli: &ContainerCliConfig,
        name: &str,
        overall_timeout: Duration,
    ) -> Result<(), XecError> {
        let poll = async {
            loop {
                let result = self.run_cli(cli, argv::inspect_args(name)).await?;
                if let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(&result.stdout_bytes) {
                    let status = parsed
                        .get(0)
                        .and_then(|v| v.get("State"))
                        .and_then(|v| v.get("Health"))
                        .and_then(|v| v.get("Status"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    if status == "healthy" {
                        return Ok::<(), XecError>(());
                    }
                }
                tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
            }
        };
        timeout(overall_timeout, poll)
            .await
            .map_err(|_| XecError::Timeout(overall_timeout))?
    }

    pub async fn remove_named(&self, cli: &ContainerCliConfig, name: &str) -> Result<(), XecError> {
        self.run_cli(cli, argv::remove_args(name, true)).await.map(|_| ())
    }

    pub async fn stop_named(&self, cli: &ContainerCliConfig, name: &str) -> Result<(), XecError> {
        self.run_cli(cli, argv::stop_args(name)).await.map(|_| ())
    }

    pub async fn restart_named(&self, cli: &ContainerCliConfig, name: &str) -> Result<(), XecError> {
        self.run_cli(cli, argv::restart_args(name)).await.map(|_| ())
    }

    pub async fn list(&self, cli: &ContainerCliConfig, all: bool) -> Result<Vec<String>, XecError> {
        let result = self.run_cli(cli, argv::list_args(all)).await?;
        Ok(String::from_utf8_lossy(&result.stdout_bytes)
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub async fn inspect(&self, cli: &ContainerCliConfig, name: &str) -> Result<serde_json::Value, XecError> {
        let result = self.run_cli(cli, argv::inspect_args(name)).await?;
        serde_json::from_slice(&result.stdout_bytes)
            .map_err(|e| XecError::Internal(format!("parsing inspect output: {e}")))
    }

    pub async fn stats(&self, cli: &ContainerCliConfig, name: &str) -> Result<serde_json::Value, XecError> {
        let result = self.run_cli(cli, argv::stats_args(name)).await?;
        serde_json::from_slice(&result.stdout_bytes)
            .map_err(|e| XecError::Internal(format!("parsing stats output: {e}")))
    }

    /// Best-effort container IP lookup from the default bridge network,
    /// via `inspect`'s `NetworkSettings.IPAddress` field.
    pub async fn ip_address(&self, cli: &ContainerCliConfig, name: &str) -> Result<Option<String>, XecError> {
        let parsed = self.inspect(cli, name).await?;
        Ok(parsed
            .get(0)
            .and_then(|v| v.get("NetworkSettings"))
            .and_then(|v| v.get("IPAddress"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }
}

#[async_trait]
impl Adapter for ContainerAdapter {
    fn name(&self) -> &str {
        "container"
    }

    async fn available(&self) -> bool {
        which::which("docker").is_ok() || which::which("podman").is_ok()
    }

    async fn execute(&self, command: &Command) -> Result<ExecResult, XecError> {
        self.execute_streaming(command, &xec_adapter::NullSink).await
    }

    async fn execute_streaming(
        &self,
        command: &Command,
        sink: &dyn OutputSink,
    ) -> Result<ExecResult, XecError> {
        let target = Self::target(command)?.clone();
        let (name, cli, tty, user) = match &target {
            ContainerTarget::Existing { name, cli, user, tty } => {
                (name.clone(), cli.clone(), *tty, user.clone())
            }
            ContainerTarget::Ephemeral { image, spec, cli } => {
                let name = self.ensure_started(cli, image, spec).await?;
                (name, cli.clone(), spec.tty, spec.user.clone())
            }
        };

        let args = argv::exec_args(&name, command, DEFAULT_SHELL, tty, user.as_deref());
        let exec_command = cli_command(&cli, args);
        let result = self.local.execute_streaming(&exec_command, sink).await;

        if let ContainerTarget::Ephemeral { spec, .. } = &target {
            if spec.remove_on_exit {
                let _ = self.remove_named(&cli, &name).await;
            }
        }

        let result = result?;
        if !result.ok() && !command.suppress_throw {
            let code = result.exit_status.numeric_code().unwrap_or(1);
            return Err(XecError::CommandFailed(code));
        }
        Ok(result)
    }

    async fn dispose(&self) {}

    fn as_file_transfer(&self) -> Option<&dyn FileTransfer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl FileTransfer for ContainerAdapter {
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), XecError> {
        Err(XecError::Internal(format!(
            "use ContainerAdapter::upload_to with an explicit target (attempted upload of {} to {remote})",
            local.display()
        )))
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), XecError> {
        Err(XecError::Internal(format!(
            "use ContainerAdapter::download_from with an explicit target (attempted download of {remote} to {})",
            local.display()
        )))
    }
}

impl ContainerAdapter {
    pub async fn upload_to(
        &self,
        cli: &ContainerCliConfig,
        name: &str,
        local: &Path,
        remote: &str,
    ) -> Result<(), XecError> {
        self.run_cli(cli, argv::copy_to_args(&local.to_string_lossy(), name, remote))
            .await
            .map(|_| ())
    }

    pub async fn download_from(
        &self,
        cli: &ContainerCliConfig,
        name: &str,
        remote: &str,
        local: &Path,
    ) -> Result<(), XecError> {
        self.run_cli(cli, argv::copy_from_args(name, remote, &local.to_string_lossy()))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl LogSource for ContainerAdapter {
    async fn logs(&self, target: &str, opts: &LogOptions) -> Result<Vec<u8>, XecError> {
        let cli = ContainerCliConfig::default();
        let result = self.run_cli(&cli, argv::logs_args(target, opts)).await?;
        Ok(result.stdout_bytes)
    }
}
