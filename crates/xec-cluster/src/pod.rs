//! Cluster-pod adapter (spec §4.6): interface only. Exec/raw/logs/copy
//! shell out to a kubectl-compatible CLI the same way the container
//! adapter shells out to docker/podman. Port-forwarding and log-follow are
//! explicit stubs: the spec marks this adapter's full implementation out
//! of scope, and owning a long-lived forwarded socket or a follow stream
//! is exactly the kind of internals that belongs to an external
//! collaborator, not this crate.

use std::any::Any;
use std::path::Path;

use async_trait::async_trait;
use indexmap::IndexMap;
use xec_adapter::{Adapter, FileTransfer, LogOptions, LogSource, OutputSink};
use xec_core::{Command, ClusterPodConfig, ExecResult, ProgramSource, ShellMode, TargetSelector, XecError};
use xec_process::LocalAdapter;

use crate::argv;

const DEFAULT_SHELL: &str = "/bin/sh";

/// A live port-forward. `is_open()` reflects whether the forwarding
/// process is still believed to be running; `close()` tears it down.
/// Unimplemented in this crate (spec §4.6): both are functional enough to
/// type-check against, but return values a caller must treat as
/// unsupported until a real implementation is wired in.
pub struct PortForwardHandle {
    pub local_port: u16,
    pub remote_port: u16,
}

impl PortForwardHandle {
    pub fn is_open(&self) -> bool {
        false
    }

    pub async fn close(&self) -> Result<(), XecError> {
        Err(XecError::AdapterUnavailable(
            "cluster-pod port forwarding is not implemented".to_string(),
        ))
    }
}

/// One named pod in an optional namespace (spec §4.6's `pod(name, namespace?)`).
pub struct PodHandle {
    name: String,
    namespace: Option<String>,
    config: ClusterPodConfig,
    local: LocalAdapter,
}

impl PodHandle {
    pub(crate) fn new(name: impl Into<String>, namespace: Option<String>, config: ClusterPodConfig) -> Self {
        Self {
            name: name.into(),
            namespace,
            config,
            local: LocalAdapter::new(),
        }
    }

    fn cli_command(&self, args: Vec<String>) -> Command {
        Command {
            program: ProgramSource::Argv {
                program: self.config.cli_binary.clone(),
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

    /// Run `command` inside the pod via a structured template (spec
    /// §4.6's `exec(template)`).
    pub async fn exec(&self, command: &Command) -> Result<ExecResult, XecError> {
        let args = argv::exec_args(&self.name, self.namespace.as_deref(), command, DEFAULT_SHELL);
        let result = self.local.execute(&self.cli_command(args)).await?;
        if !result.ok() && !command.suppress_throw {
            let code = result.exit_status.numeric_code().unwrap_or(1);
            return Err(XecError::CommandFailed(code));
        }
        Ok(result)
    }

    /// `raw(template)`: same as `exec`, but the caller supplies an
    /// already fully-rendered shell string with no further interpolation.
    pub async fn raw(&self, rendered_command: &str) -> Result<ExecResult, XecError> {
        let command = Command {
            program: ProgramSource::ShellString(rendered_command.to_string()),
            shell_mode: ShellMode::Auto,
            environment: IndexMap::new(),
            working_directory: None,
            timeout: None,
            stdin: None,
            suppress_throw: false,
            target: TargetSelector::Local,
            retry_policy: None,
        };
        self.exec(&command).await
    }

    pub async fn logs(&self, opts: &LogOptions) -> Result<Vec<u8>, XecError> {
        let args = argv::logs_args(&self.name, self.namespace.as_deref(), opts);
        let result = self.local.execute(&self.cli_command(args)).await?;
        Ok(result.stdout_bytes)
    }

    /// `streamLogs(sink, opts)`: forwards to the sink as output arrives
    /// rather than buffering to return at the end.
    pub async fn stream_logs(&self, sink: &dyn OutputSink, opts: &LogOptions) -> Result<(), XecError> {
        let args = argv::logs_args(&self.name, self.namespace.as_deref(), opts);
        self.local.execute_streaming(&self.cli_command(args), sink).await?;
        Ok(())
    }

    /// `follow(sink, opts)`: a continuous `streamLogs` with `follow: true`
    /// that a consumer drains until `stop()`. Out of scope here (spec
    /// §4.6): a real follow needs a cancellable background task the
    /// caller can `stop()`, which this synchronous helper can't express.
    pub async fn follow(&self, _sink: &dyn OutputSink, _opts: &LogOptions) -> Result<(), XecError> {
        Err(XecError::AdapterUnavailable(
            "cluster-pod log following is not implemented".to_string(),
        ))
    }

    pub async fn port_forward(&self, local_port: u16, remote_port: u16) -> Result<PortForwardHandle, XecError> {
        let _ = (local_port, remote_port);
        Err(XecError::AdapterUnavailable(
            "cluster-pod port forwarding is not implemented".to_string(),
        ))
    }

    pub async fn port_forward_dynamic(&self, remote_port: u16) -> Result<PortForwardHandle, XecError> {
        let _ = remote_port;
        Err(XecError::AdapterUnavailable(
            "cluster-pod dynamic port forwarding is not implemented".to_string(),
        ))
    }

    pub async fn copy_to(&self, local: &Path, dest: &str) -> Result<(), XecError> {
        let args = argv::copy_to_args(&local.to_string_lossy(), self.namespace.as_deref(), &self.name, dest);
        self.local.execute(&self.cli_command(args)).await.map(|_| ())
    }

    pub async fn copy_from(&self, src: &str, local: &Path) -> Result<(), XecError> {
        let args = argv::copy_from_args(self.namespace.as_deref(), &self.name, src, &local.to_string_lossy());
        self.local.execute(&self.cli_command(args)).await.map(|_| ())
    }
}

/// Backend for `TargetSelector::ClusterPod`: resolves pod handles and also
/// implements the three-verb `Adapter` contract directly so a plain
/// `Command` targeting a pod can be dispatched without going through
/// `pod()` first.
#[derive(Debug, Clone, Default)]
pub struct ClusterPodAdapter {
    local: LocalAdapter,
}

impl ClusterPodAdapter {
    pub fn new() -> Self {
        Self {
            local: LocalAdapter::new(),
        }
    }

    pub fn pod(&self, name: impl Into<String>, config: ClusterPodConfig) -> PodHandle {
        let namespace = config.namespace.clone();
        PodHandle::new(name, namespace, config)
    }

    fn config(command: &Command) -> Result<&ClusterPodConfig, XecError> {
        match &command.target {
            TargetSelector::ClusterPod(cfg) => Ok(cfg),
            _ => Err(XecError::Internal(
                "ClusterPodAdapter invoked with a non-cluster-pod target".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Adapter for ClusterPodAdapter {
    fn name(&self) -> &str {
        "cluster-pod"
    }

    async fn available(&self) -> bool {
        which::which("kubectl").is_ok()
    }

    async fn execute(&self, command: &Command) -> Result<ExecResult, XecError> {
        self.execute_streaming(command, &xec_adapter::NullSink).await
    }

    async fn execute_streaming(
        &self,
        command: &Command,
        sink: &dyn OutputSink,
    ) -> Result<ExecResult, XecError> {
        let config = Self::config(command)?.clone();
        let handle = self.pod(config.name.clone(), config);
        let args = argv::exec_args(&handle.name, handle.namespace.as_deref(), command, DEFAULT_SHELL);
        let exec_command = handle.cli_command(args);
        self.local.execute_streaming(&exec_command, sink).await
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
impl FileTransfer for ClusterPodAdapter {
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), XecError> {
        Err(XecError::Internal(format!(
            "use ClusterPodAdapter::pod(..).copy_to with an explicit target (attempted upload of {} to {remote})",
            local.display()
        )))
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), XecError> {
        Err(XecError::Internal(format!(
            "use ClusterPodAdapter::pod(..).copy_from with an explicit target (attempted download of {remote} to {})",
            local.display()
        )))
    }
}

#[async_trait]
impl LogSource for ClusterPodAdapter {
    async fn logs(&self, target: &str, opts: &LogOptions) -> Result<Vec<u8>, XecError> {
        let handle = self.pod(target, ClusterPodConfig {
            name: target.to_string(),
            namespace: None,
            cli_binary: "kubectl".to_string(),
        });
        handle.logs(opts).await
    }
}
