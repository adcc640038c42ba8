//! The SSH adapter (spec §4.4): wires the pool, exec path, and SFTP file
//! transfer together behind the [`Adapter`]/[`FileTransfer`] contract.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use xec_adapter::{Adapter, FileTransfer, OutputSink};
use xec_core::{Command, ExecResult, SshConnectionConfig, TargetSelector, XecError};

use crate::exec::{build_remote_command, finalize_result, run_exec};
use crate::pool::SshPool;
use crate::sftp;

/// Backend implementation of the three-verb execution contract for
/// `TargetSelector::Ssh`, plus the file-transfer capability (spec §4.2,
/// §4.4.5).
pub struct SshAdapter {
    pool: Arc<SshPool>,
}

impl SshAdapter {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(SshPool::default()),
        }
    }

    pub fn with_pool(pool: Arc<SshPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> Arc<SshPool> {
        Arc::clone(&self.pool)
    }

    fn ssh_config(command: &Command) -> Result<&SshConnectionConfig, XecError> {
        match &command.target {
            TargetSelector::Ssh(cfg) => Ok(cfg),
            _ => Err(XecError::Internal(
                "SshAdapter invoked with a non-SSH target".to_string(),
            )),
        }
    }
}

impl Default for SshAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for SshAdapter {
    fn name(&self) -> &str {
        "ssh"
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
        let ssh_config = Self::ssh_config(command)?;
        let connection = self.pool.acquire(ssh_config).await?;
        let command_string = build_remote_command(command, ssh_config);
        let stdin = command.stdin.clone().map(|p| p.into_bytes());
        let sudo_password = ssh_config.sudo.as_ref().and_then(|s| s.password.as_deref());
        let started_at = SystemTime::now();

        let outcome = run_exec(
            &connection,
            &command_string,
            stdin,
            sudo_password,
            sink,
            command.timeout,
        )
        .await;

        let outcome = match outcome {
            Ok(o) => o,
            Err(XecError::SshChannelFailed(msg)) => {
                self.pool.evict(&ssh_config.pool_key(), &connection).await;
                return Err(XecError::SshChannelFailed(msg));
            }
            Err(other) => return Err(other),
        };

        if outcome.sudo_password_required && ssh_config.sudo.as_ref().map(|s| s.password.is_none()).unwrap_or(false) {
            return Err(XecError::SudoNoPassword);
        }

        let result = finalize_result(outcome, command_string, started_at);

        if !result.ok() && !command.suppress_throw {
            let code = result.exit_status.numeric_code().unwrap_or(1);
            return Err(XecError::CommandFailed(code));
        }

        Ok(result)
    }

    async fn dispose(&self) {
        self.pool.dispose_all().await;
    }

    fn as_file_transfer(&self) -> Option<&dyn FileTransfer> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl FileTransfer for SshAdapter {
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), XecError> {
        // The adapter has no per-call SSH config here (the trait is
        // target-agnostic); callers go through `xec-engine`, which always
        // dispatches file-transfer verbs against a specific target config
        // it resolves itself. `SshAdapter::upload_to` is the concrete,
        // config-carrying entry point engine code actually calls.
        Err(XecError::Internal(format!(
            "use SshAdapter::upload_to with an explicit target (attempted upload of {} to {remote})",
            local.display()
        )))
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), XecError> {
        Err(XecError::Internal(format!(
            "use SshAdapter::download_from with an explicit target (attempted download of {remote} to {})",
            local.display()
        )))
    }
}

impl SshAdapter {
    /// Upload `local` to `remote` over the connection for `ssh_config`
    /// (spec §4.4.5). Fails with `SftpDisabled` when the target config has
    /// SFTP turned off.
    pub async fn upload_to(
        &self,
        ssh_config: &SshConnectionConfig,
        local: &Path,
        remote: &str,
    ) -> Result<(), XecError> {
        if !ssh_config.sftp_enabled {
            return Err(XecError::SftpDisabled);
        }
        let connection = self.pool.acquire(ssh_config).await?;
        sftp::upload(&connection, local, remote).await
    }

    /// Download `remote` to `local` over the connection for `ssh_config`.
    pub async fn download_from(
        &self,
        ssh_config: &SshConnectionConfig,
        remote: &str,
        local: &Path,
    ) -> Result<(), XecError> {
        if !ssh_config.sftp_enabled {
            return Err(XecError::SftpDisabled);
        }
        let connection = self.pool.acquire(ssh_config).await?;
        sftp::download(&connection, remote, local).await
    }
}
