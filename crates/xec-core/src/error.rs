//! Error taxonomy shared by every adapter and wrapper layer.

use std::fmt;

/// The full error taxonomy of the execution engine (spec §7).
///
/// Adapters only construct the variants they can classify; everything else
/// propagates as-is through `anyhow::Error` at call sites that don't need to
/// match on a specific kind.
#[derive(thiserror::Error, Debug)]
pub enum XecError {
    #[error("bad interpolant: {0}")]
    BadInterpolant(String),

    #[error("raw interpolation used without opting into raw mode: {0}")]
    RawUnsafeUsage(String),

    #[error("command failed with exit code {0}")]
    CommandFailed(i32),

    #[error("command timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("execution cancelled")]
    Cancelled,

    #[error("failed to connect to {host}:{port}: {source}")]
    SshConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: anyhow::Error,
    },

    #[error("ssh authentication exhausted for {user}@{host}")]
    SshAuthFailed { host: String, user: String },

    #[error("ssh channel failed: {0}")]
    SshChannelFailed(String),

    #[error("sudo requires a password but none was configured")]
    SudoNoPassword,

    #[error("sftp is disabled on this adapter")]
    SftpDisabled,

    #[error("container CLI '{0}' not found on PATH")]
    ContainerCliUnavailable(String),

    #[error("container '{0}' not found")]
    ContainerNotFound(String),

    #[error("container '{0}' is not running")]
    ContainerNotRunning(String),

    #[error("container operation failed: {0}")]
    ContainerOperationFailed(String),

    #[error("adapter '{0}' is unavailable")]
    AdapterUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Clone for XecError {
    /// Lossy: `anyhow::Error` isn't `Clone`, so `SshConnectFailed` rebuilds
    /// its `source` from the original's `Display` text. Used to remember
    /// the "last error" across retry attempts and to memoize a
    /// `ProcessHandle`'s terminal result for repeat awaits.
    fn clone(&self) -> Self {
        match self {
            XecError::BadInterpolant(s) => XecError::BadInterpolant(s.clone()),
            XecError::RawUnsafeUsage(s) => XecError::RawUnsafeUsage(s.clone()),
            XecError::CommandFailed(c) => XecError::CommandFailed(*c),
            XecError::Timeout(d) => XecError::Timeout(*d),
            XecError::Cancelled => XecError::Cancelled,
            XecError::SshConnectFailed { host, port, source } => XecError::SshConnectFailed {
                host: host.clone(),
                port: *port,
                source: anyhow::anyhow!("{source}"),
            },
            XecError::SshAuthFailed { host, user } => XecError::SshAuthFailed {
                host: host.clone(),
                user: user.clone(),
            },
            XecError::SshChannelFailed(s) => XecError::SshChannelFailed(s.clone()),
            XecError::SudoNoPassword => XecError::SudoNoPassword,
            XecError::SftpDisabled => XecError::SftpDisabled,
            XecError::ContainerCliUnavailable(s) => XecError::ContainerCliUnavailable(s.clone()),
            XecError::ContainerNotFound(s) => XecError::ContainerNotFound(s.clone()),
            XecError::ContainerNotRunning(s) => XecError::ContainerNotRunning(s.clone()),
            XecError::ContainerOperationFailed(s) => XecError::ContainerOperationFailed(s.clone()),
            XecError::AdapterUnavailable(s) => XecError::AdapterUnavailable(s.clone()),
            XecError::Internal(s) => XecError::Internal(s.clone()),
        }
    }
}

impl XecError {
    /// Whether this error kind is, by default, worth retrying.
    ///
    /// This is only the *default* classifier consulted by
    /// [`crate::RetryPolicy::is_retryable`] when the caller hasn't supplied
    /// their own predicate; `Internal` is never retryable regardless.
    pub fn default_retryable(&self) -> bool {
        !matches!(
            self,
            XecError::BadInterpolant(_)
                | XecError::RawUnsafeUsage(_)
                | XecError::Internal(_)
                | XecError::Cancelled
        )
    }

    /// Best-effort mapping to the `CommandFailed(code)` exit-code variant.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            XecError::CommandFailed(code) => Some(*code),
            _ => None,
        }
    }
}

/// The terminal tag surfaced alongside a failure message (spec §7: "the
/// error message contains the final command string, the adapter name, the
/// exit code or signal, and the last 4 KB of stderr").
#[derive(Debug, Clone)]
pub struct FailureContext {
    pub command_string: String,
    pub adapter_name: String,
    pub exit_description: String,
    pub stderr_tail: String,
}

const STDERR_TAIL_BYTES: usize = 4 * 1024;

impl FailureContext {
    pub fn new(
        command_string: impl Into<String>,
        adapter_name: impl Into<String>,
        exit_description: impl Into<String>,
        stderr: &[u8],
    ) -> Self {
        let tail_start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
        let stderr_tail = String::from_utf8_lossy(&stderr[tail_start..]).into_owned();
        Self {
            command_string: command_string.into(),
            adapter_name: adapter_name.into(),
            exit_description: exit_description.into(),
            stderr_tail,
        }
    }
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] `{}` {} -- stderr: {}",
            self.adapter_name, self.command_string, self.exit_description, self.stderr_tail
        )
    }
}
