//! The data model shared by every adapter: `Command`, `ExecResult`, and the
//! target/connection/retry value types they're built from (spec §3).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// What to run and under what environment. Immutable once built; every
/// modifier on [`crate::CommandBuilder`] (exposed by `xec-engine`) returns a
/// new value rather than mutating this one in place.
#[derive(Debug, Clone)]
pub struct Command {
    pub program: ProgramSource,
    pub shell_mode: ShellMode,
    /// Caller overrides merged over ambient environment, caller wins.
    /// Insertion order is preserved and matters for the container adapter's
    /// `-e K=V` flag ordering (spec §6).
    pub environment: IndexMap<String, String>,
    pub working_directory: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub stdin: Option<StdinPayload>,
    pub suppress_throw: bool,
    pub target: TargetSelector,
    pub retry_policy: Option<RetryPolicy>,
}

/// Either a pre-rendered shell string (the common case, produced by the
/// interpolator) or an explicit argv with no shell involved.
#[derive(Debug, Clone)]
pub enum ProgramSource {
    /// A single string to hand to a shell, e.g. `"echo 'hello world'"`.
    ShellString(String),
    /// Program + argv, bypassing shell interpretation entirely.
    Argv {
        program: String,
        args: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub enum ShellMode {
    /// Invoke through `$SHELL` (falling back to `/bin/sh`).
    #[default]
    Auto,
    /// Invoke through the named shell executable.
    Explicit(String),
    /// No shell: `ProgramSource` must be `Argv`.
    Disabled,
}

/// Finite payload or streaming source piped to the child's stdin, or the
/// ambient terminal's own stdin for interactive sessions (spec §4.9
/// `interactive()`).
#[derive(Debug, Clone)]
pub enum StdinPayload {
    Bytes(Vec<u8>),
    Text(String),
    Inherit,
}

impl StdinPayload {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            StdinPayload::Bytes(b) => b,
            StdinPayload::Text(s) => s.into_bytes(),
            StdinPayload::Inherit => Vec::new(),
        }
    }
}

/// Names which adapter a command is destined for, and that adapter's config.
#[derive(Debug, Clone)]
pub enum TargetSelector {
    Local,
    Ssh(SshConnectionConfig),
    Container(ContainerTarget),
    ClusterPod(ClusterPodConfig),
    SshThenContainer(SshConnectionConfig, ContainerTarget),
}

impl Default for TargetSelector {
    fn default() -> Self {
        TargetSelector::Local
    }
}

/// SSH connection attributes (spec §3.3).
#[derive(Debug, Clone)]
pub struct SshConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credentials: SshCredentials,
    pub keepalive_interval: Duration,
    pub ready_timeout: Duration,
    pub sudo: Option<SudoConfig>,
    pub sftp_enabled: bool,
}

impl SshConnectionConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            credentials: SshCredentials::default(),
            keepalive_interval: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(10),
            sudo: None,
            sftp_enabled: true,
        }
    }

    /// The pool key of spec §3.4: `(host, port, username, credential_fingerprint)`.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            credential_fingerprint: self.credentials.fingerprint(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SshCredentials {
    pub password: Option<String>,
    pub private_key_material: Option<String>,
    pub passphrase: Option<String>,
}

impl SshCredentials {
    /// A stable hash of the key material or password; never surfaced outside
    /// the pool (spec §3.4).
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        if let Some(key) = &self.private_key_material {
            hasher.update(b"key:");
            hasher.update(key.as_bytes());
        }
        if let Some(pass) = &self.passphrase {
            hasher.update(b"passphrase:");
            hasher.update(pass.as_bytes());
        }
        if let Some(pw) = &self.password {
            hasher.update(b"password:");
            hasher.update(pw.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone)]
pub struct SudoConfig {
    pub password: Option<String>,
}

/// The pool key identity tuple (spec §3.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential_fingerprint: String,
}

/// A container reference: either an existing named container, or a spec to
/// create one ephemerally for the lifetime of a single handle (spec §3.5).
#[derive(Debug, Clone)]
pub enum ContainerTarget {
    Existing {
        name: String,
        cli: ContainerCliConfig,
        /// `-u <user>` on the exec invocation, when set (spec §4.5/§6).
        user: Option<String>,
        /// `-t` on the exec invocation (spec §4.5/§6).
        tty: bool,
    },
    Ephemeral {
        image: String,
        spec: EphemeralContainerSpec,
        cli: ContainerCliConfig,
    },
}

#[derive(Debug, Clone)]
pub struct ContainerCliConfig {
    /// Binary name discovered on `PATH` ("docker", "podman", ...).
    pub binary: String,
}

impl Default for ContainerCliConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EphemeralContainerSpec {
    pub name: Option<String>,
    pub command: Option<Vec<String>>,
    pub environment: IndexMap<String, String>,
    pub published_ports: Vec<(u16, u16)>,
    pub volume_bindings: Vec<(String, String)>,
    pub working_directory: Option<String>,
    pub user: Option<String>,
    pub tty: bool,
    pub privileged: bool,
    pub network: Option<String>,
    pub health_check: Option<HealthCheckSpec>,
    pub labels: IndexMap<String, String>,
    pub remove_on_exit: bool,
    pub name_prefix: String,
}

#[derive(Debug, Clone)]
pub struct HealthCheckSpec {
    pub cmd: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub retries: u32,
    pub start_period: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct ClusterPodConfig {
    pub name: String,
    pub namespace: Option<String>,
    pub cli_binary: String,
}

/// Retry policy (spec §4.7). `is_retryable`/`on_retry` are behavioral hooks
/// owned by `xec-retry`; this struct only carries the scheduling knobs.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Option<Duration>,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: None,
            jitter: true,
        }
    }
}

/// The terminal record produced by every adapter (spec §3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout_bytes: Vec<u8>,
    pub stderr_bytes: Vec<u8>,
    pub exit_status: ExitStatus,
    pub command_string: String,
    pub started_at: SystemTime,
    pub ended_at: SystemTime,
    pub duration: Duration,
    pub adapter_name: String,
}

impl ExecResult {
    pub fn ok(&self) -> bool {
        matches!(self.exit_status, ExitStatus::Code(0))
    }

    pub fn stdout(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout_bytes)
    }

    pub fn stderr(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr_bytes)
    }

    /// Trimmed stdout, used when a deferred handle is interpolated into
    /// another command (spec §4.1).
    pub fn stdout_trimmed(&self) -> String {
        self.stdout().trim_end_matches('\n').to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Code(i32),
    Signaled(#[serde(with = "signal_name")] SignalName),
    /// Timed out or cancelled before a status could be observed.
    None,
}

/// A `SIGTERM`/`SIGKILL`/... name, kept as a small owned string so we don't
/// need a signal-number table duplicated across adapters.
pub type SignalName = String;

mod signal_name {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(name: &String, s: S) -> Result<S::Ok, S::Error> {
        name.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        String::deserialize(d)
    }
}

impl ExitStatus {
    /// `128 + signal_number` per spec §6, or `None`/`Some(code)` otherwise.
    pub fn numeric_code(&self) -> Option<i32> {
        match self {
            ExitStatus::Code(c) => Some(*c),
            ExitStatus::Signaled(name) => Some(128 + signal_number(name)),
            ExitStatus::None => None,
        }
    }
}

fn signal_number(name: &str) -> i32 {
    match name {
        "SIGHUP" => 1,
        "SIGINT" => 2,
        "SIGQUIT" => 3,
        "SIGKILL" => 9,
        "SIGTERM" => 15,
        "SIGSEGV" => 11,
        "SIGABRT" => 6,
        _ => 0,
    }
}

#[cfg(unix)]
pub fn signal_name_from_number(n: i32) -> SignalName {
    match n {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        6 => "SIGABRT",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        15 => "SIGTERM",
        other => return format!("SIG{other}"),
    }
    .to_string()
}
