//! `EngineConfig`: the ambient defaults the engine loads before any
//! per-call `Engine::with`/`cd`/`env`/... override (SPEC_FULL.md §A).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xec_core::{RetryPolicy, ShellMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default = "default_container_binary")]
    pub container_binary: String,
    #[serde(default = "default_cluster_cli_binary")]
    pub cluster_cli_binary: String,
    #[serde(default = "default_adapter_name")]
    pub default_adapter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: IndexMap::new(),
            working_directory: None,
            timeout_secs: None,
            shell: ShellConfig::default(),
            retry: RetryConfig::default(),
            pool: PoolConfig::default(),
            container_binary: default_container_binary(),
            cluster_cli_binary: default_cluster_cli_binary(),
            default_adapter: default_adapter_name(),
        }
    }
}

fn default_container_binary() -> String {
    "docker".to_string()
}

fn default_cluster_cli_binary() -> String {
    "kubectl".to_string()
}

fn default_adapter_name() -> String {
    "local".to_string()
}

impl EngineConfig {
    /// Load from an explicit path. `Ok(None)` when the file doesn't exist,
    /// matching the teacher's `ProjectConfig::load` convention of treating
    /// "not configured" as a non-error.
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&text)?;
        Ok(Some(config))
    }

    /// Load from the platform's standard config location
    /// (`~/.config/xec/config.toml` on Linux), if present.
    pub fn load_default() -> anyhow::Result<Option<Self>> {
        match crate::paths::config_file_path() {
            Some(path) => Self::load(&path),
            None => Ok(None),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_retry_policy()
    }

    pub fn shell_mode(&self) -> ShellMode {
        self.shell.to_shell_mode()
    }
}

/// `ShellMode` as it appears in a config file (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShellConfig {
    Auto,
    Explicit { path: String },
    Disabled,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig::Auto
    }
}

impl ShellConfig {
    pub fn to_shell_mode(&self) -> ShellMode {
        match self {
            ShellConfig::Auto => ShellMode::Auto,
            ShellConfig::Explicit { path } => ShellMode::Explicit(path.clone()),
            ShellConfig::Disabled => ShellMode::Disabled,
        }
    }
}

/// Retry policy defaults (spec §4.7), as they appear in a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: default_initial_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: None,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: self.max_delay_ms.map(Duration::from_millis),
            jitter: self.jitter,
        }
    }
}

/// SSH connection-pool sizing defaults (spec §4.4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
}

fn default_max_connections() -> usize {
    10
}

fn default_idle_timeout_secs() -> u64 {
    5 * 60
}

fn default_keepalive_interval_secs() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout_secs(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }
}
