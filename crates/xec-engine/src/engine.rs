//! The execution engine (spec §4.8): adapter registry, default
//! configuration, and the chainable configuration verbs that each return a
//! *new* engine with merged configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use xec_adapter::Adapter;
use xec_config::EngineConfig;
use xec_core::{
    ClusterPodConfig, ContainerTarget, RetryPolicy, ShellMode, SshConnectionConfig, TargetSelector,
};
use xec_interp::Template;

use crate::command::{CommandBuilder, EngineDefaults};
use crate::handle::{HandleWork, ProcessHandle};
use crate::registry::AdapterRegistry;

/// Holds the adapter registry and default configuration; every
/// configuration verb returns a new `Engine` rather than mutating this one
/// (spec §4.8, mirroring `Command`'s own immutability).
#[derive(Clone)]
pub struct Engine {
    registry: AdapterRegistry,
    defaults: EngineDefaults,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A fresh engine with the real local/SSH/container/cluster-pod
    /// adapters registered and no configuration pinned.
    pub fn new() -> Self {
        Self {
            registry: AdapterRegistry::with_default_adapters(),
            defaults: EngineDefaults::default(),
        }
    }

    /// An engine with no adapters registered at all; callers (tests) wire
    /// up exactly the adapters -- real or mock -- they need via
    /// [`Engine::register_adapter`].
    pub fn bare() -> Self {
        Self {
            registry: AdapterRegistry::empty(),
            defaults: EngineDefaults::default(),
        }
    }

    /// Seed an engine's defaults from a loaded [`xec_config::EngineConfig`]
    /// (SPEC_FULL.md §A "Configuration").
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut engine = Self::new();
        engine.defaults.environment = config.environment.clone();
        engine.defaults.working_directory = config.working_directory.clone();
        engine.defaults.timeout = config.timeout();
        engine.defaults.shell_mode = Some(config.shell_mode());
        engine.defaults.retry_policy = if config.retry.max_retries > 0 {
            Some(config.retry_policy())
        } else {
            None
        };
        engine
    }

    pub fn register_adapter(&self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.registry.register(name, adapter);
    }

    pub fn unregister_adapter(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.registry.unregister(name)
    }

    /// Merge arbitrary default overrides, caller-specified keys winning
    /// (spec §4.8 `with(partial_config)`).
    pub fn with(&self, f: impl FnOnce(EngineDefaults) -> EngineDefaults) -> Self {
        Self {
            registry: self.registry.clone(),
            defaults: f(self.defaults.clone()),
        }
    }

    pub fn cd(&self, path: impl Into<PathBuf>) -> Self {
        self.with(|mut d| {
            d.working_directory = Some(path.into());
            d
        })
    }

    pub fn env(&self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.with(|mut d| {
            d.environment.extend(vars);
            d
        })
    }

    pub fn timeout(&self, duration: Duration) -> Self {
        self.with(|mut d| {
            d.timeout = Some(duration);
            d
        })
    }

    pub fn shell(&self, mode: ShellMode) -> Self {
        self.with(|mut d| {
            d.shell_mode = Some(mode);
            d
        })
    }

    pub fn retry(&self, policy: RetryPolicy) -> Self {
        self.with(|mut d| {
            d.retry_policy = Some(policy);
            d
        })
    }

    /// Pin dispatch to the local adapter regardless of a command's own
    /// target selector.
    pub fn local(&self) -> Self {
        self.with(|mut d| {
            d.pinned_target = Some(TargetSelector::Local);
            d
        })
    }

    pub fn ssh(&self, config: SshConnectionConfig) -> Self {
        self.with(|mut d| {
            d.pinned_target = Some(TargetSelector::Ssh(config));
            d
        })
    }

    pub fn docker(&self, target: ContainerTarget) -> Self {
        self.with(|mut d| {
            d.pinned_target = Some(TargetSelector::Container(target));
            d
        })
    }

    pub fn k8s(&self, config: ClusterPodConfig) -> Self {
        self.with(|mut d| {
            d.pinned_target = Some(TargetSelector::ClusterPod(config));
            d
        })
    }

    pub fn remote_docker(&self, ssh: SshConnectionConfig, target: ContainerTarget) -> Self {
        self.with(|mut d| {
            d.pinned_target = Some(TargetSelector::SshThenContainer(ssh, target));
            d
        })
    }

    pub fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    pub fn is_command_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }

    pub(crate) fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub(crate) fn defaults(&self) -> &EngineDefaults {
        &self.defaults
    }

    /// The raw entry point (spec §4.8): execute an already-built
    /// `CommandBuilder`/`Template` pair and return a deferred
    /// [`ProcessHandle`]. Quoted mode: template interpolants are
    /// single-quote-escaped.
    pub fn exec(&self, template: Template) -> ProcessHandle {
        ProcessHandle::new(self.clone(), CommandBuilder::new(), HandleWork::Template { template, raw: false })
    }

    /// Same as [`Engine::exec`] but in raw mode: interpolants are inserted
    /// verbatim, with no shell quoting (spec §4.1 "raw mode").
    pub fn exec_raw(&self, template: Template) -> ProcessHandle {
        ProcessHandle::new(self.clone(), CommandBuilder::new(), HandleWork::Template { template, raw: true })
    }

    /// Program + argv, bypassing the interpolator and any shell entirely
    /// (spec §3.1 `ProgramSource::Argv`).
    pub fn exec_argv(&self, program: impl Into<String>, args: Vec<String>) -> ProcessHandle {
        ProcessHandle::new(
            self.clone(),
            CommandBuilder::new(),
            HandleWork::Argv {
                program: program.into(),
                args,
            },
        )
    }

    /// Dispose every registered adapter's pooled resources (spec §4.2
    /// `dispose()`, idempotent).
    pub async fn dispose_all(&self) {
        self.registry.dispose_all().await;
    }
}
