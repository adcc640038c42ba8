//! `EngineDefaults` (the configuration an `Engine` carries) and
//! `CommandBuilder` (the per-call overrides accumulated on a `ProcessHandle`
//! before dispatch), and the merge between the two that produces the final
//! immutable `xec_core::Command` (spec §3.1, §4.8, §4.9).

use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;
use xec_core::{Command, ProgramSource, RetryPolicy, ShellMode, StdinPayload, TargetSelector};

/// The configuration an `Engine` carries: ambient environment, working
/// directory, timeout, shell mode, retry policy, and -- when the engine has
/// been pinned via `.local()`/`.ssh(cfg)`/`.docker(cfg)`/`.k8s(cfg)`/
/// `.remote_docker(cfg)` -- the target every command dispatches to
/// regardless of what the command itself names (spec §4.8).
#[derive(Debug, Clone, Default)]
pub struct EngineDefaults {
    pub environment: IndexMap<String, String>,
    pub working_directory: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub shell_mode: Option<ShellMode>,
    pub retry_policy: Option<RetryPolicy>,
    pub pinned_target: Option<TargetSelector>,
}

impl EngineDefaults {
    fn merged_environment(&self, overrides: &IndexMap<String, String>) -> IndexMap<String, String> {
        let mut merged = self.environment.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// Per-call overrides accumulated on a `ProcessHandle` while it is still
/// `configurable` (spec §4.9): `cwd`, `env`, `timeout`, `shell`, `nothrow`,
/// an explicit target, stdin, and a retry policy. Each setter consumes and
/// returns `self`, matching the handle's "each returns the same handle with
/// updated intent" contract one level down.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    pub(crate) environment: IndexMap<String, String>,
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) shell_mode: Option<ShellMode>,
    pub(crate) stdin: Option<StdinPayload>,
    pub(crate) suppress_throw: bool,
    pub(crate) target: Option<TargetSelector>,
    pub(crate) retry_policy: Option<RetryPolicy>,
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    pub fn env(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.environment.extend(vars);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn shell(mut self, mode: ShellMode) -> Self {
        self.shell_mode = Some(mode);
        self
    }

    pub fn nothrow(mut self) -> Self {
        self.suppress_throw = true;
        self
    }

    pub fn stdin(mut self, payload: StdinPayload) -> Self {
        self.stdin = Some(payload);
        self
    }

    pub fn target(mut self, target: TargetSelector) -> Self {
        self.target = Some(target);
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Merge this builder's overrides over `defaults` and attach the final
    /// rendered `program`, producing the immutable `Command` an adapter
    /// executes (spec §3.1: "every modifier returns a new Command").
    pub(crate) fn build(&self, defaults: &EngineDefaults, program: ProgramSource) -> Command {
        Command {
            program,
            shell_mode: self
                .shell_mode
                .clone()
                .or_else(|| defaults.shell_mode.clone())
                .unwrap_or_default(),
            environment: defaults.merged_environment(&self.environment),
            working_directory: self
                .working_directory
                .clone()
                .or_else(|| defaults.working_directory.clone()),
            timeout: self.timeout.or(defaults.timeout),
            stdin: self.stdin.clone(),
            suppress_throw: self.suppress_throw,
            target: self
                .target
                .clone()
                .or_else(|| defaults.pinned_target.clone())
                .unwrap_or(TargetSelector::Local),
            retry_policy: self.retry_policy.clone().or_else(|| defaults.retry_policy.clone()),
        }
    }
}
