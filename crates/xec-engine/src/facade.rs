//! The callable façade (spec §4.10): wraps an [`Engine`], mirrors every one
//! of its configuration verbs, and adds the two invocation entry points --
//! `cmd` (quoted interpolation) and `raw` (no quoting) -- that turn a
//! structured template into a [`ProcessHandle`].

use std::path::PathBuf;
use std::time::Duration;

use xec_core::{ClusterPodConfig, ContainerTarget, RetryPolicy, ShellMode, SshConnectionConfig};
use xec_interp::Template;

use crate::engine::Engine;
use crate::handle::ProcessHandle;

/// A thin, cloneable wrapper over [`Engine`] meant to be the crate's main
/// entry point: construct one, chain configuration, then call `cmd`/`raw`/
/// `argv` to get a handle (spec §4.10).
#[derive(Clone, Default)]
pub struct Xec {
    engine: Engine,
}

impl Xec {
    pub fn new() -> Self {
        Self { engine: Engine::new() }
    }

    pub fn from_engine(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn cd(&self, path: impl Into<PathBuf>) -> Self {
        Self::from_engine(self.engine.cd(path))
    }

    pub fn env(&self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::from_engine(self.engine.env(vars))
    }

    pub fn timeout(&self, duration: Duration) -> Self {
        Self::from_engine(self.engine.timeout(duration))
    }

    pub fn shell(&self, mode: ShellMode) -> Self {
        Self::from_engine(self.engine.shell(mode))
    }

    pub fn retry(&self, policy: RetryPolicy) -> Self {
        Self::from_engine(self.engine.retry(policy))
    }

    pub fn local(&self) -> Self {
        Self::from_engine(self.engine.local())
    }

    pub fn ssh(&self, config: SshConnectionConfig) -> Self {
        Self::from_engine(self.engine.ssh(config))
    }

    pub fn docker(&self, target: ContainerTarget) -> Self {
        Self::from_engine(self.engine.docker(target))
    }

    pub fn k8s(&self, config: ClusterPodConfig) -> Self {
        Self::from_engine(self.engine.k8s(config))
    }

    pub fn remote_docker(&self, ssh: SshConnectionConfig, target: ContainerTarget) -> Self {
        Self::from_engine(self.engine.remote_docker(ssh, target))
    }

    pub fn which(&self, program: &str) -> Option<PathBuf> {
        self.engine.which(program)
    }

    pub fn is_command_available(&self, program: &str) -> bool {
        self.engine.is_command_available(program)
    }

    /// Quoted invocation: every interpolant is single-quote-escaped (spec
    /// §4.1, the default, injection-safe mode).
    pub fn cmd(&self, template: Template) -> ProcessHandle {
        self.engine.exec(template)
    }

    /// Raw invocation: interpolants are inserted verbatim (spec §4.1 "raw
    /// mode"). The caller is responsible for shell safety.
    pub fn raw(&self, template: Template) -> ProcessHandle {
        self.engine.exec_raw(template)
    }

    /// Program + argv, bypassing the interpolator and any shell entirely.
    pub fn argv(&self, program: impl Into<String>, args: Vec<String>) -> ProcessHandle {
        self.engine.exec_argv(program, args)
    }

    pub async fn dispose_all(&self) {
        self.engine.dispose_all().await;
    }
}
